use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use serde::Serialize;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;

use super::exit_intent::{ExitIntentDetector, PointerEvent};
use super::state::{FireSource, TriggerState, TriggerStatus};
use crate::config::TriggerMode;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Receives the single "present now" signal.
pub trait PresentHook: Send + Sync {
    fn present_now(&self);
}

impl<F> PresentHook for F
where
    F: Fn() + Send + Sync,
{
    fn present_now(&self) {
        self()
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSnapshot {
    pub state: TriggerState,
    pub remaining_ms: i64,
}

/// Arms one trigger per page load and fires the hook at most once.
///
/// Cloning is cheap; clones share state, so the timer task, pointer handlers
/// and dismissal path all race on the same `Armed -> Fired` transition.
#[derive(Clone)]
pub struct TriggerScheduler {
    state: Arc<Mutex<TriggerState>>,
    hook: Arc<dyn PresentHook>,
    loaded_at: Instant,
    detector: ExitIntentDetector,
    cancel_token: CancellationToken,
    timer: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl TriggerScheduler {
    /// `loaded_at` is the page-load instant; delays are measured from it, not
    /// from when eligibility was decided.
    pub fn new(hook: Arc<dyn PresentHook>, loaded_at: Instant, detector: ExitIntentDetector) -> Self {
        Self {
            state: Arc::new(Mutex::new(TriggerState::new())),
            hook,
            loaded_at,
            detector,
            cancel_token: CancellationToken::new(),
            timer: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn arm(&self, mode: TriggerMode) -> Result<()> {
        let deadline = match mode {
            TriggerMode::Delay { seconds } => Some(
                self.loaded_at
                    .checked_add(Duration::from_secs(seconds))
                    .ok_or_else(|| anyhow!("delay of {seconds}s overflows the timer"))?,
            ),
            TriggerMode::ExitIntent => None,
        };

        self.state.lock().await.arm(mode, deadline)?;

        if let Some(deadline) = deadline {
            self.spawn_timer(deadline).await;
        }

        log_info!("popup trigger armed: {mode:?}");
        Ok(())
    }

    /// Feeds a pointer observation. Returns true if this event fired.
    pub async fn on_pointer_event(&self, event: PointerEvent) -> bool {
        let armed_for_exit = {
            let state = self.state.lock().await;
            state.mode == Some(TriggerMode::ExitIntent)
        };

        if !armed_for_exit || !self.detector.qualifies(&event) {
            return false;
        }

        self.fire(FireSource::ExitIntent).await
    }

    /// Visibility loss is ambiguous (tab switch vs. leaving), so it is only
    /// recorded.
    pub async fn on_visibility_change(&self, hidden: bool) {
        if !hidden {
            return;
        }
        let mut state = self.state.lock().await;
        if state.status == TriggerStatus::Armed && !state.visibility_lost {
            state.visibility_lost = true;
            log_debug!("page hidden while popup trigger armed; not firing");
        }
    }

    /// External entry point, subject to the same at-most-once guarantee.
    pub async fn fire_now(&self) -> bool {
        self.fire(FireSource::External).await
    }

    /// Guarantees no future firing if called before `Fired`. Never fails,
    /// whatever the current state.
    pub async fn cancel(&self) -> bool {
        let cancelled = self.state.lock().await.cancel();
        self.stop_timer().await;
        if cancelled {
            log_info!("popup trigger cancelled");
        }
        cancelled
    }

    pub async fn status(&self) -> TriggerStatus {
        self.state.lock().await.status
    }

    pub async fn snapshot(&self) -> TriggerSnapshot {
        let guard = self.state.lock().await;
        TriggerSnapshot {
            remaining_ms: guard.remaining_ms(Instant::now()),
            state: guard.clone(),
        }
    }

    async fn fire(&self, source: FireSource) -> bool {
        let fired = self.state.lock().await.try_fire(source);
        if !fired {
            log_debug!("ignoring {source:?} signal; trigger no longer armed");
            return false;
        }

        // Timer task may still be pending when another source wins.
        self.cancel_token.cancel();
        log_info!("popup trigger fired by {source:?}");
        self.hook.present_now();
        true
    }

    async fn spawn_timer(&self, deadline: Instant) {
        let mut timer_guard = self.timer.lock().await;
        if let Some(handle) = timer_guard.take() {
            handle.abort();
        }

        let scheduler = self.clone();
        let token = self.cancel_token.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep_until(deadline) => {
                    scheduler.fire(FireSource::Timer).await;
                }
                _ = token.cancelled() => {}
            }
        });

        *timer_guard = Some(handle);
    }

    async fn stop_timer(&self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.timer.lock().await.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_scheduler() -> (Arc<AtomicUsize>, TriggerScheduler) {
        let count = Arc::new(AtomicUsize::new(0));
        let hook_count = count.clone();
        let hook = Arc::new(move || {
            hook_count.fetch_add(1, Ordering::SeqCst);
        });
        let scheduler = TriggerScheduler::new(hook, Instant::now(), ExitIntentDetector::default());
        (count, scheduler)
    }

    fn exit_event() -> PointerEvent {
        PointerEvent {
            client_y: 2.0,
            leaving_document: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn overflowing_delay_is_an_error_not_a_panic() {
        let (count, scheduler) = counting_scheduler();
        assert!(scheduler
            .arm(TriggerMode::Delay { seconds: u64::MAX })
            .await
            .is_err());
        assert_eq!(scheduler.status().await, TriggerStatus::Idle);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_fires_once_after_configured_seconds() {
        let (count, scheduler) = counting_scheduler();
        scheduler.arm(TriggerMode::Delay { seconds: 2 }).await.unwrap();

        time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.status().await, TriggerStatus::Armed);

        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.status().await, TriggerStatus::Fired);

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_is_measured_from_page_load() {
        let count = Arc::new(AtomicUsize::new(0));
        let hook_count = count.clone();
        let hook = Arc::new(move || {
            hook_count.fetch_add(1, Ordering::SeqCst);
        });
        let loaded_at = Instant::now();
        let scheduler = TriggerScheduler::new(hook, loaded_at, ExitIntentDetector::default());

        // Eligibility took a while; the deadline does not move.
        time::sleep(Duration::from_millis(1500)).await;
        scheduler.arm(TriggerMode::Delay { seconds: 2 }).await.unwrap();

        time::sleep(Duration::from_millis(600)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_exit_gestures_fire_exactly_once() {
        let (count, scheduler) = counting_scheduler();
        scheduler.arm(TriggerMode::ExitIntent).await.unwrap();

        let mut fired = 0;
        for _ in 0..50 {
            if scheduler.on_pointer_event(exit_event()).await {
                fired += 1;
            }
        }

        assert_eq!(fired, 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        let snapshot = scheduler.snapshot().await;
        assert_eq!(snapshot.state.fired_by, Some(FireSource::ExitIntent));
        assert_eq!(snapshot.state.ignored_signals, 49);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_exit_gestures_fire_exactly_once() {
        let (count, scheduler) = counting_scheduler();
        scheduler.arm(TriggerMode::ExitIntent).await.unwrap();

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let scheduler = scheduler.clone();
                tokio::spawn(async move { scheduler.on_pointer_event(exit_event()).await })
            })
            .collect();

        let mut fired = 0;
        for handle in handles {
            if handle.await.unwrap() {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn visibility_loss_never_fires() {
        let (count, scheduler) = counting_scheduler();
        scheduler.arm(TriggerMode::ExitIntent).await.unwrap();

        scheduler.on_visibility_change(true).await;
        scheduler.on_visibility_change(false).await;
        scheduler.on_visibility_change(true).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
        let snapshot = scheduler.snapshot().await;
        assert_eq!(snapshot.state.status, TriggerStatus::Armed);
        assert!(snapshot.state.visibility_lost);
    }

    #[tokio::test(start_paused = true)]
    async fn pointer_events_ignored_in_delay_mode() {
        let (count, scheduler) = counting_scheduler();
        scheduler.arm(TriggerMode::Delay { seconds: 5 }).await.unwrap();

        assert!(!scheduler.on_pointer_event(exit_event()).await);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn external_fire_races_timer_without_double_present() {
        let (count, scheduler) = counting_scheduler();
        scheduler.arm(TriggerMode::Delay { seconds: 2 }).await.unwrap();

        assert!(scheduler.fire_now().await);
        time::sleep(Duration::from_secs(3)).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(
            scheduler.snapshot().await.state.fired_by,
            Some(FireSource::External)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_deadline_prevents_firing() {
        let (count, scheduler) = counting_scheduler();
        scheduler.arm(TriggerMode::Delay { seconds: 2 }).await.unwrap();

        time::sleep(Duration::from_secs(1)).await;
        assert!(scheduler.cancel().await);
        time::sleep(Duration::from_secs(5)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.status().await, TriggerStatus::Cancelled);
        assert!(!scheduler.fire_now().await);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_safe_in_any_state() {
        let (count, scheduler) = counting_scheduler();
        // Idle
        assert!(scheduler.cancel().await);
        // Already cancelled
        assert!(!scheduler.cancel().await);

        let (_, fired) = counting_scheduler();
        fired.arm(TriggerMode::ExitIntent).await.unwrap();
        fired.on_pointer_event(exit_event()).await;
        // Already fired
        assert!(!fired.cancel().await);
        assert_eq!(fired.status().await, TriggerStatus::Fired);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_reports_remaining_delay() {
        let (_, scheduler) = counting_scheduler();
        scheduler.arm(TriggerMode::Delay { seconds: 2 }).await.unwrap();

        time::sleep(Duration::from_millis(500)).await;
        let snapshot = scheduler.snapshot().await;
        // Timer wheel resolution is 1ms.
        assert!((1490..=1500).contains(&snapshot.remaining_ms));
        assert_eq!(snapshot.state.status, TriggerStatus::Armed);
    }
}
