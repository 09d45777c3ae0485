use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use super::clock::{Clock, SystemClock};
use super::guard::InitGuard;
use super::presenter::{DismissReason, Presenter};
use crate::config::{resolve_config, PopupConfig, PopupIdentity, ResolverOptions};
use crate::delivery::ConfigSource;
use crate::eligibility::{evaluate, DeviceClass, Eligibility, EligibilityContext};
use crate::render::{build_descriptor, RenderDescriptor};
use crate::settings::RuntimeSettings;
use crate::storage::{FrequencyLedger, OriginStorage};
use crate::trigger::{
    ExitIntentDetector, PointerEvent, PresentHook, TriggerScheduler, TriggerSnapshot,
    TriggerStatus,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Facts about the current page load supplied by the host.
#[derive(Debug, Clone, Copy)]
pub struct PageContext {
    pub device: DeviceClass,
    /// Delay triggers count from here.
    pub loaded_at: Instant,
}

impl PageContext {
    pub fn new(device: DeviceClass) -> Self {
        Self {
            device,
            loaded_at: Instant::now(),
        }
    }

    /// Classifies the device against the host's mobile breakpoint.
    pub fn from_viewport(width_px: u32, settings: &RuntimeSettings) -> Self {
        Self::new(DeviceClass::from_viewport_width(
            width_px,
            settings.mobile_max_width_px,
        ))
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "phase")]
pub enum PresentationState {
    Pending,
    /// The presenter could not materialize the popup; nothing was recorded.
    Failed,
    Shown {
        at: DateTime<Utc>,
        recorded: bool,
    },
    Dismissed {
        shown_at: DateTime<Utc>,
        reason: DismissReason,
    },
}

/// Runs on fire: present first, then record. A failed presentation leaves the
/// ledger untouched so the next eligible load tries again.
struct Presentation {
    identity: PopupIdentity,
    descriptor: Arc<RenderDescriptor>,
    presenter: Arc<dyn Presenter>,
    ledger: FrequencyLedger,
    clock: Arc<dyn Clock>,
    state: Mutex<PresentationState>,
}

impl Presentation {
    fn lock(&self) -> MutexGuard<'_, PresentationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> PresentationState {
        *self.lock()
    }

    fn set_state(&self, next: PresentationState) {
        *self.lock() = next;
    }

    fn record(&self, at: DateTime<Utc>) -> bool {
        match self.ledger.record_shown(&self.identity, at) {
            Ok(()) => true,
            Err(err) => {
                log_error!("failed to record presentation of {}: {err:#}", self.identity);
                false
            }
        }
    }

    /// The check and the transition share one lock, so concurrent
    /// dismissals accept exactly one caller.
    fn dismiss(&self, reason: DismissReason) -> bool {
        let mut state = self.lock();
        match *state {
            PresentationState::Shown { at, recorded } => {
                if !recorded && self.record(at) {
                    log_debug!("late presentation record written for {}", self.identity);
                }
                *state = PresentationState::Dismissed {
                    shown_at: at,
                    reason,
                };
                log_info!("popup {} dismissed via {reason:?}", self.identity);
                true
            }
            PresentationState::Dismissed { .. } => {
                log_warn!("popup {} already dismissed; ignoring {reason:?}", self.identity);
                false
            }
            PresentationState::Pending | PresentationState::Failed => {
                log_debug!("dismissal before popup {} was shown", self.identity);
                false
            }
        }
    }
}

impl PresentHook for Presentation {
    fn present_now(&self) {
        if let Err(err) = self.presenter.present(&self.descriptor) {
            log_error!("presenter failed for popup {}: {err:#}", self.identity);
            self.set_state(PresentationState::Failed);
            return;
        }

        let at = self.clock.now();
        let recorded = self.record(at);
        self.set_state(PresentationState::Shown { at, recorded });
        log_info!("popup {} presented", self.identity);
    }
}

/// Page-load entry point: resolve, decide, describe, arm.
pub struct PopupRuntime {
    settings: RuntimeSettings,
    ledger: FrequencyLedger,
    presenter: Arc<dyn Presenter>,
    clock: Arc<dyn Clock>,
    guard: Arc<InitGuard>,
}

impl PopupRuntime {
    pub fn new(
        settings: RuntimeSettings,
        storage: Arc<dyn OriginStorage>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        let ledger = FrequencyLedger::with_prefix(storage, settings.ledger_prefix.clone());
        Self {
            settings,
            ledger,
            presenter,
            clock: Arc::new(SystemClock),
            guard: InitGuard::global(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_guard(mut self, guard: Arc<InitGuard>) -> Self {
        self.guard = guard;
        self
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub fn ledger(&self) -> &FrequencyLedger {
        &self.ledger
    }

    /// Returns `None` whenever nothing will be shown on this load. Every
    /// failure is logged here and goes no further.
    pub async fn start(&self, source: &dyn ConfigSource, page: PageContext) -> Option<PopupSession> {
        if !self.guard.claim() {
            log_warn!("popup already initialised for this page load; ignoring");
            return None;
        }

        let raw = match source.load() {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                log_info!("no popup configured ({} source)", source.name());
                return None;
            }
            Err(err) => {
                log_error!("popup config from {} source unusable: {err:#}", source.name());
                return None;
            }
        };

        let Some(config) = resolve_config(&raw, &ResolverOptions::from(&self.settings)) else {
            log_warn!("popup config from {} source is not an object; nothing to show", source.name());
            return None;
        };

        let ctx = EligibilityContext {
            now: self.clock.now(),
            device: page.device,
        };
        let identity = match evaluate(&config, &ctx, &self.ledger) {
            Ok(Eligibility::Eligible { identity }) => identity,
            Ok(Eligibility::Rejected(rejection)) => {
                log_info!("popup {} not eligible: {rejection:?}", config.identity);
                return None;
            }
            Err(err) => {
                log_error!("eligibility check for {} failed: {err:#}", config.identity);
                return None;
            }
        };

        let descriptor = Arc::new(build_descriptor(&config));
        let presentation = Arc::new(Presentation {
            identity,
            descriptor: descriptor.clone(),
            presenter: self.presenter.clone(),
            ledger: self.ledger.clone(),
            clock: self.clock.clone(),
            state: Mutex::new(PresentationState::Pending),
        });

        let scheduler = TriggerScheduler::new(
            presentation.clone(),
            page.loaded_at,
            ExitIntentDetector::new(self.settings.exit_intent_threshold_px),
        );
        if let Err(err) = scheduler.arm(config.trigger).await {
            log_error!("failed to arm popup trigger: {err:#}");
            return None;
        }

        Some(PopupSession {
            config: Arc::new(config),
            descriptor,
            presentation,
            scheduler,
        })
    }
}

/// Handle the host keeps for the rest of the page load.
pub struct PopupSession {
    config: Arc<PopupConfig>,
    descriptor: Arc<RenderDescriptor>,
    presentation: Arc<Presentation>,
    scheduler: TriggerScheduler,
}

impl PopupSession {
    pub fn config(&self) -> &PopupConfig {
        &self.config
    }

    pub fn descriptor(&self) -> &RenderDescriptor {
        &self.descriptor
    }

    pub fn presentation_state(&self) -> PresentationState {
        self.presentation.state()
    }

    pub async fn trigger_status(&self) -> TriggerStatus {
        self.scheduler.status().await
    }

    pub async fn trigger_snapshot(&self) -> TriggerSnapshot {
        self.scheduler.snapshot().await
    }

    pub async fn pointer_event(&self, event: PointerEvent) -> bool {
        self.scheduler.on_pointer_event(event).await
    }

    pub async fn visibility_changed(&self, hidden: bool) {
        self.scheduler.on_visibility_change(hidden).await
    }

    /// Revokes eligibility for the rest of this load if not yet fired.
    pub async fn cancel(&self) -> bool {
        self.scheduler.cancel().await
    }

    /// Called by the presenter once the popup leaves the view. Returns false
    /// for repeat calls, calls before anything was shown, and dismissals
    /// through an affordance the descriptor disabled. Always disarms a
    /// pending trigger.
    pub async fn dismissed(&self, reason: DismissReason) -> bool {
        let allowed = match reason {
            DismissReason::CloseControl => self.descriptor.has_dismiss_control(),
            DismissReason::Backdrop => self.descriptor.backdrop_dismiss(),
            DismissReason::CallToAction => true,
        };
        if !allowed {
            log_warn!("ignoring {reason:?} dismissal; affordance disabled for this popup");
            return false;
        }

        self.scheduler.cancel().await;
        self.presentation.dismiss(reason)
    }
}
