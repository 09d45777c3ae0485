//! Display eligibility: may this popup be presented on this page load?
//!
//! Gates run in a fixed order and stop at the first rejection:
//! device visibility, schedule bounds, then frequency against the ledger.
//! Evaluation only reads storage, so it is idempotent and safe to repeat.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

pub mod device;

pub use device::DeviceClass;

use crate::config::{FrequencyPolicy, PopupConfig, PopupIdentity};
use crate::storage::FrequencyLedger;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityContext {
    pub now: DateTime<Utc>,
    pub device: DeviceClass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "reason")]
pub enum Rejection {
    DeviceHidden { device: DeviceClass },
    NotStarted { starts_at: DateTime<Utc> },
    Ended { ended_at: DateTime<Utc> },
    AlreadyShown { last_shown: DateTime<Utc> },
    CoolingDown {
        last_shown: DateTime<Utc>,
        next_eligible_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    /// Carries the identity the later ledger write must use.
    Eligible { identity: PopupIdentity },
    Rejected(Rejection),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible { .. })
    }
}

pub fn evaluate(
    config: &PopupConfig,
    ctx: &EligibilityContext,
    ledger: &FrequencyLedger,
) -> Result<Eligibility> {
    if let Some(rejection) = check_device(config, ctx.device)
        .or_else(|| check_schedule(config, ctx.now))
    {
        log_debug!("popup {} rejected: {:?}", config.identity, rejection);
        return Ok(Eligibility::Rejected(rejection));
    }

    let last_shown = match config.frequency {
        // Nothing to look up.
        FrequencyPolicy::Always => None,
        _ => ledger.last_shown(&config.identity)?,
    };

    if let Some(rejection) = check_frequency(config.frequency, last_shown, ctx.now) {
        log_debug!("popup {} rejected: {:?}", config.identity, rejection);
        return Ok(Eligibility::Rejected(rejection));
    }

    Ok(Eligibility::Eligible {
        identity: config.identity.clone(),
    })
}

fn check_device(config: &PopupConfig, device: DeviceClass) -> Option<Rejection> {
    (!device.is_visible(&config.visibility)).then_some(Rejection::DeviceHidden { device })
}

/// Each bound is checked on its own; an end before the start simply makes
/// both reject at different times.
pub fn check_schedule(config: &PopupConfig, now: DateTime<Utc>) -> Option<Rejection> {
    if let Some(starts_at) = config.schedule.starts_at {
        if now < starts_at {
            return Some(Rejection::NotStarted { starts_at });
        }
    }
    if let Some(ended_at) = config.schedule.ends_at {
        if now > ended_at {
            return Some(Rejection::Ended { ended_at });
        }
    }
    None
}

/// Cooldowns compare whole milliseconds, so one day is satisfied at exactly
/// 24h and not a millisecond earlier.
pub fn check_frequency(
    policy: FrequencyPolicy,
    last_shown: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<Rejection> {
    let last_shown = last_shown?;

    match policy {
        FrequencyPolicy::Always => None,
        FrequencyPolicy::OnceEver => Some(Rejection::AlreadyShown { last_shown }),
        FrequencyPolicy::CooldownDays(days) => {
            let cooldown_ms = i64::from(days) * MS_PER_DAY;
            let elapsed_ms = (now - last_shown).num_milliseconds();
            if elapsed_ms >= cooldown_ms {
                None
            } else {
                Some(Rejection::CoolingDown {
                    last_shown,
                    next_eligible_at: last_shown
                        .checked_add_signed(Duration::milliseconds(cooldown_ms))
                        .unwrap_or(DateTime::<Utc>::MAX_UTC),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_config, ResolverOptions};
    use crate::storage::MemoryStorage;
    use chrono::TimeZone;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn config(raw: Value) -> PopupConfig {
        resolve_config(&raw, &ResolverOptions::default()).unwrap()
    }

    fn ledger() -> FrequencyLedger {
        FrequencyLedger::new(Arc::new(MemoryStorage::new()))
    }

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn desktop(now: DateTime<Utc>) -> EligibilityContext {
        EligibilityContext {
            now,
            device: DeviceClass::Desktop,
        }
    }

    const T0: i64 = 1_750_000_000_000;

    #[test]
    fn once_ever_rejects_after_one_presentation() {
        let config = config(json!({"headline": "Sale", "frequency": 0}));
        let ledger = ledger();
        let ctx = desktop(at(T0));

        assert!(evaluate(&config, &ctx, &ledger).unwrap().is_eligible());
        ledger.record_shown(&config.identity, ctx.now).unwrap();

        assert_eq!(
            evaluate(&config, &ctx, &ledger).unwrap(),
            Eligibility::Rejected(Rejection::AlreadyShown { last_shown: ctx.now })
        );
        // Years later it is still rejected.
        let later = desktop(at(T0 + 3 * 365 * MS_PER_DAY));
        assert!(!evaluate(&config, &later, &ledger).unwrap().is_eligible());
    }

    #[test]
    fn cooldown_boundary_is_exact() {
        for days in [1_u32, 3, 30] {
            let config = config(json!({"headline": "Sale", "frequency": days}));
            let ledger = ledger();
            ledger.record_shown(&config.identity, at(T0)).unwrap();

            let window = i64::from(days) * MS_PER_DAY;
            let just_before = desktop(at(T0 + window - 1));
            let exactly = desktop(at(T0 + window));

            assert!(
                !evaluate(&config, &just_before, &ledger).unwrap().is_eligible(),
                "{days} day cooldown must still hold 1ms early"
            );
            assert!(
                evaluate(&config, &exactly, &ledger).unwrap().is_eligible(),
                "{days} day cooldown must be satisfied at exactly N*24h"
            );
        }
    }

    #[test]
    fn cooldown_reports_next_eligible_instant() {
        let config = config(json!({"frequency": "cooldown-2"}));
        let ledger = ledger();
        ledger.record_shown(&config.identity, at(T0)).unwrap();

        let result = evaluate(&config, &desktop(at(T0 + 1000)), &ledger).unwrap();
        assert_eq!(
            result,
            Eligibility::Rejected(Rejection::CoolingDown {
                last_shown: at(T0),
                next_eligible_at: at(T0 + 2 * MS_PER_DAY),
            })
        );
    }

    #[test]
    fn unreachable_cooldown_end_saturates() {
        let rejection = check_frequency(
            FrequencyPolicy::CooldownDays(u32::MAX),
            Some(at(T0)),
            at(T0 + 1),
        );
        assert_eq!(
            rejection,
            Some(Rejection::CoolingDown {
                last_shown: at(T0),
                next_eligible_at: DateTime::<Utc>::MAX_UTC,
            })
        );
    }

    #[test]
    fn oversized_frequency_with_history_still_evaluates() {
        let config = config(json!({"headline": "Sale", "frequency": 4_000_000_000_u64}));
        let ledger = ledger();
        ledger.record_shown(&config.identity, at(T0)).unwrap();

        let result = evaluate(&config, &desktop(at(T0 + MS_PER_DAY)), &ledger).unwrap();
        assert!(!result.is_eligible());
    }

    #[test]
    fn always_ignores_history() {
        let config = config(json!({"frequency": "always"}));
        let ledger = ledger();
        ledger.record_shown(&config.identity, at(T0)).unwrap();

        assert!(evaluate(&config, &desktop(at(T0)), &ledger).unwrap().is_eligible());
    }

    #[test]
    fn device_filter_wins_over_everything() {
        let config = config(json!({"hideDesktop": true, "frequency": "always"}));
        let result = evaluate(&config, &desktop(at(T0)), &ledger()).unwrap();
        assert_eq!(
            result,
            Eligibility::Rejected(Rejection::DeviceHidden {
                device: DeviceClass::Desktop
            })
        );

        let mobile = EligibilityContext {
            now: at(T0),
            device: DeviceClass::Mobile,
        };
        assert!(evaluate(&config, &mobile, &ledger()).unwrap().is_eligible());
    }

    #[test]
    fn future_start_rejects_regardless_of_frequency() {
        let now = at(T0);
        let start = now + Duration::days(1);
        let config = config(json!({
            "frequency": "always",
            "startAt": start.to_rfc3339()
        }));

        assert_eq!(
            evaluate(&config, &desktop(now), &ledger()).unwrap(),
            Eligibility::Rejected(Rejection::NotStarted { starts_at: start })
        );
    }

    #[test]
    fn past_end_rejects_regardless_of_frequency() {
        let now = at(T0);
        let end = now - Duration::hours(1);
        let config = config(json!({
            "frequency": "always",
            "endAt": end.to_rfc3339()
        }));

        assert_eq!(
            evaluate(&config, &desktop(now), &ledger()).unwrap(),
            Eligibility::Rejected(Rejection::Ended { ended_at: end })
        );
    }

    #[test]
    fn missing_bounds_impose_nothing() {
        let config = config(json!({}));
        assert!(check_schedule(&config, at(0)).is_none());
        assert!(check_schedule(&config, at(T0 * 2)).is_none());
    }

    #[test]
    fn inverted_window_is_evaluated_bound_by_bound() {
        let start = at(T0);
        let end = at(T0 - MS_PER_DAY);
        let config = config(json!({
            "startAt": start.to_rfc3339(),
            "endAt": end.to_rfc3339()
        }));

        // Before the start: the start bound rejects.
        assert!(matches!(
            check_schedule(&config, at(T0 - 2 * MS_PER_DAY)),
            Some(Rejection::NotStarted { .. })
        ));
        // After the start: the end bound rejects.
        assert!(matches!(
            check_schedule(&config, at(T0 + 1)),
            Some(Rejection::Ended { .. })
        ));
    }

    #[test]
    fn bounds_are_inclusive() {
        let config = config(json!({
            "startAt": at(T0).to_rfc3339(),
            "endAt": at(T0 + 1000).to_rfc3339()
        }));
        assert!(check_schedule(&config, at(T0)).is_none());
        assert!(check_schedule(&config, at(T0 + 1000)).is_none());
    }

    #[test]
    fn evaluation_does_not_write_state() {
        let storage = Arc::new(MemoryStorage::new());
        let ledger = FrequencyLedger::new(storage.clone());
        let config = config(json!({"headline": "Sale"}));

        for _ in 0..3 {
            assert!(evaluate(&config, &desktop(at(T0)), &ledger).unwrap().is_eligible());
        }
        assert!(storage.is_empty());
    }
}
