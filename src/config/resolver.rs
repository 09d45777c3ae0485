//! Normalizes a loosely-typed configuration object into a [`PopupConfig`].
//!
//! Every recognized field has a default and degrades to it on its own; a bad
//! delay never costs the visitor the headline. Unknown keys are ignored.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use super::identity::PopupIdentity;
use super::model::{
    CallToAction, ContentBlock, CtaAction, DeviceVisibility, DismissalPolicy, FrequencyPolicy,
    LayoutPosition, MediaBlock, MediaKind, PopupConfig, ScheduleWindow, TriggerMode,
    DEFAULT_DELAY_SECS, DEFAULT_OVERLAY_OPACITY,
};
use crate::settings::RuntimeSettings;

const ENABLE_LOGS: bool = true;

/// Longer delays are treated as garbage.
const MAX_DELAY_SECS: u64 = u32::MAX as u64;
/// A century. Longer cooldowns are treated as garbage.
pub const MAX_COOLDOWN_DAYS: u32 = 36_500;

use crate::log_debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    pub default_frequency: FrequencyPolicy,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            default_frequency: FrequencyPolicy::OnceEver,
        }
    }
}

impl From<&RuntimeSettings> for ResolverOptions {
    fn from(settings: &RuntimeSettings) -> Self {
        Self {
            default_frequency: settings.default_frequency,
        }
    }
}

/// Returns `None` when `raw` is not a JSON object: nothing is configured.
pub fn resolve_config(raw: &Value, options: &ResolverOptions) -> Option<PopupConfig> {
    let obj = raw.as_object()?;

    let content = resolve_content(obj);
    let explicit_id = text_field(obj, "id");
    let identity = PopupIdentity::derive(explicit_id.as_deref(), &content.headline);

    Some(PopupConfig {
        identity,
        schedule: ScheduleWindow {
            starts_at: instant_field(obj, "startAt"),
            ends_at: instant_field(obj, "endAt"),
        },
        frequency: resolve_frequency(obj, options.default_frequency),
        visibility: resolve_visibility(obj),
        trigger: resolve_trigger(obj),
        overlay_opacity: resolve_opacity(obj),
        dismissal: DismissalPolicy {
            show_close: bool_field(obj, "showClose") != Some(false),
            backdrop_close: bool_field(obj, "noBackdropClose") != Some(true),
        },
        position: resolve_position(obj),
        content,
        media: resolve_media(obj),
        cta: resolve_cta(obj),
    })
}

fn resolve_content(obj: &Map<String, Value>) -> ContentBlock {
    let defaults = ContentBlock::default();
    ContentBlock {
        headline: text_field(obj, "headline").unwrap_or(defaults.headline),
        text: text_field(obj, "text").unwrap_or(defaults.text),
        headline_color: text_field(obj, "headlineColor").unwrap_or(defaults.headline_color),
        text_color: text_field(obj, "textColor").unwrap_or(defaults.text_color),
        background: text_field(obj, "popupBg").unwrap_or(defaults.background),
    }
}

fn resolve_cta(obj: &Map<String, Value>) -> CallToAction {
    let defaults = CallToAction::default();
    let action = match text_field(obj, "buttonAction") {
        Some(raw) => CtaAction::parse(&raw).unwrap_or_else(|| {
            log_debug!("unknown buttonAction '{raw}', using same-tab");
            defaults.action
        }),
        None => defaults.action,
    };

    CallToAction {
        label: text_field(obj, "buttonText").unwrap_or(defaults.label),
        link: text_field(obj, "buttonLink").unwrap_or(defaults.link),
        action,
        background: text_field(obj, "buttonBgColor").unwrap_or(defaults.background),
        color: text_field(obj, "buttonTextColor").unwrap_or(defaults.color),
    }
}

fn resolve_media(obj: &Map<String, Value>) -> MediaBlock {
    let kind = match text_field(obj, "mediaType") {
        Some(raw) => MediaKind::parse(&raw).unwrap_or_else(|| {
            log_debug!("unknown mediaType '{raw}', rendering no media");
            MediaKind::None
        }),
        None => MediaKind::None,
    };

    MediaBlock {
        kind,
        source: text_field(obj, "mediaUrl"),
        link: text_field(obj, "mediaLink"),
    }
}

fn resolve_position(obj: &Map<String, Value>) -> LayoutPosition {
    match text_field(obj, "position") {
        Some(raw) => LayoutPosition::parse(&raw).unwrap_or_else(|| {
            log_debug!("unknown position '{raw}', using center");
            LayoutPosition::Center
        }),
        None => LayoutPosition::Center,
    }
}

fn resolve_trigger(obj: &Map<String, Value>) -> TriggerMode {
    let exit_intent = match text_field(obj, "trigger") {
        Some(raw) => matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "exit" | "exit-intent" | "exitintent" | "exit_intent"
        ),
        None => bool_field(obj, "exitIntent") == Some(true),
    };

    if exit_intent {
        return TriggerMode::ExitIntent;
    }

    TriggerMode::Delay {
        seconds: resolve_delay(obj),
    }
}

fn resolve_delay(obj: &Map<String, Value>) -> u64 {
    match number_field(obj, "delay") {
        // Zero, negative and sub-second delays use the default.
        Some(secs) if (1.0..=MAX_DELAY_SECS as f64).contains(&secs) => secs.trunc() as u64,
        Some(secs) => {
            log_debug!("delay {secs} is out of range, using default");
            DEFAULT_DELAY_SECS
        }
        None => DEFAULT_DELAY_SECS,
    }
}

fn resolve_frequency(obj: &Map<String, Value>, default: FrequencyPolicy) -> FrequencyPolicy {
    if bool_field(obj, "everyLoad") == Some(true) {
        return FrequencyPolicy::Always;
    }

    match obj.get("frequency") {
        None | Some(Value::Null) => default,
        Some(value) => parse_frequency(value).unwrap_or_else(|| {
            log_debug!("unparsable frequency {value}, using default {default:?}");
            default
        }),
    }
}

/// Numbers are day counts (0 = once-ever). Strings may also be `always`,
/// `once`, `once-ever`, `cooldown-N` or `cooldown-N-days`.
pub fn parse_frequency(value: &Value) -> Option<FrequencyPolicy> {
    match value {
        Value::Number(n) => n.as_f64().and_then(days_from_f64),
        Value::String(raw) => {
            let raw = raw.trim().to_ascii_lowercase();
            match raw.as_str() {
                "always" | "every-load" | "everyload" => Some(FrequencyPolicy::Always),
                "once" | "once-ever" | "onceever" => Some(FrequencyPolicy::OnceEver),
                _ => {
                    let days = raw
                        .strip_prefix("cooldown-")
                        .map(|rest| rest.strip_suffix("-days").unwrap_or(rest))
                        .unwrap_or(raw.as_str());
                    days.parse::<f64>().ok().and_then(days_from_f64)
                }
            }
        }
        _ => None,
    }
}

/// Fractional counts round up so half a day never collapses into once-ever.
fn days_from_f64(days: f64) -> Option<FrequencyPolicy> {
    if !days.is_finite() || days < 0.0 || days > f64::from(MAX_COOLDOWN_DAYS) {
        return None;
    }
    let whole = days.ceil();
    if whole != days {
        log_debug!("fractional cooldown {days} rounded up to {whole} days");
    }
    Some(FrequencyPolicy::from_days(whole as u32))
}

fn resolve_visibility(obj: &Map<String, Value>) -> DeviceVisibility {
    let mut visibility = match text_field(obj, "device").map(|d| d.to_ascii_lowercase()) {
        Some(device) if device == "desktop" => DeviceVisibility {
            show_on_desktop: true,
            show_on_mobile: false,
        },
        Some(device) if device == "mobile" => DeviceVisibility {
            show_on_desktop: false,
            show_on_mobile: true,
        },
        _ => DeviceVisibility::default(),
    };

    if bool_field(obj, "hideDesktop") == Some(true) {
        visibility.show_on_desktop = false;
    }
    if bool_field(obj, "hideMobile") == Some(true) {
        visibility.show_on_mobile = false;
    }
    visibility
}

fn resolve_opacity(obj: &Map<String, Value>) -> f64 {
    match number_field(obj, "overlayOpacity") {
        Some(value) if (0.0..=1.0).contains(&value) => value,
        Some(percent) if percent > 1.0 && percent <= 100.0 => percent / 100.0,
        Some(value) => {
            log_debug!("overlayOpacity {value} out of range, using default");
            DEFAULT_OVERLAY_OPACITY
        }
        None => DEFAULT_OVERLAY_OPACITY,
    }
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> Option<bool> {
    match obj.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        _ => None,
    }
}

fn number_field(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = match obj.get(key)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

fn instant_field(obj: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    let value = obj.get(key)?;
    let parsed = parse_instant(value);
    if parsed.is_none() && !value.is_null() {
        log_debug!("ignoring unparsable {key} value {value}");
    }
    parsed
}

/// RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` and `YYYY-MM-DD` are read as UTC;
/// numbers are epoch milliseconds.
pub fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::String(raw) => {
            let raw = raw.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
                return Some(dt.with_timezone(&Utc));
            }
            for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                    return Some(Utc.from_utc_datetime(&naive));
                }
            }
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
        _ => None,
    }
}
