//! Resolved popup configuration.
//!
//! A `PopupConfig` is produced once per page load by [`super::resolve_config`]
//! and is read-only afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::PopupIdentity;

pub const DEFAULT_HEADLINE: &str = "Welcome!";
pub const DEFAULT_TEXT: &str = "This is your Smartarget popup.";
pub const DEFAULT_BUTTON_TEXT: &str = "Learn More";
pub const DEFAULT_BUTTON_LINK: &str = "#";
pub const DEFAULT_DELAY_SECS: u64 = 2;
pub const DEFAULT_OVERLAY_OPACITY: f64 = 0.6;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FrequencyPolicy {
    Always,
    OnceEver,
    /// Never constructed with 0; the resolver maps 0 to `OnceEver`.
    CooldownDays(u32),
}

impl Default for FrequencyPolicy {
    fn default() -> Self {
        FrequencyPolicy::OnceEver
    }
}

impl FrequencyPolicy {
    /// Normalizes a day count: 0 means shown at most once, permanently.
    pub fn from_days(days: u32) -> Self {
        if days == 0 {
            FrequencyPolicy::OnceEver
        } else {
            FrequencyPolicy::CooldownDays(days)
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TriggerMode {
    Delay { seconds: u64 },
    ExitIntent,
}

impl Default for TriggerMode {
    fn default() -> Self {
        TriggerMode::Delay {
            seconds: DEFAULT_DELAY_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceVisibility {
    pub show_on_desktop: bool,
    pub show_on_mobile: bool,
}

impl Default for DeviceVisibility {
    fn default() -> Self {
        Self {
            show_on_desktop: true,
            show_on_mobile: true,
        }
    }
}

/// Optional bounds, each evaluated on its own. `ends_at` may precede
/// `starts_at`; nothing here assumes a well-formed interval.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleWindow {
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DismissalPolicy {
    pub show_close: bool,
    pub backdrop_close: bool,
}

impl Default for DismissalPolicy {
    fn default() -> Self {
        Self {
            show_close: true,
            backdrop_close: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutPosition {
    #[default]
    Center,
    Top,
    Bottom,
    TopCover,
    LeftCover,
    RightCover,
}

impl LayoutPosition {
    /// Accepts `top-cover`, `topCover`, `TOP_COVER` and friends.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized: String = value
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "center" | "centre" | "middle" => Some(LayoutPosition::Center),
            "top" => Some(LayoutPosition::Top),
            "bottom" => Some(LayoutPosition::Bottom),
            "topcover" => Some(LayoutPosition::TopCover),
            "leftcover" => Some(LayoutPosition::LeftCover),
            "rightcover" => Some(LayoutPosition::RightCover),
            _ => None,
        }
    }

    pub fn is_cover(&self) -> bool {
        matches!(
            self,
            LayoutPosition::TopCover | LayoutPosition::LeftCover | LayoutPosition::RightCover
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlock {
    pub headline: String,
    pub text: String,
    pub headline_color: String,
    pub text_color: String,
    pub background: String,
}

impl Default for ContentBlock {
    fn default() -> Self {
        Self {
            headline: DEFAULT_HEADLINE.into(),
            text: DEFAULT_TEXT.into(),
            headline_color: "#111827".into(),
            text_color: "#374151".into(),
            background: "#fff".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MediaKind {
    #[default]
    None,
    Image,
    Video,
    Icon,
}

impl MediaKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Some(MediaKind::None),
            "image" | "img" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            "icon" | "emoji" => Some(MediaKind::Icon),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaBlock {
    pub kind: MediaKind,
    pub source: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CtaAction {
    #[default]
    SameTab,
    NewTab,
    CloseOnly,
}

impl CtaAction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "same-tab" | "same" | "_self" | "self" => Some(CtaAction::SameTab),
            "new-tab" | "new" | "_blank" | "blank" => Some(CtaAction::NewTab),
            "close-only" | "close" | "dismiss" => Some(CtaAction::CloseOnly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CallToAction {
    pub label: String,
    pub link: String,
    pub action: CtaAction,
    pub background: String,
    pub color: String,
}

impl Default for CallToAction {
    fn default() -> Self {
        Self {
            label: DEFAULT_BUTTON_TEXT.into(),
            link: DEFAULT_BUTTON_LINK.into(),
            action: CtaAction::SameTab,
            background: "#0b5cff".into(),
            color: "#fff".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PopupConfig {
    pub identity: PopupIdentity,
    pub schedule: ScheduleWindow,
    pub frequency: FrequencyPolicy,
    pub visibility: DeviceVisibility,
    pub trigger: TriggerMode,
    pub overlay_opacity: f64,
    pub dismissal: DismissalPolicy,
    pub position: LayoutPosition,
    pub content: ContentBlock,
    pub media: MediaBlock,
    pub cta: CallToAction,
}
