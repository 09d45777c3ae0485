//! Presentation-agnostic description of a popup.
//!
//! Colors are opaque tokens passed through verbatim; nothing here is CSS.
//! The descriptor serializes to camelCase JSON for presenters that live in a
//! different runtime.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::{LayoutPosition, PopupIdentity};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum RegionName {
    Header,
    Body,
    Media,
    Action,
    Dismiss,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ActionBinding {
    NavigateSameTab { url: String },
    NavigateNewTab { url: String },
    /// Close the popup without navigating.
    Dismiss,
}

impl ActionBinding {
    pub fn dismisses(&self) -> bool {
        matches!(self, ActionBinding::Dismiss)
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            ActionBinding::NavigateSameTab { url } | ActionBinding::NavigateNewTab { url } => {
                Some(url)
            }
            ActionBinding::Dismiss => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverlayRegion {
    pub opacity: f64,
    pub backdrop_dismiss: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TextRegion {
    pub text: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "render")]
pub enum MediaContent {
    /// Playable media with visible controls.
    Playable { source: String },
    Image { source: String },
    /// Short text or emoji shown in place of an image.
    Glyph { text: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaRegion {
    pub content: MediaContent,
    /// `None` means the media is inert.
    pub link: Option<ActionBinding>,
}

impl MediaRegion {
    pub fn is_playable(&self) -> bool {
        matches!(self.content, MediaContent::Playable { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActionRegion {
    pub label: String,
    pub background: String,
    pub color: String,
    pub binding: ActionBinding,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DismissRegion {
    pub glyph: String,
    pub binding: ActionBinding,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RenderDescriptor {
    pub identity: PopupIdentity,
    pub layout: LayoutPosition,
    pub overlay: OverlayRegion,
    pub background: String,
    pub header: TextRegion,
    pub body: TextRegion,
    pub media: Option<MediaRegion>,
    pub action: ActionRegion,
    pub dismiss: Option<DismissRegion>,
}

impl RenderDescriptor {
    /// Regions a presenter has to materialize, in display order.
    pub fn regions(&self) -> Vec<RegionName> {
        let mut regions = Vec::with_capacity(5);
        if self.dismiss.is_some() {
            regions.push(RegionName::Dismiss);
        }
        regions.push(RegionName::Header);
        regions.push(RegionName::Body);
        if self.media.is_some() {
            regions.push(RegionName::Media);
        }
        regions.push(RegionName::Action);
        regions
    }

    pub fn has_dismiss_control(&self) -> bool {
        self.dismiss.is_some()
    }

    pub fn backdrop_dismiss(&self) -> bool {
        self.overlay.backdrop_dismiss
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("failed to serialize render descriptor")
    }
}
