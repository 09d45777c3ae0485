use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::config::FrequencyPolicy;
use crate::eligibility::device::DEFAULT_MOBILE_MAX_WIDTH_PX;

/// Prepended to a popup identity to form its last-shown storage key.
pub const DEFAULT_LEDGER_PREFIX: &str = "smartPop_lastShown:";
/// Storage key a host writes a JSON config under for the storage delivery path.
pub const DEFAULT_CONFIG_STORAGE_KEY: &str = "smartPopConfig";

/// Host-level knobs that are not part of any individual popup config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeSettings {
    /// Applied when a config omits `frequency` or supplies garbage.
    pub default_frequency: FrequencyPolicy,
    /// Pointer must be at or above this many px from the viewport top to count
    /// as an exit gesture. Heuristic, tune per host.
    pub exit_intent_threshold_px: f64,
    /// Viewports narrower than this are classified as mobile.
    pub mobile_max_width_px: u32,
    pub ledger_prefix: String,
    pub config_storage_key: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            default_frequency: FrequencyPolicy::OnceEver,
            exit_intent_threshold_px: 10.0,
            mobile_max_width_px: DEFAULT_MOBILE_MAX_WIDTH_PX,
            ledger_prefix: DEFAULT_LEDGER_PREFIX.into(),
            config_storage_key: DEFAULT_CONFIG_STORAGE_KEY.into(),
        }
    }
}

impl RuntimeSettings {
    /// Reads settings from `path`. A missing file yields defaults; a malformed
    /// one is logged and also yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        Ok(Self::from_json_str(&contents).unwrap_or_else(|err| {
            log::warn!(
                "Ignoring malformed settings at {}: {err:#}",
                path.display()
            );
            Self::default()
        }))
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("invalid runtime settings JSON")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }
}
