//! Configuration delivery.
//!
//! However the host hands the config over (an injected global, a stored JSON
//! string, a base64 attribute on the script tag), each path is just something
//! that yields zero or one JSON value. The resolver never knows which one ran.

use std::sync::Arc;

use anyhow::{Context, Result};
use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine,
};
use serde_json::Value;

use crate::settings::{RuntimeSettings, DEFAULT_CONFIG_STORAGE_KEY};
use crate::storage::OriginStorage;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

pub trait ConfigSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` means nothing is configured, which is not an error.
    fn load(&self) -> Result<Option<Value>>;
}

/// A value the host injected before boot, e.g. `window.smartPopConfig`.
pub struct GlobalSource {
    value: Option<Value>,
}

impl GlobalSource {
    pub fn new(value: Option<Value>) -> Self {
        Self { value }
    }
}

impl ConfigSource for GlobalSource {
    fn name(&self) -> &'static str {
        "global"
    }

    fn load(&self) -> Result<Option<Value>> {
        Ok(self.value.clone().filter(|value| !value.is_null()))
    }
}

/// A JSON string saved in origin storage.
pub struct StorageSource {
    storage: Arc<dyn OriginStorage>,
    key: String,
}

impl StorageSource {
    pub fn new(storage: Arc<dyn OriginStorage>) -> Self {
        Self::with_key(storage, DEFAULT_CONFIG_STORAGE_KEY)
    }

    /// Reads from the key the host configured in its settings.
    pub fn from_settings(storage: Arc<dyn OriginStorage>, settings: &RuntimeSettings) -> Self {
        Self::with_key(storage, settings.config_storage_key.clone())
    }

    pub fn with_key(storage: Arc<dyn OriginStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }
}

impl ConfigSource for StorageSource {
    fn name(&self) -> &'static str {
        "storage"
    }

    fn load(&self) -> Result<Option<Value>> {
        let Some(raw) = self
            .storage
            .get_item(&self.key)
            .with_context(|| format!("failed to read config key {}", self.key))?
        else {
            return Ok(None);
        };

        if raw.trim().is_empty() {
            return Ok(None);
        }

        let value = serde_json::from_str(&raw)
            .with_context(|| format!("config under {} is not valid JSON", self.key))?;
        Ok(Some(value))
    }
}

/// Base64-encoded JSON carried on the hosting script element. Both the
/// standard and URL-safe alphabets are accepted.
pub struct AttributeSource {
    encoded: Option<String>,
}

impl AttributeSource {
    pub fn new(encoded: Option<String>) -> Self {
        Self { encoded }
    }
}

impl ConfigSource for AttributeSource {
    fn name(&self) -> &'static str {
        "attribute"
    }

    fn load(&self) -> Result<Option<Value>> {
        let Some(encoded) = self.encoded.as_deref().map(str::trim) else {
            return Ok(None);
        };
        if encoded.is_empty() {
            return Ok(None);
        }

        let bytes = STANDARD
            .decode(encoded)
            .or_else(|_| URL_SAFE_NO_PAD.decode(encoded.trim_end_matches('=')))
            .context("config attribute is not valid base64")?;

        let value = serde_json::from_slice(&bytes).context("decoded config attribute is not JSON")?;
        Ok(Some(value))
    }
}

/// Tries each source in order and returns the first configured value. A
/// failing source is logged and skipped.
pub struct FirstAvailable {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl FirstAvailable {
    pub fn new(sources: Vec<Box<dyn ConfigSource>>) -> Self {
        Self { sources }
    }
}

impl ConfigSource for FirstAvailable {
    fn name(&self) -> &'static str {
        "first-available"
    }

    fn load(&self) -> Result<Option<Value>> {
        for source in &self.sources {
            match source.load() {
                Ok(Some(value)) => {
                    log_debug!("popup config delivered by {} source", source.name());
                    return Ok(Some(value));
                }
                Ok(None) => {}
                Err(err) => log_warn!("{} config source failed: {err:#}", source.name()),
            }
        }
        Ok(None)
    }
}
