use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};

use super::OriginStorage;
use crate::config::PopupIdentity;
use crate::settings::DEFAULT_LEDGER_PREFIX;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Last-shown stamps per popup identity, one storage key each. Records are
/// never deleted.
#[derive(Clone)]
pub struct FrequencyLedger {
    storage: Arc<dyn OriginStorage>,
    prefix: String,
}

impl FrequencyLedger {
    pub fn new(storage: Arc<dyn OriginStorage>) -> Self {
        Self::with_prefix(storage, DEFAULT_LEDGER_PREFIX)
    }

    pub fn with_prefix(storage: Arc<dyn OriginStorage>, prefix: impl Into<String>) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
        }
    }

    pub fn storage_key(&self, identity: &PopupIdentity) -> String {
        format!("{}{}", self.prefix, identity)
    }

    /// A record that cannot be parsed is treated as absent.
    pub fn last_shown(&self, identity: &PopupIdentity) -> Result<Option<DateTime<Utc>>> {
        let key = self.storage_key(identity);
        let raw = self
            .storage
            .get_item(&key)
            .with_context(|| format!("failed to read last-shown record {key}"))?;

        Ok(raw.and_then(|value| {
            let parsed = parse_stamp(&value);
            if parsed.is_none() {
                log_warn!("ignoring unparsable last-shown record {key}={value:?}");
            }
            parsed
        }))
    }

    /// Overwrites the record with `at` as epoch milliseconds.
    pub fn record_shown(&self, identity: &PopupIdentity, at: DateTime<Utc>) -> Result<()> {
        let key = self.storage_key(identity);
        self.storage
            .set_item(&key, &at.timestamp_millis().to_string())
            .with_context(|| format!("failed to write last-shown record {key}"))?;
        log_debug!("recorded presentation of {identity} at {at}");
        Ok(())
    }
}

/// Accepts integer epoch milliseconds or an RFC 3339 timestamp.
pub fn parse_stamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ms) = value.parse::<i64>() {
        return Utc.timestamp_millis_opt(ms).single();
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
