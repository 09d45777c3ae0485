use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::cmp;
use tokio::time::Instant;

use crate::config::TriggerMode;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TriggerStatus {
    Idle,
    Armed,
    Fired,
    Cancelled,
}

impl Default for TriggerStatus {
    fn default() -> Self {
        TriggerStatus::Idle
    }
}

impl TriggerStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TriggerStatus::Fired | TriggerStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FireSource {
    Timer,
    ExitIntent,
    External,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerState {
    pub status: TriggerStatus,
    pub mode: Option<TriggerMode>,
    pub fired_by: Option<FireSource>,
    /// Signals that arrived after the state went terminal.
    pub ignored_signals: u32,
    /// Visibility was lost at least once while armed. Never fires on its own.
    pub visibility_lost: bool,
    #[serde(skip)]
    pub deadline: Option<Instant>,
}

impl TriggerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, mode: TriggerMode, deadline: Option<Instant>) -> Result<()> {
        if self.status != TriggerStatus::Idle {
            bail!("trigger already {:?}", self.status);
        }
        self.status = TriggerStatus::Armed;
        self.mode = Some(mode);
        self.deadline = deadline;
        Ok(())
    }

    /// Moves `Armed` to `Fired`. Returns false, and counts the signal, for
    /// every other state, which makes firing at-most-once.
    pub fn try_fire(&mut self, source: FireSource) -> bool {
        if self.status != TriggerStatus::Armed {
            self.ignored_signals = self.ignored_signals.saturating_add(1);
            return false;
        }
        self.status = TriggerStatus::Fired;
        self.fired_by = Some(source);
        self.deadline = None;
        true
    }

    /// Returns true if this call moved the state to `Cancelled`.
    pub fn cancel(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = TriggerStatus::Cancelled;
        self.deadline = None;
        true
    }

    pub fn remaining_ms(&self, now: Instant) -> i64 {
        match (self.status, self.deadline) {
            (TriggerStatus::Armed, Some(deadline)) => {
                let remaining = deadline.saturating_duration_since(now).as_millis() as i64;
                cmp::max(remaining, 0)
            }
            _ => 0,
        }
    }
}
