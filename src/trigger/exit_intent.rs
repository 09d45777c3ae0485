//! Exit-intent heuristic.
//!
//! A pointer leaving the document near the top edge of the viewport is read as
//! the visitor heading for the tab strip or address bar. The threshold is a
//! tunable guess, not a browser contract.

use serde::{Deserialize, Serialize};

pub const DEFAULT_EXIT_THRESHOLD_PX: f64 = 10.0;

/// A `mouseout`-style observation delivered by the host page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerEvent {
    /// Vertical pointer position relative to the viewport top, in CSS px.
    pub client_y: f64,
    /// True when the pointer left the document (no related target).
    pub leaving_document: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitIntentDetector {
    threshold_px: f64,
}

impl Default for ExitIntentDetector {
    fn default() -> Self {
        Self::new(DEFAULT_EXIT_THRESHOLD_PX)
    }
}

impl ExitIntentDetector {
    pub fn new(threshold_px: f64) -> Self {
        let threshold_px = if threshold_px.is_finite() && threshold_px >= 0.0 {
            threshold_px
        } else {
            DEFAULT_EXIT_THRESHOLD_PX
        };
        Self { threshold_px }
    }

    pub fn threshold_px(&self) -> f64 {
        self.threshold_px
    }

    pub fn qualifies(&self, event: &PointerEvent) -> bool {
        event.leaving_document && event.client_y <= self.threshold_px
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(client_y: f64, leaving_document: bool) -> PointerEvent {
        PointerEvent {
            client_y,
            leaving_document,
        }
    }

    #[test]
    fn upward_exit_qualifies() {
        let detector = ExitIntentDetector::default();
        assert!(detector.qualifies(&event(0.0, true)));
        assert!(detector.qualifies(&event(-4.0, true)));
        assert!(detector.qualifies(&event(10.0, true)));
    }

    #[test]
    fn movement_inside_page_or_below_threshold_does_not() {
        let detector = ExitIntentDetector::default();
        assert!(!detector.qualifies(&event(0.0, false)));
        assert!(!detector.qualifies(&event(300.0, true)));
    }

    #[test]
    fn invalid_threshold_falls_back() {
        assert_eq!(
            ExitIntentDetector::new(f64::NAN).threshold_px(),
            DEFAULT_EXIT_THRESHOLD_PX
        );
        assert_eq!(ExitIntentDetector::new(25.0).threshold_px(), 25.0);
    }
}
