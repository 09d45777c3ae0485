pub mod exit_intent;
pub mod scheduler;
pub mod state;

pub use exit_intent::{ExitIntentDetector, PointerEvent, DEFAULT_EXIT_THRESHOLD_PX};
pub use scheduler::{PresentHook, TriggerScheduler, TriggerSnapshot};
pub use state::{FireSource, TriggerState, TriggerStatus};
