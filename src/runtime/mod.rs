//! Page-load orchestration: one config, one decision, at most one popup.

pub mod clock;
pub mod controller;
pub mod guard;
pub mod presenter;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{PageContext, PopupRuntime, PopupSession, PresentationState};
pub use guard::InitGuard;
pub use presenter::{DismissReason, Presenter};
