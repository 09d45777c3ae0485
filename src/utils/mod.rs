pub mod logging;

pub use logging::{debug_requested, init_logging};
