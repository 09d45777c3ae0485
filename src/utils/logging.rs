//! Logger bootstrap plus conditional logging macros gated on a module-level
//! `ENABLE_LOGS` flag.
//!
//! Usage:
//! ```ignore
//! // In your module, define the flag first:
//! const ENABLE_LOGS: bool = true;
//!
//! // Then use the macros (they're exported at the crate root):
//! use crate::{log_debug, log_info, log_warn};
//!
//! log_info!("popup armed for {}", identity);
//! ```

use log::LevelFilter;

/// Set to `1` or `true` to lower the default log level to debug.
pub const DEBUG_ENV_VAR: &str = "SMARTPOP_DEBUG";

pub fn debug_requested() -> bool {
    std::env::var(DEBUG_ENV_VAR)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Installs `env_logger` (reads `RUST_LOG`). Safe to call more than once; the
/// host may already have installed a logger.
pub fn init_logging() {
    let default_level = if debug_requested() {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let result = env_logger::Builder::from_default_env()
        .filter_level(default_level)
        .parse_default_env()
        .try_init();

    if result.is_ok() {
        log::debug!("smartpop logging initialised at {default_level}");
    }
}

/// Conditional debug logging. The calling module must define
/// `const ENABLE_LOGS: bool`.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// Conditional info logging.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Conditional warn logging.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Errors are always logged; `ENABLE_LOGS` only silences the chatty levels.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        {
            log::error!($($arg)*);
        }
    };
}
