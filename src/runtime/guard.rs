use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, OnceLock,
};

/// Claimed once per page load and never reset.
#[derive(Debug, Default)]
pub struct InitGuard {
    claimed: AtomicBool,
}

impl InitGuard {
    pub const fn new() -> Self {
        Self {
            claimed: AtomicBool::new(false),
        }
    }

    /// The process-wide guard used when no other is supplied.
    pub fn global() -> Arc<InitGuard> {
        static GLOBAL: OnceLock<Arc<InitGuard>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(InitGuard::new())).clone()
    }

    /// True for exactly one caller.
    pub fn claim(&self) -> bool {
        !self.claimed.swap(true, Ordering::SeqCst)
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::SeqCst)
    }
}
