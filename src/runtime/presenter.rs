use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::render::RenderDescriptor;

/// Materializes a descriptor on the host page. Returning `Err` means nothing
/// became visible.
pub trait Presenter: Send + Sync {
    fn present(&self, descriptor: &RenderDescriptor) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DismissReason {
    CloseControl,
    Backdrop,
    CallToAction,
}
