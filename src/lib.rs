pub mod config;
pub mod delivery;
pub mod eligibility;
pub mod render;
pub mod runtime;
pub mod settings;
pub mod storage;
pub mod trigger;
pub mod utils;

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};

pub use config::{resolve_config, PopupConfig, PopupIdentity, ResolverOptions};
pub use delivery::{AttributeSource, ConfigSource, FirstAvailable, GlobalSource, StorageSource};
pub use eligibility::{evaluate, DeviceClass, Eligibility, EligibilityContext, Rejection};
pub use render::{build_descriptor, RenderDescriptor};
pub use runtime::{
    DismissReason, InitGuard, PageContext, PopupRuntime, PopupSession, PresentationState,
    Presenter,
};
pub use settings::RuntimeSettings;
pub use storage::{FrequencyLedger, JsonFileStorage, MemoryStorage, OriginStorage, SqliteStorage};
pub use trigger::{PointerEvent, TriggerStatus};

/// Wires a runtime backed by on-disk state under `data_dir`:
/// `settings.json` for host knobs and `smartpop.sqlite3` for origin storage.
pub fn boot(data_dir: &Path, presenter: Arc<dyn Presenter>) -> Result<PopupRuntime> {
    utils::init_logging();

    log::info!("smartpop starting up...");

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;

    let settings = RuntimeSettings::load(&data_dir.join("settings.json"))?;
    let storage = SqliteStorage::open(data_dir.join("smartpop.sqlite3"))?;

    Ok(PopupRuntime::new(settings, Arc::new(storage), presenter))
}
