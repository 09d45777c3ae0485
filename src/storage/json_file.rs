use anyhow::{anyhow, Context, Result};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

use super::OriginStorage;

/// Storage persisted as a flat JSON object. The whole map is rewritten on
/// every set, which is fine for the handful of keys a popup owns.
pub struct JsonFileStorage {
    path: PathBuf,
    data: RwLock<BTreeMap<String, String>>,
}

impl JsonFileStorage {
    /// Opens `path`, starting empty if the file is missing or unreadable JSON.
    pub fn open(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read storage from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Discarding unreadable storage at {}: {err}", path.display());
                BTreeMap::new()
            })
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, data: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create storage directory {}", parent.display())
                })?;
            }
        }

        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write storage to {}", self.path.display()))
    }

    /// Re-reads the file, picking up writes from other page loads.
    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: BTreeMap<String, String> = serde_json::from_str(&contents)?;
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("storage lock poisoned"))?;
        *guard = data;
        Ok(())
    }
}

impl OriginStorage for JsonFileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let guard = self
            .data
            .read()
            .map_err(|_| anyhow!("storage lock poisoned"))?;
        Ok(guard.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("storage lock poisoned"))?;
        guard.insert(key.to_string(), value.to_string());
        self.persist(&guard)
    }
}
