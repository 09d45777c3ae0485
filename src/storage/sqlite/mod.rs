use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};

mod migrations;

use migrations::run_migrations;

use super::OriginStorage;

type StorageTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum StorageCommand {
    Execute(StorageTask),
    Shutdown,
}

struct WorkerInner {
    sender: Mutex<mpsc::Sender<StorageCommand>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for WorkerInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            let sender = match self.sender.lock() {
                Ok(sender) => sender,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Err(err) = sender.send(StorageCommand::Shutdown) {
                error!("Failed to send shutdown to storage thread: {err}");
            }
            drop(sender);
            if let Err(join_err) = handle.join() {
                error!("Failed to join storage thread: {join_err:?}");
            }
        }
    }
}

/// SQLite-backed storage. One worker thread owns the connection; callers
/// block on a reply channel, so access stays synchronous.
#[derive(Clone)]
pub struct SqliteStorage {
    inner: Arc<WorkerInner>,
    db_path: Arc<PathBuf>,
}

impl SqliteStorage {
    pub fn open(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create storage directory {}", parent.display())
                })?;
            }
        }

        let (command_tx, command_rx) = mpsc::channel::<StorageCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("smartpop-storage".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite storage")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run storage migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("Storage initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        StorageCommand::Execute(task) => task(&mut conn),
                        StorageCommand::Shutdown => break,
                    }
                }

                info!("Storage thread shutting down");
            })
            .context("failed to spawn storage worker thread")?;

        ready_rx
            .recv()
            .context("storage worker exited before signaling readiness")??;

        info!("Popup storage opened at {}", db_path.display());

        Ok(Self {
            inner: Arc::new(WorkerInner {
                sender: Mutex::new(command_tx),
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    /// Runs `task` on the storage thread and waits for its result.
    pub fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = mpsc::channel();

        let command = StorageCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("Storage caller dropped before receiving result");
            }
        }));

        self.inner
            .sender
            .lock()
            .map_err(|_| anyhow!("storage sender lock poisoned"))?
            .send(command)
            .map_err(|err| anyhow!("failed to send command to storage thread: {err}"))?;

        reply_rx
            .recv()
            .map_err(|_| anyhow!("storage thread terminated unexpectedly"))?
    }
}

impl OriginStorage for SqliteStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.execute(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM origin_storage WHERE key = ?1",
                    params![key],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .with_context(|| format!("failed to read storage key {key}"))?;
            Ok(value)
        })
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO origin_storage (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("failed to write storage key {key}"))?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn set_then_get_round_trips_through_worker() {
        let dir = TempDir::new().unwrap();
        let storage = SqliteStorage::open(dir.path().join("popup.sqlite3")).unwrap();

        assert!(storage.get_item("missing").unwrap().is_none());
        storage.set_item("k", "1").unwrap();
        storage.set_item("k", "2").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn records_persist_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("popup.sqlite3");

        {
            let storage = SqliteStorage::open(path.clone()).unwrap();
            storage.set_item("smartPop_lastShown:abc", "42").unwrap();
        }

        let reopened = SqliteStorage::open(path).unwrap();
        assert_eq!(
            reopened.get_item("smartPop_lastShown:abc").unwrap().as_deref(),
            Some("42")
        );
    }

    #[test]
    fn clones_share_one_worker() {
        let dir = TempDir::new().unwrap();
        let storage = SqliteStorage::open(dir.path().join("popup.sqlite3")).unwrap();
        let clone = storage.clone();

        clone.set_item("shared", "yes").unwrap();
        assert_eq!(storage.get_item("shared").unwrap().as_deref(), Some("yes"));
        assert_eq!(storage.path(), clone.path());
    }
}
