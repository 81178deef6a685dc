// Session persistence: snapshot format, storage media and legacy migration

pub mod snapshot;
pub mod storage;

pub use snapshot::{WorkflowSnapshot, SNAPSHOT_VERSION};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};

use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::PersistenceConfig;

/// Key holding the unified snapshot
pub const APP_STATE_KEY: &str = "wspAppState";
/// Pre-unification keys, read once during migration and then deleted
pub const LEGACY_CONFIG_KEY: &str = "wspConfig";
pub const LEGACY_CONSTRAINTS_KEY: &str = "wspConstraints";
pub const LEGACY_MATRIX_KEY: &str = "authMatrix";

const LEGACY_KEYS: [&str; 3] = [LEGACY_CONFIG_KEY, LEGACY_CONSTRAINTS_KEY, LEGACY_MATRIX_KEY];

/// Errors that can occur while loading or saving snapshots
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Lock acquisition failed: {reason}")]
    Lock { reason: String },

    #[error("Snapshot version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// Where the store restores from and saves to
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PersistencePort: Send {
    /// The last saved snapshot, or `None` on first start
    fn load(&self) -> Result<Option<WorkflowSnapshot>, PersistenceError>;

    fn save(&self, snapshot: &WorkflowSnapshot) -> Result<(), PersistenceError>;

    fn clear(&self) -> Result<(), PersistenceError>;
}

/// Snapshot persistence over any key/value medium
#[derive(Debug, Clone)]
pub struct SnapshotRepository<S> {
    storage: S,
}

impl<S: KeyValueStorage> SnapshotRepository<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Fold the legacy keys into one snapshot, save it under the unified key
    /// and delete the legacy keys. Returns `None` when no legacy key exists.
    fn migrate_legacy(&self) -> Result<Option<WorkflowSnapshot>, PersistenceError> {
        let config = self.storage.get(LEGACY_CONFIG_KEY)?;
        let constraints = self.storage.get(LEGACY_CONSTRAINTS_KEY)?;
        let matrix = self.storage.get(LEGACY_MATRIX_KEY)?;
        if config.is_none() && constraints.is_none() && matrix.is_none() {
            return Ok(None);
        }

        let snapshot = snapshot::from_legacy_keys(
            config.as_deref(),
            constraints.as_deref(),
            matrix.as_deref(),
        )?;
        self.save(&snapshot)?;
        for key in LEGACY_KEYS {
            self.storage.remove(key)?;
        }

        info!(
            steps = snapshot.config.steps,
            users = snapshot.config.users,
            constraints = snapshot.constraints.len(),
            "Migrated legacy storage keys"
        );
        Ok(Some(snapshot))
    }
}

impl<S: KeyValueStorage> PersistencePort for SnapshotRepository<S> {
    fn load(&self) -> Result<Option<WorkflowSnapshot>, PersistenceError> {
        match self.storage.get(APP_STATE_KEY)? {
            Some(text) => {
                let snapshot = snapshot::decode(&text)?;
                debug!(
                    constraints = snapshot.constraints.len(),
                    history = snapshot.history.len(),
                    "Loaded snapshot"
                );
                Ok(Some(snapshot))
            }
            None => self.migrate_legacy(),
        }
    }

    fn save(&self, snapshot: &WorkflowSnapshot) -> Result<(), PersistenceError> {
        let text = serde_json::to_string(snapshot)?;
        self.storage.set(APP_STATE_KEY, &text)
    }

    fn clear(&self) -> Result<(), PersistenceError> {
        self.storage.remove(APP_STATE_KEY)?;
        for key in LEGACY_KEYS {
            self.storage.remove(key)?;
        }
        Ok(())
    }
}

/// Port that never stores anything
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPersistence;

impl PersistencePort for DisabledPersistence {
    fn load(&self) -> Result<Option<WorkflowSnapshot>, PersistenceError> {
        Ok(None)
    }

    fn save(&self, _snapshot: &WorkflowSnapshot) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn clear(&self) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// Build the port described by the persistence settings
pub fn open_port(config: &PersistenceConfig) -> Box<dyn PersistencePort> {
    if !config.enabled {
        warn!("Persistence disabled, session state will not survive restarts");
        return Box::new(DisabledPersistence);
    }
    Box::new(file_repository(&config.storage_dir))
}

pub fn file_repository(directory: &Path) -> SnapshotRepository<FileStorage> {
    SnapshotRepository::new(FileStorage::new(directory))
}
