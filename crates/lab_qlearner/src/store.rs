//! Q-table store and its persistence.
//!
//! The store maps each [`GoalKey`] to exactly one [`QTable`]. The whole map is
//! the unit of persistence: it is loaded in full before training and written
//! in full afterwards. Storage backends implement [`TableStorage`]:
//!
//! - [`JsonFileStorage`] writes a JSON object of goal key to 2D array, via a
//!   temporary file that is renamed over the target.
//! - [`MemoryStorage`] keeps the serialized bytes in memory.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lab_qlearner::store::{load_or_empty, JsonFileStorage, TableStorage};
//!
//! let storage = JsonFileStorage::new("qtables.json");
//! let mut store = load_or_empty(&storage);
//! let (_table, created) = store.get_or_create(goal.key(), 1024, 8);
//! storage.save(&store)?;
//! ```

use crate::goal::GoalKey;
use crate::qtable::QTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Errors raised while reading or writing the persisted store.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// File I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The store could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The persisted bytes are not a valid store.
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

/// Serialization options for persisted stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceOptions {
    /// If `true`, pretty-prints the JSON output.
    pub pretty: bool,
}

impl Default for PersistenceOptions {
    fn default() -> Self {
        Self::compact()
    }
}

impl PersistenceOptions {
    /// Single-line JSON; the default, since tables run to thousands of cells.
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    /// Pretty-printed JSON for inspection by hand.
    pub fn readable() -> Self {
        Self { pretty: true }
    }
}

/// All trained Q-tables, keyed by goal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QTableStore {
    tables: BTreeMap<GoalKey, QTable>,
}

impl QTableStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the table for `key`, creating a zero-filled
    /// `state_count x action_count` table if none exists. The boolean is
    /// `true` when the table was created by this call. An existing table is
    /// never replaced.
    pub fn get_or_create(
        &mut self,
        key: GoalKey,
        state_count: usize,
        action_count: usize,
    ) -> (&mut QTable, bool) {
        let mut created = false;
        let table = self.tables.entry(key).or_insert_with(|| {
            created = true;
            QTable::zeros(state_count, action_count)
        });
        (table, created)
    }

    /// The table for `key`, if trained.
    pub fn get(&self, key: &GoalKey) -> Option<&QTable> {
        self.tables.get(key)
    }

    /// Mutable access to the table for `key`.
    pub fn get_mut(&mut self, key: &GoalKey) -> Option<&mut QTable> {
        self.tables.get_mut(key)
    }

    /// Whether a table exists for `key`.
    pub fn contains(&self, key: &GoalKey) -> bool {
        self.tables.contains_key(key)
    }

    /// Drops the table for `key`, returning it.
    pub fn remove(&mut self, key: &GoalKey) -> Option<QTable> {
        self.tables.remove(key)
    }

    /// Goal keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &GoalKey> {
        self.tables.keys()
    }

    /// Number of stored tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the store holds no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// A durable home for a [`QTableStore`].
pub trait TableStorage {
    /// Restores the full store. A store that was never saved loads as empty.
    fn load(&self) -> Result<QTableStore, PersistenceError>;

    /// Persists the full store, replacing any previous content.
    fn save(&self, store: &QTableStore) -> Result<(), PersistenceError>;
}

impl<T: TableStorage + ?Sized> TableStorage for &T {
    fn load(&self) -> Result<QTableStore, PersistenceError> {
        (**self).load()
    }

    fn save(&self, store: &QTableStore) -> Result<(), PersistenceError> {
        (**self).save(store)
    }
}

/// Loads the store, falling back to an empty one on any failure. Missing
/// persisted state is normal on a first run.
pub fn load_or_empty<S: TableStorage + ?Sized>(storage: &S) -> QTableStore {
    match storage.load() {
        Ok(store) => store,
        Err(e) => {
            log::warn!("Could not load Q-table store, starting empty: {}", e);
            QTableStore::new()
        }
    }
}

/// Stores the Q-tables as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
    options: PersistenceOptions,
}

impl JsonFileStorage {
    /// Creates a storage backed by `path` with compact output.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            options: PersistenceOptions::default(),
        }
    }

    /// Sets the serialization options.
    pub fn with_options(mut self, options: PersistenceOptions) -> Self {
        self.options = options;
        self
    }

    /// The file this storage reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl TableStorage for JsonFileStorage {
    fn load(&self) -> Result<QTableStore, PersistenceError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("No Q-table store at {:?}, starting empty", self.path);
                return Ok(QTableStore::new());
            }
            Err(e) => return Err(e.into()),
        };

        let store: QTableStore = deserialize(&bytes)?;
        log::info!(
            "Read {} Q-table(s) from {:?}",
            store.len(),
            self.path
        );
        Ok(store)
    }

    fn save(&self, store: &QTableStore) -> Result<(), PersistenceError> {
        let bytes = serialize(store, &self.options)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        // Write then rename so readers never see a truncated store
        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        log::info!("Saved {} Q-table(s) to {:?}", store.len(), self.path);
        Ok(())
    }
}

/// Keeps the serialized store in memory. Saves still go through JSON, so a
/// round trip exercises the same encoding as [`JsonFileStorage`].
#[derive(Debug, Default)]
pub struct MemoryStorage {
    bytes: Mutex<Option<Vec<u8>>>,
    options: PersistenceOptions,
}

impl MemoryStorage {
    /// Creates an empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage pre-populated with `bytes`, as if a previous process
    /// had saved them.
    pub fn with_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Mutex::new(Some(bytes)),
            options: PersistenceOptions::default(),
        }
    }

    /// The last saved bytes, if any.
    pub fn snapshot(&self) -> Option<Vec<u8>> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TableStorage for MemoryStorage {
    fn load(&self) -> Result<QTableStore, PersistenceError> {
        match self.snapshot() {
            Some(bytes) => deserialize(&bytes),
            None => Ok(QTableStore::new()),
        }
    }

    fn save(&self, store: &QTableStore) -> Result<(), PersistenceError> {
        let bytes = serialize(store, &self.options)?;
        *self.bytes.lock().unwrap_or_else(PoisonError::into_inner) = Some(bytes);
        Ok(())
    }
}

fn serialize(store: &QTableStore, options: &PersistenceOptions) -> Result<Vec<u8>, PersistenceError> {
    let result = if options.pretty {
        serde_json::to_vec_pretty(store)
    } else {
        serde_json::to_vec(store)
    };
    result.map_err(|e| PersistenceError::Serialization(e.to_string()))
}

fn deserialize(bytes: &[u8]) -> Result<QTableStore, PersistenceError> {
    serde_json::from_slice(bytes).map_err(|e| PersistenceError::Deserialization(e.to_string()))
}
