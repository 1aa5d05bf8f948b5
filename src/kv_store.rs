//! Key-value persistence for the local session.
//!
//! The application only ever stores whole serialized values under a couple of
//! fixed keys, so the interface is a plain `get`/`set` over strings. Two
//! backends are provided: an LMDB environment on disk and an in-memory map.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use lmdb::{Database, DatabaseFlags, Environment, Transaction, WriteFlags};
use log::{debug, info, warn};

use crate::app_response::AppResponse;

/// Store key holding the serialized build list.
pub const BUILDS_KEY: &str = "userGarageBuilds";
/// Store key holding the premium entitlement (`"true"` / `"false"`).
pub const PREMIUM_KEY: &str = "isPro";

const DB_NAME: &str = "tunerspecs";
const MAP_SIZE: usize = 64 * 1024 * 1024;

pub trait KeyValueStore {
    /// Reads a value; `Ok(None)` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>, AppResponse>;

    /// Writes a value, replacing any previous one.
    fn set(&mut self, key: &str, value: &str) -> Result<(), AppResponse>;
}

/// LMDB-backed store living in `<name>.lmdb/`.
pub struct LmdbStore {
    env: Environment,
    db: Database,
    path: PathBuf,
}

impl LmdbStore {
    /// Opens (or creates) the store directory and its single database.
    pub fn init(name: &str) -> Result<Self, AppResponse> {
        let path = PathBuf::from(format!("{name}.lmdb"));
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self, AppResponse> {
        fs::create_dir_all(path).map_err(|e| {
            AppResponse::DatabaseError(format!(
                "Cannot create store directory {}: {e}",
                path.display()
            ))
        })?;

        let env = Environment::new()
            .set_max_dbs(1)
            .set_map_size(MAP_SIZE)
            .open(path)?;
        let db = env.create_db(Some(DB_NAME), DatabaseFlags::empty())?;

        info!("Store opened at {}", path.display());

        Ok(Self {
            env,
            db,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes pending writes to disk before the environment is dropped.
    pub fn close(self) -> Result<(), AppResponse> {
        self.env.sync(true)?;
        info!("Store at {} closed", self.path.display());
        Ok(())
    }
}

impl KeyValueStore for LmdbStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppResponse> {
        let txn = self.env.begin_ro_txn()?;
        let value = match txn.get(self.db, &key) {
            Ok(bytes) => Some(String::from_utf8(bytes.to_vec()).map_err(|e| {
                AppResponse::SerializationError(format!("Value under '{key}' is not UTF-8: {e}"))
            })?),
            Err(lmdb::Error::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        txn.commit()?;
        debug!("Store get '{key}': {}", if value.is_some() { "hit" } else { "miss" });
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppResponse> {
        let mut txn = self.env.begin_rw_txn()?;
        if let Err(e) = txn.put(self.db, &key, &value, WriteFlags::empty()) {
            warn!("Store write to '{key}' failed: {e}");
            txn.abort();
            return Err(e.into());
        }
        txn.commit()?;
        debug!("Store set '{key}' ({} bytes)", value.len());
        Ok(())
    }
}

/// Volatile store, used by tests and hosts without a writable filesystem.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    read_only: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects every write, like a full or locked browser storage.
    pub fn read_only(values: HashMap<String, String>) -> Self {
        Self { values, read_only: true }
    }

    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppResponse> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppResponse> {
        if self.read_only {
            return Err(AppResponse::DatabaseError(format!(
                "Store is read-only, '{key}' was not written"
            )));
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, AppResponse> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppResponse> {
        (**self).set(key, value)
    }
}
