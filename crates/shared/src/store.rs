//! Local key-value store: string-keyed JSON blobs with fallback-on-failure.
//!
//! Every persisted entity in the workspace lives in exactly one store slot.
//! Reads of missing or corrupt slots yield the caller's fallback value and
//! writes degrade to a logged no-op, so storage trouble never crashes the
//! widget.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// A string-keyed blob store. Implementations must make individual reads and
/// writes atomic from the caller's perspective.
pub trait KvStore: Send + Sync {
    fn get_raw(&self, key: &str) -> Option<String>;
    fn set_raw(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Read a JSON value from `key`, returning `fallback` when the slot is
/// missing or does not parse.
pub fn read_json<T: DeserializeOwned>(store: &dyn KvStore, key: &str, fallback: T) -> T {
    match store.get_raw(key) {
        Some(raw) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, %err, "discarding corrupt store slot");
                fallback
            }
        },
        None => fallback,
    }
}

/// Serialize `value` into `key`. Serialization failure is a no-op.
pub fn write_json<T: Serialize>(store: &dyn KvStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => store.set_raw(key, &raw),
        Err(err) => warn!(key, %err, "failed to serialize store slot"),
    }
}

/// In-memory store. Backs the per-session slots and the tests.
#[derive(Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.slots.read().get(key).cloned()
    }

    fn set_raw(&self, key: &str, value: &str) {
        self.slots.write().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.slots.write().remove(key);
    }
}

/// File-backed store: one JSON file per key under a base directory.
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    pub fn new(base_dir: PathBuf) -> Self {
        let _ = fs::create_dir_all(&base_dir);
        Self { base_dir }
    }

    /// Store rooted in the per-user config directory.
    pub fn default_location() -> Self {
        let base = directories::ProjectDirs::from("com.local", "Shop Assistant", "ShopAssistant")
            .map(|p| p.config_dir().join("store"))
            .unwrap_or_else(|| PathBuf::from("./store"));
        Self::new(base)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{key}.json"))
    }
}

impl KvStore for FileStore {
    fn get_raw(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set_raw(&self, key: &str, value: &str) {
        if let Err(err) = fs::write(self.path_for(key), value) {
            warn!(key, %err, "store write failed");
        }
    }

    fn remove(&self, key: &str) {
        let _ = fs::remove_file(self.path_for(key));
    }
}
