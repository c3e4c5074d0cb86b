//! Durable key/value counter storage.
//!
//! Values are kept as text, the way browser local storage keeps them; a value that does
//! not parse as a non-negative integer reads as 0.

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
  sync::Mutex,
};

use tracing::{debug, instrument};

use crate::error::StoreError;

pub trait CounterStore: Send + Sync {
  /// Current value, 0 when absent.
  fn get(&self, key: &str) -> Result<u64, StoreError>;

  fn set(&self, key: &str, value: u64) -> Result<(), StoreError>;

  /// Read-increment-write as one step; returns the new value.
  fn increment(&self, key: &str) -> Result<u64, StoreError>;
}

fn parse_count(raw: Option<&String>) -> u64 {
  raw.and_then(|s| s.trim().parse().ok()).unwrap_or(0)
}

/// Process-local store, used by tests and when no scores file is configured.
#[derive(Default)]
pub struct MemoryCounterStore {
  values: Mutex<BTreeMap<String, String>>,
}

impl MemoryCounterStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CounterStore for MemoryCounterStore {
  fn get(&self, key: &str) -> Result<u64, StoreError> {
    let values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
    Ok(parse_count(values.get(key)))
  }

  fn set(&self, key: &str, value: u64) -> Result<(), StoreError> {
    let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
    values.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn increment(&self, key: &str) -> Result<u64, StoreError> {
    let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
    let next = parse_count(values.get(key)) + 1;
    values.insert(key.to_string(), next.to_string());
    Ok(next)
  }
}

/// JSON file store. The whole map is rewritten on every change, so async callers reach it
/// through `spawn_blocking`.
pub struct FileCounterStore {
  path: PathBuf,
  values: Mutex<BTreeMap<String, String>>,
}

impl FileCounterStore {
  /// Open `path`, starting empty if the file does not exist yet.
  #[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
  pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
    let path = path.as_ref().to_path_buf();
    let values = match std::fs::read_to_string(&path) {
      Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
      Ok(raw) => serde_json::from_str(&raw)?,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
      Err(source) => return Err(StoreError::Io { path: path.display().to_string(), source }),
    };
    Ok(Self { path, values: Mutex::new(values) })
  }

  fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
    let raw = serde_json::to_string_pretty(values)?;
    let tmp = self.path.with_extension("tmp");
    let io_err = |source| StoreError::Io { path: self.path.display().to_string(), source };
    std::fs::write(&tmp, raw).map_err(io_err)?;
    std::fs::rename(&tmp, &self.path).map_err(io_err)?;
    debug!(target: "score", path = %self.path.display(), "Score store persisted");
    Ok(())
  }
}

impl CounterStore for FileCounterStore {
  fn get(&self, key: &str) -> Result<u64, StoreError> {
    let values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
    Ok(parse_count(values.get(key)))
  }

  fn set(&self, key: &str, value: u64) -> Result<(), StoreError> {
    let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
    values.insert(key.to_string(), value.to_string());
    self.persist(&values)
  }

  fn increment(&self, key: &str) -> Result<u64, StoreError> {
    let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
    let next = parse_count(values.get(key)) + 1;
    values.insert(key.to_string(), next.to_string());
    self.persist(&values)?;
    Ok(next)
  }
}
