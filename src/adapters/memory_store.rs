//! In-memory config store adapter.
//!
//! Implements [`ConfigStore`] over a `serde_json` value tree addressed by
//! `/`-separated paths, mirroring the layout of the cloud database.  Used
//! by the bench binary and by tests; supports readiness toggling and
//! per-path failure injection so the hold-last-value and best-effort
//! write paths can be exercised without a network.

use std::collections::{HashMap, HashSet};

use log::debug;
use serde_json::{Map, Value};

use crate::app::ports::ConfigStore;
use crate::error::StoreError;

/// JSON-tree backed [`ConfigStore`].
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    root: Value,
    ready: bool,
    failing: HashSet<String>,
    writes: HashMap<String, usize>,
}

impl MemoryConfigStore {
    /// An empty store whose session is not up yet.
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
            ..Default::default()
        }
    }

    /// An empty, ready store.
    pub fn ready() -> Self {
        let mut store = Self::new();
        store.ready = true;
        store
    }

    /// Seed the tree from a JSON document.
    pub fn from_json(root: Value) -> Self {
        Self {
            root,
            ready: true,
            ..Default::default()
        }
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Make every read and write of `path` fail with [`StoreError::Io`].
    pub fn fail_path(&mut self, path: &str) {
        self.failing.insert(path.to_owned());
    }

    pub fn heal_path(&mut self, path: &str) {
        self.failing.remove(path);
    }

    // ── Direct access (bypasses readiness and failure injection) ──

    pub fn set(&mut self, path: &str, value: Value) {
        *slot_mut(&mut self.root, path) = value;
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(&self.root, |node, seg| node.get(seg))
    }

    pub fn bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(Value::as_bool)
    }

    pub fn int(&self, path: &str) -> Option<i64> {
        self.get(path).and_then(Value::as_i64)
    }

    pub fn float(&self, path: &str) -> Option<f32> {
        self.get(path).and_then(Value::as_f64).map(|v| v as f32)
    }

    pub fn string(&self, path: &str) -> Option<String> {
        self.get(path).and_then(Value::as_str).map(str::to_owned)
    }

    /// Entries appended to the list at `path`.
    pub fn list(&self, path: &str) -> Vec<String> {
        self.get(path)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Successful writes to `path` through the [`ConfigStore`] interface.
    pub fn writes(&self, path: &str) -> usize {
        self.writes.get(path).copied().unwrap_or(0)
    }

    /// Whole tree, for dumping.
    pub fn snapshot(&self) -> &Value {
        &self.root
    }

    // ── Internal ──────────────────────────────────────────────

    fn check(&self, path: &str) -> Result<(), StoreError> {
        if !self.ready {
            return Err(StoreError::NotReady);
        }
        if self.failing.contains(path) {
            return Err(StoreError::Io);
        }
        Ok(())
    }

    fn read(&self, path: &str) -> Result<&Value, StoreError> {
        self.check(path)?;
        self.get(path).ok_or(StoreError::NotFound)
    }

    fn write(&mut self, path: &str, value: Value) -> Result<(), StoreError> {
        self.check(path)?;
        debug!("STORE | {path} <- {value}");
        self.set(path, value);
        *self.writes.entry(path.to_owned()).or_insert(0) += 1;
        Ok(())
    }
}

/// Walk to `path`, creating (or replacing non-object) intermediate nodes.
fn slot_mut<'a>(root: &'a mut Value, path: &str) -> &'a mut Value {
    let mut node = root;
    for seg in path.split('/').filter(|s| !s.is_empty()) {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = match node {
            Value::Object(map) => map.entry(seg).or_insert(Value::Null),
            other => other,
        };
    }
    node
}

impl ConfigStore for MemoryConfigStore {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn read_string(&mut self, path: &str) -> Result<String, StoreError> {
        self.read(path)?
            .as_str()
            .map(str::to_owned)
            .ok_or(StoreError::TypeMismatch)
    }

    fn read_bool(&mut self, path: &str) -> Result<bool, StoreError> {
        self.read(path)?.as_bool().ok_or(StoreError::TypeMismatch)
    }

    fn read_int(&mut self, path: &str) -> Result<i32, StoreError> {
        self.read(path)?
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or(StoreError::TypeMismatch)
    }

    fn write_string(&mut self, path: &str, value: &str) -> Result<(), StoreError> {
        self.write(path, Value::from(value))
    }

    fn write_bool(&mut self, path: &str, value: bool) -> Result<(), StoreError> {
        self.write(path, Value::from(value))
    }

    fn write_int(&mut self, path: &str, value: i32) -> Result<(), StoreError> {
        self.write(path, Value::from(value))
    }

    fn write_float(&mut self, path: &str, value: f32) -> Result<(), StoreError> {
        self.write(path, Value::from(f64::from(value)))
    }

    fn push_string(&mut self, path: &str, value: &str) -> Result<(), StoreError> {
        self.check(path)?;
        let slot = slot_mut(&mut self.root, path);
        match slot {
            Value::Array(items) => items.push(Value::from(value)),
            other => *other = Value::Array(vec![Value::from(value)]),
        }
        *self.writes.entry(path.to_owned()).or_insert(0) += 1;
        Ok(())
    }
}
