//! Settings persistence.
//!
//! The control values are stored as one JSON record under a namespaced key.
//! Persistence is best-effort: write failures are swallowed, and a missing or
//! malformed record leaves the current controls untouched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::controls::{Controls, parse_bound};
use crate::error::StorageError;

/// The persisted record, as written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSettings {
    pub volume: f64,
    pub tone: f64,
    pub dampen: f64,
    pub auto_lower: u32,
    pub auto_upper: u32,
    pub auto_enabled: bool,
}

impl PersistedSettings {
    pub fn from_controls(controls: &Controls) -> Self {
        PersistedSettings {
            volume: controls.volume,
            tone: controls.tone,
            dampen: controls.dampen,
            auto_lower: controls.auto_lower,
            auto_upper: controls.auto_upper,
            auto_enabled: controls.auto_enabled,
        }
    }
}

/// A string key-value store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Volatile store; also the fallback when nothing persistent is available.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a single JSON object file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    /// `settings.json` in the platform data directory.
    #[cfg(feature = "native")]
    pub fn in_data_dir() -> Option<Self> {
        directories::ProjectDirs::from("net", "gong", "gong")
            .map(|d| FileStore::new(d.data_dir().join("settings.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        // An unreadable file is replaced rather than blocking writes.
        let mut entries = self.read_all().unwrap_or_default();
        entries.insert(key.to_string(), value.to_string());
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Saves and restores [`Controls`] through a [`KeyValueStore`].
pub struct SettingsStore<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> SettingsStore<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        SettingsStore {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Persist the current control values. Never fails.
    pub fn save(&mut self, controls: &Controls) {
        let record = PersistedSettings::from_controls(controls);
        let result = serde_json::to_string(&record)
            .map_err(StorageError::from)
            .and_then(|json| self.store.set(&self.key, &json));
        if let Err(e) = result {
            log::debug!(target: "settings", "save skipped: {e}");
        }
    }

    /// Restore control values from the stored record. Returns true if a
    /// record was found and applied.
    pub fn load(&self, controls: &mut Controls) -> bool {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return false,
            Err(e) => {
                log::debug!(target: "settings", "load skipped: {e}");
                return false;
            }
        };
        let Ok(Value::Object(record)) = serde_json::from_str::<Value>(&raw) else {
            log::debug!(target: "settings", "ignoring malformed record under {}", self.key);
            return false;
        };

        let field = |name: &str| record.get(name).filter(|v| !v.is_null());

        if let Some(v) = field("volume").and_then(coerce_number) {
            controls.volume = v;
        }
        if let Some(v) = field("tone").and_then(coerce_number) {
            controls.tone = v;
        }
        if let Some(v) = field("dampen").and_then(coerce_number) {
            controls.dampen = v;
        }
        if let Some(v) = field("autoLower") {
            controls.auto_lower = coerce_bound(v);
        }
        if let Some(v) = field("autoUpper") {
            controls.auto_upper = coerce_bound(v);
        }
        if let Some(v) = field("autoEnabled").and_then(coerce_bool) {
            controls.auto_enabled = v;
        }
        controls.enforce_bounds();
        true
    }
}

/// Numeric conversion of a stored value: numbers as-is, numeric strings
/// parsed (blank reads as 0), booleans as 1/0. Anything else is skipped.
fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse::<f64>().ok()?
            }
        }
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Integer conversion of a stored bound: leading integer of its text form,
/// with missing, zero or negative values read as 1.
fn coerce_bound(value: &Value) -> u32 {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() && f.trunc() != 0.0 => {
                f.trunc().clamp(1.0, u32::MAX as f64) as u32
            }
            _ => 1,
        },
        Value::String(s) => parse_bound(s),
        _ => 1,
    }
}

/// Booleans, numbers (non-zero is true) and the strings `"true"`/`"false"`.
fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim() {
            t if t.eq_ignore_ascii_case("true") => Some(true),
            t if t.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        },
        _ => None,
    }
}
