//! File-based configuration loading.
//!
//! A lab file may use flat keys or one table per target:
//!
//! ```toml
//! SSH_PORT = 2200
//!
//! [openbmc]
//! host = "10.1.1.1"
//! username = "root"
//! password = "0penBmc"
//! ```
//!
//! Both forms produce the same keys: tables are flattened with `_` and
//! upper-cased, so `openbmc.host` becomes `OPENBMC_HOST`.

use std::collections::HashMap;
use std::path::Path;

use super::store::ConfigStore;
use crate::error::{DispatchError, Result};

/// Configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Detect format from path.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Configuration store loaded from a file.
#[derive(Debug, Clone, Default)]
pub struct FileStore {
    values: HashMap<String, String>,
}

impl FileStore {
    /// Load a file, detecting the format from its extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            DispatchError::config(format!("unknown config format: {}", path.display()))
        })?;
        let content = DispatchError::with_io_context(
            std::fs::read_to_string(path),
            format!("reading {}", path.display()),
        )?;
        Self::parse(&content, format)
    }

    /// Parse configuration content.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let mut values = HashMap::new();
        match format {
            ConfigFormat::Toml => {
                let table: toml::Table = content
                    .parse()
                    .map_err(|e| DispatchError::config(format!("invalid TOML: {e}")))?;
                flatten_toml("", &table, &mut values);
            }
            ConfigFormat::Json => {
                let value: serde_json::Value = serde_json::from_str(content)
                    .map_err(|e| DispatchError::config(format!("invalid JSON: {e}")))?;
                let serde_json::Value::Object(map) = value else {
                    return Err(DispatchError::config("JSON config must be an object"));
                };
                flatten_json("", &map, &mut values);
            }
        }
        Ok(Self { values })
    }

    /// Number of keys loaded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if no keys were loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ConfigStore for FileStore {
    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_uppercase()
    } else {
        format!("{prefix}_{}", key.to_uppercase())
    }
}

fn flatten_toml(prefix: &str, table: &toml::Table, out: &mut HashMap<String, String>) {
    for (key, value) in table {
        let full_key = join_key(prefix, key);
        match value {
            toml::Value::String(s) => {
                out.insert(full_key, s.clone());
            }
            toml::Value::Integer(i) => {
                out.insert(full_key, i.to_string());
            }
            toml::Value::Float(f) => {
                out.insert(full_key, f.to_string());
            }
            toml::Value::Boolean(b) => {
                out.insert(full_key, b.to_string());
            }
            toml::Value::Table(inner) => flatten_toml(&full_key, inner, out),
            toml::Value::Array(_) | toml::Value::Datetime(_) => {
                tracing::debug!(key = %full_key, "Skipping non-scalar config value");
            }
        }
    }
}

fn flatten_json(
    prefix: &str,
    map: &serde_json::Map<String, serde_json::Value>,
    out: &mut HashMap<String, String>,
) {
    for (key, value) in map {
        let full_key = join_key(prefix, key);
        match value {
            serde_json::Value::String(s) => {
                out.insert(full_key, s.clone());
            }
            serde_json::Value::Number(n) => {
                out.insert(full_key, n.to_string());
            }
            serde_json::Value::Bool(b) => {
                out.insert(full_key, b.to_string());
            }
            serde_json::Value::Object(inner) => flatten_json(&full_key, inner, out),
            serde_json::Value::Null | serde_json::Value::Array(_) => {
                tracing::debug!(key = %full_key, "Skipping non-scalar config value");
            }
        }
    }
}
