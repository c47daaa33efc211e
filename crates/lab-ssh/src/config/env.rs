//! Environment-based configuration.

use super::store::ConfigStore;

/// Configuration store backed by the process environment.
///
/// With a prefix, key `OPENBMC_HOST` is read from `<PREFIX>_OPENBMC_HOST`.
#[derive(Debug, Clone, Default)]
pub struct EnvStore {
    /// Prefix for environment variables.
    prefix: String,
}

impl EnvStore {
    /// Read keys verbatim.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read keys under a prefix.
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Build the full environment variable name.
    fn var_name(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_uppercase()
        } else {
            format!("{}_{}", self.prefix, key.to_uppercase())
        }
    }
}

impl ConfigStore for EnvStore {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(self.var_name(key)).ok()
    }
}

/// Parse a boolean setting.
///
/// `1`, `true`, `yes`, `on` and `enabled` (any case) are true; anything else
/// is false.
#[must_use]
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "enabled"
    )
}
