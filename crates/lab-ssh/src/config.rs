//! Configuration types for lab-ssh.
//!
//! [`LabConfig`] is the explicit configuration object a
//! [`CommandDispatcher`](crate::CommandDispatcher) is built from. It is
//! resolved once from a [`ConfigStore`] (environment, file, map, or a layered
//! stack of them) and never mutated by dispatch.

mod env;
mod file;
mod store;

use std::fmt;
use std::path::Path;

pub use env::{EnvStore, parse_bool};
pub use file::{ConfigFormat, FileStore};
pub use store::{ConfigStore, LayeredStore, MapStore};

use crate::error::Result;
use crate::target::TargetClass;
use crate::types::ExecDefaults;

/// Key selecting privilege escalation on the BMC.
pub const USER_TYPE_KEY: &str = "USER_TYPE";

/// Key holding the default for `quiet`.
pub const QUIET_KEY: &str = "QUIET";

/// Key holding the default for `test_mode`.
pub const TEST_MODE_KEY: &str = "TEST_MODE";

/// Key holding the log filter directive.
pub const LOG_LEVEL_KEY: &str = "LOG_LEVEL";

/// Key holding the log output format.
pub const LOG_FORMAT_KEY: &str = "LOG_FORMAT";

/// Connection settings for one target class, as configured.
///
/// Values are stored as resolved, including empty strings; validation
/// happens at dispatch time.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TargetSettings {
    /// Host name or address.
    pub host: String,
    /// Login user name.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Port, for classes that carry one.
    pub port: Option<String>,
}

impl TargetSettings {
    /// Resolve the settings for a target class from a store.
    #[must_use]
    pub fn from_store(target: TargetClass, store: &dyn ConfigStore) -> Self {
        Self {
            host: store.get(&target.host_key(), ""),
            username: store.get(&target.username_key(), ""),
            password: store.get(&target.password_key(), ""),
            port: target
                .port_key()
                .zip(target.default_port())
                .map(|(key, default)| store.get(key, default)),
        }
    }

    /// Set the host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the username.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Set the password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the port.
    #[must_use]
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }
}

impl fmt::Debug for TargetSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetSettings")
            .field("host", &self.host)
            .field("username", &self.username)
            .field(
                "password",
                &if self.password.is_empty() {
                    ""
                } else {
                    "<redacted>"
                },
            )
            .field("port", &self.port)
            .finish()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-field lines.
    #[default]
    Full,
    /// Compact single-line output.
    Compact,
    /// Newline-delimited JSON.
    Json,
}

impl LogFormat {
    /// Parse a format name; unknown names fall back to [`LogFormat::Full`].
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "compact" => Self::Compact,
            "json" | "ndjson" => Self::Json,
            _ => Self::Full,
        }
    }
}

/// Configuration for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive (`info`, `lab_ssh=debug`, ...). Falls back to `RUST_LOG`.
    pub filter: Option<String>,
    /// Output format.
    pub format: LogFormat,
    /// Include the event target in each line.
    pub with_target: bool,
}

impl LoggingConfig {
    /// Create a new logging configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve from a store.
    #[must_use]
    pub fn from_store(store: &dyn ConfigStore) -> Self {
        Self {
            filter: store.lookup(LOG_LEVEL_KEY),
            format: store
                .lookup(LOG_FORMAT_KEY)
                .map(|f| LogFormat::parse(&f))
                .unwrap_or_default(),
            with_target: false,
        }
    }

    /// Set the filter directive.
    #[must_use]
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set the format.
    #[must_use]
    pub const fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Include event targets.
    #[must_use]
    pub const fn with_target(mut self, on: bool) -> Self {
        self.with_target = on;
        self
    }
}

/// Connection settings for every target class plus dispatch-wide options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabConfig {
    /// Baseboard management controller.
    pub bmc: TargetSettings,
    /// Host operating system.
    pub os: TargetSettings,
    /// Provisioning server.
    pub provisioning: TargetSettings,
    /// Network device.
    pub device: TargetSettings,
    /// BMC user type; `"sudo"` prefixes BMC commands with `sudo `.
    pub user_type: Option<String>,
    /// Defaults for options the caller leaves unset.
    pub defaults: ExecDefaults,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self::from_store(&MapStore::new())
    }
}

impl LabConfig {
    /// Resolve every setting from a store.
    #[must_use]
    pub fn from_store(store: &dyn ConfigStore) -> Self {
        let config = Self {
            bmc: TargetSettings::from_store(TargetClass::Bmc, store),
            os: TargetSettings::from_store(TargetClass::Os, store),
            provisioning: TargetSettings::from_store(TargetClass::Provisioning, store),
            device: TargetSettings::from_store(TargetClass::Device, store),
            user_type: store.lookup_non_empty(USER_TYPE_KEY),
            defaults: ExecDefaults {
                quiet: store.lookup(QUIET_KEY).is_some_and(|v| parse_bool(&v)),
                test_mode: store.lookup(TEST_MODE_KEY).is_some_and(|v| parse_bool(&v)),
            },
            logging: LoggingConfig::from_store(store),
        };
        tracing::debug!(
            bmc_host = %config.bmc.host,
            os_host = %config.os.host,
            xcat_host = %config.provisioning.host,
            device_host = %config.device.host,
            "Resolved lab configuration"
        );
        config
    }

    /// Resolve from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_store(&EnvStore::new())
    }

    /// Load a TOML or JSON file; environment variables take precedence.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = FileStore::load(path)?;
        let store = LayeredStore::new().layer(EnvStore::new()).layer(file);
        Ok(Self::from_store(&store))
    }

    /// Settings for a target class.
    #[must_use]
    pub const fn target(&self, target: TargetClass) -> &TargetSettings {
        match target {
            TargetClass::Bmc => &self.bmc,
            TargetClass::Os => &self.os,
            TargetClass::Provisioning => &self.provisioning,
            TargetClass::Device => &self.device,
        }
    }

    /// Mutable settings for a target class.
    pub fn target_mut(&mut self, target: TargetClass) -> &mut TargetSettings {
        match target {
            TargetClass::Bmc => &mut self.bmc,
            TargetClass::Os => &mut self.os,
            TargetClass::Provisioning => &mut self.provisioning,
            TargetClass::Device => &mut self.device,
        }
    }

    /// Replace the settings for a target class.
    #[must_use]
    pub fn with_target(mut self, target: TargetClass, settings: TargetSettings) -> Self {
        *self.target_mut(target) = settings;
        self
    }

    /// Set the BMC user type.
    #[must_use]
    pub fn user_type(mut self, user_type: impl Into<String>) -> Self {
        self.user_type = Some(user_type.into());
        self
    }

    /// Set the execution defaults.
    #[must_use]
    pub const fn defaults(mut self, defaults: ExecDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Whether BMC commands run under `sudo`.
    #[must_use]
    pub fn sudo_enabled(&self) -> bool {
        self.user_type.as_deref() == Some("sudo")
    }
}
