//! Target classes.
//!
//! Every remote command goes to one of four kinds of lab host. The variant
//! carries everything that differs between them: which configuration keys
//! name the host and login, which key (if any) names the port, the session
//! alias, and the fixed connection extras.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Port used when the configuration names none.
pub const DEFAULT_PORT: &str = "22";

/// Connect timeout sent with BMC connections, in seconds.
pub const BMC_CONNECT_TIMEOUT: &str = "25.0";

/// Shell prompt expected on the BMC.
pub const BMC_PROMPT: &str = "# ";

/// The class of lab host a command is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetClass {
    /// Baseboard management controller.
    Bmc,
    /// Host operating system.
    Os,
    /// Provisioning server (xCAT).
    Provisioning,
    /// Network device such as a switch.
    Device,
}

impl TargetClass {
    /// All target classes.
    pub const ALL: [Self; 4] = [Self::Bmc, Self::Os, Self::Provisioning, Self::Device];

    /// Session alias, unique per class so sessions to different targets coexist.
    #[must_use]
    pub const fn alias(self) -> &'static str {
        match self {
            Self::Bmc => "bmc_connection",
            Self::Os => "os_connection",
            Self::Provisioning => "xcat_connection",
            Self::Device => "device_connection",
        }
    }

    /// Prefix of the host, username and password configuration keys.
    #[must_use]
    pub const fn key_prefix(self) -> &'static str {
        match self {
            Self::Bmc => "OPENBMC_",
            Self::Os => "OS_",
            Self::Provisioning => "XCAT_",
            Self::Device => "DEVICE_",
        }
    }

    /// Configuration key holding the host.
    #[must_use]
    pub fn host_key(self) -> String {
        format!("{}HOST", self.key_prefix())
    }

    /// Configuration key holding the login user name.
    #[must_use]
    pub fn username_key(self) -> String {
        format!("{}USERNAME", self.key_prefix())
    }

    /// Configuration key holding the login password.
    #[must_use]
    pub fn password_key(self) -> String {
        format!("{}PASSWORD", self.key_prefix())
    }

    /// Configuration key holding the port, for classes that carry one.
    ///
    /// The BMC shares the generic `SSH_PORT` key.
    #[must_use]
    pub const fn port_key(self) -> Option<&'static str> {
        match self {
            Self::Bmc => Some("SSH_PORT"),
            Self::Os => None,
            Self::Provisioning => Some("XCAT_PORT"),
            Self::Device => Some("DEVICE_PORT"),
        }
    }

    /// Port used when the configuration has none.
    #[must_use]
    pub const fn default_port(self) -> Option<&'static str> {
        match self.port_key() {
            Some(_) => Some(DEFAULT_PORT),
            None => None,
        }
    }

    /// Connect timeout carried in the connection profile.
    #[must_use]
    pub const fn connect_timeout(self) -> Option<&'static str> {
        match self {
            Self::Bmc => Some(BMC_CONNECT_TIMEOUT),
            _ => None,
        }
    }

    /// Prompt carried in the connection profile.
    #[must_use]
    pub const fn prompt(self) -> Option<&'static str> {
        match self {
            Self::Bmc => Some(BMC_PROMPT),
            _ => None,
        }
    }

    /// Whether caller-supplied host and login overrides apply.
    #[must_use]
    pub const fn accepts_overrides(self) -> bool {
        matches!(self, Self::Os)
    }

    /// Short lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bmc => "bmc",
            Self::Os => "os",
            Self::Provisioning => "provisioning",
            Self::Device => "device",
        }
    }
}

impl fmt::Display for TargetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetClass {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bmc" | "openbmc" => Ok(Self::Bmc),
            "os" | "host" => Ok(Self::Os),
            "provisioning" | "xcat" => Ok(Self::Provisioning),
            "device" | "switch" => Ok(Self::Device),
            other => Err(DispatchError::config(format!(
                "unknown target class '{other}'"
            ))),
        }
    }
}
