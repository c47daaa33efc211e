//! lab-ssh: run commands on lab hosts over SSH.
//!
//! A test lab has four kinds of host: the baseboard management controller,
//! the host operating system, a provisioning server, and a network device.
//! [`CommandDispatcher`] resolves the connection settings for each from a
//! [`LabConfig`], rejects placeholders before anything is sent, applies the
//! per-class rules, and forwards the command to an [`SshExecutor`].
//!
//! # Features
//!
//! - **Explicit configuration** from environment, TOML/JSON files or maps
//! - **Per-class rules**: `sudo` on the BMC, host overrides on the OS,
//!   errors never fatal on the network device
//! - **SSH backend** with cached sessions per alias (feature: `ssh`)
//! - **Recording executor** for tests and dry runs
//! - **Output parsing** of `key: value` listings and tables
//!
//! # Example
//!
//! ```no_run
//! use lab_ssh::{CommandDispatcher, CommandRequest, LabConfig, SessionExecutor};
//!
//! # fn main() -> lab_ssh::Result<()> {
//! let config = LabConfig::from_env();
//! lab_ssh::logging::init(&config.logging)?;
//!
//! let dispatcher = CommandDispatcher::new(config, SessionExecutor::new()?);
//! let result = dispatcher.bmc_execute_command(CommandRequest::new("uptime").print_out(true));
//! if !result.is_success() {
//!     eprintln!("uptime failed with {}", result.return_code);
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod logging;
pub mod output;
pub mod target;
pub mod types;
pub mod validation;

#[cfg(feature = "ssh")]
pub use backend::ssh::{HostKeyVerification, SessionExecutor};
pub use config::{
    ConfigFormat, ConfigStore, EnvStore, FileStore, LabConfig, LayeredStore, LogFormat,
    LoggingConfig, MapStore, TargetSettings,
};
pub use dispatcher::{CommandDispatcher, HostOverrides};
#[cfg(feature = "ssh")]
pub use error::SshError;
pub use error::{DispatchError, ParameterField, Result};
pub use executor::{RecordingExecutor, SshExecutor, SshInvocation};
pub use output::KeyValueOptions;
pub use target::TargetClass;
pub use types::{
    CommandRequest, CommandResult, ConnectionProfile, Credentials, ExecDefaults, ExecOptions,
};
pub use validation::ValueRule;
