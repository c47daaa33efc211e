//! Command dispatch to lab targets.
//!
//! Every call is one linear pass: resolve the connection settings for the
//! target class, validate them, rewrite the command if the class calls for
//! it, resolve unset options, and hand the result to the executor.
//!
//! A rejected setting never reaches the executor. The caller gets the
//! canonical `("", "", 1)` result, which is indistinguishable by return code
//! from a remote command that exited 1; only the empty output tells them
//! apart.
//!
//! # Example
//!
//! ```
//! use lab_ssh::{CommandDispatcher, CommandRequest, LabConfig, MapStore, RecordingExecutor};
//!
//! let store = MapStore::new()
//!     .with("OPENBMC_HOST", "10.1.1.1")
//!     .with("OPENBMC_USERNAME", "root")
//!     .with("OPENBMC_PASSWORD", "0penBmc");
//! let dispatcher = CommandDispatcher::new(LabConfig::from_store(&store), RecordingExecutor::new());
//!
//! let result = dispatcher.bmc_execute_command(CommandRequest::new("uptime"));
//! assert_eq!(result.return_code, 0);
//! assert_eq!(dispatcher.executor().invocation_count(), 1);
//! ```

use crate::config::LabConfig;
use crate::error::{DispatchError, ParameterField, Result};
use crate::executor::{SshExecutor, SshInvocation};
use crate::target::TargetClass;
use crate::types::{CommandRequest, CommandResult, ConnectionProfile, Credentials};
use crate::validation::ValueRule;

/// Prefix added to BMC commands when the user type is `sudo`.
pub const SUDO_PREFIX: &str = "sudo ";

/// Caller-supplied host and login that replace configured values.
///
/// Only honoured for [`TargetClass::Os`]. An empty field falls back to the
/// configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostOverrides {
    /// Host to use instead of `OS_HOST`.
    pub host: String,
    /// User name to use instead of `OS_USERNAME`.
    pub username: String,
    /// Password to use instead of `OS_PASSWORD`.
    pub password: String,
}

impl HostOverrides {
    /// No overrides.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Override the host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Override the user name.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Override the password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Check whether any field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.host.is_empty() && self.username.is_empty() && self.password.is_empty()
    }
}

/// Pick the override when it is non-empty.
fn prefer<'a>(override_value: &'a str, configured: &'a str) -> &'a str {
    if override_value.is_empty() {
        configured
    } else {
        override_value
    }
}

/// Resolves, validates and forwards commands to an [`SshExecutor`].
#[derive(Debug)]
pub struct CommandDispatcher<E> {
    config: LabConfig,
    executor: E,
    value_rule: ValueRule,
}

impl<E: SshExecutor> CommandDispatcher<E> {
    /// Create a dispatcher.
    #[must_use]
    pub const fn new(config: LabConfig, executor: E) -> Self {
        Self {
            config,
            executor,
            value_rule: ValueRule::new(),
        }
    }

    /// Check connection settings with `rule` instead of the default one.
    #[must_use]
    pub fn with_value_rule(mut self, rule: ValueRule) -> Self {
        self.value_rule = rule;
        self
    }

    /// The rule connection settings are checked with.
    #[must_use]
    pub const fn value_rule(&self) -> &ValueRule {
        &self.value_rule
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &LabConfig {
        &self.config
    }

    /// The executor in use.
    #[must_use]
    pub const fn executor(&self) -> &E {
        &self.executor
    }

    /// Take the dispatcher apart.
    #[must_use]
    pub fn into_parts(self) -> (LabConfig, E) {
        (self.config, self.executor)
    }

    /// Resolve and validate the connection profile and login for a target.
    ///
    /// Fields are checked in the order host, username, password, port and
    /// the first failure is returned.
    pub fn resolve(
        &self,
        target: TargetClass,
        overrides: &HostOverrides,
    ) -> Result<(ConnectionProfile, Credentials)> {
        let settings = self.config.target(target);

        let (host, username, password) = if target.accepts_overrides() {
            (
                prefer(&overrides.host, &settings.host),
                prefer(&overrides.username, &settings.username),
                prefer(&overrides.password, &settings.password),
            )
        } else {
            if !overrides.is_empty() {
                tracing::debug!(target_class = %target, "Ignoring host overrides");
            }
            (
                settings.host.as_str(),
                settings.username.as_str(),
                settings.password.as_str(),
            )
        };

        if !self.value_rule.check(host) {
            return Err(DispatchError::invalid_parameter(
                target,
                ParameterField::Host,
                target.host_key(),
            ));
        }
        if !self.value_rule.check(username) {
            return Err(DispatchError::invalid_parameter(
                target,
                ParameterField::Username,
                target.username_key(),
            ));
        }
        if !self.value_rule.check(password) {
            return Err(DispatchError::invalid_parameter(
                target,
                ParameterField::Password,
                target.password_key(),
            ));
        }

        let port = settings
            .port
            .as_deref()
            .or_else(|| target.default_port());
        if let Some(port) = port
            && !self.value_rule.check(port)
        {
            return Err(DispatchError::invalid_parameter(
                target,
                ParameterField::Port,
                target.port_key().unwrap_or("PORT"),
            ));
        }

        let mut profile = ConnectionProfile::new(host, target.alias());
        if let Some(timeout) = target.connect_timeout() {
            profile = profile.timeout(timeout);
        }
        if let Some(prompt) = target.prompt() {
            profile = profile.prompt(prompt);
        }
        if let Some(port) = port {
            profile = profile.port(port);
        }

        Ok((profile, Credentials::new(username, password)))
    }

    /// Build the invocation that would be sent, without sending it.
    pub fn prepare(
        &self,
        target: TargetClass,
        request: &CommandRequest,
        overrides: &HostOverrides,
    ) -> Result<SshInvocation> {
        let (connection, login) = self.resolve(target, overrides)?;

        let command = if target == TargetClass::Bmc && self.config.sudo_enabled() {
            format!("{SUDO_PREFIX}{}", request.command)
        } else {
            request.command.clone()
        };

        let mut options = request.resolve(&self.config.defaults);
        if target == TargetClass::Device {
            // Switch output is routinely partial or garbled; never fail on it.
            options.print_err = false;
            options.ignore_err = true;
            options.fork = false;
            options.timeout = None;
        }

        Ok(SshInvocation {
            command,
            connection,
            login,
            options,
        })
    }

    /// Run a command on a target.
    pub fn execute(&self, target: TargetClass, request: &CommandRequest) -> CommandResult {
        self.execute_with_overrides(target, request, &HostOverrides::none())
    }

    /// Run a command on a target with caller-supplied host and login.
    pub fn execute_with_overrides(
        &self,
        target: TargetClass,
        request: &CommandRequest,
        overrides: &HostOverrides,
    ) -> CommandResult {
        let _span = tracing::debug_span!("dispatch", target_class = %target).entered();

        match self.prepare(target, request, overrides) {
            Ok(invocation) => {
                tracing::debug!(
                    alias = %invocation.connection.alias,
                    host = %invocation.connection.host,
                    "Dispatching command"
                );
                self.executor.execute_ssh_command(&invocation)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Not dispatching command");
                CommandResult::invalid()
            }
        }
    }

    /// Run a command on the BMC.
    pub fn bmc_execute_command(&self, request: impl Into<CommandRequest>) -> CommandResult {
        self.execute(TargetClass::Bmc, &request.into())
    }

    /// Run a command on the host operating system.
    pub fn os_execute_command(
        &self,
        request: impl Into<CommandRequest>,
        overrides: &HostOverrides,
    ) -> CommandResult {
        self.execute_with_overrides(TargetClass::Os, &request.into(), overrides)
    }

    /// Run a command on the provisioning server.
    pub fn xcat_execute_command(&self, request: impl Into<CommandRequest>) -> CommandResult {
        self.execute(TargetClass::Provisioning, &request.into())
    }

    /// Write a command to the network device.
    ///
    /// Errors are never reported or fatal here; only `print_out`, `quiet` and
    /// `test_mode` from the request are honoured.
    pub fn device_write(&self, request: impl Into<CommandRequest>) -> CommandResult {
        self.execute(TargetClass::Device, &request.into())
    }
}
