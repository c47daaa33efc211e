//! Error types for lab-ssh.
//!
//! Dispatch itself only produces one kind of failure: a required connection
//! parameter that is missing or a placeholder. That failure is recovered into
//! the canonical `("", "", 1)` result by the `execute*` operations, but it is
//! kept as a typed error here so that callers using
//! [`CommandDispatcher::resolve`](crate::CommandDispatcher::resolve) can see
//! which field was rejected.
//!
//! SSH transport failures live in [`SshError`] and never escape the executor;
//! they are folded into the returned [`CommandResult`](crate::CommandResult).

use std::time::Duration;

use thiserror::Error;

use crate::target::TargetClass;

/// The connection parameter that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterField {
    /// Host name or address.
    Host,
    /// Login user name.
    Username,
    /// Login password.
    Password,
    /// TCP port.
    Port,
}

impl ParameterField {
    /// Lowercase field name used in messages and log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Username => "username",
            Self::Password => "password",
            Self::Port => "port",
        }
    }
}

impl std::fmt::Display for ParameterField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The main error type for lab-ssh operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A required connection parameter resolved to an empty or placeholder value.
    #[error("invalid {field} for {target} target (config key {key})")]
    InvalidConnectionParameter {
        /// Target class being dispatched to.
        target: TargetClass,
        /// The field that failed validation.
        field: ParameterField,
        /// The configuration key the value was resolved from.
        key: String,
    },

    /// The command string cannot be sent.
    #[error("invalid command: {reason}")]
    InvalidCommand {
        /// Why the command was rejected.
        reason: String,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// The global log subscriber could not be installed.
    #[error("failed to initialize logging: {reason}")]
    Logging {
        /// Why installation failed.
        reason: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An I/O error occurred with additional context.
    #[error("{context}: {source}")]
    IoWithContext {
        /// What operation was being performed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors related to SSH connections.
#[cfg(feature = "ssh")]
#[derive(Debug, Error)]
pub enum SshError {
    /// Connection failed.
    #[error("failed to connect to {host}:{port}: {reason}")]
    Connection {
        /// The host that could not be connected to.
        host: String,
        /// The port that was used.
        port: u16,
        /// The reason for the failure.
        reason: String,
    },

    /// Authentication failed.
    #[error("authentication failed for user '{user}': {reason}")]
    Authentication {
        /// The user that failed to authenticate.
        user: String,
        /// The reason for the failure.
        reason: String,
    },

    /// Host key verification failed.
    #[error("host key verification failed for {host}: {reason}")]
    HostKeyVerification {
        /// The host whose key verification failed.
        host: String,
        /// The reason for the failure.
        reason: String,
    },

    /// Channel error.
    #[error("SSH channel error: {reason}")]
    Channel {
        /// The reason for the channel error.
        reason: String,
    },

    /// Session error.
    #[error("SSH session error: {reason}")]
    Session {
        /// The reason for the session error.
        reason: String,
    },

    /// Timeout during SSH operation.
    #[error("SSH operation timed out after {duration:?}")]
    Timeout {
        /// The duration that elapsed.
        duration: Duration,
    },

    /// The port string in a connection profile is not a TCP port.
    #[error("invalid SSH port '{value}'")]
    InvalidPort {
        /// The rejected port string.
        value: String,
    },
}

/// Result type alias for lab-ssh operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

impl DispatchError {
    /// Create an invalid connection parameter error.
    pub fn invalid_parameter(
        target: TargetClass,
        field: ParameterField,
        key: impl Into<String>,
    ) -> Self {
        Self::InvalidConnectionParameter {
            target,
            field,
            key: key.into(),
        }
    }

    /// Create an invalid command error.
    pub fn invalid_command(reason: impl Into<String>) -> Self {
        Self::InvalidCommand {
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a logging initialization error.
    pub fn logging(reason: impl Into<String>) -> Self {
        Self::Logging {
            reason: reason.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io_context(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoWithContext {
            context: context.into(),
            source,
        }
    }

    /// Wrap an I/O result with context.
    pub fn with_io_context<T>(result: std::io::Result<T>, context: impl Into<String>) -> Result<T> {
        result.map_err(|e| Self::io_context(context, e))
    }

    /// Check if this is a connection-parameter validation failure.
    #[must_use]
    pub const fn is_invalid_parameter(&self) -> bool {
        matches!(self, Self::InvalidConnectionParameter { .. })
    }

    /// The rejected field, if this is a validation failure.
    #[must_use]
    pub const fn field(&self) -> Option<ParameterField> {
        match self {
            Self::InvalidConnectionParameter { field, .. } => Some(*field),
            _ => None,
        }
    }
}

#[cfg(feature = "ssh")]
impl SshError {
    /// Create a connection error.
    pub fn connection(host: impl Into<String>, port: u16, reason: impl Into<String>) -> Self {
        Self::Connection {
            host: host.into(),
            port,
            reason: reason.into(),
        }
    }

    /// Create an authentication error.
    pub fn authentication(user: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Authentication {
            user: user.into(),
            reason: reason.into(),
        }
    }

    /// Create a channel error.
    pub fn channel(reason: impl Into<String>) -> Self {
        Self::Channel {
            reason: reason.into(),
        }
    }

    /// Create a session error.
    pub fn session(reason: impl Into<String>) -> Self {
        Self::Session {
            reason: reason.into(),
        }
    }

    /// Create a timeout error.
    #[must_use]
    pub const fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Exit code reported for this failure in a command result.
    ///
    /// Transport failures use 255 like the OpenSSH client; an elapsed
    /// command timeout uses 124 like coreutils `timeout`.
    #[must_use]
    pub const fn return_code(&self) -> i32 {
        match self {
            Self::Timeout { .. } => 124,
            Self::InvalidPort { .. } => 1,
            _ => 255,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameter_display() {
        let err = DispatchError::invalid_parameter(
            TargetClass::Bmc,
            ParameterField::Host,
            "OPENBMC_HOST",
        );
        let msg = err.to_string();
        assert!(msg.contains("host"));
        assert!(msg.contains("bmc"));
        assert!(msg.contains("OPENBMC_HOST"));
        assert!(err.is_invalid_parameter());
        assert_eq!(err.field(), Some(ParameterField::Host));
    }

    #[test]
    fn config_error_is_not_invalid_parameter() {
        let err = DispatchError::config("bad file");
        assert!(!err.is_invalid_parameter());
        assert!(err.field().is_none());
        assert!(err.to_string().contains("bad file"));
    }

    #[test]
    fn io_with_context_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = DispatchError::io_context("reading lab config", io_err);
        let msg = err.to_string();
        assert!(msg.contains("reading lab config"));
        assert!(msg.contains("file not found"));
    }

    #[test]
    fn with_io_context_success() {
        let result: std::io::Result<i32> = Ok(42);
        let value = DispatchError::with_io_context(result, "some operation").unwrap();
        assert_eq!(value, 42);
    }

    #[cfg(feature = "ssh")]
    #[test]
    fn ssh_error_return_codes() {
        assert_eq!(SshError::timeout(Duration::from_secs(1)).return_code(), 124);
        assert_eq!(SshError::connection("h", 22, "refused").return_code(), 255);
        assert_eq!(
            SshError::InvalidPort {
                value: "x".to_string()
            }
            .return_code(),
            1
        );
    }
}
