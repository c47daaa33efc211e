//! Common types for lab-ssh.
//!
//! These are the values that cross the boundary between the dispatcher and
//! the SSH execution collaborator: where to connect, how to log in, what to
//! run, and what came back.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How to reach a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionProfile {
    /// Host name or address.
    pub host: String,
    /// Session alias; sessions are reused per alias.
    pub alias: String,
    /// TCP port, when the target class carries one.
    pub port: Option<String>,
    /// Connect timeout in seconds, as configured.
    pub timeout: Option<String>,
    /// Expected shell prompt.
    pub prompt: Option<String>,
}

impl ConnectionProfile {
    /// Create a profile with host and alias only.
    #[must_use]
    pub fn new(host: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            alias: alias.into(),
            port: None,
            timeout: None,
            prompt: None,
        }
    }

    /// Set the port.
    #[must_use]
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    /// Set the prompt.
    #[must_use]
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

/// Login parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Create credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A command plus the caller's execution flags.
///
/// `quiet`, `test_mode` and `timeout` are optional; unset values inherit the
/// configured defaults when the dispatcher resolves the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandRequest {
    /// The command string to run.
    pub command: String,
    /// Print stdout and stderr after the command runs.
    pub print_out: bool,
    /// Print an error report if the command returns non-zero.
    pub print_err: bool,
    /// Treat a non-zero return code as expected.
    pub ignore_err: bool,
    /// Start the command without waiting for it to finish.
    pub fork: bool,
    /// Suppress the `Issuing:` line.
    pub quiet: Option<bool>,
    /// Do not actually run the command.
    pub test_mode: Option<bool>,
    /// Limit on how long the command may run; `None` means no limit.
    pub timeout: Option<Duration>,
}

impl CommandRequest {
    /// Create a request with all flags off.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// Set `print_out`.
    #[must_use]
    pub const fn print_out(mut self, on: bool) -> Self {
        self.print_out = on;
        self
    }

    /// Set `print_err`.
    #[must_use]
    pub const fn print_err(mut self, on: bool) -> Self {
        self.print_err = on;
        self
    }

    /// Set `ignore_err`.
    #[must_use]
    pub const fn ignore_err(mut self, on: bool) -> Self {
        self.ignore_err = on;
        self
    }

    /// Set `fork`.
    #[must_use]
    pub const fn fork(mut self, on: bool) -> Self {
        self.fork = on;
        self
    }

    /// Set `quiet` explicitly.
    #[must_use]
    pub const fn quiet(mut self, on: bool) -> Self {
        self.quiet = Some(on);
        self
    }

    /// Set `test_mode` explicitly.
    #[must_use]
    pub const fn test_mode(mut self, on: bool) -> Self {
        self.test_mode = Some(on);
        self
    }

    /// Set the command timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Resolve unset options against defaults.
    #[must_use]
    pub fn resolve(&self, defaults: &ExecDefaults) -> ExecOptions {
        ExecOptions {
            print_out: self.print_out,
            print_err: self.print_err,
            ignore_err: self.ignore_err,
            fork: self.fork,
            quiet: self.quiet.unwrap_or(defaults.quiet),
            test_mode: self.test_mode.unwrap_or(defaults.test_mode),
            timeout: self.timeout,
        }
    }
}

impl From<&str> for CommandRequest {
    fn from(command: &str) -> Self {
        Self::new(command)
    }
}

impl From<String> for CommandRequest {
    fn from(command: String) -> Self {
        Self::new(command)
    }
}

/// Process-wide defaults for options the caller left unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecDefaults {
    /// Default for `quiet`.
    pub quiet: bool,
    /// Default for `test_mode`.
    pub test_mode: bool,
}

/// Fully resolved execution flags handed to the executor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Print stdout and stderr after the command runs.
    pub print_out: bool,
    /// Print an error report on non-zero return code.
    pub print_err: bool,
    /// Treat a non-zero return code as expected.
    pub ignore_err: bool,
    /// Start the command without waiting.
    pub fork: bool,
    /// Suppress the `Issuing:` line.
    pub quiet: bool,
    /// Do not run the command.
    pub test_mode: bool,
    /// Command timeout.
    pub timeout: Option<Duration>,
}

/// Output of a remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Exit status of the command, or a failure code from the executor.
    pub return_code: i32,
}

impl CommandResult {
    /// Create a result.
    #[must_use]
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, return_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            return_code,
        }
    }

    /// The canonical result for a rejected connection parameter: `("", "", 1)`.
    #[must_use]
    pub const fn invalid() -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            return_code: 1,
        }
    }

    /// A successful, empty result.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            return_code: 0,
        }
    }

    /// Check whether the return code is zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.return_code == 0
    }

    /// Split into the `(stdout, stderr, return_code)` triple.
    #[must_use]
    pub fn into_parts(self) -> (String, String, i32) {
        (self.stdout, self.stderr, self.return_code)
    }
}

impl From<(String, String, i32)> for CommandResult {
    fn from((stdout, stderr, return_code): (String, String, i32)) -> Self {
        Self {
            stdout,
            stderr,
            return_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::new("root", "0penBmc");
        let shown = format!("{creds:?}");
        assert!(shown.contains("root"));
        assert!(!shown.contains("0penBmc"));
    }

    #[test]
    fn request_builder() {
        let req = CommandRequest::new("uptime")
            .print_out(true)
            .fork(true)
            .timeout(Duration::from_secs(5));
        assert_eq!(req.command, "uptime");
        assert!(req.print_out);
        assert!(req.fork);
        assert!(!req.print_err);
        assert_eq!(req.quiet, None);
        assert_eq!(req.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn resolve_inherits_defaults() {
        let defaults = ExecDefaults {
            quiet: true,
            test_mode: true,
        };
        let opts = CommandRequest::new("ls").resolve(&defaults);
        assert!(opts.quiet);
        assert!(opts.test_mode);
    }

    #[test]
    fn resolve_explicit_wins() {
        let defaults = ExecDefaults {
            quiet: true,
            test_mode: true,
        };
        let opts = CommandRequest::new("ls")
            .quiet(false)
            .test_mode(false)
            .resolve(&defaults);
        assert!(!opts.quiet);
        assert!(!opts.test_mode);
    }

    #[test]
    fn result_serializes_as_object() {
        let value = serde_json::to_value(CommandResult::new("ok\n", "", 0)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"stdout": "ok\n", "stderr": "", "return_code": 0})
        );
    }

    #[test]
    fn invalid_result_shape() {
        let result = CommandResult::invalid();
        assert_eq!(
            result.into_parts(),
            (String::new(), String::new(), 1)
        );
    }
}
