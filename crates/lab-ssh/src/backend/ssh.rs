//! SSH backend.
//!
//! - Password, then keyboard-interactive authentication with the same password
//! - Host key checking against `known_hosts`, trust-on-first-use by default
//! - One cached session per alias, reconnected when the endpoint changes
//! - Command timeouts and fire-and-forget (forked) commands

pub mod auth;
mod executor;
mod known_hosts;
pub mod session;

pub use auth::{AuthMethod, HostKeyVerification, SshCredentials};
pub use executor::SessionExecutor;
pub use session::{ExecOutput, SshConfig, SshSession, SshSessionState};
