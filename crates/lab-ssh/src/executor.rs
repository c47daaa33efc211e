//! The SSH execution collaborator.
//!
//! The dispatcher ends every successful resolution by handing an
//! [`SshInvocation`] to an [`SshExecutor`]. The executor owns everything
//! after that point: opening or reusing the session for the alias,
//! authenticating, running or forking the command, printing, and turning
//! transport failures into a [`CommandResult`].
//!
//! - [`RecordingExecutor`] records invocations and replays scripted results.
//! - `SessionExecutor` (feature `ssh`) runs commands over russh.

mod recording;
#[cfg(feature = "ssh")]
pub(crate) mod report;

pub use recording::RecordingExecutor;

use std::sync::Arc;

use crate::types::{CommandResult, ConnectionProfile, Credentials, ExecOptions};

/// One fully resolved remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshInvocation {
    /// Command string, after any rewriting.
    pub command: String,
    /// Where to connect.
    pub connection: ConnectionProfile,
    /// How to log in.
    pub login: Credentials,
    /// Resolved execution flags.
    pub options: ExecOptions,
}

/// Runs a command over SSH and reports what happened.
///
/// Implementations never fail: every outcome, including connection and
/// authentication errors, is reported through the returned result.
pub trait SshExecutor: Send + Sync {
    /// Execute one invocation, blocking until it completes or is forked.
    fn execute_ssh_command(&self, invocation: &SshInvocation) -> CommandResult;
}

impl<T: SshExecutor + ?Sized> SshExecutor for &T {
    fn execute_ssh_command(&self, invocation: &SshInvocation) -> CommandResult {
        (**self).execute_ssh_command(invocation)
    }
}

impl<T: SshExecutor + ?Sized> SshExecutor for Box<T> {
    fn execute_ssh_command(&self, invocation: &SshInvocation) -> CommandResult {
        (**self).execute_ssh_command(invocation)
    }
}

impl<T: SshExecutor + ?Sized> SshExecutor for Arc<T> {
    fn execute_ssh_command(&self, invocation: &SshInvocation) -> CommandResult {
        (**self).execute_ssh_command(invocation)
    }
}
