//! Blocking [`SshExecutor`] backed by cached russh sessions.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::runtime::{Handle, Runtime};

use super::auth::HostKeyVerification;
use super::session::{SshConfig, SshSession};
use crate::error::{DispatchError, Result, SshError};
use crate::executor::{SshExecutor, SshInvocation, report};
use crate::types::CommandResult;
use crate::validation::validate_command;

/// Executes invocations over SSH, keeping one session per alias.
///
/// Calls block. A session is reused while the alias keeps pointing at the
/// same host, port and user; a session that failed or timed out is dropped
/// and the next call reconnects. Calls on one alias are not serialized: when
/// two overlap, the session stored last is kept and the other is closed.
///
/// Safe to call and drop from inside a tokio runtime of either flavor; the
/// work then runs on a helper thread.
pub struct SessionExecutor {
    handle: Handle,
    runtime: Option<Runtime>,
    sessions: Mutex<HashMap<String, SshSession>>,
    host_key_verification: HostKeyVerification,
    known_hosts: Option<PathBuf>,
}

impl std::fmt::Debug for SessionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionExecutor")
            .field("aliases", &self.active_aliases())
            .field("host_key_verification", &self.host_key_verification)
            .field("known_hosts", &self.known_hosts)
            .finish_non_exhaustive()
    }
}

impl SessionExecutor {
    /// Create an executor with its own single-worker runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be started.
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("lab-ssh")
            .enable_all()
            .build()
            .map_err(|e| DispatchError::io_context("starting SSH runtime", e))?;

        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
            sessions: Mutex::default(),
            host_key_verification: HostKeyVerification::default(),
            known_hosts: None,
        })
    }

    /// Set the host key policy for new connections.
    #[must_use]
    pub const fn host_key_verification(mut self, policy: HostKeyVerification) -> Self {
        self.host_key_verification = policy;
        self
    }

    /// Use a specific `known_hosts` file.
    #[must_use]
    pub fn known_hosts(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts = Some(path.into());
        self
    }

    /// Aliases with a cached session, sorted.
    #[must_use]
    pub fn active_aliases(&self) -> Vec<String> {
        let mut aliases: Vec<_> = self.lock().keys().cloned().collect();
        aliases.sort_unstable();
        aliases
    }

    /// Close the session cached for `alias`. Returns whether one existed.
    pub fn disconnect(&self, alias: &str) -> bool {
        let Some(mut session) = self.lock().remove(alias) else {
            return false;
        };
        self.block_on(session.disconnect());
        tracing::debug!(alias = %alias, "Closed SSH session");
        true
    }

    /// Close every cached session.
    pub fn disconnect_all(&self) {
        let sessions: Vec<_> = self.lock().drain().collect();
        for (alias, mut session) in sessions {
            self.block_on(session.disconnect());
            tracing::debug!(alias = %alias, "Closed SSH session");
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SshSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drive `future` on the private runtime.
    ///
    /// Blocking a runtime thread is not allowed, so inside one the future runs
    /// on a scoped helper thread instead.
    fn block_on<F>(&self, future: F) -> F::Output
    where
        F: Future + Send,
        F::Output: Send,
    {
        if Handle::try_current().is_err() {
            return self.handle.block_on(future);
        }
        std::thread::scope(|scope| {
            scope
                .spawn(|| self.handle.block_on(future))
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
        })
    }

    /// Store a session for `alias`, closing any session it displaces.
    fn store(&self, alias: String, session: SshSession) {
        let displaced = self.lock().insert(alias, session);
        if let Some(mut displaced) = displaced {
            tracing::debug!(
                address = %displaced.config().address(),
                "Closing SSH session displaced by a concurrent call"
            );
            self.block_on(displaced.disconnect());
        }
    }

    fn session_config(&self, invocation: &SshInvocation) -> std::result::Result<SshConfig, SshError> {
        let config = SshConfig::from_profile(&invocation.connection, &invocation.login)?
            .host_key_verification(self.host_key_verification);
        Ok(match &self.known_hosts {
            Some(path) => config.known_hosts(path),
            None => config,
        })
    }

    /// Connect, or reuse `cached` when it still reaches the same endpoint.
    async fn checkout(
        config: SshConfig,
        cached: Option<SshSession>,
    ) -> std::result::Result<(SshSession, bool), SshError> {
        if let Some(mut session) = cached {
            if session.is_connected() && session.config().same_endpoint(&config) {
                return Ok((session, true));
            }
            tracing::debug!(
                address = %session.config().address(),
                "Replacing cached SSH session"
            );
            session.disconnect().await;
        }

        let mut session = SshSession::new(config);
        session.connect().await?;
        Ok((session, false))
    }

    async fn run(
        &self,
        invocation: &SshInvocation,
        cached: Option<SshSession>,
    ) -> (CommandResult, Option<SshSession>) {
        let config = match self.session_config(invocation) {
            Ok(config) => config,
            Err(e) => return (failure(&e), cached),
        };

        let (mut session, reused) = match Self::checkout(config.clone(), cached).await {
            Ok(checked_out) => checked_out,
            Err(e) => return (failure(&e), None),
        };

        let command = invocation.command.as_str();
        let options = invocation.options;

        if options.fork {
            return match session.spawn(command).await {
                Ok(()) => (CommandResult::empty(), Some(session)),
                Err(e) => (failure(&e), None),
            };
        }

        let mut attempt = session.exec(command, options.timeout).await;
        if reused && matches!(attempt, Err(SshError::Channel { .. } | SshError::Session { .. })) {
            tracing::debug!(alias = %invocation.connection.alias, "Cached SSH session went stale, reconnecting");
            session = SshSession::new(config);
            if let Err(e) = session.connect().await {
                return (failure(&e), None);
            }
            attempt = session.exec(command, options.timeout).await;
        }

        match attempt {
            Ok(output) if output.timed_out => {
                let limit = options.timeout.unwrap_or_default();
                let mut result = output.into_result();
                result.stderr = SshError::timeout(limit).to_string();
                result.return_code = SshError::timeout(limit).return_code();
                session.disconnect().await;
                (result, None)
            }
            Ok(output) => (output.into_result(), Some(session)),
            Err(e) => (failure(&e), None),
        }
    }

    fn report(invocation: &SshInvocation, result: &CommandResult) {
        let options = invocation.options;
        if options.print_out {
            report::output(result);
        }
        if result.is_success() {
            return;
        }
        if options.print_err {
            report::error_report(invocation, result);
        }
        if options.ignore_err {
            tracing::debug!(
                alias = %invocation.connection.alias,
                return_code = result.return_code,
                "Remote command failed (ignored)"
            );
        } else {
            tracing::error!(
                alias = %invocation.connection.alias,
                host = %invocation.connection.host,
                command = %invocation.command,
                return_code = result.return_code,
                stderr = %result.stderr.trim_end(),
                "Remote command failed"
            );
        }
    }
}

fn failure(error: &SshError) -> CommandResult {
    CommandResult::new("", error.to_string(), error.return_code())
}

impl SshExecutor for SessionExecutor {
    fn execute_ssh_command(&self, invocation: &SshInvocation) -> CommandResult {
        let options = invocation.options;
        if !options.quiet {
            report::issuing(&invocation.command, options.test_mode);
        }
        if options.test_mode {
            return CommandResult::empty();
        }

        if let Err(e) = validate_command(&invocation.command) {
            tracing::warn!(error = %e, "Refusing to send command");
            return CommandResult::new("", e.to_string(), 1);
        }

        let alias = invocation.connection.alias.clone();
        let cached = self.lock().remove(&alias);
        let (result, session) = self.block_on(self.run(invocation, cached));
        if let Some(session) = session {
            self.store(alias, session);
        }

        Self::report(invocation, &result);
        result
    }
}

impl Drop for SessionExecutor {
    fn drop(&mut self) {
        self.disconnect_all();
        // Dropping a runtime blocks, which panics inside async code.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConnectionProfile, Credentials, ExecOptions};

    fn invocation(profile: ConnectionProfile, options: ExecOptions) -> SshInvocation {
        SshInvocation {
            command: "uptime".to_string(),
            connection: profile,
            login: Credentials::new("root", "pw"),
            options,
        }
    }

    #[test]
    fn test_mode_never_connects() {
        let exec = SessionExecutor::new().unwrap();
        let options = ExecOptions {
            quiet: true,
            test_mode: true,
            ..ExecOptions::default()
        };
        let result = exec.execute_ssh_command(&invocation(
            ConnectionProfile::new("203.0.113.1", "os_connection"),
            options,
        ));
        assert_eq!(result, CommandResult::empty());
        assert!(exec.active_aliases().is_empty());
    }

    #[test]
    fn invalid_port_reported() {
        let exec = SessionExecutor::new().unwrap();
        let options = ExecOptions {
            quiet: true,
            ignore_err: true,
            ..ExecOptions::default()
        };
        let result = exec.execute_ssh_command(&invocation(
            ConnectionProfile::new("127.0.0.1", "device_connection").port("telnet"),
            options,
        ));
        assert_eq!(result.return_code, 1);
        assert!(result.stdout.is_empty());
        assert!(result.stderr.contains("telnet"));
    }

    #[test]
    fn disconnect_unknown_alias() {
        let exec = SessionExecutor::new().unwrap();
        assert!(!exec.disconnect("bmc_connection"));
        exec.disconnect_all();
    }

    #[test]
    fn displaced_session_is_replaced() {
        let exec = SessionExecutor::new().unwrap();
        let config = |host: &str| SshConfig::new(host).port(2222);
        exec.store("os_connection".to_string(), SshSession::new(config("os1")));
        exec.store("os_connection".to_string(), SshSession::new(config("os2")));

        assert_eq!(exec.active_aliases(), ["os_connection"]);
        let sessions = exec.lock();
        assert_eq!(sessions["os_connection"].config().host, "os2");
    }

    #[tokio::test]
    async fn usable_on_current_thread_runtime() {
        let exec = SessionExecutor::new().unwrap();
        let options = ExecOptions {
            quiet: true,
            ignore_err: true,
            ..ExecOptions::default()
        };
        let result = exec.execute_ssh_command(&invocation(
            ConnectionProfile::new("127.0.0.1", "os_connection").port("0"),
            options,
        ));
        assert_eq!(result.return_code, 1);
        assert!(!exec.disconnect("os_connection"));
        drop(exec);
    }

    #[tokio::test]
    async fn dropped_on_current_thread_runtime() {
        drop(SessionExecutor::new().unwrap());
    }
}
