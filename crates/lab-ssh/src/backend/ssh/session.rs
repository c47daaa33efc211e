//! SSH session management over russh.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use russh::ChannelMsg;
use russh::client::{self, KeyboardInteractiveAuthResponse};
use russh::keys::PublicKey;

use super::auth::{AuthMethod, HostKeyVerification, SshCredentials};
use super::known_hosts;
use crate::error::SshError;
use crate::types::{CommandResult, ConnectionProfile, Credentials};

/// Connect timeout used when the profile carries none.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Port used when the profile carries none.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Return code reported when the channel closes without an exit status.
const NO_EXIT_STATUS: i32 = 255;

/// SSH session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshConfig {
    /// Host to connect to.
    pub host: String,
    /// Port (default 22).
    pub port: u16,
    /// Credentials.
    pub credentials: SshCredentials,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Host key verification policy.
    pub host_key_verification: HostKeyVerification,
    /// `known_hosts` file; `None` uses the default location.
    pub known_hosts: Option<PathBuf>,
}

impl SshConfig {
    /// Create new config for a host.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            credentials: SshCredentials::new(String::new()),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            host_key_verification: HostKeyVerification::default(),
            known_hosts: None,
        }
    }

    /// Build a config from a connection profile and login.
    ///
    /// The profile's port must parse as a TCP port. A timeout that is not a
    /// positive number of seconds falls back to the default.
    pub fn from_profile(profile: &ConnectionProfile, login: &Credentials) -> Result<Self, SshError> {
        let port = match profile.port.as_deref() {
            None => DEFAULT_SSH_PORT,
            Some(value) => parse_port(value)?,
        };
        let connect_timeout = profile
            .timeout
            .as_deref()
            .map_or(DEFAULT_CONNECT_TIMEOUT, parse_timeout);

        Ok(Self::new(&profile.host)
            .port(port)
            .credentials(SshCredentials::from_login(login))
            .connect_timeout(connect_timeout))
    }

    /// Set port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set credentials.
    #[must_use]
    pub fn credentials(mut self, credentials: SshCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set host key verification.
    #[must_use]
    pub const fn host_key_verification(mut self, policy: HostKeyVerification) -> Self {
        self.host_key_verification = policy;
        self
    }

    /// Set the `known_hosts` file.
    #[must_use]
    pub fn known_hosts(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts = Some(path.into());
        self
    }

    /// Get the address string.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether a session built from `other` would reach the same endpoint as one
    /// built from `self`.
    #[must_use]
    pub fn same_endpoint(&self, other: &Self) -> bool {
        self.host == other.host
            && self.port == other.port
            && self.credentials.username == other.credentials.username
    }
}

fn parse_port(value: &str) -> Result<u16, SshError> {
    value
        .trim()
        .parse::<u16>()
        .ok()
        .filter(|port| *port != 0)
        .ok_or_else(|| SshError::InvalidPort {
            value: value.to_string(),
        })
}

fn parse_timeout(value: &str) -> Duration {
    match value.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => Duration::from_secs_f64(secs),
        _ => {
            tracing::debug!(value = %value, "Ignoring unusable connect timeout");
            DEFAULT_CONNECT_TIMEOUT
        }
    }
}

/// SSH session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SshSessionState {
    /// Not connected.
    Disconnected,
    /// Connecting.
    Connecting,
    /// Authenticating.
    Authenticating,
    /// Connected and ready.
    Connected,
    /// Error state.
    Error,
}

/// Output collected from one exec channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Bytes from the data stream.
    pub stdout: Vec<u8>,
    /// Bytes from extended data stream 1.
    pub stderr: Vec<u8>,
    /// Exit status, if the server sent one.
    pub exit_status: Option<u32>,
    /// Whether the command timeout elapsed before the channel closed.
    pub timed_out: bool,
}

impl ExecOutput {
    fn absorb(&mut self, msg: ChannelMsg) {
        match msg {
            ChannelMsg::Data { data } => self.stdout.extend_from_slice(&data),
            ChannelMsg::ExtendedData { data, ext } if ext == 1 => {
                self.stderr.extend_from_slice(&data);
            }
            ChannelMsg::ExitStatus { exit_status } => self.exit_status = Some(exit_status),
            ChannelMsg::ExitSignal { signal_name, .. } => {
                tracing::debug!(signal = ?signal_name, "Remote command killed by signal");
            }
            _ => {}
        }
    }

    /// Convert to a command result, decoding output lossily as UTF-8.
    #[must_use]
    pub fn into_result(self) -> CommandResult {
        let return_code = self
            .exit_status
            .map_or(NO_EXIT_STATUS, |status| i32::try_from(status).unwrap_or(NO_EXIT_STATUS));
        CommandResult::new(
            String::from_utf8_lossy(&self.stdout),
            String::from_utf8_lossy(&self.stderr),
            return_code,
        )
    }
}

/// Client handler for russh that applies the host key policy.
pub struct SshClientHandler {
    host_key_verification: HostKeyVerification,
    host: String,
    port: u16,
    known_hosts: PathBuf,
}

impl client::Handler for SshClientHandler {
    type Error = russh::Error;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        let accepted = match self.host_key_verification {
            #[cfg(feature = "insecure-skip-verify")]
            HostKeyVerification::AcceptAll => {
                tracing::warn!(
                    host = %self.host,
                    "Accepting server key without verification (INSECURE)"
                );
                true
            }
            HostKeyVerification::RejectUnknown => {
                tracing::debug!(host = %self.host, "Rejecting host key");
                false
            }
            HostKeyVerification::KnownHosts => {
                known_hosts::check(&self.known_hosts, &self.host, self.port, server_public_key)
            }
            HostKeyVerification::Tofu => known_hosts::trust_on_first_use(
                &self.known_hosts,
                &self.host,
                self.port,
                server_public_key,
            ),
        };
        Ok(accepted)
    }
}

type Handle = client::Handle<SshClientHandler>;

async fn authenticate(handle: &mut Handle, credentials: &SshCredentials) -> Result<(), SshError> {
    let username = &credentials.username;

    for method in &credentials.auth_methods {
        tracing::debug!(user = %username, method = method.name(), "Attempting authentication");
        let accepted = match method {
            AuthMethod::Password(password) => {
                match handle.authenticate_password(username, password).await {
                    Ok(result) => result.success(),
                    Err(e) => {
                        tracing::debug!(user = %username, error = %e, "Password authentication error");
                        false
                    }
                }
            }
            AuthMethod::KeyboardInteractive { answer } => {
                keyboard_interactive(handle, username, answer).await
            }
        };

        if accepted {
            tracing::debug!(user = %username, method = method.name(), "Authentication successful");
            return Ok(());
        }
    }

    Err(SshError::authentication(
        username,
        "all authentication methods exhausted",
    ))
}

async fn keyboard_interactive(handle: &mut Handle, username: &str, answer: &str) -> bool {
    let mut response = match handle
        .authenticate_keyboard_interactive_start(username, None)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(user = %username, error = %e, "Keyboard-interactive start error");
            return false;
        }
    };

    loop {
        match response {
            KeyboardInteractiveAuthResponse::Success => return true,
            KeyboardInteractiveAuthResponse::Failure { .. } => return false,
            KeyboardInteractiveAuthResponse::InfoRequest { prompts, .. } => {
                tracing::debug!(
                    user = %username,
                    prompt_count = prompts.len(),
                    "Answering keyboard-interactive prompts"
                );
                let answers = vec![answer.to_string(); prompts.len()];
                response = match handle
                    .authenticate_keyboard_interactive_respond(answers)
                    .await
                {
                    Ok(next) => next,
                    Err(e) => {
                        tracing::debug!(user = %username, error = %e, "Keyboard-interactive response error");
                        return false;
                    }
                };
            }
        }
    }
}

/// One authenticated SSH connection.
pub struct SshSession {
    config: SshConfig,
    state: SshSessionState,
    handle: Option<Handle>,
}

impl std::fmt::Debug for SshSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshSession")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("connected", &self.handle.is_some())
            .finish()
    }
}

impl SshSession {
    /// Create a new, unconnected session.
    #[must_use]
    pub const fn new(config: SshConfig) -> Self {
        Self {
            config,
            state: SshSessionState::Disconnected,
            handle: None,
        }
    }

    /// Get configuration.
    #[must_use]
    pub const fn config(&self) -> &SshConfig {
        &self.config
    }

    /// Get current state.
    #[must_use]
    pub const fn state(&self) -> SshSessionState {
        self.state
    }

    /// Check if connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == SshSessionState::Connected
            && self.handle.as_ref().is_some_and(|h| !h.is_closed())
    }

    /// Connect and authenticate.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP connection or handshake fails or times
    /// out, the host key is refused, or every authentication method fails.
    pub async fn connect(&mut self) -> Result<(), SshError> {
        self.state = SshSessionState::Connecting;

        let handler = SshClientHandler {
            host_key_verification: self.config.host_key_verification,
            host: self.config.host.clone(),
            port: self.config.port,
            known_hosts: self
                .config
                .known_hosts
                .clone()
                .unwrap_or_else(known_hosts::default_path),
        };

        tracing::info!(
            host = %self.config.host,
            port = self.config.port,
            "Connecting to SSH server"
        );

        let connected = tokio::time::timeout(
            self.config.connect_timeout,
            client::connect(
                Arc::new(client::Config::default()),
                (self.config.host.as_str(), self.config.port),
                handler,
            ),
        )
        .await;

        let mut handle = match connected {
            Ok(Ok(handle)) => handle,
            Ok(Err(russh::Error::UnknownKey)) => {
                self.state = SshSessionState::Error;
                return Err(SshError::HostKeyVerification {
                    host: self.config.host.clone(),
                    reason: "server key refused".to_string(),
                });
            }
            Ok(Err(e)) => {
                self.state = SshSessionState::Error;
                return Err(SshError::connection(
                    &self.config.host,
                    self.config.port,
                    e.to_string(),
                ));
            }
            Err(_) => {
                self.state = SshSessionState::Error;
                return Err(SshError::connection(
                    &self.config.host,
                    self.config.port,
                    format!("timed out after {:?}", self.config.connect_timeout),
                ));
            }
        };

        self.state = SshSessionState::Authenticating;
        if let Err(e) = authenticate(&mut handle, &self.config.credentials).await {
            self.state = SshSessionState::Error;
            return Err(e);
        }

        self.state = SshSessionState::Connected;
        self.handle = Some(handle);
        tracing::info!(
            host = %self.config.host,
            user = %self.config.credentials.username,
            "SSH connection established"
        );
        Ok(())
    }

    async fn open_exec(&mut self, command: &str) -> Result<russh::Channel<client::Msg>, SshError> {
        let handle = self
            .handle
            .as_mut()
            .ok_or_else(|| SshError::session("not connected"))?;

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| SshError::channel(e.to_string()))?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| SshError::channel(e.to_string()))?;
        Ok(channel)
    }

    /// Run a command and collect its output.
    ///
    /// When `timeout` elapses the output gathered so far is returned with
    /// [`ExecOutput::timed_out`] set and the channel is closed.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not connected or the channel
    /// cannot be opened.
    pub async fn exec(
        &mut self,
        command: &str,
        timeout: Option<Duration>,
    ) -> Result<ExecOutput, SshError> {
        let mut channel = self.open_exec(command).await?;
        let mut output = ExecOutput::default();

        let drain = async {
            while let Some(msg) = channel.wait().await {
                output.absorb(msg);
            }
        };
        let finished = match timeout {
            Some(limit) => tokio::time::timeout(limit, drain).await.is_ok(),
            None => {
                drain.await;
                true
            }
        };

        if !finished {
            output.timed_out = true;
            if let Err(e) = channel.close().await {
                tracing::debug!(error = %e, "Failed to close timed out channel");
            }
        }
        Ok(output)
    }

    /// Start a command and return without waiting for it.
    ///
    /// Output is read and discarded by a background task on the current
    /// runtime until the channel closes.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not connected or the channel
    /// cannot be opened.
    pub async fn spawn(&mut self, command: &str) -> Result<(), SshError> {
        let mut channel = self.open_exec(command).await?;
        let command = command.to_string();
        tokio::spawn(async move {
            let mut output = ExecOutput::default();
            while let Some(msg) = channel.wait().await {
                output.absorb(msg);
            }
            tracing::debug!(
                command = %command,
                exit_status = ?output.exit_status,
                "Forked command finished"
            );
        });
        Ok(())
    }

    /// Disconnect from the server.
    pub async fn disconnect(&mut self) {
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle
                .disconnect(russh::Disconnect::ByApplication, "", "en")
                .await
        {
            tracing::debug!(host = %self.config.host, error = %e, "Error during disconnect");
        }
        self.state = SshSessionState::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_bmc_profile() {
        let profile = ConnectionProfile::new("10.1.1.1", "bmc_connection")
            .port("2200")
            .timeout("25.0")
            .prompt("# ");
        let config = SshConfig::from_profile(&profile, &Credentials::new("root", "pw")).unwrap();
        assert_eq!(config.address(), "10.1.1.1:2200");
        assert_eq!(config.connect_timeout, Duration::from_secs(25));
        assert_eq!(config.credentials.username, "root");
        assert_eq!(config.credentials.auth_methods.len(), 2);
    }

    #[test]
    fn config_defaults_without_port_or_timeout() {
        let profile = ConnectionProfile::new("os1", "os_connection");
        let config = SshConfig::from_profile(&profile, &Credentials::new("u", "p")).unwrap();
        assert_eq!(config.port, 22);
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
    }

    #[test]
    fn bad_port_rejected() {
        for port in ["ssh", "0", "70000", "-1"] {
            let profile = ConnectionProfile::new("h", "a").port(port);
            let err = SshConfig::from_profile(&profile, &Credentials::new("u", "p")).unwrap_err();
            assert!(matches!(err, SshError::InvalidPort { .. }), "{port}");
        }
    }

    #[test]
    fn bad_timeout_falls_back() {
        assert_eq!(parse_timeout("soon"), DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(parse_timeout("-3"), DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(parse_timeout("0.5"), Duration::from_millis(500));
    }

    #[test]
    fn same_endpoint_ignores_password() {
        let a = SshConfig::new("h").credentials(SshCredentials::new("u").with_password("1"));
        let b = SshConfig::new("h").credentials(SshCredentials::new("u").with_password("2"));
        assert!(a.same_endpoint(&b));
        assert!(!a.same_endpoint(&b.clone().port(2222)));
    }

    #[test]
    fn exec_output_conversion() {
        let output = ExecOutput {
            stdout: b"up 3 days\n".to_vec(),
            stderr: b"warn\n".to_vec(),
            exit_status: Some(3),
            timed_out: false,
        };
        assert_eq!(
            output.into_result(),
            CommandResult::new("up 3 days\n", "warn\n", 3)
        );
        assert_eq!(ExecOutput::default().into_result().return_code, 255);
    }

    #[test]
    fn new_session_is_disconnected() {
        let session = SshSession::new(SshConfig::new("host"));
        assert_eq!(session.state(), SshSessionState::Disconnected);
        assert!(!session.is_connected());
    }
}
