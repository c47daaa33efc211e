//! SSH authentication methods and host key policy.

use std::fmt;

use crate::types::Credentials;

/// SSH authentication method.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMethod {
    /// Password authentication.
    Password(String),
    /// Keyboard-interactive authentication, giving the same answer to every prompt.
    KeyboardInteractive {
        /// Answer sent for each prompt.
        answer: String,
    },
}

impl AuthMethod {
    /// Create password auth.
    #[must_use]
    pub fn password(password: impl Into<String>) -> Self {
        Self::Password(password.into())
    }

    /// Create keyboard-interactive auth.
    #[must_use]
    pub fn keyboard_interactive(answer: impl Into<String>) -> Self {
        Self::KeyboardInteractive {
            answer: answer.into(),
        }
    }

    /// Method name as used in SSH.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Password(_) => "password",
            Self::KeyboardInteractive { .. } => "keyboard-interactive",
        }
    }
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthMethod::{}(<redacted>)", self.name())
    }
}

/// User name plus the methods to try, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshCredentials {
    /// Username.
    pub username: String,
    /// Authentication methods to try (in order).
    pub auth_methods: Vec<AuthMethod>,
}

impl SshCredentials {
    /// Create credentials with no methods.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            auth_methods: Vec::new(),
        }
    }

    /// Add an authentication method.
    #[must_use]
    pub fn with_auth(mut self, method: AuthMethod) -> Self {
        self.auth_methods.push(method);
        self
    }

    /// Add password authentication.
    #[must_use]
    pub fn with_password(self, password: impl Into<String>) -> Self {
        self.with_auth(AuthMethod::password(password))
    }

    /// Password first, then keyboard-interactive with the same password.
    ///
    /// BMCs and switches often disable plain password auth but answer the
    /// single `Password:` prompt of keyboard-interactive.
    #[must_use]
    pub fn from_login(login: &Credentials) -> Self {
        Self::new(&login.username)
            .with_password(&login.password)
            .with_auth(AuthMethod::keyboard_interactive(&login.password))
    }
}

/// Host key verification policy.
///
/// The default is [`HostKeyVerification::Tofu`]: lab hosts are reinstalled
/// often and rarely pre-seeded in `known_hosts`, but a changed key for a host
/// already recorded is still refused.
///
/// `AcceptAll` is only available with the `insecure-skip-verify` feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum HostKeyVerification {
    /// Accept all keys without verification.
    ///
    /// **DANGEROUS:** allows man-in-the-middle attacks. Only for closed test
    /// networks.
    #[cfg(feature = "insecure-skip-verify")]
    AcceptAll,
    /// Reject every key.
    RejectUnknown,
    /// Accept only keys already in `known_hosts`.
    KnownHosts,
    /// Record unknown keys, reject keys that differ from the record.
    #[default]
    Tofu,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_login_order() {
        let creds = SshCredentials::from_login(&Credentials::new("root", "0penBmc"));
        assert_eq!(creds.username, "root");
        assert_eq!(
            creds.auth_methods,
            vec![
                AuthMethod::password("0penBmc"),
                AuthMethod::keyboard_interactive("0penBmc"),
            ]
        );
    }

    #[test]
    fn debug_hides_secrets() {
        let shown = format!("{:?}", SshCredentials::new("u").with_password("hunter2"));
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("password"));
    }

    #[test]
    fn default_policy_is_tofu() {
        assert_eq!(HostKeyVerification::default(), HostKeyVerification::Tofu);
    }
}
