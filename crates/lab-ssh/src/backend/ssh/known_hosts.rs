//! `known_hosts` lookup and trust-on-first-use recording.

use std::io::Write;
use std::path::{Path, PathBuf};

use russh::keys::{HashAlg, PublicKey};

/// Outcome of looking a host up in `known_hosts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KnownHost {
    /// An entry for the host has the same key.
    Match,
    /// Entries for the host exist but none has this key.
    Mismatch,
    /// No entry for the host.
    Unknown,
}

/// The default `known_hosts` path: `$SSH_KNOWN_HOSTS`, else `~/.ssh/known_hosts`.
pub(crate) fn default_path() -> PathBuf {
    if let Ok(path) = std::env::var("SSH_KNOWN_HOSTS") {
        return PathBuf::from(path);
    }

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".ssh").join("known_hosts")
}

/// Host field as OpenSSH writes it: bare for port 22, `[host]:port` otherwise.
pub(crate) fn host_pattern(host: &str, port: u16) -> String {
    if port == 22 {
        host.to_string()
    } else {
        format!("[{host}]:{port}")
    }
}

fn same_key(stored: &PublicKey, server: &PublicKey) -> bool {
    stored.fingerprint(HashAlg::Sha256) == server.fingerprint(HashAlg::Sha256)
}

/// Look a host key up in the contents of a `known_hosts` file.
///
/// Hashed host names and `@` markers are skipped.
pub(crate) fn lookup(contents: &str, host: &str, port: u16, key: &PublicKey) -> KnownHost {
    let pattern = host_pattern(host, port);
    let mut seen = false;

    for line in contents.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line.starts_with('@') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let (Some(hosts), Some(_key_type), Some(key_data)) =
            (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };

        if !hosts.split(',').any(|h| h == pattern || h == "*") {
            continue;
        }

        match russh::keys::parse_public_key_base64(key_data) {
            Ok(stored) if same_key(&stored, key) => return KnownHost::Match,
            Ok(_) => seen = true,
            Err(e) => tracing::debug!(host = %host, error = %e, "Unparsable known_hosts key"),
        }
    }

    if seen {
        KnownHost::Mismatch
    } else {
        KnownHost::Unknown
    }
}

fn read(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read known_hosts");
            String::new()
        }
    }
}

/// Accept the key only if `known_hosts` already has it.
pub(crate) fn check(path: &Path, host: &str, port: u16, key: &PublicKey) -> bool {
    match lookup(&read(path), host, port, key) {
        KnownHost::Match => {
            tracing::debug!(host = %host, "Host key verified against known_hosts");
            true
        }
        KnownHost::Mismatch => {
            tracing::error!(host = %host, "HOST KEY MISMATCH! Possible man-in-the-middle attack!");
            false
        }
        KnownHost::Unknown => {
            tracing::warn!(host = %host, path = %path.display(), "Host not found in known_hosts");
            false
        }
    }
}

/// Accept a known key, record an unknown one, refuse a changed one.
///
/// A key that cannot be recorded is still accepted for this connection.
pub(crate) fn trust_on_first_use(path: &Path, host: &str, port: u16, key: &PublicKey) -> bool {
    match lookup(&read(path), host, port, key) {
        KnownHost::Match => true,
        KnownHost::Mismatch => {
            tracing::error!(host = %host, "HOST KEY MISMATCH! Possible man-in-the-middle attack!");
            false
        }
        KnownHost::Unknown => {
            match append(path, host, port, key) {
                Ok(()) => tracing::info!(
                    host = %host,
                    path = %path.display(),
                    "Added host key to known_hosts (TOFU)"
                ),
                Err(e) => tracing::warn!(
                    host = %host,
                    error = %e,
                    "Failed to record host key, accepting without saving"
                ),
            }
            true
        }
    }
}

/// Key as `type base64`, without the comment.
fn openssh_key(key: &PublicKey) -> String {
    key.to_openssh()
        .unwrap_or_else(|_| format!("{} <encoding-error>", key.algorithm().as_str()))
        .split_whitespace()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ")
}

fn append(path: &Path, host: &str, port: u16, key: &PublicKey) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
        }
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{} {}", host_pattern(host, port), openssh_key(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ED25519: &str = "AAAAC3NzaC1lZDI1NTE5AAAAIOMqqnkVzrm0SdG6UOoqKLsabgH5C9okWi0dh2l9GKJl";
    const OTHER_ED25519: &str = "AAAAC3NzaC1lZDI1NTE5AAAAIKURRtOAd/+ZLrqEzx1emySQc1A+t0hoaZAWFTsDGjj3";

    fn key(data: &str) -> PublicKey {
        russh::keys::parse_public_key_base64(data).unwrap()
    }

    #[test]
    fn pattern_for_port() {
        assert_eq!(host_pattern("bmc1", 22), "bmc1");
        assert_eq!(host_pattern("bmc1", 2200), "[bmc1]:2200");
    }

    #[test]
    fn lookup_outcomes() {
        let contents = format!(
            "# lab hosts\nbmc1,10.1.1.1 ssh-ed25519 {ED25519}\n[sw1]:2222 ssh-ed25519 {ED25519}\n"
        );
        assert_eq!(lookup(&contents, "10.1.1.1", 22, &key(ED25519)), KnownHost::Match);
        assert_eq!(lookup(&contents, "sw1", 2222, &key(ED25519)), KnownHost::Match);
        assert_eq!(lookup(&contents, "sw1", 22, &key(ED25519)), KnownHost::Unknown);
        assert_eq!(
            lookup(&contents, "bmc1", 22, &key(OTHER_ED25519)),
            KnownHost::Mismatch
        );
    }

    #[test]
    fn tofu_records_then_checks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ssh").join("known_hosts");

        assert!(!check(&path, "os1", 22, &key(ED25519)));
        assert!(trust_on_first_use(&path, "os1", 22, &key(ED25519)));
        assert!(check(&path, "os1", 22, &key(ED25519)));
        assert!(!trust_on_first_use(&path, "os1", 22, &key(OTHER_ED25519)));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.starts_with("os1 ssh-ed25519 "));
    }
}
