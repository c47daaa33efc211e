//! Integration tests for the SSH backend.
//!
//! Nothing here needs a reachable SSH server: the tests cover the paths that
//! end before authentication (test mode, bad ports, refused connections).

#![cfg(feature = "ssh")]

use std::net::TcpListener;
use std::time::Duration;

use lab_ssh::backend::ssh::{AuthMethod, SshConfig, SshCredentials};
use lab_ssh::{
    CommandDispatcher, CommandRequest, CommandResult, ConnectionProfile, Credentials,
    HostKeyVerification, LabConfig, MapStore, SessionExecutor, SshExecutor, SshInvocation,
    types::ExecOptions,
};

fn quiet_options() -> ExecOptions {
    ExecOptions {
        quiet: true,
        ignore_err: true,
        ..ExecOptions::default()
    }
}

/// A local port with nothing listening on it.
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[test]
fn credentials_from_login() {
    let creds = SshCredentials::from_login(&Credentials::new("root", "0penBmc"));
    assert_eq!(creds.username, "root");
    assert_eq!(creds.auth_methods[0], AuthMethod::password("0penBmc"));
    assert_eq!(creds.auth_methods[1].name(), "keyboard-interactive");
}

#[test]
fn ssh_config_builder() {
    let config = SshConfig::new("example.com")
        .port(2222)
        .connect_timeout(Duration::from_secs(60))
        .host_key_verification(HostKeyVerification::KnownHosts)
        .known_hosts("/tmp/known_hosts");

    assert_eq!(config.address(), "example.com:2222");
    assert_eq!(config.connect_timeout, Duration::from_secs(60));
    assert_eq!(config.host_key_verification, HostKeyVerification::KnownHosts);
}

#[test]
fn test_mode_through_dispatcher() {
    let store = MapStore::new()
        .with("OPENBMC_HOST", "203.0.113.10")
        .with("OPENBMC_USERNAME", "root")
        .with("OPENBMC_PASSWORD", "0penBmc");
    let d = CommandDispatcher::new(LabConfig::from_store(&store), SessionExecutor::new().unwrap());

    let result = d.bmc_execute_command(CommandRequest::new("uptime").test_mode(true).quiet(true));
    assert_eq!(result, CommandResult::empty());
    assert!(d.executor().active_aliases().is_empty());
}

#[test]
fn refused_connection_is_transport_failure() {
    let port = closed_port();
    let exec = SessionExecutor::new().unwrap();
    let invocation = SshInvocation {
        command: "uptime".to_string(),
        connection: ConnectionProfile::new("127.0.0.1", "os_connection")
            .port(port.to_string())
            .timeout("5"),
        login: Credentials::new("root", "pw"),
        options: quiet_options(),
    };

    let result = exec.execute_ssh_command(&invocation);
    assert_eq!(result.return_code, 255);
    assert!(result.stdout.is_empty());
    assert!(result.stderr.contains("127.0.0.1"));
    assert!(!result.stderr.contains("pw"));
    assert!(exec.active_aliases().is_empty());
}

#[test]
fn null_byte_command_not_sent() {
    let exec = SessionExecutor::new().unwrap();
    let invocation = SshInvocation {
        command: "echo\0".to_string(),
        connection: ConnectionProfile::new("127.0.0.1", "xcat_connection").port("22"),
        login: Credentials::new("root", "pw"),
        options: quiet_options(),
    };
    let result = exec.execute_ssh_command(&invocation);
    assert_eq!(result.return_code, 1);
    assert!(result.stderr.contains("null byte"));
}

fn closed_port_invocation() -> SshInvocation {
    SshInvocation {
        command: "uptime".to_string(),
        connection: ConnectionProfile::new("127.0.0.1", "device_connection")
            .port(closed_port().to_string()),
        login: Credentials::new("admin", "pw"),
        options: quiet_options(),
    }
}

#[test]
fn executor_usable_inside_multi_thread_runtime() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    let task = rt.spawn(async {
        let exec = SessionExecutor::new().unwrap();
        exec.execute_ssh_command(&closed_port_invocation())
    });
    let result = rt.block_on(task).unwrap();
    assert_eq!(result.return_code, 255);
}

#[tokio::test]
async fn executor_usable_inside_current_thread_runtime() {
    let exec = SessionExecutor::new().unwrap();
    let result = exec.execute_ssh_command(&closed_port_invocation());
    assert_eq!(result.return_code, 255);
    assert!(exec.active_aliases().is_empty());
    drop(exec);
}
