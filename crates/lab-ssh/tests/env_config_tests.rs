//! Configuration loaded from a file while the environment is set.
//!
//! Kept in its own test binary: it mutates the process environment.

#![allow(unsafe_code)]

use std::io::Write;

use lab_ssh::{CommandDispatcher, LabConfig, RecordingExecutor};

#[test]
fn empty_user_type_in_environment_keeps_file_value() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lab.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(
        br#"
            USER_TYPE = "sudo"

            [openbmc]
            host = "10.1.1.1"
            username = "root"
            password = "0penBmc"
        "#,
    )
    .unwrap();

    // SAFETY: the only test in this binary, so no other thread reads the environment.
    unsafe { std::env::set_var("USER_TYPE", "") };
    let config = LabConfig::load(&path).unwrap();
    assert_eq!(config.user_type.as_deref(), Some("sudo"));
    assert!(config.sudo_enabled());

    let d = CommandDispatcher::new(config, RecordingExecutor::new());
    d.bmc_execute_command("uptime");
    assert_eq!(d.executor().last_invocation().unwrap().command, "sudo uptime");

    // SAFETY: as above.
    unsafe { std::env::set_var("USER_TYPE", "admin") };
    let config = LabConfig::load(&path).unwrap();
    assert_eq!(config.user_type.as_deref(), Some("admin"));
    assert!(!config.sudo_enabled());

    // SAFETY: as above.
    unsafe { std::env::remove_var("USER_TYPE") };
}
