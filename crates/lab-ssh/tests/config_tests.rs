//! Integration tests for configuration handling.

use std::io::Write;

use lab_ssh::{
    CommandDispatcher, ConfigFormat, ConfigStore, FileStore, LabConfig, LayeredStore, LogFormat,
    MapStore, RecordingExecutor, TargetClass,
};

fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

#[test]
fn load_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "lab.toml",
        r#"
            SSH_PORT = 2200
            LOG_FORMAT = "json"

            [openbmc]
            host = "10.1.1.1"
            username = "root"
            password = "0penBmc"

            [device]
            host = "sw1.lab"
            port = 830
        "#,
    );

    let config = LabConfig::load(&path).unwrap();
    assert_eq!(config.bmc.host, "10.1.1.1");
    assert_eq!(config.bmc.port.as_deref(), Some("2200"));
    assert_eq!(config.device.host, "sw1.lab");
    assert_eq!(config.device.port.as_deref(), Some("830"));
    assert_eq!(config.provisioning.port.as_deref(), Some("22"));
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn load_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "lab.json",
        r#"{"xcat": {"host": "xcat.lab", "username": "root", "password": "cluster", "port": 2022}}"#,
    );

    let config = LabConfig::load(&path).unwrap();
    assert_eq!(config.provisioning.host, "xcat.lab");
    assert_eq!(config.provisioning.port.as_deref(), Some("2022"));
}

#[test]
fn load_unknown_extension_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "lab.ini", "OPENBMC_HOST=x\n");
    let err = LabConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("lab.ini"));
}

#[test]
fn load_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = LabConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn malformed_content_fails() {
    assert!(FileStore::parse("[openbmc\nhost=", ConfigFormat::Toml).is_err());
    assert!(FileStore::parse("[1, 2]", ConfigFormat::Json).is_err());
}

#[test]
fn earlier_layer_wins() {
    let store = LayeredStore::new()
        .layer(MapStore::new().with("USER_TYPE", "sudo"))
        .layer(MapStore::new().with("USER_TYPE", "admin").with("OS_HOST", "os1"));

    assert_eq!(store.get("USER_TYPE", ""), "sudo");
    assert_eq!(store.get("OS_HOST", ""), "os1");

    let config = LabConfig::from_store(&store);
    assert!(config.sudo_enabled());
}

#[test]
fn empty_string_in_earlier_layer_still_wins() {
    let store = LayeredStore::new()
        .layer(MapStore::new().with("OPENBMC_HOST", ""))
        .layer(MapStore::new().with("OPENBMC_HOST", "10.1.1.1"));
    let config = LabConfig::from_store(&store);
    assert_eq!(config.bmc.host, "");
}

#[test]
fn config_from_file_drives_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "lab.toml",
        r#"
            [os]
            host = "os.lab"
            username = "admin"
            password = "pw"
        "#,
    );
    let store = FileStore::load(&path).unwrap();
    let d = CommandDispatcher::new(LabConfig::from_store(&store), RecordingExecutor::new());

    d.execute(TargetClass::Os, &"uptime".into());
    let inv = d.executor().last_invocation().unwrap();
    assert_eq!(inv.connection.host, "os.lab");
    assert_eq!(inv.connection.alias, "os_connection");
}

#[test]
fn dispatch_never_mutates_config() {
    let store = MapStore::new()
        .with("OPENBMC_HOST", "10.1.1.1")
        .with("OPENBMC_USERNAME", "root")
        .with("OPENBMC_PASSWORD", "0penBmc");
    let config = LabConfig::from_store(&store);
    let d = CommandDispatcher::new(config.clone(), RecordingExecutor::new());

    d.bmc_execute_command("uptime");
    d.os_execute_command("uptime", &lab_ssh::HostOverrides::none().host("x"));
    assert_eq!(d.config(), &config);
}
