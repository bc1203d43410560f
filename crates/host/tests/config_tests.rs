//! Configuration file tests

use host::config::{BackendKind, HostConfig};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_save_and_load_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("devctl.toml");

    let mut config = HostConfig::default();
    config.device.vendor_id = "0x1234".to_string();
    config.device.interface = 2;
    config.transport.backend = BackendKind::Loopback;
    config.transport.timeout_ms = 500;
    config.loopback.interfaces = vec![vec![4], vec![8, 9]];
    config.save(&path).unwrap();

    let loaded = HostConfig::load(Some(path)).unwrap();
    assert_eq!(loaded.device.vendor_id, "0x1234");
    assert_eq!(loaded.device.interface, 2);
    assert_eq!(loaded.transport.backend, BackendKind::Loopback);
    assert_eq!(loaded.loopback.interfaces, vec![vec![4], vec![8, 9]]);

    let session = loaded.session_config().unwrap();
    assert_eq!(session.vendor_id, 0x1234);
    assert_eq!(session.timeout, Duration::from_millis(500));
}

#[test]
fn test_minimal_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("devctl.toml");
    fs::write(
        &path,
        r#"
[device]
vendor_id = "0x20b1"
product_id = "0x0008"
"#,
    )
    .unwrap();

    let config = HostConfig::load(Some(path)).unwrap();
    assert_eq!(config.device.interface, 0);
    assert_eq!(config.device.configuration, 1);
    assert!(config.device.claim_interface);
    assert_eq!(config.transport.timeout_ms, 100);
    assert_eq!(config.transport.backend, BackendKind::Libusb);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_configuration_zero_in_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("devctl.toml");
    fs::write(
        &path,
        r#"
[device]
vendor_id = "0x20b1"
product_id = "0x0008"
configuration = 0
claim_interface = false
"#,
    )
    .unwrap();

    let session = HostConfig::load(Some(path))
        .unwrap()
        .session_config()
        .unwrap();
    assert_eq!(session.configuration, None);
    assert!(!session.claim_interface);
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("devctl.toml");
    fs::write(
        &path,
        r#"
[device]
vendor_id = "20b1"
product_id = "0x0008"
"#,
    )
    .unwrap();

    assert!(HostConfig::load(Some(path)).is_err());
}

#[test]
fn test_unknown_backend_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("devctl.toml");
    fs::write(
        &path,
        r#"
[device]
vendor_id = "0x20b1"
product_id = "0x0008"

[transport]
backend = "serial"
"#,
    )
    .unwrap();

    assert!(HostConfig::load(Some(path)).is_err());
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    assert!(HostConfig::load(Some(dir.path().join("absent.toml"))).is_err());
}

#[test]
fn test_load_with_source_reports_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("devctl.toml");
    HostConfig::default().save(&path).unwrap();

    let (config, source) = HostConfig::load_with_source(Some(path.clone())).unwrap();
    assert_eq!(source, path);
    assert_eq!(config.device.vendor_id, "0x20b1");
}

#[test]
fn test_load_with_source_error_names_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("devctl.toml");
    fs::write(&path, "[device\n").unwrap();

    let err = HostConfig::load_with_source(Some(path.clone())).unwrap_err();
    assert!(format!("{:#}", err).contains(&path.display().to_string()));
}
