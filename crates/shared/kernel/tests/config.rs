use fstone_domain::config::{CompatibilityMode, StorageBackend};
use fstone_kernel::config::{ConfigError, load_platform_config};
use serial_test::serial;
use std::io::Write;

#[test]
#[serial]
fn defaults_apply_without_file() {
    let cfg = load_platform_config(None::<&str>).expect("defaults should load");
    assert_eq!(cfg.flags.cache_ttl_seconds, 300);
    assert_eq!(cfg.compatibility.mode, CompatibilityMode::Lenient);
}

#[test]
#[serial]
fn toml_file_is_layered_under_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[flags]
cache_ttl_seconds = 30

[compatibility]
mode = "strict"

[storage]
backend = "file"
root = "/var/lib/flagstone"
"#
    )
    .unwrap();

    let cfg = load_platform_config(Some(file.path())).unwrap();
    assert_eq!(cfg.flags.cache_ttl_seconds, 30);
    assert_eq!(cfg.flags.cache_capacity, 10_000);
    assert_eq!(cfg.compatibility.mode, CompatibilityMode::Strict);
    assert_eq!(cfg.storage.backend, StorageBackend::File);
    assert!(cfg.migration.rollback_on_error);
}

#[test]
#[serial]
fn missing_file_is_an_error() {
    let err = load_platform_config(Some("/definitely/not/here.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Config { .. }));
}
