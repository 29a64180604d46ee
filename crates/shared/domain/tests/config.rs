use fstone_domain::config::{
    CompatibilityMode, FlagSettings, LoggingSettings, MigrationSettings, PlatformConfig,
    StorageBackend, ValidationSettings,
};
use serde_json::json;

#[test]
fn config_defaults_are_sane() {
    let flags = FlagSettings::default();
    assert_eq!(flags.cache_ttl_seconds, 300);
    assert_eq!(flags.cache_capacity, 10_000);

    let migration = MigrationSettings::default();
    assert!(migration.rollback_on_error);
    assert_eq!(migration.retry_attempts, 0);

    let validation = ValidationSettings::default();
    assert_eq!(
        (validation.cpu_threshold, validation.memory_threshold, validation.network_threshold),
        (8, 8, 6)
    );

    let logging = LoggingSettings::default();
    assert_eq!(logging.level, "info");
    assert!(logging.directory.is_none());

    let cfg = PlatformConfig::default();
    assert_eq!(cfg.compatibility.mode, CompatibilityMode::Lenient);
    assert_eq!(cfg.storage.backend, StorageBackend::Memory);
}

#[test]
fn platform_config_deserializes_partial_documents() {
    let raw = json!({
        "flags": { "cache_ttl_seconds": 60 },
        "compatibility": { "mode": "auto" },
        "storage": { "backend": "file", "root": "/tmp/flagstone", "compression": true },
        "unknown_section": { "ignored": true }
    });

    let cfg: PlatformConfig = serde_json::from_value(raw).expect("config deserialize");
    assert_eq!(cfg.flags.cache_ttl_seconds, 60);
    assert_eq!(cfg.flags.cache_capacity, 10_000);
    assert_eq!(cfg.compatibility.mode, CompatibilityMode::Auto);
    assert_eq!(cfg.storage.backend, StorageBackend::File);
    assert_eq!(cfg.storage.root, std::path::PathBuf::from("/tmp/flagstone"));
    assert!(cfg.migration.rollback_on_error);
}

#[test]
fn clones_are_copy_on_write() {
    let original = PlatformConfig::default();
    let mut changed = original.clone();
    changed.migration.retry_attempts = 2;

    assert_eq!(original.migration.retry_attempts, 0);
    assert_eq!(changed.migration.retry_attempts, 2);
}

#[test]
fn unknown_mode_is_rejected() {
    let raw = json!({ "compatibility": { "mode": "yolo" } });
    assert!(serde_json::from_value::<PlatformConfig>(raw).is_err());
}
