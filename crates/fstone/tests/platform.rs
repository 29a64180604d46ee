use fstone::compat::StaticEnvironment;
use fstone::domain::config::{PlatformConfig, StorageBackend};
use fstone::domain::constants::{DARK_MODE, ENHANCED_NAVIGATION};
use fstone::domain::{BrowserInfo, Environment, Feature};
use fstone::storage::KeyValueStore;
use fstone::{IntegrationError, Platform};

#[tokio::test]
async fn builtin_catalog_is_registered_by_default() {
    let platform = Platform::builder().build().await.unwrap();

    assert_eq!(platform.available_features().len(), fstone::registry::catalog::builtin_features().len());
    assert!(platform.components().migrations.requires_migration(DARK_MODE));
    assert!(platform.components().registry.enabled_ids().is_empty());
}

#[tokio::test]
async fn custom_catalog_without_builtins() {
    let platform = Platform::builder()
        .builtin_catalog(false)
        .feature(Feature::new("reports", "Reports"))
        .feature(Feature::new("exports", "Exports").depends_on("reports"))
        .build()
        .await
        .unwrap();

    let ids: Vec<_> = platform.available_features().into_iter().map(|f| f.id).collect();
    assert_eq!(ids, vec!["reports", "exports"]);
    assert!(platform.components().migrations.features_requiring_migration().is_empty());
}

#[tokio::test]
async fn injected_environment_drives_compatibility() {
    let legacy = Environment {
        browser: BrowserInfo { name: "firefox".into(), version: "60".into() },
        ..Environment::default()
    };
    let platform = Platform::builder().environment(StaticEnvironment::new(legacy)).build().await.unwrap();

    let err = platform.enable_feature(ENHANCED_NAVIGATION, None).await.unwrap_err();
    assert!(matches!(err, IntegrationError::CompatibilityFailure { .. }));
}

#[tokio::test]
async fn file_backend_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = PlatformConfig::default();
    config.storage.backend = StorageBackend::File;
    config.storage.root = dir.path().to_path_buf();

    {
        let platform = Platform::builder().config(config.clone()).build().await.unwrap();
        assert!(platform.enable_feature(DARK_MODE, Some("u1")).await.unwrap());
    }

    let platform = Platform::builder().config(config).build().await.unwrap();
    assert!(platform.is_feature_enabled(DARK_MODE));
    assert!(!platform.components().migrations.check_needed(DARK_MODE));
    assert_eq!(platform.integration_status()[DARK_MODE].user_id.as_deref(), Some("u1"));

    let preferences = platform.store().get("users/u1/preferences").await.unwrap().unwrap();
    let preferences: serde_json::Value = serde_json::from_str(&preferences).unwrap();
    assert_eq!(preferences["color_scheme"], "auto");
}
