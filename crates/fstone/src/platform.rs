use crate::error::{PlatformError, PlatformErrorExt};
use fstone_compat::{CompatibilityChecker, EnvironmentProvider, StaticEnvironment};
use fstone_domain::Feature;
use fstone_domain::config::{PlatformConfig, StorageBackend, StorageSettings};
use fstone_events::EventBus;
use fstone_flags::FlagEvaluator;
use fstone_integration::{Components, Coordinator};
use fstone_migration::{MigrationOrchestrator, MigrationTask};
use fstone_registry::FeatureRegistry;
use fstone_storage::{Compression, FileStore, MemoryStore, SharedStore};
use fstone_validation::ValidationEngine;
use std::ops::Deref;
use std::sync::Arc;
use tracing::info;

/// The assembled platform: configuration, store and a ready [`Coordinator`].
///
/// Constructed once by the entry point and passed around by reference (or cloned; clones share
/// every component). Dereferences to the coordinator.
#[derive(Debug, Clone)]
pub struct Platform {
    config: PlatformConfig,
    store: SharedStore,
    coordinator: Coordinator,
}

impl Platform {
    #[must_use]
    pub fn builder() -> PlatformBuilder {
        PlatformBuilder::new()
    }

    #[must_use]
    pub const fn config(&self) -> &PlatformConfig {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &SharedStore {
        &self.store
    }

    #[must_use]
    pub const fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }
}

impl Deref for Platform {
    type Target = Coordinator;

    fn deref(&self) -> &Self::Target {
        &self.coordinator
    }
}

#[derive(Debug)]
pub struct PlatformBuilder {
    config: PlatformConfig,
    store: Option<SharedStore>,
    environment: Option<Arc<dyn EnvironmentProvider>>,
    builtin_catalog: bool,
    features: Vec<Feature>,
    tasks: Vec<Arc<dyn MigrationTask>>,
}

impl Default for PlatformBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PlatformConfig::default(),
            store: None,
            environment: None,
            builtin_catalog: true,
            features: Vec::new(),
            tasks: Vec::new(),
        }
    }

    #[must_use]
    pub fn config(mut self, config: PlatformConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the store selected by `config.storage`.
    #[must_use]
    pub fn store(mut self, store: SharedStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Defaults to an empty [`StaticEnvironment`].
    #[must_use]
    pub fn environment(mut self, provider: impl EnvironmentProvider + 'static) -> Self {
        self.environment = Some(Arc::new(provider));
        self
    }

    /// Whether the shipped feature and migration catalogs are registered. On by default.
    #[must_use]
    pub const fn builtin_catalog(mut self, enabled: bool) -> Self {
        self.builtin_catalog = enabled;
        self
    }

    #[must_use]
    pub fn feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    #[must_use]
    pub fn task(mut self, task: Arc<dyn MigrationTask>) -> Self {
        self.tasks.push(task);
        self
    }

    /// Wires the components, reloads persisted state and registers the catalogs.
    ///
    /// # Errors
    /// Returns [`PlatformError`] if the store cannot be opened or read, or if a migration task
    /// id is registered twice.
    pub async fn build(self) -> Result<Platform, PlatformError> {
        let Self { config, store, environment, builtin_catalog, mut features, mut tasks } = self;

        let store = match store {
            Some(store) => store,
            None => open_store(&config.storage).await?,
        };
        let environment: Arc<dyn EnvironmentProvider> = match environment {
            Some(provider) => provider,
            None => Arc::new(StaticEnvironment::default()),
        };

        let components = Components {
            registry: FeatureRegistry::new(),
            flags: FlagEvaluator::new(Arc::clone(&store), &config.flags)?,
            compatibility: CompatibilityChecker::new(&config.compatibility),
            migrations: MigrationOrchestrator::new(Arc::clone(&store), &config.migration)?,
            validation: ValidationEngine::new(&config.validation),
            environment,
            events: EventBus::new(),
            store: Arc::clone(&store),
        };
        let coordinator = Coordinator::new(components)?;
        let loaded = coordinator.load().await.context("reload persisted state")?;

        if builtin_catalog {
            features = fstone_registry::catalog::builtin_features().into_iter().chain(features).collect();
            tasks = fstone_migration::catalog::builtin_tasks().into_iter().chain(tasks).collect();
        }
        for task in tasks {
            coordinator.components().migrations.register_task(task)?;
        }
        for feature in features {
            coordinator.register_feature(feature).await.context("register feature")?;
        }

        info!(
            features = coordinator.components().registry.len(),
            flags = loaded.flags,
            states = loaded.states,
            backend = %config.storage.backend,
            "Platform ready"
        );
        Ok(Platform { config, store, coordinator })
    }
}

async fn open_store(settings: &StorageSettings) -> Result<SharedStore, PlatformError> {
    let store: SharedStore = match settings.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File => {
            let compression = if settings.compression { Compression::Lz4 } else { Compression::None };
            let store = FileStore::builder()
                .root(settings.root.clone())
                .compression(compression)
                .connect()
                .await
                .context("open file store")?;
            Arc::new(store)
        },
    };
    Ok(store)
}
