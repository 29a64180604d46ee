use crate::error::CompatibilityError;
use async_trait::async_trait;
use fstone_domain::Environment;
use parking_lot::RwLock;
use std::fmt::Debug;
use std::sync::Arc;

/// Supplies the host description consumed by compatibility checks and flag conditions.
#[async_trait]
pub trait EnvironmentProvider: Debug + Send + Sync {
    async fn environment(&self) -> Result<Environment, CompatibilityError>;
}

/// A fixed environment, replaceable at runtime. Clones share the value.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    environment: Arc<RwLock<Environment>>,
}

impl StaticEnvironment {
    #[must_use]
    pub fn new(environment: Environment) -> Self {
        Self { environment: Arc::new(RwLock::new(environment)) }
    }

    pub fn set(&self, environment: Environment) {
        *self.environment.write() = environment;
    }

    #[must_use]
    pub fn current(&self) -> Environment {
        self.environment.read().clone()
    }
}

#[async_trait]
impl EnvironmentProvider for StaticEnvironment {
    async fn environment(&self) -> Result<Environment, CompatibilityError> {
        Ok(self.current())
    }
}
