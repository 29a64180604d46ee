use fstone_compat::{CompatibilityError, CompatibilityIssue};
use fstone_domain::MigrationResult;
use fstone_flags::FlagError;
use fstone_migration::MigrationError;
use fstone_registry::RegistryError;
use fstone_storage::StorageError;
use std::borrow::Cow;

#[fstone_derive::fstone_error]
pub enum IntegrationError {
    #[error("Unknown feature{}: {message}", format_context(.context))]
    UnknownFeature { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Feature is incompatible with the environment{}: {message}", format_context(.context))]
    CompatibilityFailure {
        message: Cow<'static, str>,
        issues: Vec<CompatibilityIssue>,
        context: Option<Cow<'static, str>>,
    },

    #[error("Feature is still required by enabled features{}: {message}", format_context(.context))]
    DisableBlockedByDependents {
        message: Cow<'static, str>,
        dependents: Vec<String>,
        context: Option<Cow<'static, str>>,
    },

    /// At least one migration task failed; the flag was not committed.
    #[error("Feature migration failed{}: {message}", format_context(.context))]
    MigrationFailed {
        message: Cow<'static, str>,
        results: Vec<MigrationResult>,
        context: Option<Cow<'static, str>>,
    },

    #[error("Flag error{}: {source}", format_context(.context))]
    Flag { source: FlagError, context: Option<Cow<'static, str>> },

    #[error("Registry error{}: {source}", format_context(.context))]
    Registry { source: RegistryError, context: Option<Cow<'static, str>> },

    #[error("Compatibility error{}: {source}", format_context(.context))]
    Compatibility { source: CompatibilityError, context: Option<Cow<'static, str>> },

    #[error("Migration error{}: {source}", format_context(.context))]
    Migration { source: MigrationError, context: Option<Cow<'static, str>> },

    #[error("Storage error{}: {source}", format_context(.context))]
    Storage { source: StorageError, context: Option<Cow<'static, str>> },

    #[error("Serialization error{}: {source}", format_context(.context))]
    Serialize { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("Internal integration error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl IntegrationError {
    pub(crate) fn unknown(id: &str) -> Self {
        Self::UnknownFeature { message: id.to_owned().into(), context: None }
    }
}
