use fstone_flags::FlagError;
use fstone_integration::IntegrationError;
use fstone_migration::MigrationError;
use fstone_storage::StorageError;
use std::borrow::Cow;

#[fstone_derive::fstone_error]
pub enum PlatformError {
    #[error("Storage error{}: {source}", format_context(.context))]
    Storage { source: StorageError, context: Option<Cow<'static, str>> },

    #[error("Flag error{}: {source}", format_context(.context))]
    Flag { source: FlagError, context: Option<Cow<'static, str>> },

    #[error("Migration error{}: {source}", format_context(.context))]
    Migration { source: MigrationError, context: Option<Cow<'static, str>> },

    #[error("Integration error{}: {source}", format_context(.context))]
    Integration { source: IntegrationError, context: Option<Cow<'static, str>> },

    #[error("Internal platform error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
