use std::borrow::Cow;

#[fstone_derive::fstone_error]
pub enum MigrationError {
    /// Raised by task implementations; the orchestrator records it as a failed result.
    #[error("Migration task failed{}: {message}", format_context(.context))]
    TaskFailed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Duplicate migration task{}: {message}", format_context(.context))]
    DuplicateTask { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Migration serialization error{}: {source}", format_context(.context))]
    Serialize { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("Migration storage error{}: {source}", format_context(.context))]
    Storage { source: fstone_storage::StorageError, context: Option<Cow<'static, str>> },

    #[error("Internal migration error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl MigrationError {
    pub fn task_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::TaskFailed { message: message.into(), context: None }
    }
}
