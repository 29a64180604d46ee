use std::borrow::Cow;

/// Errors raised while registering, persisting or importing flags.
#[fstone_derive::fstone_error]
pub enum FlagError {
    #[error("Unknown flag{}: {message}", format_context(.context))]
    UnknownFlag { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A condition whose operator does not fit its operand.
    #[error("Invalid condition{}: {message}", format_context(.context))]
    InvalidCondition { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Rollout percentage must be within 0..=100{}: {message}", format_context(.context))]
    InvalidPercentage { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Flag serialization error{}: {source}", format_context(.context))]
    Serialize { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("Flag storage error{}: {source}", format_context(.context))]
    Storage { source: fstone_storage::StorageError, context: Option<Cow<'static, str>> },

    #[error("Internal flag error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl FlagError {
    pub(crate) fn unknown(id: &str) -> Self {
        Self::UnknownFlag { message: id.to_owned().into(), context: None }
    }
}
