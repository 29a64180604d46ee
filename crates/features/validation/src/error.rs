use std::borrow::Cow;

#[fstone_derive::fstone_error]
pub enum ValidationError {
    /// A rule could not evaluate the snapshot; the engine reports it as an issue of that rule.
    #[error("Validation rule failed{}: {message}", format_context(.context))]
    RuleFailed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal validation error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl ValidationError {
    pub fn rule_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::RuleFailed { message: message.into(), context: None }
    }
}
