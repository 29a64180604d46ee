use std::borrow::Cow;

#[fstone_derive::fstone_error]
pub enum CompatibilityError {
    /// The environment provider could not describe the host.
    #[error("Environment unavailable{}: {message}", format_context(.context))]
    Environment { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal compatibility error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
