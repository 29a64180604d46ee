use std::borrow::Cow;

/// Errors that can occur while setting up the event bus.
#[fstone_derive::fstone_error]
pub enum EventBusError {
    /// Capacity must be greater than zero.
    #[error("Invalid capacity{}: {message}", format_context(.context))]
    InvalidCapacity { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal event bus error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
