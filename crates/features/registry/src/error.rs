use std::borrow::Cow;

#[fstone_derive::fstone_error]
pub enum RegistryError {
    #[error("Unknown feature{}: {message}", format_context(.context))]
    UnknownFeature { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal registry error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl RegistryError {
    pub(crate) fn unknown(id: &str) -> Self {
        Self::UnknownFeature { message: id.to_owned().into(), context: None }
    }
}
