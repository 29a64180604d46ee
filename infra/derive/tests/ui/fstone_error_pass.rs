use fstone_derive::fstone_error;
use std::borrow::Cow;

#[fstone_error]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Unknown flag{}: {message}", format_context(.context))]
    UnknownFlag { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn read_flag() -> Result<Vec<u8>, DemoError> {
    std::fs::read("/definitely/missing/flag.json").context("Reading flag definition")
}

fn main() {
    let err = read_flag().unwrap_err();
    assert!(err.to_string().contains("Reading flag definition"));

    let internal: DemoError = "boom".into();
    assert!(matches!(internal, DemoError::Internal { .. }));

    let tagged: Result<(), DemoError> =
        Err(DemoError::UnknownFlag { message: "dark_mode".into(), context: None });
    let tagged = tagged.context("evaluate").unwrap_err();
    assert_eq!(tagged.to_string(), "Unknown flag (evaluate): dark_mode");
}
