#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the workspace crates.
//!
//! * [`macro@fstone_error`] turns a struct-variant enum into a context-aware error type.
//! * [`macro@validation_rule`] attaches static metadata (id, category, severity) to a
//!   validation rule type.
//!
//! Examples are `ignore`d here because the expansions reference downstream crates.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemStruct, parse_macro_input};

/// A high-level attribute macro for defining domain-specific error enums.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]` when missing.
/// * **Context Support**: Generates a companion `...Ext` trait that adds `.context()`
///   to any `Result` that can be converted into this error type.
/// * **Standard Conversions**: Implements `From<T>` for variants containing a `source` field
///   (or a field marked `#[source]`/`#[from]`), enabling the `?` operator for upstream errors.
/// * **Internal Fallback**: Provides `From<&'static str>` and `From<String>` when an
///   `Internal` variant is present.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum**.
/// 2. Variants that support context must include a `context: Option<Cow<'static, str>>` field.
/// 3. Variants wrapping external errors must also carry the context field.
/// 4. Tuple or unit variants are rejected.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[fstone_derive::fstone_error]
/// pub enum StoreError {
///     #[error("IO error{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn read() -> Result<Vec<u8>, StoreError> {
///     std::fs::read("flags.json").context("Reading flag file")
/// }
/// ```
#[proc_macro_attribute]
pub fn fstone_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}

/// Attribute macro that implements `fstone_validation::RuleMetadata` for a rule type.
///
/// # Arguments
///
/// * `id = "..."` - stable rule identifier, also exposed as the associated `ID` constant.
/// * `category = "..."` - one of `dependency`, `compatibility`, `version`, `performance`,
///   `conflict`, `rollout`, `migration`, `browser`, `resources`.
/// * `severity = "..."` - one of `error`, `warning`, `info`; the default severity of the
///   issues the rule reports.
/// * `description = "..."` - optional human readable summary.
///
/// # Example
///
/// ```rust,ignore
/// #[fstone_derive::validation_rule(
///     id = "dependency-chain",
///     category = "dependency",
///     severity = "error",
///     description = "Enabled features only depend on enabled features",
/// )]
/// pub struct DependencyChainRule;
/// ```
#[proc_macro_attribute]
pub fn validation_rule(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::rule::expand_rule(args.into(), input).into()
}
