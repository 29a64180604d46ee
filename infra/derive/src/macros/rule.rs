use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{Expr, ItemStruct, Lit, LitStr, Meta, MetaNameValue, Token};

const CATEGORIES: &[(&str, &str)] = &[
    ("dependency", "Dependency"),
    ("compatibility", "Compatibility"),
    ("version", "Version"),
    ("performance", "Performance"),
    ("conflict", "Conflict"),
    ("rollout", "Rollout"),
    ("migration", "Migration"),
    ("browser", "Browser"),
    ("resources", "Resources"),
];

const SEVERITIES: &[(&str, &str)] = &[("error", "Error"), ("warning", "Warning"), ("info", "Info")];

#[derive(Default)]
struct RuleArgs {
    id: Option<LitStr>,
    category: Option<LitStr>,
    severity: Option<LitStr>,
    description: Option<LitStr>,
}

pub fn expand_rule(args: TokenStream, input: ItemStruct) -> TokenStream {
    match expand(args, input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error(),
    }
}

fn expand(args: TokenStream, input: ItemStruct) -> Result<TokenStream, syn::Error> {
    let args = parse_args(args)?;

    let id = args
        .id
        .ok_or_else(|| syn::Error::new(Span::call_site(), "validation_rule requires `id`"))?;
    if id.value().trim().is_empty() {
        return Err(syn::Error::new_spanned(&id, "rule id cannot be empty"));
    }
    let category = args
        .category
        .ok_or_else(|| syn::Error::new(Span::call_site(), "validation_rule requires `category`"))?;
    let severity = args.severity.unwrap_or_else(|| LitStr::new("error", Span::call_site()));
    let description = args.description.unwrap_or_else(|| LitStr::new("", Span::call_site()));

    let category_variant = lookup(&category, CATEGORIES, "category")?;
    let severity_variant = lookup(&severity, SEVERITIES, "severity")?;

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let debug = if has_derive(&input, "Debug") { quote! {} } else { quote! { #[derive(Debug)] } };

    Ok(quote! {
        #debug
        #input

        impl #impl_generics #name #ty_generics #where_clause {
            /// Stable identifier of this rule.
            pub const ID: &'static str = #id;
        }

        #[automatically_derived]
        impl #impl_generics ::fstone_validation::RuleMetadata for #name #ty_generics #where_clause {
            fn id(&self) -> &'static str {
                #id
            }

            fn category(&self) -> ::fstone_validation::RuleCategory {
                ::fstone_validation::RuleCategory::#category_variant
            }

            fn severity(&self) -> ::fstone_validation::Severity {
                ::fstone_validation::Severity::#severity_variant
            }

            fn description(&self) -> &'static str {
                #description
            }
        }
    })
}

fn parse_args(args: TokenStream) -> Result<RuleArgs, syn::Error> {
    let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse2(args)?;
    let mut parsed = RuleArgs::default();

    for meta in metas {
        let Meta::NameValue(nv) = meta else {
            return Err(syn::Error::new_spanned(meta, "expected `key = \"value\"` arguments"));
        };
        let value = string_literal(&nv)?;
        let slot = if nv.path.is_ident("id") {
            &mut parsed.id
        } else if nv.path.is_ident("category") {
            &mut parsed.category
        } else if nv.path.is_ident("severity") {
            &mut parsed.severity
        } else if nv.path.is_ident("description") {
            &mut parsed.description
        } else {
            return Err(syn::Error::new_spanned(
                &nv.path,
                "unsupported argument; expected id, category, severity or description",
            ));
        };
        if slot.replace(value).is_some() {
            return Err(syn::Error::new_spanned(&nv.path, "duplicate argument"));
        }
    }

    Ok(parsed)
}

fn string_literal(nv: &MetaNameValue) -> Result<LitStr, syn::Error> {
    if let Expr::Lit(expr) = &nv.value
        && let Lit::Str(lit) = &expr.lit
    {
        return Ok(lit.clone());
    }
    Err(syn::Error::new_spanned(&nv.value, "expected a string literal"))
}

fn lookup(
    lit: &LitStr,
    table: &[(&str, &str)],
    label: &str,
) -> Result<syn::Ident, syn::Error> {
    let value = lit.value();
    table
        .iter()
        .find(|(key, _)| *key == value)
        .map(|(_, variant)| syn::Ident::new(variant, lit.span()))
        .ok_or_else(|| {
            let known = table.iter().map(|(key, _)| *key).collect::<Vec<_>>().join(", ");
            syn::Error::new_spanned(lit, format!("unknown {label} `{value}`; expected one of: {known}"))
        })
}

fn has_derive(input: &ItemStruct, name: &str) -> bool {
    let mut found = false;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("derive")) {
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.segments.last().is_some_and(|s| s.ident == name) {
                found = true;
            }
            Ok(())
        });
    }
    found
}
