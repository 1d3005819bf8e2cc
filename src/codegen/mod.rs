//! Rendering of the models into Rust source
//!
//! Every artifact is built as a `quote!` token stream, parsed back into a
//! `syn::File` and printed with `prettyplease`. A token stream that does not
//! parse is a generator defect and surfaces as [`GeneratorError::TemplateError`].

pub mod error;
pub mod route;

use crate::types::is_keyword;
use crate::GeneratorError;
use proc_macro2::{Ident, Span, TokenStream};
use quote::quote;

/// Version stamped into generated headers
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The comment block every generated file starts with
pub fn header(plugin: &str, compiler_version: Option<&str>, source: &str) -> String {
    format!(
        "// Code generated by {plugin}. DO NOT EDIT.\n\
         // versions:\n\
         // - {plugin} v{version}\n\
         // - protoc {protoc}\n\
         // source: {source}\n\n",
        plugin = plugin,
        version = PLUGIN_VERSION,
        protoc = compiler_version.unwrap_or("(unknown)"),
        source = source,
    )
}

/// Format `tokens` as a Rust file preceded by `header`
pub fn render_file(header: &str, tokens: TokenStream) -> Result<String, GeneratorError> {
    let file = syn::parse2::<syn::File>(tokens).map_err(|e| {
        GeneratorError::TemplateError(format!("generated code does not parse: {}", e))
    })?;
    Ok(format!("{}{}", header, prettyplease::unparse(&file)))
}

/// Parse a Rust type written as a string
pub(crate) fn rust_type(ty: &str) -> Result<syn::Type, GeneratorError> {
    syn::parse_str(ty)
        .map_err(|e| GeneratorError::TemplateError(format!("invalid Rust type `{}`: {}", ty, e)))
}

/// An identifier for a snake_case name, escaped like prost escapes fields
pub(crate) fn field_ident(name: &str) -> Ident {
    match name {
        "self" | "super" | "crate" | "Self" => Ident::new(&format!("{}_", name), Span::call_site()),
        name if is_keyword(name) => Ident::new_raw(name, Span::call_site()),
        name => Ident::new(name, Span::call_site()),
    }
}

/// `#[doc = " line"]` attributes, one per line
pub(crate) fn doc_attrs<'a>(lines: impl IntoIterator<Item = &'a str>) -> TokenStream {
    let attrs = lines.into_iter().map(|line| {
        let text = format!(" {}", line);
        quote! { #[doc = #text] }
    });
    quote! { #(#attrs)* }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header() {
        let header = header("protoc-gen-sphere", Some("v5.27.1"), "user/v1/user.proto");
        assert!(header.starts_with("// Code generated by protoc-gen-sphere. DO NOT EDIT.\n"));
        assert!(header.contains(&format!("// - protoc-gen-sphere v{}\n", PLUGIN_VERSION)));
        assert!(header.contains("// - protoc v5.27.1\n"));
        assert!(header.ends_with("// source: user/v1/user.proto\n\n"));
    }

    #[test]
    fn test_field_ident_escaping() {
        assert_eq!(field_ident("name").to_string(), "name");
        assert_eq!(field_ident("type").to_string(), "r#type");
        assert_eq!(field_ident("self").to_string(), "self_");
    }

    #[test]
    fn test_invalid_tokens_are_template_errors() {
        let err = render_file("", quote! { fn broken() -> }).unwrap_err();
        assert!(matches!(err, GeneratorError::TemplateError(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_render_file() {
        let doc = doc_attrs(["hello"]);
        let text = render_file("// header\n\n", quote! { #doc pub struct A; }).unwrap();
        assert_eq!(text, "// header\n\n/// hello\npub struct A;\n");
    }
}
