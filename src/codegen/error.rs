//! Error taxonomy rendering
//!
//! Each error set becomes an inherent impl on the prost enum with `const`
//! accessors, plus `Display` and `std::error::Error`.

use super::{doc_attrs, render_file, rust_type};
use crate::model::{ErrorWrapper, FileErrors};
use crate::GeneratorError;
use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote};

/// Render the error sets of one file
pub fn render(header: &str, errors: &FileErrors) -> Result<String, GeneratorError> {
    let wrappers = errors
        .wrappers
        .iter()
        .map(render_wrapper)
        .collect::<Result<Vec<_>, _>>()?;
    render_file(header, quote! { #(#wrappers)* })
}

fn render_wrapper(wrapper: &ErrorWrapper) -> Result<TokenStream, GeneratorError> {
    let ty = rust_type(&wrapper.rust_path)?;
    let variants: Vec<_> = wrapper
        .errors
        .iter()
        .map(|info| format_ident!("{}", info.variant))
        .collect();

    let statuses = wrapper
        .errors
        .iter()
        .map(|info| int_literal(i64::from(info.status)));
    let codes = wrapper
        .errors
        .iter()
        .map(|info| int_literal(i64::from(info.effective_code())));
    let reasons = wrapper.errors.iter().map(|info| info.effective_reason());
    let messages = wrapper.errors.iter().map(|info| info.effective_message());

    let doc = if wrapper.comment.is_empty() {
        TokenStream::new()
    } else {
        doc_attrs([wrapper.comment.as_str()])
    };

    Ok(quote! {
        #doc
        impl #ty {
            /// Every error of this set, in declaration order
            pub const ERRORS: &'static [Self] = &[#(Self::#variants),*];

            /// HTTP status of the error
            pub const fn status(&self) -> u16 {
                match *self {
                    #(Self::#variants => #statuses,)*
                }
            }

            /// Application error code
            pub const fn code(&self) -> i32 {
                match *self {
                    #(Self::#variants => #codes,)*
                }
            }

            /// Machine-readable reason
            pub const fn reason(&self) -> &'static str {
                match *self {
                    #(Self::#variants => #reasons,)*
                }
            }

            /// Human-readable message, empty when unset
            pub const fn message(&self) -> &'static str {
                match *self {
                    #(Self::#variants => #messages,)*
                }
            }
        }

        impl ::core::fmt::Display for #ty {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                let message = self.message();
                if message.is_empty() {
                    f.write_str(self.reason())
                } else {
                    write!(f, "{}: {}", self.reason(), message)
                }
            }
        }

        impl ::std::error::Error for #ty {}
    })
}

/// An unsuffixed integer literal; negative values become `-N`
fn int_literal(value: i64) -> TokenStream {
    let literal = Literal::u64_unsuffixed(value.unsigned_abs());
    if value < 0 {
        quote! { -#literal }
    } else {
        quote! { #literal }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ErrorInfo;
    use pretty_assertions::assert_eq;

    fn info(name: &str, number: i32, variant: &str, status: u16) -> ErrorInfo {
        ErrorInfo {
            name: name.to_string(),
            number,
            variant: variant.to_string(),
            status,
            code: None,
            reason: None,
            message: None,
        }
    }

    fn common_error() -> FileErrors {
        let mut invalid = info("INVALID_ARGUMENT", 1, "InvalidArgument", 400);
        invalid.reason = Some("BAD_INPUT".to_string());
        invalid.code = Some(1001);
        invalid.message = Some("invalid argument".to_string());
        FileErrors {
            file: "shared/v1/errors.proto".to_string(),
            package: "shared.v1".to_string(),
            wrappers: vec![ErrorWrapper {
                name: "CommonError".to_string(),
                rust_path: "CommonError".to_string(),
                comment: "Errors shared by every service".to_string(),
                errors: vec![info("OK", 0, "Ok", 200), invalid],
            }],
        }
    }

    fn compact(text: &str) -> String {
        text.split_whitespace().collect()
    }

    fn assert_renders(text: &str, expected: &str) {
        assert!(
            compact(text).contains(&compact(expected)),
            "missing `{}` in:\n{}",
            expected,
            text
        );
    }

    #[test]
    fn test_render_common_error() {
        let text = render("", &common_error()).unwrap();
        assert_renders(&text, "/// Errors shared by every service\nimpl CommonError {");
        assert_renders(
            &text,
            "pub const ERRORS: &'static [Self] = &[Self::Ok, Self::InvalidArgument];",
        );
        assert_renders(
            &text,
            "pub const fn status(&self) -> u16 { match *self { \
             Self::Ok => 200, Self::InvalidArgument => 400, } }",
        );
        assert_renders(
            &text,
            "pub const fn code(&self) -> i32 { match *self { \
             Self::Ok => 0, Self::InvalidArgument => 1001, } }",
        );
        assert_renders(&text, "Self::Ok => \"OK\", Self::InvalidArgument => \"BAD_INPUT\",");
        assert_renders(&text, "Self::Ok => \"\", Self::InvalidArgument => \"invalid argument\",");
        assert_renders(&text, "impl ::core::fmt::Display for CommonError {");
        assert_renders(&text, "write!(f, \"{}: {}\", self.reason(), message)");
        assert_renders(&text, "impl ::std::error::Error for CommonError {}");
    }

    #[test]
    fn test_negative_codes() {
        let mut errors = common_error();
        errors.wrappers[0].errors[1].code = Some(-7);
        let text = render("", &errors).unwrap();
        assert_renders(&text, "Self::InvalidArgument => -7,");
    }

    #[test]
    fn test_empty_error_set() {
        let mut errors = common_error();
        errors.wrappers[0].errors.clear();
        errors.wrappers[0].comment.clear();
        let text = render("", &errors).unwrap();
        assert_renders(&text, "pub const ERRORS: &'static [Self] = &[];");
        assert_renders(&text, "match *self {}");
    }

    #[test]
    fn test_nested_enum_path() {
        let mut errors = common_error();
        errors.wrappers[0].rust_path = "get_user_request::Reason".to_string();
        let text = render("", &errors).unwrap();
        assert_renders(&text, "impl get_user_request::Reason {");
    }

    #[test]
    fn test_render_is_deterministic() {
        let errors = common_error();
        assert_eq!(render("", &errors).unwrap(), render("", &errors).unwrap());
    }
}
