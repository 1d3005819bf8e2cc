//! Protobuf to Rust type mapping
//!
//! Generated code is included next to prost's output, so type names and
//! module paths follow prost's conventions.

use heck::{ToSnakeCase, ToUpperCamelCase};

/// Scalar protobuf field types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// `double`
    Double,
    /// `float`
    Float,
    /// `int32`, `sint32`, `sfixed32`
    Int32,
    /// `int64`, `sint64`, `sfixed64`
    Int64,
    /// `uint32`, `fixed32`
    Uint32,
    /// `uint64`, `fixed64`
    Uint64,
    /// `bool`
    Bool,
    /// `string`
    String,
    /// `bytes`
    Bytes,
}

/// A reference to a named message or enum type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    /// Fully-qualified protobuf name without the leading dot
    pub full_name: String,
    /// Simple name of the type
    pub name: String,
    /// Rust path of the prost type, relative to the referencing package
    pub rust_path: String,
}

/// The type of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// A scalar value
    Scalar(ScalarKind),
    /// An enum, stored by prost as `i32`
    Enum(TypeRef),
    /// A nested message
    Message(TypeRef),
}

/// Mapped Rust type information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedType {
    /// The Rust type as prost declares it for a singular value
    pub rust_type: String,
    /// Swagger parameter type
    pub swagger_type: &'static str,
}

/// Map a field kind to its Rust and swagger types
pub fn map_field_kind(kind: &FieldKind) -> MappedType {
    match kind {
        FieldKind::Scalar(scalar) => {
            let (rust_type, swagger_type) = match scalar {
                ScalarKind::Double => ("f64", "number"),
                ScalarKind::Float => ("f32", "number"),
                ScalarKind::Int32 => ("i32", "integer"),
                ScalarKind::Int64 => ("i64", "integer"),
                ScalarKind::Uint32 => ("u32", "integer"),
                ScalarKind::Uint64 => ("u64", "integer"),
                ScalarKind::Bool => ("bool", "boolean"),
                ScalarKind::String => ("::prost::alloc::string::String", "string"),
                ScalarKind::Bytes => ("::prost::alloc::vec::Vec<u8>", "string"),
            };
            MappedType {
                rust_type: rust_type.to_string(),
                swagger_type,
            }
        }
        FieldKind::Enum(_) => MappedType {
            rust_type: "i32".to_string(),
            swagger_type: "integer",
        },
        FieldKind::Message(type_ref) => MappedType {
            rust_type: type_ref.rust_path.clone(),
            swagger_type: "object",
        },
    }
}

impl FieldKind {
    /// Whether values of this kind can be bound from a URL path segment
    pub fn is_path_bindable(&self) -> bool {
        match self {
            FieldKind::Scalar(ScalarKind::Bool | ScalarKind::Bytes) => false,
            FieldKind::Scalar(_) | FieldKind::Enum(_) => true,
            FieldKind::Message(_) => false,
        }
    }

    /// Whether values of this kind can be bound from a query string
    pub fn is_query_bindable(&self) -> bool {
        match self {
            FieldKind::Scalar(ScalarKind::Bytes) => false,
            FieldKind::Scalar(_) | FieldKind::Enum(_) => true,
            FieldKind::Message(_) => false,
        }
    }
}

/// Rust path of a prost type as seen from code in `from_package`
///
/// `type_package` is the package the type is declared in and `full_name` its
/// fully-qualified name. Nested types live in snake_case modules named after
/// their parent messages, other packages are reached through `super::`.
pub fn rust_type_path(from_package: &str, type_package: &str, full_name: &str) -> String {
    let full_name = full_name.trim_start_matches('.');
    if type_package == "google.protobuf" && from_package != type_package {
        // prost maps the well-known types onto prost-types
        return match full_name {
            "google.protobuf.Empty" => "()".to_string(),
            other => format!(
                "::prost_types::{}",
                other.trim_start_matches("google.protobuf.").replace('.', "::")
            ),
        };
    }
    let relative = if type_package.is_empty() {
        full_name
    } else {
        full_name
            .strip_prefix(type_package)
            .map(|rest| rest.trim_start_matches('.'))
            .unwrap_or(full_name)
    };

    let from: Vec<&str> = split_package(from_package);
    let target: Vec<&str> = split_package(type_package);
    let common = from
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments = vec!["super".to_string(); from.len() - common];
    segments.extend(target[common..].iter().map(|s| s.to_snake_case()));

    let mut names: Vec<&str> = relative.split('.').collect();
    let type_name = names.pop().unwrap_or_default();
    segments.extend(names.iter().map(|parent| parent.to_snake_case()));
    segments.push(type_name.to_upper_camel_case());

    segments.join("::")
}

fn split_package(package: &str) -> Vec<&str> {
    package.split('.').filter(|s| !s.is_empty()).collect()
}

/// Whether `name` is a Rust keyword and needs escaping as an identifier
pub fn is_keyword(name: &str) -> bool {
    matches!(
        name,
        "as" | "break"
            | "const"
            | "continue"
            | "crate"
            | "else"
            | "enum"
            | "extern"
            | "false"
            | "fn"
            | "for"
            | "if"
            | "impl"
            | "in"
            | "let"
            | "loop"
            | "match"
            | "mod"
            | "move"
            | "mut"
            | "pub"
            | "ref"
            | "return"
            | "self"
            | "Self"
            | "static"
            | "struct"
            | "super"
            | "trait"
            | "true"
            | "type"
            | "unsafe"
            | "use"
            | "where"
            | "while"
            | "async"
            | "await"
            | "dyn"
            | "abstract"
            | "become"
            | "box"
            | "do"
            | "final"
            | "macro"
            | "override"
            | "priv"
            | "typeof"
            | "unsized"
            | "virtual"
            | "yield"
            | "try"
            | "gen"
    )
}
