//! Error taxonomy model
//!
//! An enum becomes an error set when it carries `(sphere.errors.default_status)`
//! or any of its values carries `(sphere.errors.options)`.

use crate::descriptor::{ProtoEnum, ProtoEnumValue, ProtoFile};
use crate::GeneratorError;
use heck::ToUpperCamelCase;
use tracing::debug;

/// Status used when neither the value nor the enum sets one
pub const DEFAULT_STATUS: u16 = 500;

/// One error of an error set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Enum value identifier, e.g. `USER_NOT_FOUND`
    pub name: String,
    /// Numeric value
    pub number: i32,
    /// Variant name prost generates for this value
    pub variant: String,
    /// Resolved HTTP status
    pub status: u16,
    /// Explicit application code
    pub code: Option<i32>,
    /// Explicit machine-readable reason
    pub reason: Option<String>,
    /// Explicit human-readable message
    pub message: Option<String>,
}

impl ErrorInfo {
    /// The code, 0 when unset
    pub fn effective_code(&self) -> i32 {
        self.code.unwrap_or(0)
    }

    /// The reason, the identifier when unset
    pub fn effective_reason(&self) -> &str {
        match &self.reason {
            Some(reason) if !reason.is_empty() => reason,
            _ => &self.name,
        }
    }

    /// The message, empty when unset
    pub fn effective_message(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }
}

/// An error set and its errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorWrapper {
    /// Enum name
    pub name: String,
    /// Rust path of the prost enum
    pub rust_path: String,
    /// Leading comment
    pub comment: String,
    /// Errors in declaration order
    pub errors: Vec<ErrorInfo>,
}

/// Error model of one proto file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileErrors {
    /// Proto file name
    pub file: String,
    /// Protobuf package
    pub package: String,
    /// Error sets in declaration order
    pub wrappers: Vec<ErrorWrapper>,
}

impl FileErrors {
    /// Build the error model of `file`
    pub fn build(file: &ProtoFile) -> Result<Self, GeneratorError> {
        let mut wrappers = Vec::new();
        for proto_enum in file.enums.iter().filter(|e| e.is_error_set()) {
            wrappers.push(build_wrapper(&file.name, proto_enum)?);
        }
        debug!("{}: {} error sets", file.name, wrappers.len());
        Ok(Self {
            file: file.name.clone(),
            package: file.package.clone(),
            wrappers,
        })
    }

    /// Whether the file has anything to render
    pub fn is_empty(&self) -> bool {
        self.wrappers.is_empty()
    }
}

fn build_wrapper(file: &str, proto_enum: &ProtoEnum) -> Result<ErrorWrapper, GeneratorError> {
    let enum_status = proto_enum
        .default_status
        .map(|status| checked_status(file, &proto_enum.full_name, status))
        .transpose()?;

    let mut errors: Vec<ErrorInfo> = Vec::with_capacity(proto_enum.values.len());
    for value in &proto_enum.values {
        // prost only generates a variant for the first name of an aliased number
        if errors.iter().any(|e| e.number == value.number) {
            debug!("{}: skipping alias {}", proto_enum.full_name, value.name);
            continue;
        }
        errors.push(build_info(file, proto_enum, value, enum_status)?);
    }

    Ok(ErrorWrapper {
        name: proto_enum.name.clone(),
        rust_path: proto_enum.rust_path.clone(),
        comment: proto_enum.comment.clone(),
        errors,
    })
}

fn build_info(
    file: &str,
    proto_enum: &ProtoEnum,
    value: &ProtoEnumValue,
    enum_status: Option<u16>,
) -> Result<ErrorInfo, GeneratorError> {
    let options = value.error.clone().unwrap_or_default();
    let status = match options.status {
        Some(status) => checked_status(file, &proto_enum.full_name, status)?,
        None => enum_status.unwrap_or(DEFAULT_STATUS),
    };

    Ok(ErrorInfo {
        name: value.name.clone(),
        number: value.number,
        variant: strip_enum_prefix(&camel_case(&proto_enum.name), &camel_case(&value.name)),
        status,
        code: options.code,
        reason: options.reason,
        message: options.message,
    })
}

fn checked_status(file: &str, owner: &str, status: i32) -> Result<u16, GeneratorError> {
    u16::try_from(status)
        .ok()
        .filter(|s| (100..=599).contains(s))
        .ok_or_else(|| GeneratorError::OptionsParseError {
            file: file.to_string(),
            message: format!("{}: status {} is not a valid HTTP status code", owner, status),
        })
}

/// Convert an enum value identifier to UpperCamelCase
///
/// `USER_NOT_FOUND` becomes `UserNotFound`; already converted names are
/// returned unchanged.
pub fn camel_case(name: &str) -> String {
    name.to_upper_camel_case()
}

/// Strip the enum name off a variant the way prost does
///
/// `ErrorCode` + `ErrorCodeNotFound` gives `NotFound`, while `Foo` is not
/// stripped from `Foobar`.
pub fn strip_enum_prefix(prefix: &str, name: &str) -> String {
    match name.strip_prefix(prefix) {
        Some(stripped) if stripped.starts_with(|c: char| c.is_uppercase()) => stripped.to_string(),
        _ => name.to_string(),
    }
}
