//! Options parsing for the custom protobuf extensions
//!
//! This module handles `(google.api.http)`, `(sphere.http.auth)`,
//! `(sphere.http.service_auth)`, `(sphere.http.swagger_auth_header)`,
//! `(sphere.errors.default_status)` and `(sphere.errors.options)`.
//!
//! Custom protobuf extensions are stored as extension fields in the options
//! messages. The descriptor pool is decoded from the raw request bytes, so
//! prost-reflect resolves those extensions for us; message-typed values are
//! then re-encoded into the typed structs below.

use prost::Message;
use prost_reflect::{DescriptorPool, DynamicMessage, ExtensionDescriptor, Value};

/// Extension name for the HTTP rule attached to methods
pub const HTTP_EXTENSION_NAME: &str = "google.api.http";

/// Extension name for the method-level auth marker
pub const AUTH_EXTENSION_NAME: &str = "sphere.http.auth";

/// Extension name for the service-level auth marker
pub const SERVICE_AUTH_EXTENSION_NAME: &str = "sphere.http.service_auth";

/// Extension name for the per-method swagger auth line override
pub const SWAGGER_AUTH_HEADER_EXTENSION_NAME: &str = "sphere.http.swagger_auth_header";

/// Extension name for the default HTTP status of an error enum
pub const DEFAULT_STATUS_EXTENSION_NAME: &str = "sphere.errors.default_status";

/// Extension name for the metadata of an error enum value
pub const ERROR_EXTENSION_NAME: &str = "sphere.errors.options";

/// Mirror of `google/api/http.proto`
///
/// Only the parts this plugin reads are declared; unknown fields are skipped
/// on decode.
#[allow(missing_docs)]
pub mod google_api {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct HttpRule {
        #[prost(string, tag = "1")]
        pub selector: ::prost::alloc::string::String,
        #[prost(string, tag = "7")]
        pub body: ::prost::alloc::string::String,
        #[prost(string, tag = "12")]
        pub response_body: ::prost::alloc::string::String,
        #[prost(message, repeated, tag = "11")]
        pub additional_bindings: ::prost::alloc::vec::Vec<HttpRule>,
        #[prost(oneof = "http_rule::Pattern", tags = "2, 3, 4, 5, 6, 8")]
        pub pattern: ::core::option::Option<http_rule::Pattern>,
    }

    pub mod http_rule {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Pattern {
            #[prost(string, tag = "2")]
            Get(::prost::alloc::string::String),
            #[prost(string, tag = "3")]
            Put(::prost::alloc::string::String),
            #[prost(string, tag = "4")]
            Post(::prost::alloc::string::String),
            #[prost(string, tag = "5")]
            Delete(::prost::alloc::string::String),
            #[prost(string, tag = "6")]
            Patch(::prost::alloc::string::String),
            #[prost(message, tag = "8")]
            Custom(super::CustomHttpPattern),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CustomHttpPattern {
        #[prost(string, tag = "1")]
        pub kind: ::prost::alloc::string::String,
        #[prost(string, tag = "2")]
        pub path: ::prost::alloc::string::String,
    }
}

/// Mirror of `proto/sphere/errors/errors.proto`
#[allow(missing_docs)]
pub mod sphere {
    /// Metadata of one error enum value; every field tracks presence
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ErrorOptions {
        #[prost(int32, optional, tag = "1")]
        pub status: ::core::option::Option<i32>,
        #[prost(int32, optional, tag = "2")]
        pub code: ::core::option::Option<i32>,
        #[prost(string, optional, tag = "3")]
        pub reason: ::core::option::Option<::prost::alloc::string::String>,
        #[prost(string, optional, tag = "4")]
        pub message: ::core::option::Option<::prost::alloc::string::String>,
    }
}

/// The extensions known to one descriptor pool
///
/// Extensions the request never imports are simply `None`; lookups against
/// them yield "not set".
#[derive(Debug, Clone, Default)]
pub struct Extensions {
    http: Option<ExtensionDescriptor>,
    auth: Option<ExtensionDescriptor>,
    service_auth: Option<ExtensionDescriptor>,
    swagger_auth_header: Option<ExtensionDescriptor>,
    default_status: Option<ExtensionDescriptor>,
    error: Option<ExtensionDescriptor>,
}

impl Extensions {
    /// Resolve every known extension in `pool`
    pub fn resolve(pool: &DescriptorPool) -> Self {
        Self {
            http: pool.get_extension_by_name(HTTP_EXTENSION_NAME),
            auth: pool.get_extension_by_name(AUTH_EXTENSION_NAME),
            service_auth: pool.get_extension_by_name(SERVICE_AUTH_EXTENSION_NAME),
            swagger_auth_header: pool.get_extension_by_name(SWAGGER_AUTH_HEADER_EXTENSION_NAME),
            default_status: pool.get_extension_by_name(DEFAULT_STATUS_EXTENSION_NAME),
            error: pool.get_extension_by_name(ERROR_EXTENSION_NAME),
        }
    }

    /// `(google.api.http)` of a method
    pub fn http_rule(&self, opts: &DynamicMessage) -> Result<Option<google_api::HttpRule>, String> {
        decode_message_extension(opts, self.http.as_ref())
    }

    /// `(sphere.http.auth)` of a method
    pub fn method_auth(&self, opts: &DynamicMessage) -> Result<bool, String> {
        Ok(bool_extension(opts, self.auth.as_ref())?.unwrap_or(false))
    }

    /// `(sphere.http.service_auth)` of a service
    pub fn service_auth(&self, opts: &DynamicMessage) -> Result<bool, String> {
        Ok(bool_extension(opts, self.service_auth.as_ref())?.unwrap_or(false))
    }

    /// `(sphere.http.swagger_auth_header)` of a method
    pub fn swagger_auth_header(&self, opts: &DynamicMessage) -> Result<Option<String>, String> {
        let Some(value) = extension_value(opts, self.swagger_auth_header.as_ref()) else {
            return Ok(None);
        };
        match value {
            Value::String(s) => Ok(Some(s)),
            other => Err(unexpected(SWAGGER_AUTH_HEADER_EXTENSION_NAME, "string", &other)),
        }
    }

    /// `(sphere.errors.default_status)` of an enum
    pub fn default_status(&self, opts: &DynamicMessage) -> Result<Option<i32>, String> {
        let Some(value) = extension_value(opts, self.default_status.as_ref()) else {
            return Ok(None);
        };
        match value {
            Value::I32(n) => Ok(Some(n)),
            other => Err(unexpected(DEFAULT_STATUS_EXTENSION_NAME, "int32", &other)),
        }
    }

    /// `(sphere.errors.options)` of an enum value
    pub fn error_options(
        &self,
        opts: &DynamicMessage,
    ) -> Result<Option<sphere::ErrorOptions>, String> {
        decode_message_extension(opts, self.error.as_ref())
    }
}

fn extension_value(opts: &DynamicMessage, ext: Option<&ExtensionDescriptor>) -> Option<Value> {
    let ext = ext?;
    if !opts.has_extension(ext) {
        return None;
    }
    Some(opts.get_extension(ext).into_owned())
}

fn bool_extension(
    opts: &DynamicMessage,
    ext: Option<&ExtensionDescriptor>,
) -> Result<Option<bool>, String> {
    match extension_value(opts, ext) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(other) => Err(unexpected(
            ext.map(|e| e.full_name()).unwrap_or_default(),
            "bool",
            &other,
        )),
    }
}

/// Decode a message-typed extension into its typed mirror
fn decode_message_extension<T: Message + Default>(
    opts: &DynamicMessage,
    ext: Option<&ExtensionDescriptor>,
) -> Result<Option<T>, String> {
    let Some(value) = extension_value(opts, ext) else {
        return Ok(None);
    };
    let name = ext.map(|e| e.full_name()).unwrap_or_default();
    match value {
        Value::Message(msg) => T::decode(msg.encode_to_vec().as_slice())
            .map(Some)
            .map_err(|e| format!("({}) is malformed: {}", name, e)),
        other => Err(unexpected(name, "message", &other)),
    }
}

fn unexpected(name: &str, expected: &str, got: &Value) -> String {
    format!("({}) should be a {} value, found {:?}", name, expected, got)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_rule_wire_compatibility() {
        let rule = google_api::HttpRule {
            body: "*".to_string(),
            pattern: Some(google_api::http_rule::Pattern::Post("/v1/users".to_string())),
            additional_bindings: vec![google_api::HttpRule {
                pattern: Some(google_api::http_rule::Pattern::Custom(
                    google_api::CustomHttpPattern {
                        kind: "HEAD".to_string(),
                        path: "/v1/users".to_string(),
                    },
                )),
                ..Default::default()
            }],
            ..Default::default()
        };
        let decoded = google_api::HttpRule::decode(rule.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, rule);
    }

    #[test]
    fn test_error_options_presence() {
        let opts = sphere::ErrorOptions {
            code: Some(0),
            ..Default::default()
        };
        let decoded = sphere::ErrorOptions::decode(opts.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.code, Some(0));
        assert_eq!(decoded.status, None);
        assert_eq!(decoded.reason, None);
    }

    #[test]
    fn test_unknown_extensions_resolve_to_none() {
        let extensions = Extensions::resolve(&DescriptorPool::new());
        assert!(extensions.http.is_none());
        assert!(extensions.error.is_none());
    }
}
