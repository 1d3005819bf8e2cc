//! protoc-gen-sphere library
//!
//! This crate provides the code generation logic behind two protoc plugins:
//!
//! - `protoc-gen-sphere` turns `google.api.http` annotated RPC methods into
//!   axum route bindings (`<file>.sphere.rs`).
//! - `protoc-gen-sphere-errors` turns enums annotated with `sphere.errors`
//!   options into a typed error taxonomy (`<file>.errors.rs`).
//!
//! Both outputs are meant to be `include!`d into the module that holds the
//! prost output for the same protobuf package.

#![deny(warnings)]
#![deny(missing_docs)]

pub mod codegen;
pub mod collector;
pub mod config;
pub mod descriptor;
pub mod generator;
pub mod model;
pub mod options;
pub mod types;

use std::ffi::OsString;

use collector::AggregateError;
use config::{ErrorsConfig, RouteConfig};
use descriptor::DescriptorGraph;
use generator::{ErrorsGenerator, RouteGenerator};
use prost_types::compiler::CodeGeneratorResponse;
use thiserror::Error;

/// Errors that can occur during code generation
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// Failed to decode the plugin request
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Invalid plugin configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A custom option attached to a descriptor could not be interpreted
    #[error("{file}: failed to parse options: {message}")]
    OptionsParseError {
        /// Proto file the option was found in
        file: String,
        /// What went wrong
        message: String,
    },

    /// The annotations of a method do not match its request message
    #[error("{file}: {method}: {message}")]
    SchemaError {
        /// Proto file that declares the method
        file: String,
        /// Fully-qualified method name
        method: String,
        /// What went wrong
        message: String,
    },

    /// A fixed template produced output that is not valid Rust
    #[error("Template error: {0}")]
    TemplateError(String),

    /// Reading the request or writing the response failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Several independent failures, joined in the order they were recorded
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl GeneratorError {
    /// Whether this error aborts the whole run instead of a single file
    pub fn is_fatal(&self) -> bool {
        match self {
            GeneratorError::DecodeError(_)
            | GeneratorError::InvalidConfig(_)
            | GeneratorError::TemplateError(_)
            | GeneratorError::Io(_) => true,
            GeneratorError::OptionsParseError { .. }
            | GeneratorError::SchemaError { .. } => false,
            GeneratorError::Aggregate(errors) => errors.iter().any(GeneratorError::is_fatal),
        }
    }
}

/// Generate route bindings from raw `CodeGeneratorRequest` bytes
///
/// The plugin parameter carried by the request is the only configuration
/// source.
pub fn generate_routes_from_bytes(bytes: &[u8]) -> Result<CodeGeneratorResponse, GeneratorError> {
    generate_routes_with_args(bytes, ["protoc-gen-sphere"])
}

/// Generate route bindings, layering the request parameter over `args`
///
/// `args` are process arguments including the binary name, as passed to
/// [`RouteConfig::from_sources`].
pub fn generate_routes_with_args<I, T>(
    bytes: &[u8],
    args: I,
) -> Result<CodeGeneratorResponse, GeneratorError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let graph = DescriptorGraph::decode(bytes)?;
    let config = RouteConfig::from_sources(args, graph.parameter())?;
    generator::run(&graph, &RouteGenerator::new(config))
}

/// Generate error taxonomies from raw `CodeGeneratorRequest` bytes
pub fn generate_errors_from_bytes(bytes: &[u8]) -> Result<CodeGeneratorResponse, GeneratorError> {
    generate_errors_with_args(bytes, ["protoc-gen-sphere-errors"])
}

/// Generate error taxonomies, layering the request parameter over `args`
pub fn generate_errors_with_args<I, T>(
    bytes: &[u8],
    args: I,
) -> Result<CodeGeneratorResponse, GeneratorError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let graph = DescriptorGraph::decode(bytes)?;
    ErrorsConfig::from_sources(args, graph.parameter())?;
    generator::run(&graph, &ErrorsGenerator)
}

/// Install the stderr `tracing` subscriber used by the plugin binaries
///
/// Filtering follows the `SPHERE_LOG` environment variable and defaults to
/// `warn`. Stdout is reserved for the plugin response.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("SPHERE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Build the response carrying only `error`, for failures that abort the run
pub fn error_response(error: &GeneratorError) -> CodeGeneratorResponse {
    CodeGeneratorResponse {
        error: Some(error.to_string()),
        supported_features: Some(generator::SUPPORTED_FEATURES),
        ..Default::default()
    }
}
