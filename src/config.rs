//! Plugin configuration
//!
//! Flags can be given on the command line or through the protoc plugin
//! parameter (`--sphere_opt=omitempty=false,omitempty_prefix=/v1`). The
//! parameter is applied after the process arguments, so it wins.

use crate::GeneratorError;
use clap::error::ErrorKind;
use clap::{ArgAction, Parser};
use std::ffi::OsString;

/// Swagger auth line emitted for methods that require authentication
pub const DEFAULT_SWAGGER_AUTH_HEADER: &str =
    "@Param Authorization header string false \"Bearer token\"";

/// Configuration of the route binding plugin
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(
    name = "protoc-gen-sphere",
    version,
    about = "Generate axum route bindings from google.api.http annotations",
    args_override_self = true
)]
pub struct RouteConfig {
    /// Skip binding query values equal to their type's default
    #[arg(
        long,
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub omitempty: bool,

    /// Only apply `omitempty` to routes starting with this prefix
    #[arg(long = "omitempty_prefix", default_value = "")]
    pub omitempty_prefix: String,

    /// Swagger line emitted for methods that require authentication
    #[arg(long = "swagger_auth_header", default_value = DEFAULT_SWAGGER_AUTH_HEADER)]
    pub swagger_auth_header: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            omitempty: true,
            omitempty_prefix: String::new(),
            swagger_auth_header: DEFAULT_SWAGGER_AUTH_HEADER.to_string(),
        }
    }
}

impl RouteConfig {
    /// Parse process arguments followed by the plugin parameter
    pub fn from_sources<I, T>(args: I, parameter: Option<&str>) -> Result<Self, GeneratorError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(merge_arguments(args, parameter)).map_err(config_error)
    }

    /// The auth line as it should appear in a doc comment
    ///
    /// Go-style `// ` prefixes from older configurations are stripped.
    pub fn auth_line(&self) -> String {
        normalize_swagger_line(&self.swagger_auth_header)
    }

    /// Whether omit-empty binding applies to a route
    pub fn omit_empty_for(&self, path: &str) -> bool {
        self.omitempty && path.starts_with(&self.omitempty_prefix)
    }
}

/// Configuration of the error taxonomy plugin
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(
    name = "protoc-gen-sphere-errors",
    version,
    about = "Generate typed error taxonomies from sphere.errors enum annotations",
    args_override_self = true
)]
pub struct ErrorsConfig {}

impl ErrorsConfig {
    /// Parse process arguments followed by the plugin parameter
    pub fn from_sources<I, T>(args: I, parameter: Option<&str>) -> Result<Self, GeneratorError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(merge_arguments(args, parameter)).map_err(config_error)
    }
}

/// `--help` and `--version` are handled before stdin is read, so reaching
/// them here means they came in through the plugin parameter
fn config_error(error: clap::Error) -> GeneratorError {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => GeneratorError::InvalidConfig(
            "`help` and `version` cannot be used as plugin parameters".to_string(),
        ),
        _ => GeneratorError::InvalidConfig(error.to_string()),
    }
}

/// Strip comment markers and surrounding whitespace from a swagger line
pub fn normalize_swagger_line(line: &str) -> String {
    line.trim()
        .trim_start_matches('/')
        .trim()
        .to_string()
}

/// Split a plugin parameter into `--key=value` arguments
///
/// Pairs are separated by commas. Keys may carry leading dashes already; a
/// bare key becomes a bare flag.
pub fn parameter_arguments(parameter: &str) -> Vec<String> {
    parameter
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let part = part.trim_start_matches('-');
            match part.split_once('=') {
                Some((key, value)) => format!("--{}={}", key.trim(), value.trim()),
                None => format!("--{}", part),
            }
        })
        .collect()
}

fn merge_arguments<I, T>(args: I, parameter: Option<&str>) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut merged: Vec<OsString> = args.into_iter().map(Into::into).collect();
    if let Some(parameter) = parameter {
        merged.extend(
            parameter_arguments(parameter)
                .into_iter()
                .map(OsString::from),
        );
    }
    merged
}
