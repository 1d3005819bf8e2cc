//! Plugin response assembly
//!
//! [`run`] walks the files protoc asked for on a scoped worker pool. Files
//! fail independently: their errors are collected and reported together,
//! while every file that succeeded still lands in the response. Fatal errors
//! abort the run.

use crate::codegen;
use crate::collector::ErrorCollector;
use crate::config::RouteConfig;
use crate::descriptor::{DescriptorGraph, ProtoFile};
use crate::model::{FileErrors, FileRoutes};
use crate::GeneratorError;
use prost_types::compiler::code_generator_response::{Feature, File};
use prost_types::compiler::CodeGeneratorResponse;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tracing::{debug, warn};

/// Features advertised in every response
pub const SUPPORTED_FEATURES: u64 = Feature::Proto3Optional as u64;

/// One rendered output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Output path relative to the plugin's output directory
    pub name: String,
    /// Rendered source
    pub content: String,
}

impl From<GeneratedFile> for File {
    fn from(file: GeneratedFile) -> Self {
        File {
            name: Some(file.name),
            content: Some(file.content),
            ..Default::default()
        }
    }
}

/// Produces at most one output file per proto file
pub trait FileGenerator: Sync {
    /// Plugin name used in headers and logs
    fn name(&self) -> &'static str;

    /// Generate the output for `file`, or `None` when there is nothing to emit
    fn generate_file(
        &self,
        graph: &DescriptorGraph,
        file: &ProtoFile,
    ) -> Result<Option<GeneratedFile>, GeneratorError>;
}

/// Route bindings (`<stem>.sphere.rs`)
#[derive(Debug, Clone, Default)]
pub struct RouteGenerator {
    config: RouteConfig,
}

impl RouteGenerator {
    /// Create a generator using `config`
    pub fn new(config: RouteConfig) -> Self {
        Self { config }
    }
}

impl FileGenerator for RouteGenerator {
    fn name(&self) -> &'static str {
        "protoc-gen-sphere"
    }

    fn generate_file(
        &self,
        graph: &DescriptorGraph,
        file: &ProtoFile,
    ) -> Result<Option<GeneratedFile>, GeneratorError> {
        let routes = FileRoutes::build(file, &self.config)?;
        if routes.is_empty() {
            return Ok(None);
        }
        let header = codegen::header(self.name(), graph.compiler_version(), &file.name);
        Ok(Some(GeneratedFile {
            name: format!("{}.sphere.rs", file.stem()),
            content: codegen::route::render(&header, &routes)?,
        }))
    }
}

/// Error taxonomies (`<stem>.errors.rs`)
///
/// The plugin takes no options; [`ErrorsConfig`] only validates its
/// parameter.
///
/// [`ErrorsConfig`]: crate::config::ErrorsConfig
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorsGenerator;

impl FileGenerator for ErrorsGenerator {
    fn name(&self) -> &'static str {
        "protoc-gen-sphere-errors"
    }

    fn generate_file(
        &self,
        graph: &DescriptorGraph,
        file: &ProtoFile,
    ) -> Result<Option<GeneratedFile>, GeneratorError> {
        let errors = FileErrors::build(file)?;
        if errors.is_empty() {
            return Ok(None);
        }
        let header = codegen::header(self.name(), graph.compiler_version(), &file.name);
        Ok(Some(GeneratedFile {
            name: format!("{}.errors.rs", file.stem()),
            content: codegen::error::render(&header, &errors)?,
        }))
    }
}

type Outcome = Result<Option<GeneratedFile>, GeneratorError>;

/// Run `generator` over every requested file
///
/// Per-file failures end up in the response's `error` field next to the
/// files that succeeded, in request order. A fatal error is returned as `Err`.
pub fn run<G: FileGenerator>(
    graph: &DescriptorGraph,
    generator: &G,
) -> Result<CodeGeneratorResponse, GeneratorError> {
    let names = graph.files_to_generate();
    let workers = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .min(names.len())
        .max(1);
    let chunk_size = names.len().div_ceil(workers).max(1);
    let aborted = AtomicBool::new(false);

    let outcomes: Vec<Outcome> = thread::scope(|scope| {
        let handles: Vec<_> = names
            .chunks(chunk_size)
            .map(|chunk| {
                let aborted = &aborted;
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|name| {
                            if aborted.load(Ordering::Relaxed) {
                                return Ok(None);
                            }
                            let outcome = generate_one(graph, generator, name);
                            match &outcome {
                                Err(e) if e.is_fatal() => aborted.store(true, Ordering::Relaxed),
                                Err(e) => warn!("{}: {}", name, e),
                                Ok(_) => {}
                            }
                            outcome
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    vec![Err(GeneratorError::TemplateError(
                        "a generator worker panicked".to_string(),
                    ))]
                })
            })
            .collect()
    });

    let errors = ErrorCollector::new();
    let mut file = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(Some(generated)) => {
                debug!("generated {}", generated.name);
                file.push(File::from(generated));
            }
            Ok(None) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => errors.add(e),
        }
    }

    Ok(CodeGeneratorResponse {
        error: errors.into_error().map(|e| e.to_string()),
        supported_features: Some(SUPPORTED_FEATURES),
        file,
        ..Default::default()
    })
}

fn generate_one<G: FileGenerator>(
    graph: &DescriptorGraph,
    generator: &G,
    name: &str,
) -> Result<Option<GeneratedFile>, GeneratorError> {
    let file = graph.file(name)?;
    generator.generate_file(graph, &file)
}
