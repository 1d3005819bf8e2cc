//! protoc-gen-sphere-errors - A protoc plugin for generating typed error taxonomies
//!
//! This binary reads a CodeGeneratorRequest from stdin and writes a
//! CodeGeneratorResponse to stdout, following the protoc plugin protocol.

use clap::Parser;
use prost::Message;
use protoc_gen_sphere::config::ErrorsConfig;
use std::io::{self, Read, Write};
use tracing::{debug, error};

fn main() {
    let _ = ErrorsConfig::parse();
    protoc_gen_sphere::init_tracing();

    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let mut buf = Vec::new();
    io::stdin().read_to_end(&mut buf)?;

    let response = protoc_gen_sphere::generate_errors_with_args(&buf, std::env::args_os())
        .unwrap_or_else(|e| protoc_gen_sphere::error_response(&e));

    debug!("generated {} files", response.file.len());
    if let Some(ref err) = response.error {
        error!("{}", err);
    }

    io::stdout().write_all(&response.encode_to_vec())?;
    io::stdout().flush()?;

    Ok(response.error.is_none())
}
