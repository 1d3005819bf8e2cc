//! Compiles the demo protos with prost-build, then runs both sphere
//! generators over the same descriptor set.

use prost::Message;
use std::fs;
use std::path::PathBuf;

/// `FileDescriptorSet` with every file kept as raw bytes, so extension
/// options survive the round trip
#[derive(Clone, PartialEq, Message)]
struct RawFileDescriptorSet {
    #[prost(bytes = "vec", repeated, tag = "1")]
    file: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
struct RawCodeGeneratorRequest {
    #[prost(string, repeated, tag = "1")]
    file_to_generate: Vec<String>,
    #[prost(bytes = "vec", repeated, tag = "15")]
    proto_file: Vec<Vec<u8>>,
}

const PROTO: &str = "user/v1/user.proto";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);
    let descriptor_path = out_dir.join("descriptor.bin");

    prost_build::Config::new()
        .file_descriptor_set_path(&descriptor_path)
        .type_attribute(".user.v1", "#[derive(serde::Serialize, serde::Deserialize)]")
        .compile_protos(&[format!("proto/{}", PROTO)], &["proto", "../../proto"])?;

    let set = RawFileDescriptorSet::decode(fs::read(&descriptor_path)?.as_slice())?;
    let request = RawCodeGeneratorRequest {
        file_to_generate: vec![PROTO.to_string()],
        proto_file: set.file,
    }
    .encode_to_vec();

    let responses = [
        protoc_gen_sphere::generate_routes_from_bytes(&request)?,
        protoc_gen_sphere::generate_errors_from_bytes(&request)?,
    ];
    for response in responses {
        if let Some(error) = response.error {
            return Err(error.into());
        }
        for file in response.file {
            let path = out_dir.join(file.name.unwrap_or_default());
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, file.content.unwrap_or_default())?;
        }
    }

    println!("cargo:rerun-if-changed=proto");
    println!("cargo:rerun-if-changed=../../proto");
    println!("cargo:rerun-if-changed=../../src");
    Ok(())
}
