//! Descriptor graph loading
//!
//! The plugin request is decoded twice: once through a minimal prost view
//! that keeps every `proto_file` entry as raw bytes, and once through
//! prost-reflect, which builds a [`DescriptorPool`] from those bytes. Decoding
//! from bytes (rather than from `prost_types`) keeps the extension options
//! intact.
//!
//! Everything downstream consumes the typed [`ProtoFile`] view produced here,
//! never prost-reflect directly.

use crate::options::{google_api::HttpRule, sphere::ErrorOptions, Extensions};
use crate::types::{rust_type_path, FieldKind, ScalarKind, TypeRef};
use crate::GeneratorError;
use prost::Message;
use prost_reflect::{
    Cardinality, DescriptorPool, EnumDescriptor, FieldDescriptor, FileDescriptor, Kind,
    MessageDescriptor, MethodDescriptor, ServiceDescriptor,
};
use prost_types::SourceCodeInfo;

/// Raw view of `google.protobuf.compiler.CodeGeneratorRequest`
#[derive(Clone, PartialEq, ::prost::Message)]
struct RawCodeGeneratorRequest {
    #[prost(string, repeated, tag = "1")]
    pub file_to_generate: ::prost::alloc::vec::Vec<String>,
    #[prost(string, optional, tag = "2")]
    pub parameter: Option<String>,
    #[prost(message, optional, tag = "3")]
    pub compiler_version: Option<prost_types::compiler::Version>,
    #[prost(bytes = "vec", repeated, tag = "15")]
    pub proto_file: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}

/// Raw view of `google.protobuf.FileDescriptorSet`
#[derive(Clone, PartialEq, ::prost::Message)]
struct RawFileDescriptorSet {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub file: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}

// Field numbers used to address locations in `SourceCodeInfo`
const FILE_MESSAGE_TYPE: i32 = 4;
const FILE_ENUM_TYPE: i32 = 5;
const FILE_SERVICE: i32 = 6;
const MESSAGE_NESTED_TYPE: i32 = 3;
const MESSAGE_ENUM_TYPE: i32 = 4;
const SERVICE_METHOD: i32 = 2;

/// Read-only view of everything one plugin invocation can see
#[derive(Debug, Clone)]
pub struct DescriptorGraph {
    pool: DescriptorPool,
    extensions: Extensions,
    files_to_generate: Vec<String>,
    parameter: Option<String>,
    compiler_version: Option<String>,
}

impl DescriptorGraph {
    /// Decode a serialized `CodeGeneratorRequest`
    pub fn decode(bytes: &[u8]) -> Result<Self, GeneratorError> {
        let request = RawCodeGeneratorRequest::decode(bytes).map_err(|e| {
            GeneratorError::DecodeError(format!("failed to decode CodeGeneratorRequest: {}", e))
        })?;

        let set = RawFileDescriptorSet {
            file: request.proto_file,
        };
        let pool = DescriptorPool::decode(set.encode_to_vec().as_slice()).map_err(|e| {
            GeneratorError::DecodeError(format!("failed to build descriptor pool: {}", e))
        })?;

        for name in &request.file_to_generate {
            if pool.get_file_by_name(name).is_none() {
                return Err(GeneratorError::DecodeError(format!(
                    "file to generate `{}` is missing from the request",
                    name
                )));
            }
        }

        let compiler_version = request.compiler_version.map(|v| {
            let suffix = if v.suffix().is_empty() {
                String::new()
            } else {
                format!("-{}", v.suffix())
            };
            format!("v{}.{}.{}{}", v.major(), v.minor(), v.patch(), suffix)
        });

        Ok(Self {
            extensions: Extensions::resolve(&pool),
            pool,
            files_to_generate: request.file_to_generate,
            parameter: request.parameter,
            compiler_version,
        })
    }

    /// The plugin parameter string, if protoc passed one
    pub fn parameter(&self) -> Option<&str> {
        self.parameter.as_deref().filter(|p| !p.is_empty())
    }

    /// Files protoc asked us to generate for, in request order
    pub fn files_to_generate(&self) -> &[String] {
        &self.files_to_generate
    }

    /// Whether generation is enabled for `name`
    pub fn is_generated(&self, name: &str) -> bool {
        self.files_to_generate.iter().any(|f| f == name)
    }

    /// Version of the invoking compiler, formatted like `v5.27.1`
    pub fn compiler_version(&self) -> Option<&str> {
        self.compiler_version.as_deref()
    }

    /// Translate one file into its typed view
    ///
    /// Options that cannot be interpreted fail this file only.
    pub fn file(&self, name: &str) -> Result<ProtoFile, GeneratorError> {
        let file = self.pool.get_file_by_name(name).ok_or_else(|| {
            GeneratorError::DecodeError(format!("unknown file `{}`", name))
        })?;
        FileLoader {
            extensions: &self.extensions,
            file: &file,
            source_info: file.file_descriptor_proto().source_code_info.as_ref(),
        }
        .load()
    }
}

/// A proto file with the parts the generators need
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoFile {
    /// Path of the file as given to protoc, e.g. `api/user/v1/user.proto`
    pub name: String,
    /// Protobuf package
    pub package: String,
    /// Services in declaration order
    pub services: Vec<Service>,
    /// Top-level and nested enums in declaration order
    pub enums: Vec<ProtoEnum>,
}

impl ProtoFile {
    /// File name without the `.proto` extension
    pub fn stem(&self) -> &str {
        self.name.strip_suffix(".proto").unwrap_or(&self.name)
    }
}

/// A service declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    /// Simple name, e.g. `UserService`
    pub name: String,
    /// Fully-qualified name, e.g. `user.v1.UserService`
    pub full_name: String,
    /// Leading comment
    pub comment: String,
    /// `(sphere.http.service_auth)`
    pub auth: bool,
    /// Methods in declaration order
    pub methods: Vec<Method>,
}

/// An RPC method declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    /// Simple name, e.g. `GetUser`
    pub name: String,
    /// Fully-qualified name, e.g. `user.v1.UserService.GetUser`
    pub full_name: String,
    /// Leading comment
    pub comment: String,
    /// Request message, with its fields
    pub input: MessageInfo,
    /// Response message, with its fields
    pub output: MessageInfo,
    /// `(google.api.http)`
    pub http_rule: Option<HttpRule>,
    /// `(sphere.http.auth)`
    pub auth: bool,
    /// `(sphere.http.swagger_auth_header)`
    pub auth_header: Option<String>,
    /// Whether the client streams requests
    pub client_streaming: bool,
    /// Whether the server streams responses
    pub server_streaming: bool,
}

/// A message and its fields
#[derive(Debug, Clone, PartialEq)]
pub struct MessageInfo {
    /// The message type
    pub type_ref: TypeRef,
    /// Fields in declaration order
    pub fields: Vec<FieldInfo>,
}

impl MessageInfo {
    /// Look a top-level field up by its protobuf name
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// How a field stores its value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldLabel {
    /// Plain value; prost wraps singular messages in `Option`
    Singular,
    /// Explicit presence (`optional`), stored as `Option<T>`
    Optional,
    /// `repeated`, stored as `Vec<T>`
    Repeated,
    /// `map<K, V>`, stored as `HashMap<K, V>`
    Map {
        /// Key type
        key: Box<FieldKind>,
        /// Value type
        value: Box<FieldKind>,
    },
}

/// A message field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Protobuf field name
    pub name: String,
    /// Field number
    pub number: u32,
    /// Value type
    pub kind: FieldKind,
    /// Storage shape
    pub label: FieldLabel,
    /// Name of the enclosing (non-synthetic) oneof
    pub oneof: Option<String>,
}

/// An enum declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoEnum {
    /// Simple name, e.g. `CommonError`
    pub name: String,
    /// Fully-qualified name
    pub full_name: String,
    /// Rust path of the prost enum from the file's package
    pub rust_path: String,
    /// Leading comment
    pub comment: String,
    /// `(sphere.errors.default_status)`
    pub default_status: Option<i32>,
    /// Values in declaration order
    pub values: Vec<ProtoEnumValue>,
}

impl ProtoEnum {
    /// Whether the enum is annotated as an error set
    pub fn is_error_set(&self) -> bool {
        self.default_status.is_some() || self.values.iter().any(|v| v.error.is_some())
    }
}

/// An enum value
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoEnumValue {
    /// Identifier, e.g. `USER_NOT_FOUND`
    pub name: String,
    /// Numeric value
    pub number: i32,
    /// `(sphere.errors.options)`
    pub error: Option<ErrorOptions>,
}

struct FileLoader<'a> {
    extensions: &'a Extensions,
    file: &'a FileDescriptor,
    source_info: Option<&'a SourceCodeInfo>,
}

impl FileLoader<'_> {
    fn load(&self) -> Result<ProtoFile, GeneratorError> {
        let services = self
            .file
            .services()
            .enumerate()
            .map(|(i, service)| self.load_service(i, &service))
            .collect::<Result<Vec<_>, _>>()?;

        let mut enums = Vec::new();
        for (i, enum_desc) in self.file.enums().enumerate() {
            enums.push(self.load_enum(&enum_desc, vec![FILE_ENUM_TYPE, i as i32])?);
        }
        for (i, message) in self.file.messages().enumerate() {
            self.collect_nested_enums(&message, vec![FILE_MESSAGE_TYPE, i as i32], &mut enums)?;
        }

        Ok(ProtoFile {
            name: self.file.name().to_string(),
            package: self.file.package_name().to_string(),
            services,
            enums,
        })
    }

    fn load_service(
        &self,
        index: usize,
        service: &ServiceDescriptor,
    ) -> Result<Service, GeneratorError> {
        let path = vec![FILE_SERVICE, index as i32];
        let auth = self
            .extensions
            .service_auth(&service.options())
            .map_err(|e| self.options_error(e))?;

        let methods = service
            .methods()
            .enumerate()
            .map(|(i, method)| {
                let mut method_path = path.clone();
                method_path.extend([SERVICE_METHOD, i as i32]);
                self.load_method(&method, &method_path)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Service {
            name: service.name().to_string(),
            full_name: service.full_name().to_string(),
            comment: self.leading_comment(&path),
            auth,
            methods,
        })
    }

    fn load_method(
        &self,
        method: &MethodDescriptor,
        path: &[i32],
    ) -> Result<Method, GeneratorError> {
        let options = method.options();
        let http_rule = self
            .extensions
            .http_rule(&options)
            .map_err(|e| self.options_error(format!("{}: {}", method.full_name(), e)))?;
        let auth = self
            .extensions
            .method_auth(&options)
            .map_err(|e| self.options_error(format!("{}: {}", method.full_name(), e)))?;
        let auth_header = self
            .extensions
            .swagger_auth_header(&options)
            .map_err(|e| self.options_error(format!("{}: {}", method.full_name(), e)))?;

        Ok(Method {
            name: method.name().to_string(),
            full_name: method.full_name().to_string(),
            comment: self.leading_comment(path),
            input: self.message_info(&method.input()),
            output: self.message_info(&method.output()),
            http_rule,
            auth,
            auth_header,
            client_streaming: method.is_client_streaming(),
            server_streaming: method.is_server_streaming(),
        })
    }

    fn message_info(&self, message: &MessageDescriptor) -> MessageInfo {
        MessageInfo {
            type_ref: self.message_ref(message),
            fields: message.fields().map(|f| self.field_info(&f)).collect(),
        }
    }

    fn collect_nested_enums(
        &self,
        message: &MessageDescriptor,
        path: Vec<i32>,
        enums: &mut Vec<ProtoEnum>,
    ) -> Result<(), GeneratorError> {
        if message.is_map_entry() {
            return Ok(());
        }
        for (i, enum_desc) in message.child_enums().enumerate() {
            let mut enum_path = path.clone();
            enum_path.extend([MESSAGE_ENUM_TYPE, i as i32]);
            enums.push(self.load_enum(&enum_desc, enum_path)?);
        }
        for (i, nested) in message.child_messages().enumerate() {
            let mut nested_path = path.clone();
            nested_path.extend([MESSAGE_NESTED_TYPE, i as i32]);
            self.collect_nested_enums(&nested, nested_path, enums)?;
        }
        Ok(())
    }

    fn load_enum(
        &self,
        enum_desc: &EnumDescriptor,
        path: Vec<i32>,
    ) -> Result<ProtoEnum, GeneratorError> {
        let default_status = self
            .extensions
            .default_status(&enum_desc.options())
            .map_err(|e| self.options_error(format!("{}: {}", enum_desc.full_name(), e)))?;
        if let Some(status) = default_status {
            self.check_status(enum_desc.full_name(), status)?;
        }

        let mut values = Vec::new();
        for value in enum_desc.values() {
            let error = self
                .extensions
                .error_options(&value.options())
                .map_err(|e| self.options_error(format!("{}: {}", value.full_name(), e)))?;
            if let Some(status) = error.as_ref().and_then(|e| e.status) {
                self.check_status(value.full_name(), status)?;
            }
            values.push(ProtoEnumValue {
                name: value.name().to_string(),
                number: value.number(),
                error,
            });
        }

        Ok(ProtoEnum {
            name: enum_desc.name().to_string(),
            full_name: enum_desc.full_name().to_string(),
            rust_path: rust_type_path(
                self.file.package_name(),
                enum_desc.package_name(),
                enum_desc.full_name(),
            ),
            comment: self.leading_comment(&path),
            default_status,
            values,
        })
    }

    fn field_info(&self, field: &FieldDescriptor) -> FieldInfo {
        let label = if field.is_map() {
            match field.kind() {
                Kind::Message(entry) => {
                    let key = entry.map_entry_key_field();
                    let value = entry.map_entry_value_field();
                    FieldLabel::Map {
                        key: Box::new(self.field_kind(&key.kind())),
                        value: Box::new(self.field_kind(&value.kind())),
                    }
                }
                _ => FieldLabel::Repeated,
            }
        } else if field.is_list() {
            FieldLabel::Repeated
        } else if field.field_descriptor_proto().proto3_optional()
            || (field.cardinality() == Cardinality::Optional
                && field.supports_presence()
                && field.containing_oneof().is_none()
                && !matches!(field.kind(), Kind::Message(_)))
        {
            FieldLabel::Optional
        } else {
            FieldLabel::Singular
        };

        // proto3 `optional` fields sit in a synthetic oneof; prost does not
        // generate an enum for those.
        let oneof = if field.field_descriptor_proto().proto3_optional() {
            None
        } else {
            field.containing_oneof().map(|o| o.name().to_string())
        };

        FieldInfo {
            name: field.name().to_string(),
            number: field.number(),
            kind: self.field_kind(&field.kind()),
            label,
            oneof,
        }
    }

    fn field_kind(&self, kind: &Kind) -> FieldKind {
        match kind {
            Kind::Double => FieldKind::Scalar(ScalarKind::Double),
            Kind::Float => FieldKind::Scalar(ScalarKind::Float),
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => FieldKind::Scalar(ScalarKind::Int32),
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => FieldKind::Scalar(ScalarKind::Int64),
            Kind::Uint32 | Kind::Fixed32 => FieldKind::Scalar(ScalarKind::Uint32),
            Kind::Uint64 | Kind::Fixed64 => FieldKind::Scalar(ScalarKind::Uint64),
            Kind::Bool => FieldKind::Scalar(ScalarKind::Bool),
            Kind::String => FieldKind::Scalar(ScalarKind::String),
            Kind::Bytes => FieldKind::Scalar(ScalarKind::Bytes),
            Kind::Enum(e) => FieldKind::Enum(TypeRef {
                full_name: e.full_name().to_string(),
                name: e.name().to_string(),
                rust_path: rust_type_path(
                    self.file.package_name(),
                    e.package_name(),
                    e.full_name(),
                ),
            }),
            Kind::Message(m) => FieldKind::Message(self.message_ref(m)),
        }
    }

    fn message_ref(&self, message: &MessageDescriptor) -> TypeRef {
        TypeRef {
            full_name: message.full_name().to_string(),
            name: message.name().to_string(),
            rust_path: rust_type_path(
                self.file.package_name(),
                message.package_name(),
                message.full_name(),
            ),
        }
    }

    fn leading_comment(&self, path: &[i32]) -> String {
        self.source_info
            .and_then(|info| info.location.iter().find(|loc| loc.path == path))
            .and_then(|loc| loc.leading_comments.as_deref())
            .map(|comment| {
                comment
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    }

    fn check_status(&self, owner: &str, status: i32) -> Result<(), GeneratorError> {
        if (100..=599).contains(&status) {
            Ok(())
        } else {
            Err(self.options_error(format!(
                "{}: status {} is not a valid HTTP status code",
                owner, status
            )))
        }
    }

    fn options_error(&self, message: impl Into<String>) -> GeneratorError {
        GeneratorError::OptionsParseError {
            file: self.file.name().to_string(),
            message: message.into(),
        }
    }
}
