//! Request fixtures shared by the integration tests
//!
//! `prost_types` drops extension fields on encode, so the descriptors that
//! carry custom options are mirrored here with their options typed out.

#![allow(dead_code)]

use prost::Message;
use prost_reflect::DescriptorPool;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, FieldDescriptorProto, OneofDescriptorProto};
use protoc_gen_sphere::options::google_api::{http_rule::Pattern, HttpRule};
use protoc_gen_sphere::options::sphere::ErrorOptions;

#[derive(Clone, PartialEq, Message)]
pub struct FileProto {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub package: Option<String>,
    #[prost(string, repeated, tag = "3")]
    pub dependency: Vec<String>,
    #[prost(message, repeated, tag = "4")]
    pub message_type: Vec<DescriptorProto>,
    #[prost(message, repeated, tag = "5")]
    pub enum_type: Vec<EnumProto>,
    #[prost(message, repeated, tag = "6")]
    pub service: Vec<ServiceProto>,
    #[prost(message, repeated, tag = "7")]
    pub extension: Vec<FieldDescriptorProto>,
    #[prost(string, optional, tag = "12")]
    pub syntax: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ServiceProto {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(message, repeated, tag = "2")]
    pub method: Vec<MethodProto>,
    #[prost(message, optional, tag = "3")]
    pub options: Option<ServiceOptionsExt>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ServiceOptionsExt {
    #[prost(bool, optional, tag = "50101")]
    pub service_auth: Option<bool>,
}

#[derive(Clone, PartialEq, Message)]
pub struct MethodProto {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub input_type: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub output_type: Option<String>,
    #[prost(message, optional, tag = "4")]
    pub options: Option<MethodOptionsExt>,
    #[prost(bool, optional, tag = "5")]
    pub client_streaming: Option<bool>,
    #[prost(bool, optional, tag = "6")]
    pub server_streaming: Option<bool>,
}

#[derive(Clone, PartialEq, Message)]
pub struct MethodOptionsExt {
    #[prost(message, optional, tag = "72295728")]
    pub http: Option<HttpRule>,
    #[prost(bool, optional, tag = "50101")]
    pub auth: Option<bool>,
    #[prost(string, optional, tag = "50102")]
    pub swagger_auth_header: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct EnumProto {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(message, repeated, tag = "2")]
    pub value: Vec<EnumValueProto>,
    #[prost(message, optional, tag = "3")]
    pub options: Option<EnumOptionsExt>,
}

#[derive(Clone, PartialEq, Message)]
pub struct EnumOptionsExt {
    #[prost(int32, optional, tag = "50001")]
    pub default_status: Option<i32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct EnumValueProto {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(int32, optional, tag = "2")]
    pub number: Option<i32>,
    #[prost(message, optional, tag = "3")]
    pub options: Option<EnumValueOptionsExt>,
}

#[derive(Clone, PartialEq, Message)]
pub struct EnumValueOptionsExt {
    #[prost(message, optional, tag = "50002")]
    pub error: Option<ErrorOptions>,
}

#[derive(Clone, PartialEq, Message)]
pub struct RequestFixture {
    #[prost(string, repeated, tag = "1")]
    pub file_to_generate: Vec<String>,
    #[prost(string, optional, tag = "2")]
    pub parameter: Option<String>,
    #[prost(message, optional, tag = "3")]
    pub compiler_version: Option<prost_types::compiler::Version>,
    #[prost(bytes = "vec", repeated, tag = "15")]
    pub proto_file: Vec<Vec<u8>>,
}

/// A serialized `CodeGeneratorRequest` for `files`, with every option proto
/// prepended as a dependency
pub fn request(files: &[FileProto], parameter: Option<&str>) -> Vec<u8> {
    let mut proto_file = vec![
        descriptor_proto(),
        annotations_proto().encode_to_vec(),
        sphere_http_proto().encode_to_vec(),
        sphere_errors_proto().encode_to_vec(),
    ];
    proto_file.extend(files.iter().map(Message::encode_to_vec));

    RequestFixture {
        file_to_generate: files.iter().filter_map(|f| f.name.clone()).collect(),
        parameter: parameter.map(str::to_string),
        compiler_version: Some(prost_types::compiler::Version {
            major: Some(5),
            minor: Some(27),
            patch: Some(1),
            suffix: Some(String::new()),
        }),
        proto_file,
    }
    .encode_to_vec()
}

fn descriptor_proto() -> Vec<u8> {
    DescriptorPool::global()
        .get_file_by_name("google/protobuf/descriptor.proto")
        .expect("descriptor.proto is a well-known file")
        .file_descriptor_proto()
        .encode_to_vec()
}

pub fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional.into()),
        r#type: Some(ty.into()),
        json_name: Some(name.to_string()),
        ..Default::default()
    }
}

pub fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..field(name, number, Type::Message)
    }
}

pub fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

fn extension(name: &str, number: i32, ty: Type, extendee: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        extendee: Some(extendee.to_string()),
        ..field(name, number, ty)
    }
}

fn annotations_proto() -> FileProto {
    let mut http_rule = vec![field("selector", 1, Type::String)];
    for (name, number) in [("get", 2), ("put", 3), ("post", 4), ("delete", 5), ("patch", 6)] {
        http_rule.push(FieldDescriptorProto {
            oneof_index: Some(0),
            ..field(name, number, Type::String)
        });
    }
    http_rule.push(field("body", 7, Type::String));
    http_rule.push(FieldDescriptorProto {
        oneof_index: Some(0),
        ..message_field("custom", 8, ".google.api.CustomHttpPattern")
    });
    http_rule.push(FieldDescriptorProto {
        label: Some(Label::Repeated.into()),
        ..message_field("additional_bindings", 11, ".google.api.HttpRule")
    });
    http_rule.push(field("response_body", 12, Type::String));

    FileProto {
        name: Some("google/api/annotations.proto".to_string()),
        package: Some("google.api".to_string()),
        dependency: vec!["google/protobuf/descriptor.proto".to_string()],
        message_type: vec![
            DescriptorProto {
                oneof_decl: vec![OneofDescriptorProto {
                    name: Some("pattern".to_string()),
                    ..Default::default()
                }],
                ..message("HttpRule", http_rule)
            },
            message(
                "CustomHttpPattern",
                vec![field("kind", 1, Type::String), field("path", 2, Type::String)],
            ),
        ],
        extension: vec![FieldDescriptorProto {
            type_name: Some(".google.api.HttpRule".to_string()),
            ..extension("http", 72295728, Type::Message, ".google.protobuf.MethodOptions")
        }],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

fn sphere_http_proto() -> FileProto {
    FileProto {
        name: Some("sphere/http/http.proto".to_string()),
        package: Some("sphere.http".to_string()),
        dependency: vec!["google/protobuf/descriptor.proto".to_string()],
        extension: vec![
            extension("auth", 50101, Type::Bool, ".google.protobuf.MethodOptions"),
            extension(
                "swagger_auth_header",
                50102,
                Type::String,
                ".google.protobuf.MethodOptions",
            ),
            extension("service_auth", 50101, Type::Bool, ".google.protobuf.ServiceOptions"),
        ],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

fn sphere_errors_proto() -> FileProto {
    FileProto {
        name: Some("sphere/errors/errors.proto".to_string()),
        package: Some("sphere.errors".to_string()),
        dependency: vec!["google/protobuf/descriptor.proto".to_string()],
        message_type: vec![message(
            "Error",
            vec![
                field("status", 1, Type::Int32),
                field("code", 2, Type::Int32),
                field("reason", 3, Type::String),
                field("message", 4, Type::String),
            ],
        )],
        extension: vec![
            extension("default_status", 50001, Type::Int32, ".google.protobuf.EnumOptions"),
            FieldDescriptorProto {
                type_name: Some(".sphere.errors.Error".to_string()),
                ..extension("options", 50002, Type::Message, ".google.protobuf.EnumValueOptions")
            },
        ],
        syntax: Some("proto2".to_string()),
        ..Default::default()
    }
}

/// An HTTP rule with a pattern and a body selector
pub fn rule(pattern: Pattern, body: &str) -> HttpRule {
    HttpRule {
        body: body.to_string(),
        pattern: Some(pattern),
        ..Default::default()
    }
}

/// A unary method annotated with `http`
pub fn method(name: &str, input: &str, output: &str, http: HttpRule) -> MethodProto {
    MethodProto {
        name: Some(name.to_string()),
        input_type: Some(input.to_string()),
        output_type: Some(output.to_string()),
        options: Some(MethodOptionsExt {
            http: Some(http),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// `user/v1/user.proto`: a user service with a path-bound read, an
/// additional binding and an authenticated create
pub fn user_file() -> FileProto {
    let mut get_rule = rule(Pattern::Get("/v1/users/{id}".to_string()), "");
    get_rule.additional_bindings = vec![rule(Pattern::Get("/v1/accounts/{id}".to_string()), "")];

    let mut create = method(
        "CreateUser",
        ".user.v1.CreateUserRequest",
        ".user.v1.User",
        rule(Pattern::Post("/v1/users".to_string()), "user"),
    );
    if let Some(options) = create.options.as_mut() {
        options.auth = Some(true);
    }

    FileProto {
        name: Some("user/v1/user.proto".to_string()),
        package: Some("user.v1".to_string()),
        dependency: vec![
            "google/api/annotations.proto".to_string(),
            "sphere/http/http.proto".to_string(),
        ],
        message_type: vec![
            message(
                "GetUserRequest",
                vec![field("id", 1, Type::Int64), field("verbose", 2, Type::Bool)],
            ),
            message(
                "CreateUserRequest",
                vec![message_field("user", 1, ".user.v1.User")],
            ),
            message(
                "User",
                vec![field("id", 1, Type::Int64), field("name", 2, Type::String)],
            ),
        ],
        service: vec![ServiceProto {
            name: Some("UserService".to_string()),
            method: vec![
                method("GetUser", ".user.v1.GetUserRequest", ".user.v1.User", get_rule),
                create,
            ],
            ..Default::default()
        }],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

/// `shared/v1/errors.proto`: the `CommonError` taxonomy
pub fn errors_file() -> FileProto {
    let value = |name: &str, number: i32, error: ErrorOptions| EnumValueProto {
        name: Some(name.to_string()),
        number: Some(number),
        options: Some(EnumValueOptionsExt { error: Some(error) }),
    };

    FileProto {
        name: Some("shared/v1/errors.proto".to_string()),
        package: Some("shared.v1".to_string()),
        dependency: vec!["sphere/errors/errors.proto".to_string()],
        enum_type: vec![
            EnumProto {
                name: Some("CommonError".to_string()),
                value: vec![
                    value(
                        "OK",
                        0,
                        ErrorOptions {
                            status: Some(200),
                            ..Default::default()
                        },
                    ),
                    value(
                        "INVALID_ARGUMENT",
                        1,
                        ErrorOptions {
                            status: Some(400),
                            reason: Some("BAD_INPUT".to_string()),
                            code: Some(1001),
                            message: Some("invalid argument".to_string()),
                        },
                    ),
                ],
                ..Default::default()
            },
            EnumProto {
                name: Some("AuthError".to_string()),
                value: vec![EnumValueProto {
                    name: Some("AUTH_ERROR_TOKEN_EXPIRED".to_string()),
                    number: Some(0),
                    ..Default::default()
                }],
                options: Some(EnumOptionsExt {
                    default_status: Some(401),
                }),
            },
            EnumProto {
                name: Some("Color".to_string()),
                value: vec![EnumValueProto {
                    name: Some("COLOR_RED".to_string()),
                    number: Some(0),
                    ..Default::default()
                }],
                ..Default::default()
            },
        ],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}
