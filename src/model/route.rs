//! Route binding model
//!
//! One [`RouteBinding`] is built per HTTP rule of a method: the primary rule
//! gets index 0 and each entry of `additional_bindings` the next index.

use crate::collector::ErrorCollector;
use crate::config::{normalize_swagger_line, RouteConfig};
use crate::descriptor::{FieldInfo, FieldLabel, Method, ProtoFile, Service};
use crate::model::path::PathTemplate;
use crate::options::google_api::{http_rule::Pattern, HttpRule};
use crate::types::{map_field_kind, FieldKind, TypeRef};
use crate::GeneratorError;
use heck::ToSnakeCase;
use tracing::{debug, warn};

/// HTTP methods a binding can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
    /// `HEAD`, through a custom pattern
    Head,
    /// `OPTIONS`, through a custom pattern
    Options,
    /// `TRACE`, through a custom pattern
    Trace,
}

impl HttpVerb {
    /// Resolve the verb of a custom pattern such as `HEAD`
    pub fn from_custom(kind: &str) -> Option<Self> {
        match kind.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(HttpVerb::Get),
            "POST" => Some(HttpVerb::Post),
            "PUT" => Some(HttpVerb::Put),
            "PATCH" => Some(HttpVerb::Patch),
            "DELETE" => Some(HttpVerb::Delete),
            "HEAD" => Some(HttpVerb::Head),
            "OPTIONS" => Some(HttpVerb::Options),
            "TRACE" => Some(HttpVerb::Trace),
            _ => None,
        }
    }

    /// Upper-case method name
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Head => "HEAD",
            HttpVerb::Options => "OPTIONS",
            HttpVerb::Trace => "TRACE",
        }
    }

    /// Name of the `axum::routing` method router constructor
    pub fn routing_fn(&self) -> &'static str {
        match self {
            HttpVerb::Get => "get",
            HttpVerb::Post => "post",
            HttpVerb::Put => "put",
            HttpVerb::Patch => "patch",
            HttpVerb::Delete => "delete",
            HttpVerb::Head => "head",
            HttpVerb::Options => "options",
            HttpVerb::Trace => "trace",
        }
    }

    /// Whether swagger documents a request body for this verb
    pub fn carries_body(&self) -> bool {
        !matches!(
            self,
            HttpVerb::Get | HttpVerb::Head | HttpVerb::Delete | HttpVerb::Options
        )
    }
}

/// A request field bound from the path or the query string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundField {
    /// Protobuf field name, used as the wire name
    pub name: String,
    /// snake_case Rust field name, before keyword escaping
    pub ident: String,
    /// Rust type of a single value
    pub rust_type: String,
    /// Swagger parameter type
    pub swagger_type: &'static str,
    /// Whether the request field is `Option<T>`
    pub optional: bool,
}

impl BoundField {
    fn new(field: &FieldInfo) -> Self {
        let mapped = map_field_kind(&field.kind);
        Self {
            name: field.name.clone(),
            ident: field.name.to_snake_case(),
            rust_type: mapped.rust_type,
            swagger_type: mapped.swagger_type,
            optional: field.label == FieldLabel::Optional,
        }
    }
}

/// Where the request body goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodySource {
    /// No body is read
    None,
    /// The body is the whole request message (`body: "*"`)
    Whole,
    /// The body is one request field
    Field {
        /// Protobuf field name
        name: String,
        /// snake_case Rust field name, before keyword escaping
        ident: String,
        /// Rust type the body is decoded into
        rust_type: String,
        /// Whether the decoded value is wrapped in `Some`
        wrap_some: bool,
    },
}

/// What the handler returns from the reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseSource {
    /// The whole reply message (`response_body` empty or `"*"`)
    Whole,
    /// One reply field
    Field {
        /// Protobuf field name
        name: String,
        /// snake_case Rust field name, before keyword escaping
        ident: String,
        /// Rust type of the field as prost stores it
        rust_type: String,
        /// Swagger `@Success` type, e.g. `{object} Profile`
        swagger_type: String,
    },
}

/// One HTTP binding of an RPC method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteBinding {
    /// 0 for the primary rule, 1.. for additional bindings
    pub index: usize,
    /// HTTP method
    pub verb: HttpVerb,
    /// Route in axum syntax
    pub route: String,
    /// Route in swagger syntax
    pub swagger_path: String,
    /// Path parameters in path order
    pub path_params: Vec<BoundField>,
    /// Body binding
    pub body: BodySource,
    /// Query parameters in declaration order
    pub query_params: Vec<BoundField>,
    /// Response binding
    pub response: ResponseSource,
    /// Whether default-valued query values are skipped
    pub omit_empty: bool,
    /// Swagger auth line, when the binding requires auth
    pub auth_header: Option<String>,
    /// Swagger annotation lines, without comment markers
    pub swagger: Vec<String>,
}

/// An RPC method and its bindings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRoutes {
    /// Simple method name
    pub name: String,
    /// Fully-qualified method name
    pub full_name: String,
    /// Leading comment
    pub comment: String,
    /// Request message
    pub request: TypeRef,
    /// Response message
    pub reply: TypeRef,
    /// Bindings, primary first
    pub bindings: Vec<RouteBinding>,
}

/// A service with at least one bound method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRoutes {
    /// Simple service name
    pub name: String,
    /// Fully-qualified service name
    pub full_name: String,
    /// Leading comment
    pub comment: String,
    /// Bound methods in declaration order
    pub methods: Vec<MethodRoutes>,
}

/// Route model of one proto file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRoutes {
    /// Proto file name
    pub file: String,
    /// Protobuf package
    pub package: String,
    /// Services with bindings, in declaration order
    pub services: Vec<ServiceRoutes>,
}

impl FileRoutes {
    /// Build the route model of `file`
    ///
    /// Every schema error in the file is collected before the file fails.
    pub fn build(file: &ProtoFile, config: &RouteConfig) -> Result<Self, GeneratorError> {
        let errors = ErrorCollector::new();
        let mut seen: Vec<(HttpVerb, String, String, String)> = Vec::new();
        let mut services = Vec::new();

        for service in &file.services {
            let mut methods = Vec::new();
            for method in &service.methods {
                let Some(rule) = &method.http_rule else {
                    continue;
                };
                if method.client_streaming || method.server_streaming {
                    warn!(
                        "{}: skipping streaming method {}",
                        file.name, method.full_name
                    );
                    continue;
                }

                let rules = std::iter::once(rule).chain(rule.additional_bindings.iter());
                let mut bindings = Vec::new();
                for (index, rule) in rules.enumerate() {
                    let builder = BindingBuilder {
                        file,
                        service,
                        method,
                        config,
                    };
                    let Some(binding) = errors.add_result(builder.build(index, rule)) else {
                        continue;
                    };

                    let shape = route_shape(&binding.route);
                    let clash = seen.iter().find(|(verb, route, other_shape, _)| {
                        other_shape == &shape && (route != &binding.route || *verb == binding.verb)
                    });
                    if let Some((verb, route, _, owner)) = clash {
                        let message = if route == &binding.route {
                            format!(
                                "route {} {} is already bound by {}",
                                verb.as_str(),
                                route,
                                owner
                            )
                        } else {
                            format!(
                                "route {} conflicts with route {} of {}",
                                binding.route, route, owner
                            )
                        };
                        errors.add(schema_error(file, method, message));
                        continue;
                    }
                    seen.push((
                        binding.verb,
                        binding.route.clone(),
                        shape,
                        method.full_name.clone(),
                    ));
                    bindings.push(binding);
                }

                if !bindings.is_empty() {
                    methods.push(MethodRoutes {
                        name: method.name.clone(),
                        full_name: method.full_name.clone(),
                        comment: method.comment.clone(),
                        request: method.input.type_ref.clone(),
                        reply: method.output.type_ref.clone(),
                        bindings,
                    });
                }
            }

            if !methods.is_empty() {
                services.push(ServiceRoutes {
                    name: service.name.clone(),
                    full_name: service.full_name.clone(),
                    comment: service.comment.clone(),
                    methods,
                });
            }
        }

        errors.into_result()?;
        debug!(
            "{}: {} services with route bindings",
            file.name,
            services.len()
        );
        Ok(Self {
            file: file.name.clone(),
            package: file.package.clone(),
            services,
        })
    }

    /// Whether the file has anything to render
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// A route with its parameter names erased, so `/{id}` and `/{name}` compare equal
fn route_shape(route: &str) -> String {
    let mut shape = String::with_capacity(route.len());
    let mut in_param = false;
    for c in route.chars() {
        match c {
            '{' => {
                in_param = true;
                shape.push('{');
            }
            '}' => {
                in_param = false;
                shape.push('}');
            }
            '*' if in_param => shape.push('*'),
            _ if in_param => {}
            c => shape.push(c),
        }
    }
    shape
}

fn schema_error(file: &ProtoFile, method: &Method, message: impl Into<String>) -> GeneratorError {
    GeneratorError::SchemaError {
        file: file.name.clone(),
        method: method.full_name.clone(),
        message: message.into(),
    }
}

struct BindingBuilder<'a> {
    file: &'a ProtoFile,
    service: &'a Service,
    method: &'a Method,
    config: &'a RouteConfig,
}

impl BindingBuilder<'_> {
    fn error(&self, message: impl Into<String>) -> GeneratorError {
        schema_error(self.file, self.method, message)
    }

    fn build(&self, index: usize, rule: &HttpRule) -> Result<RouteBinding, GeneratorError> {
        let (verb, template) = match &rule.pattern {
            Some(Pattern::Get(path)) => (HttpVerb::Get, path.as_str()),
            Some(Pattern::Post(path)) => (HttpVerb::Post, path.as_str()),
            Some(Pattern::Put(path)) => (HttpVerb::Put, path.as_str()),
            Some(Pattern::Patch(path)) => (HttpVerb::Patch, path.as_str()),
            Some(Pattern::Delete(path)) => (HttpVerb::Delete, path.as_str()),
            Some(Pattern::Custom(custom)) => match HttpVerb::from_custom(&custom.kind) {
                Some(verb @ (HttpVerb::Head | HttpVerb::Options | HttpVerb::Trace)) => {
                    (verb, custom.path.as_str())
                }
                _ => {
                    return Err(self.error(format!(
                        "unsupported custom HTTP method `{}`",
                        custom.kind
                    )))
                }
            },
            None => return Err(self.error("http rule has no pattern")),
        };

        let template = PathTemplate::parse(template)
            .map_err(|e| self.error(format!("invalid path `{}`: {}", template, e)))?;
        let swagger_path = template.swagger_path();

        let request = &self.method.input;
        let mut path_params = Vec::new();
        for name in template.parameters() {
            let field = request.field(name).ok_or_else(|| {
                self.error(format!(
                    "path parameter `{}` is not a field of {}",
                    name, request.type_ref.full_name
                ))
            })?;
            if field.oneof.is_some()
                || !matches!(field.label, FieldLabel::Singular | FieldLabel::Optional)
                || !field.kind.is_path_bindable()
            {
                return Err(self.error(format!(
                    "field `{}` cannot be bound to the path, \
                     only singular string, number and enum fields can",
                    name
                )));
            }
            path_params.push(BoundField::new(field));
        }

        let body = self.body_source(rule, &path_params)?;
        let response = self.response_source(rule)?;

        let mut query_params = Vec::new();
        if body != BodySource::Whole {
            for field in &request.fields {
                let consumed = path_params.iter().any(|p| p.name == field.name)
                    || matches!(&body, BodySource::Field { name, .. } if name == &field.name);
                if consumed {
                    continue;
                }
                if field.oneof.is_none()
                    && matches!(field.label, FieldLabel::Singular | FieldLabel::Optional)
                    && field.kind.is_query_bindable()
                {
                    query_params.push(BoundField::new(field));
                } else if body == BodySource::None {
                    warn!(
                        "{}: {}: field `{}` is bound to neither the path nor the query",
                        self.file.name, self.method.full_name, field.name
                    );
                }
            }
        }

        let omit_empty = self.config.omit_empty_for(&swagger_path);
        let auth_header = self.auth_header();

        let mut binding = RouteBinding {
            index,
            verb,
            route: template.axum_route(),
            swagger_path,
            path_params,
            body,
            query_params,
            response,
            omit_empty,
            auth_header,
            swagger: Vec::new(),
        };
        binding.swagger = self.swagger_lines(&binding);
        Ok(binding)
    }

    fn body_source(
        &self,
        rule: &HttpRule,
        path_params: &[BoundField],
    ) -> Result<BodySource, GeneratorError> {
        match rule.body.trim() {
            "" => Ok(BodySource::None),
            "*" => Ok(BodySource::Whole),
            name => {
                let request = &self.method.input;
                let field = request.field(name).ok_or_else(|| {
                    self.error(format!(
                        "body field `{}` is not a field of {}",
                        name, request.type_ref.full_name
                    ))
                })?;
                if path_params.iter().any(|p| p.name == name) {
                    return Err(self.error(format!(
                        "body field `{}` is also bound to the path",
                        name
                    )));
                }
                if field.oneof.is_some() {
                    return Err(self.error(format!(
                        "body field `{}` is a member of oneof `{}`",
                        name,
                        field.oneof.as_deref().unwrap_or_default()
                    )));
                }

                let value_type = map_field_kind(&field.kind).rust_type;
                let (rust_type, wrap_some) = match &field.label {
                    FieldLabel::Repeated => {
                        (format!("::prost::alloc::vec::Vec<{}>", value_type), false)
                    }
                    FieldLabel::Map { key, value } => (
                        format!(
                            "::std::collections::HashMap<{}, {}>",
                            map_field_kind(key).rust_type,
                            map_field_kind(value).rust_type
                        ),
                        false,
                    ),
                    FieldLabel::Optional => (value_type, true),
                    FieldLabel::Singular => {
                        let is_message = matches!(field.kind, FieldKind::Message(_));
                        (value_type, is_message)
                    }
                };
                Ok(BodySource::Field {
                    name: field.name.clone(),
                    ident: field.name.to_snake_case(),
                    rust_type,
                    wrap_some,
                })
            }
        }
    }

    fn response_source(&self, rule: &HttpRule) -> Result<ResponseSource, GeneratorError> {
        let name = rule.response_body.trim();
        if name.is_empty() || name == "*" {
            return Ok(ResponseSource::Whole);
        }
        let reply = &self.method.output;
        let field = reply.field(name).ok_or_else(|| {
            self.error(format!(
                "response body field `{}` is not a field of {}",
                name, reply.type_ref.full_name
            ))
        })?;
        if let Some(oneof) = &field.oneof {
            return Err(self.error(format!(
                "response body field `{}` is a member of oneof `{}`",
                name, oneof
            )));
        }

        let mapped = map_field_kind(&field.kind);
        let element = match &field.kind {
            FieldKind::Message(type_ref) => type_ref.name.clone(),
            _ => mapped.swagger_type.to_string(),
        };
        let (rust_type, swagger_type) = match &field.label {
            FieldLabel::Repeated => (
                format!("::prost::alloc::vec::Vec<{}>", mapped.rust_type),
                format!("{{array}} {}", element),
            ),
            FieldLabel::Map { key, value } => (
                format!(
                    "::std::collections::HashMap<{}, {}>",
                    map_field_kind(key).rust_type,
                    map_field_kind(value).rust_type
                ),
                "{object} object".to_string(),
            ),
            FieldLabel::Optional => (
                format!("::core::option::Option<{}>", mapped.rust_type),
                format!("{{{}}} {}", mapped.swagger_type, element),
            ),
            FieldLabel::Singular => match &field.kind {
                FieldKind::Message(_) => (
                    format!("::core::option::Option<{}>", mapped.rust_type),
                    format!("{{object}} {}", element),
                ),
                _ => (
                    mapped.rust_type,
                    format!("{{{}}} {}", mapped.swagger_type, element),
                ),
            },
        };
        Ok(ResponseSource::Field {
            name: field.name.clone(),
            ident: field.name.to_snake_case(),
            rust_type,
            swagger_type,
        })
    }

    fn auth_header(&self) -> Option<String> {
        let method = self.method;
        if let Some(line) = &method.auth_header {
            let line = normalize_swagger_line(line);
            if !line.is_empty() {
                return Some(line);
            }
        }
        if method.auth || self.service.auth || method.auth_header.is_some() {
            Some(self.config.auth_line())
        } else {
            None
        }
    }

    fn swagger_lines(&self, binding: &RouteBinding) -> Vec<String> {
        let package = &self.file.package;
        let mut lines = vec![format!("@Summary {}", self.method.name)];
        if !self.method.comment.is_empty() {
            lines.push(format!("@Description {}", self.method.comment));
        }
        lines.push(format!("@Tags {},{}.{}", package, package, self.service.name));
        lines.push("@Accept json".to_string());
        lines.push("@Produce json".to_string());
        if let Some(auth) = &binding.auth_header {
            lines.push(auth.clone());
        }
        for param in &binding.path_params {
            lines.push(format!(
                "@Param {} path {} true \"{}\"",
                param.name, param.swagger_type, param.name
            ));
        }
        for param in &binding.query_params {
            lines.push(format!(
                "@Param {} query {} false \"{}\"",
                param.name, param.swagger_type, param.name
            ));
        }
        if binding.verb.carries_body() {
            lines.push(format!(
                "@Param request body {} true \"request body\"",
                self.method.input.type_ref.name
            ));
        }
        match &binding.response {
            ResponseSource::Whole => lines.push(format!(
                "@Success 200 {{object}} {}",
                self.method.output.type_ref.name
            )),
            ResponseSource::Field { swagger_type, .. } => {
                lines.push(format!("@Success 200 {}", swagger_type))
            }
        }
        lines.push("@Failure 400,401,403,500,default {object} ErrorResponse".to_string());
        lines.push(format!(
            "@Router {} [{}]",
            binding.swagger_path,
            binding.verb.routing_fn()
        ));
        lines
    }
}
