//! axum route bindings
//!
//! For every service with bound methods this renders:
//!
//! - `OPERATION_*` constants naming each RPC
//! - a `<Service>HttpServer` trait implemented by the application
//! - path and query parameter structs per binding
//! - one handler per binding, documented with its swagger annotations
//! - `register_<service>_http_server`, which mounts the handlers on a router

use super::{doc_attrs, field_ident, render_file, rust_type};
use crate::model::{
    BodySource, BoundField, FileRoutes, MethodRoutes, ResponseSource, RouteBinding, ServiceRoutes,
};
use crate::GeneratorError;
use heck::{ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

/// Render the route bindings of one file
pub fn render(header: &str, routes: &FileRoutes) -> Result<String, GeneratorError> {
    let services = routes
        .services
        .iter()
        .map(|service| render_service(&routes.package, service))
        .collect::<Result<Vec<_>, _>>()?;
    render_file(header, quote! { #(#services)* })
}

fn render_service(package: &str, service: &ServiceRoutes) -> Result<TokenStream, GeneratorError> {
    let service_snake = service.name.to_snake_case();
    let trait_ident = format_ident!("{}HttpServer", service.name.to_upper_camel_case());
    let register_ident = format_ident!("register_{}_http_server", service_snake);

    let operations = service.methods.iter().map(|method| {
        let ident = format_ident!(
            "OPERATION_{}_{}",
            service.name.to_shouty_snake_case(),
            method.name.to_shouty_snake_case()
        );
        let value = if package.is_empty() {
            format!("/{}/{}", service.name, method.name)
        } else {
            format!("/{}.{}/{}", package, service.name, method.name)
        };
        quote! { pub const #ident: &str = #value; }
    });

    let mut trait_methods = Vec::new();
    let mut items = Vec::new();
    // route -> (routing fn, handler) in first-appearance order
    let mut routes: Vec<(String, Vec<(String, syn::Ident)>)> = Vec::new();

    for method in &service.methods {
        let request = rust_type(&method.request.rust_path)?;
        let reply = rust_type(&method.reply.rust_path)?;
        let method_ident = field_ident(&method.name.to_snake_case());
        let doc = if method.comment.is_empty() {
            TokenStream::new()
        } else {
            doc_attrs([method.comment.as_str()])
        };
        trait_methods.push(quote! {
            #doc
            fn #method_ident(
                &self,
                request: #request,
            ) -> impl ::core::future::Future<Output = ::core::result::Result<#reply, Self::Error>> + Send;
        });

        for binding in &method.bindings {
            let names = BindingNames::new(service, method, binding);
            items.push(render_binding(&names, &trait_ident, &method_ident, method, binding)?);

            let route = binding.route.clone();
            let entry = (binding.verb.routing_fn().to_string(), names.handler.clone());
            match routes.iter_mut().find(|(r, _)| *r == route) {
                Some((_, handlers)) => handlers.push(entry),
                None => routes.push((route, vec![entry])),
            }
        }
    }

    let registrations = routes.iter().map(|(route, handlers)| {
        let mut chain = TokenStream::new();
        for (i, (verb, handler)) in handlers.iter().enumerate() {
            let verb = format_ident!("{}", verb);
            chain = if i == 0 {
                quote! { ::axum::routing::#verb(#handler::<S>) }
            } else {
                quote! { #chain.#verb(#handler::<S>) }
            };
        }
        quote! { .route(#route, #chain) }
    });

    let service_doc = if service.comment.is_empty() {
        doc_attrs([format!("Server API for the `{}` service", service.full_name).as_str()])
    } else {
        doc_attrs([service.comment.as_str()])
    };
    let register_doc = format!(
        " Mount the HTTP bindings of `{}` on `router`",
        service.full_name
    );

    Ok(quote! {
        #(#operations)*

        #service_doc
        pub trait #trait_ident: ::core::marker::Send + ::core::marker::Sync + 'static {
            /// Error returned by every method, rendered as the HTTP response
            type Error: ::axum::response::IntoResponse + ::core::marker::Send;

            #(#trait_methods)*
        }

        #(#items)*

        #[doc = #register_doc]
        pub fn #register_ident<S>(
            router: ::axum::Router,
            server: ::std::sync::Arc<S>,
        ) -> ::axum::Router
        where
            S: #trait_ident,
        {
            let routes = ::axum::Router::new()
                #(#registrations)*
                .with_state(server);
            router.merge(routes)
        }
    })
}

struct BindingNames {
    handler: syn::Ident,
    path_struct: syn::Ident,
    query_struct: syn::Ident,
}

impl BindingNames {
    fn new(service: &ServiceRoutes, method: &MethodRoutes, binding: &RouteBinding) -> Self {
        let suffix = if binding.index == 0 {
            String::new()
        } else {
            binding.index.to_string()
        };
        let prefix = format!(
            "{}{}{}",
            service.name.to_upper_camel_case(),
            method.name.to_upper_camel_case(),
            suffix
        );
        let handler = if binding.index == 0 {
            format_ident!(
                "{}_{}_handler",
                service.name.to_snake_case(),
                method.name.to_snake_case()
            )
        } else {
            format_ident!(
                "{}_{}_handler_{}",
                service.name.to_snake_case(),
                method.name.to_snake_case(),
                binding.index
            )
        };
        Self {
            handler,
            path_struct: format_ident!("{}PathParams", prefix),
            query_struct: format_ident!("{}QueryParams", prefix),
        }
    }
}

fn render_binding(
    names: &BindingNames,
    trait_ident: &syn::Ident,
    method_ident: &syn::Ident,
    method: &MethodRoutes,
    binding: &RouteBinding,
) -> Result<TokenStream, GeneratorError> {
    let request = rust_type(&method.request.rust_path)?;
    let reply = rust_type(&method.reply.rust_path)?;

    let mut structs = Vec::new();
    let mut extractors = Vec::new();
    let mut assignments = Vec::new();

    if !binding.path_params.is_empty() {
        let path_struct = &names.path_struct;
        let fields = binding
            .path_params
            .iter()
            .map(|param| param_field(param, FieldStyle::Required))
            .collect::<Result<Vec<_>, _>>()?;
        let doc = format!(" Path parameters of `{}`", binding.route);
        structs.push(quote! {
            #[doc = #doc]
            #[derive(Debug, Clone, ::serde::Deserialize)]
            pub struct #path_struct {
                #(#fields,)*
            }
        });
        extractors.push(quote! {
            ::axum::extract::Path(path): ::axum::extract::Path<#path_struct>
        });
        for param in &binding.path_params {
            let ident = field_ident(&param.ident);
            assignments.push(if param.optional {
                quote! { request.#ident = ::core::option::Option::Some(path.#ident); }
            } else {
                quote! { request.#ident = path.#ident; }
            });
        }
    }

    if !binding.query_params.is_empty() {
        let query_struct = &names.query_struct;
        let style = if binding.omit_empty {
            FieldStyle::Optional
        } else {
            FieldStyle::Defaulted
        };
        let fields = binding
            .query_params
            .iter()
            .map(|param| param_field(param, style))
            .collect::<Result<Vec<_>, _>>()?;
        let doc = format!(" Query parameters of `{}`", binding.route);
        structs.push(quote! {
            #[doc = #doc]
            #[derive(Debug, Clone, Default, ::serde::Deserialize)]
            pub struct #query_struct {
                #(#fields,)*
            }
        });
        extractors.push(quote! {
            ::axum::extract::Query(query): ::axum::extract::Query<#query_struct>
        });
        for param in &binding.query_params {
            let ident = field_ident(&param.ident);
            let ty = rust_type(&param.rust_type)?;
            let value = if param.optional {
                quote! { ::core::option::Option::Some(value) }
            } else {
                quote! { value }
            };
            assignments.push(if binding.omit_empty {
                quote! {
                    if let ::core::option::Option::Some(value) = query.#ident {
                        if value != <#ty as ::core::default::Default>::default() {
                            request.#ident = #value;
                        }
                    }
                }
            } else {
                quote! {
                    let value = query.#ident;
                    request.#ident = #value;
                }
            });
        }
    }

    let init = match &binding.body {
        BodySource::None => quote! { <#request as ::core::default::Default>::default() },
        BodySource::Whole => {
            extractors.push(quote! { ::axum::Json(body): ::axum::Json<#request> });
            quote! { body }
        }
        BodySource::Field {
            ident,
            rust_type: body_type,
            wrap_some,
            ..
        } => {
            let body_type = rust_type(body_type)?;
            let ident = field_ident(ident);
            extractors.push(quote! { ::axum::Json(body): ::axum::Json<#body_type> });
            assignments.insert(
                0,
                if *wrap_some {
                    quote! { request.#ident = ::core::option::Option::Some(body); }
                } else {
                    quote! { request.#ident = body; }
                },
            );
            quote! { <#request as ::core::default::Default>::default() }
        }
    };

    let binding_let = if assignments.is_empty() {
        quote! { let request: #request = #init; }
    } else {
        quote! { let mut request: #request = #init; }
    };

    let (response_type, response) = match &binding.response {
        ResponseSource::Whole => (quote! { #reply }, quote! { reply }),
        ResponseSource::Field {
            ident, rust_type: field_type, ..
        } => {
            let field_type = rust_type(field_type)?;
            let ident = field_ident(ident);
            (quote! { #field_type }, quote! { reply.#ident })
        }
    };

    let handler = &names.handler;
    let doc = doc_attrs(binding.swagger.iter().map(String::as_str));

    Ok(quote! {
        #(#structs)*

        #doc
        pub async fn #handler<S>(
            ::axum::extract::State(server): ::axum::extract::State<::std::sync::Arc<S>>,
            #(#extractors,)*
        ) -> ::core::result::Result<::axum::Json<#response_type>, S::Error>
        where
            S: #trait_ident,
        {
            #binding_let
            #(#assignments)*
            let reply = server.#method_ident(request).await?;
            ::core::result::Result::Ok(::axum::Json(#response))
        }
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FieldStyle {
    /// Always present, as in the path
    Required,
    /// `None` when absent from the query
    Optional,
    /// The type's default when absent from the query
    Defaulted,
}

fn param_field(param: &BoundField, style: FieldStyle) -> Result<TokenStream, GeneratorError> {
    let ident = field_ident(&param.ident);
    let ty = rust_type(&param.rust_type)?;
    let rename = (ident.to_string() != param.name).then(|| {
        let name = &param.name;
        quote! { #[serde(rename = #name)] }
    });
    Ok(match style {
        FieldStyle::Required => quote! {
            #rename
            pub #ident: #ty
        },
        FieldStyle::Optional => quote! {
            #rename
            #[serde(default)]
            pub #ident: ::core::option::Option<#ty>
        },
        FieldStyle::Defaulted => quote! {
            #rename
            #[serde(default)]
            pub #ident: #ty
        },
    })
}
