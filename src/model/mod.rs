//! Intermediate models built from the typed descriptor graph
//!
//! Models are plain owned values. Rendering them never consults the
//! descriptor graph again.

pub mod error;
pub mod path;
pub mod route;

pub use error::{camel_case, ErrorInfo, ErrorWrapper, FileErrors};
pub use path::{PathError, PathTemplate, RouteSegment};
pub use route::{
    BodySource, BoundField, FileRoutes, HttpVerb, MethodRoutes, ResponseSource, RouteBinding,
    ServiceRoutes,
};
