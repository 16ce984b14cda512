//! A filesystem-convention web microframework core.
//!
//! Routes are not declared: they are discovered by walking a directory tree.
//! Every directory nested under a literal `api` segment that defines a route
//! unit becomes a compiled URL matcher bound to per-method handlers, and may
//! contribute a singleton service to a shared registry. Services can depend
//! on each other through their constructors; discovery builds them in
//! dependency order without the caller specifying one.
//!
//! Discovery runs once, lazily, per [`App`] and is cached; the route table
//! and registry are immutable afterwards, so concurrent requests share them
//! freely.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use waypost::{App, Handler, ParamSpec, Request, RouteUnit, UnitTable};
//!
//! // the host supplies units for the directories it knows about
//! let handler = Handler::new("api/hello GET", vec![ParamSpec::new("request")], |args| async move {
//!     let request = args.get::<Request>("request").expect("always in context");
//!     format!("hello from {}", request.path())
//! });
//! let loader = UnitTable::new().route("api/hello", RouteUnit::new().get(handler));
//!
//! let app = App::new("routes", Arc::new(loader));
//! // a missing root is not an error: the route table is just empty
//! assert!(app.routes().unwrap().is_empty());
//! ```

mod app;
mod codegen;
mod discover;
mod error;
mod inject;
mod pattern;
mod registry;
mod reply;
mod request;
mod unit;

pub use app::App;
pub use codegen::{generate, generate_to};
pub use discover::{discover, CompiledRoute, ROUTE_ANCHOR};
pub use error::{DiscoveryError, InjectError};
pub use inject::{value_of, Args, DependencyResolver, InjectContext, ParamSpec};
pub use pattern::{is_dynamic, strip_dynamic, RoutePattern};
pub use registry::{InjectKey, Service, ServiceRegistry, Value};
pub use reply::Reply;
pub use request::{PathParams, Request};
pub use unit::{recognize_method, Handler, RouteUnit, ServiceDef, ServiceFactory, UnitLoader, UnitTable, RECOGNIZED_METHODS};
