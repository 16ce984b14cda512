//! Route units and the pluggable unit loader.
//!
//! The engine never loads arbitrary code from disk. A discovered directory
//! is turned into a typed [`RouteUnit`] — handlers by HTTP method plus an
//! optional service definition — by a [`UnitLoader`] the host application
//! supplies. [`UnitTable`] is the shipped loader: units registered up front,
//! keyed by route-relative directory path.

use crate::error::DiscoveryError;
use crate::inject::{Args, ParamSpec};
use crate::registry::Service;
use crate::reply::Reply;
use futures::future::BoxFuture;
use http::Method;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// The HTTP methods a handler unit may define. Anything else in a unit is
/// ignored, which is not an error.
pub const RECOGNIZED_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::OPTIONS,
    Method::HEAD,
];

/// Parses a method name case-insensitively against the recognized set.
pub fn recognize_method(name: &str) -> Option<Method> {
    let upper = name.to_ascii_uppercase();
    RECOGNIZED_METHODS.iter().find(|method| method.as_str() == upper).cloned()
}

/// A named async callable with an explicit parameter descriptor list.
///
/// The descriptors are built once, when the unit is defined; invocation goes
/// through the dependency resolver, which fills an [`Args`] from context,
/// registry and defaults before calling the function.
#[derive(Clone)]
pub struct Handler {
    name: String,
    params: Vec<ParamSpec>,
    f: Arc<dyn Fn(Args) -> BoxFuture<'static, Reply> + Send + Sync>,
}

impl Handler {
    pub fn new<S, F, Fut, R>(name: S, params: Vec<ParamSpec>, f: F) -> Self
    where
        S: Into<String>,
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<Reply>,
    {
        let f = Arc::new(move |args: Args| -> BoxFuture<'static, Reply> {
            let fut = f(args);
            Box::pin(async move { fut.await.into() })
        });
        Self { name: name.into(), params, f }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub(crate) fn call(&self, args: Args) -> BoxFuture<'static, Reply> {
        (self.f)(args)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("name", &self.name).field("params", &self.params).finish_non_exhaustive()
    }
}

/// Builds a service instance from resolver-supplied arguments.
///
/// Factories are constructed with an empty context, so their parameters can
/// only be satisfied by other registered services or by defaults — which is
/// exactly what lets the discovery engine order construction by fixed point.
#[derive(Clone)]
pub struct ServiceFactory {
    name: String,
    params: Vec<ParamSpec>,
    build: Arc<dyn Fn(Args) -> Service + Send + Sync>,
}

impl ServiceFactory {
    pub fn new<S, F>(name: S, params: Vec<ParamSpec>, build: F) -> Self
    where
        S: Into<String>,
        F: Fn(Args) -> Service + Send + Sync + 'static,
    {
        Self { name: name.into(), params, build: Arc::new(build) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub(crate) fn build(&self, args: Args) -> Service {
        (self.build)(args)
    }
}

impl fmt::Debug for ServiceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceFactory").field("name", &self.name).field("params", &self.params).finish_non_exhaustive()
    }
}

/// How a route directory contributes a service: a pre-built instance, or a
/// factory invoked through the dependency resolver.
#[derive(Debug, Clone)]
pub enum ServiceDef {
    Instance(Service),
    Factory(ServiceFactory),
}

/// Everything one route directory defines: handlers keyed by method and an
/// optional service definition.
#[derive(Debug, Clone, Default)]
pub struct RouteUnit {
    handlers: HashMap<Method, Handler>,
    service: Option<ServiceDef>,
}

macro_rules! method_handler {
    ($name:ident, $method:ident) => {
        pub fn $name(self, handler: Handler) -> Self {
            self.handler(Method::$method, handler)
        }
    };
}

impl RouteUnit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler under a method given by name, case-insensitively.
    /// Unrecognized method names are ignored.
    pub fn on<S: AsRef<str>>(self, method: S, handler: Handler) -> Self {
        match recognize_method(method.as_ref()) {
            Some(method) => self.handler(method, handler),
            None => {
                debug!(method = method.as_ref(), "ignoring unrecognized method");
                self
            }
        }
    }

    fn handler(mut self, method: Method, handler: Handler) -> Self {
        self.handlers.insert(method, handler);
        self
    }

    method_handler!(get, GET);
    method_handler!(post, POST);
    method_handler!(put, PUT);
    method_handler!(delete, DELETE);
    method_handler!(patch, PATCH);
    method_handler!(options, OPTIONS);
    method_handler!(head, HEAD);

    /// Attaches a pre-built service instance.
    pub fn service_instance<T: Send + Sync + 'static>(mut self, instance: T) -> Self {
        self.service = Some(ServiceDef::Instance(Service::new(instance)));
        self
    }

    /// Attaches an already wrapped service handle (e.g. one carrying
    /// capability tags).
    pub fn service(mut self, service: Service) -> Self {
        self.service = Some(ServiceDef::Instance(service));
        self
    }

    /// Attaches a service factory, built through the resolver at discovery.
    pub fn service_factory(mut self, factory: ServiceFactory) -> Self {
        self.service = Some(ServiceDef::Factory(factory));
        self
    }

    pub fn handlers(&self) -> &HashMap<Method, Handler> {
        &self.handlers
    }

    pub fn service_def(&self) -> Option<&ServiceDef> {
        self.service.as_ref()
    }

    /// Splits the unit into its handler map and service definition.
    pub fn into_parts(self) -> (HashMap<Method, Handler>, Option<ServiceDef>) {
        (self.handlers, self.service)
    }
}

/// Supplies route units for discovered directories.
///
/// `dir` is the on-disk directory the walk reached; `route_dir` is the same
/// directory relative to the walk root (the key convention-based loaders
/// usually index by). Returning `Ok(None)` means the directory defines no
/// route.
pub trait UnitLoader: Send + Sync {
    fn load(&self, dir: &Path, route_dir: &Path) -> Result<Option<RouteUnit>, DiscoveryError>;
}

/// A loader backed by an explicit table of units keyed by route-relative
/// directory path. Units are cloned out, so repeated discovery passes see
/// identical definitions.
#[derive(Debug, Default)]
pub struct UnitTable {
    units: HashMap<PathBuf, RouteUnit>,
}

impl UnitTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route<P: Into<PathBuf>>(mut self, route_dir: P, unit: RouteUnit) -> Self {
        self.units.insert(route_dir.into(), unit);
        self
    }
}

impl UnitLoader for UnitTable {
    fn load(&self, _dir: &Path, route_dir: &Path) -> Result<Option<RouteUnit>, DiscoveryError> {
        Ok(self.units.get(route_dir).cloned())
    }
}
