//! Dependency resolution.
//!
//! One algorithm resolves every callable parameter, at two points in the
//! lifecycle: service construction (empty context) and handler invocation
//! (context holding the request-scoped values). Each parameter is supplied
//! from, in priority order:
//!
//! 1. an exact name match in the [`InjectContext`],
//! 2. a registry resolution by the parameter's [`InjectKey`],
//! 3. the parameter's own default value.
//!
//! If none apply, resolution fails with
//! [`InjectError::MissingDependency`] naming the parameter and the callable.
//!
//! Parameters are described by [`ParamSpec`] descriptors built once at
//! discovery time, so nothing is inspected on the request hot path.

use crate::error::InjectError;
use crate::registry::{InjectKey, ServiceRegistry, Value};
use crate::reply::Reply;
use crate::unit::{Handler, ServiceFactory};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Declares one parameter of a handler or service factory: its name, how it
/// may be satisfied from the registry, and an optional default.
#[derive(Clone)]
pub struct ParamSpec {
    name: String,
    key: Option<InjectKey>,
    default: Option<Value>,
}

impl ParamSpec {
    /// An unannotated parameter: satisfiable only by context or default.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), key: None, default: None }
    }

    /// A parameter annotated with type `T` (concrete or `dyn Trait` tag).
    pub fn of<T: ?Sized + 'static, S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), key: Some(InjectKey::of::<T>()), default: None }
    }

    /// A parameter annotated with a string alias.
    pub fn aliased<S: Into<String>, A: Into<String>>(name: S, alias: A) -> Self {
        Self { name: name.into(), key: Some(InjectKey::alias(alias)), default: None }
    }

    /// Attaches a default value, used when neither context nor registry
    /// can satisfy the parameter.
    pub fn with_default<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.default = Some(Arc::new(value));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamSpec")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

/// Request-scoped named values, consulted before the registry.
#[derive(Default)]
pub struct InjectContext {
    values: HashMap<String, Value>,
}

impl InjectContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Send + Sync + 'static, S: Into<String>>(&mut self, name: S, value: T) {
        self.values.insert(name.into(), Arc::new(value));
    }

    /// Inserts an already type-erased value, sharing it with other keys.
    pub fn insert_value<S: Into<String>>(&mut self, name: S, value: Value) {
        self.values.insert(name.into(), value);
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

impl fmt::Debug for InjectContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectContext").field("keys", &self.values.keys().collect::<Vec<_>>()).finish()
    }
}

/// The resolved arguments for one callable invocation, keyed by parameter
/// name. Callables downcast what they declared.
#[derive(Default)]
pub struct Args {
    values: HashMap<String, Value>,
}

impl Args {
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.values.get(name).and_then(|value| Arc::clone(value).downcast::<T>().ok())
    }

    /// The raw type-erased value for a parameter.
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args").field("keys", &self.values.keys().collect::<Vec<_>>()).finish()
    }
}

/// Resolves callable parameters against a registry, plus a request-scoped
/// context when invoking handlers.
#[derive(Debug, Clone, Copy)]
pub struct DependencyResolver<'r> {
    registry: &'r ServiceRegistry,
}

impl<'r> DependencyResolver<'r> {
    pub fn new(registry: &'r ServiceRegistry) -> Self {
        Self { registry }
    }

    /// Resolves every spec or fails naming the first unsatisfiable one.
    pub fn resolve_args(
        &self,
        target: &str,
        specs: &[ParamSpec],
        ctx: &InjectContext,
    ) -> Result<Args, InjectError> {
        let mut values = HashMap::with_capacity(specs.len());
        for spec in specs {
            if let Some(value) = ctx.get(&spec.name) {
                values.insert(spec.name.clone(), Arc::clone(value));
                continue;
            }
            if let Some(service) = spec.key.as_ref().and_then(|key| self.registry.resolve(key)) {
                values.insert(spec.name.clone(), service.value());
                continue;
            }
            if let Some(default) = &spec.default {
                values.insert(spec.name.clone(), Arc::clone(default));
                continue;
            }
            return Err(InjectError::missing_dependency(&spec.name, target));
        }
        Ok(Args { values })
    }

    /// Builds a service through its factory, with an empty context. Factory
    /// parameters may request other services by inject key.
    pub fn construct(&self, factory: &ServiceFactory) -> Result<crate::registry::Service, InjectError> {
        let args = self.resolve_args(factory.name(), factory.params(), &InjectContext::new())?;
        Ok(factory.build(args))
    }

    /// Invokes a handler with the request-scoped context.
    pub async fn invoke(&self, handler: &Handler, ctx: &InjectContext) -> Result<Reply, InjectError> {
        let args = self.resolve_args(handler.name(), handler.params(), ctx)?;
        Ok(handler.call(args).await)
    }
}

/// Helper for loaders that already hold a plain value.
pub fn value_of<T: Send + Sync + 'static>(value: T) -> Value {
    Arc::new(value) as Value
}
