//! The process-wide service table.
//!
//! Services are singleton instances shared by every route of a discovery
//! pass. Each instance is reachable by its concrete type, by any capability
//! tags declared at registration, and by string aliases (its bare type name
//! plus aliases derived from the route path). Later registrations under the
//! same key overwrite earlier ones silently; a collision is traced but never
//! fails discovery.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A type-erased value held by the registry or a request context.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Strips the module path (and any generic arguments) from a type name.
pub(crate) fn bare_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// A cheaply cloneable handle to a singleton service instance.
///
/// The handle captures the concrete type identity at construction so the
/// registry can index it without inspecting the instance afterwards.
/// Capability tags are the explicit replacement for subtype scanning: a
/// service that should satisfy `InjectKey::of::<dyn Greeter>()` declares it
/// with [`Service::with_capability`] up front.
#[derive(Clone)]
pub struct Service {
    instance: Value,
    type_id: TypeId,
    type_name: &'static str,
    capabilities: Vec<TypeId>,
}

impl Service {
    pub fn new<T: Send + Sync + 'static>(instance: T) -> Self {
        Self {
            instance: Arc::new(instance),
            type_id: TypeId::of::<T>(),
            type_name: bare_type_name::<T>(),
            capabilities: Vec::new(),
        }
    }

    /// Declares that this service satisfies requests for type `C`.
    pub fn with_capability<C: ?Sized + 'static>(mut self) -> Self {
        self.capabilities.push(TypeId::of::<C>());
        self
    }

    /// Downcasts the held instance to its concrete type.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.instance).downcast::<T>().ok()
    }

    /// The type-erased instance, as stored in resolver contexts.
    pub fn value(&self) -> Value {
        Arc::clone(&self.instance)
    }

    /// The bare name of the concrete type (no module path).
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service").field("type_name", &self.type_name).finish_non_exhaustive()
    }
}

/// How a dependency asks for a service: by type identity or by string alias.
#[derive(Debug, Clone)]
pub enum InjectKey {
    Type { id: TypeId, name: &'static str },
    Alias(String),
}

impl InjectKey {
    /// A type-identity key. Works for concrete types and `dyn Trait`
    /// capability tags alike.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type { id: TypeId::of::<T>(), name: bare_type_name::<T>() }
    }

    pub fn alias<S: Into<String>>(alias: S) -> Self {
        Self::Alias(alias.into())
    }
}

/// Registry of singleton services, created fresh per discovery pass and
/// immutable once requests are being served.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    by_type: HashMap<TypeId, Service>,
    by_capability: HashMap<TypeId, Service>,
    by_alias: HashMap<String, Service>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes `service` under its concrete type, its declared capability
    /// tags, its bare type name, and every extra alias. Returns the same
    /// handle for chaining. Last write wins on every index.
    pub fn register(&mut self, service: Service, aliases: &[String]) -> Service {
        self.by_type.insert(service.type_id, service.clone());
        for capability in &service.capabilities {
            self.by_capability.insert(*capability, service.clone());
        }
        if !service.type_name.is_empty() {
            self.insert_alias(service.type_name.to_string(), service.clone());
        }
        for alias in aliases {
            self.insert_alias(alias.clone(), service.clone());
        }
        service
    }

    fn insert_alias(&mut self, alias: String, service: Service) {
        if let Some(previous) = self.by_alias.insert(alias.clone(), service) {
            debug!(alias = %alias, previous = previous.type_name(), "alias overwritten");
        }
    }

    /// Looks a service up by inject key.
    ///
    /// An alias key consults only the alias index. A type key tries the
    /// exact type first, then the capability-tag index, then falls back to
    /// the type's bare name in the alias index. Absence is `None`, not an
    /// error; the resolver decides whether that is fatal.
    pub fn resolve(&self, key: &InjectKey) -> Option<Service> {
        match key {
            InjectKey::Alias(alias) => self.by_alias.get(alias).cloned(),
            InjectKey::Type { id, name } => self
                .by_type
                .get(id)
                .or_else(|| self.by_capability.get(id))
                .or_else(|| self.by_alias.get(*name))
                .cloned(),
        }
    }

    /// The number of distinct registered instances (by concrete type).
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}
