//! Route discovery.
//!
//! Walks a root directory, turns every qualifying directory into a compiled
//! route, constructs the service graph in dependency order, and sorts the
//! result so the most specific routes are matched first. Discovery either
//! fully succeeds or fails; no partial route table is ever returned.

use crate::error::{DiscoveryError, InjectError};
use crate::inject::DependencyResolver;
use crate::pattern::{strip_dynamic, RoutePattern};
use crate::registry::{Service, ServiceRegistry};
use crate::unit::{Handler, RouteUnit, ServiceDef, ServiceFactory, UnitLoader};
use http::Method;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// The literal segment a directory must be nested under to be routable.
pub const ROUTE_ANCHOR: &str = "api";

/// One discovered route: a compiled pattern bound to per-method handlers,
/// the shared registry, and the directory's own service instance if it has
/// one. Constructed once per discovery pass, immutable afterwards.
#[derive(Debug)]
pub struct CompiledRoute {
    segments: Vec<String>,
    pattern: RoutePattern,
    handlers: HashMap<Method, Handler>,
    registry: Arc<ServiceRegistry>,
    service: Option<Service>,
}

impl CompiledRoute {
    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn handler(&self, method: &Method) -> Option<&Handler> {
        self.handlers.get(method)
    }

    pub fn handlers(&self) -> &HashMap<Method, Handler> {
        &self.handlers
    }

    /// The registry shared by every route of this discovery pass.
    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// This route directory's own service instance, if it defined one.
    pub fn service(&self) -> Option<&Service> {
        self.service.as_ref()
    }

    pub fn static_count(&self) -> usize {
        self.pattern.static_count()
    }

    pub fn segment_count(&self) -> usize {
        self.pattern.segment_count()
    }

    /// The route as a request path, e.g. `/api/users/[id]`.
    pub fn route_path(&self) -> String {
        if self.segments.is_empty() {
            format!("/{ROUTE_ANCHOR}")
        } else {
            format!("/{ROUTE_ANCHOR}/{}", self.segments.join("/"))
        }
    }
}

pub(crate) struct Target {
    pub rel: PathBuf,
    pub segments: Vec<String>,
    pub unit: RouteUnit,
}

/// Walks `root` and collects every directory the loader recognizes as a
/// route, together with its path segments relative to the `api` anchor.
pub(crate) fn collect_targets(root: &Path, loader: &dyn UnitLoader) -> Result<Vec<Target>, DiscoveryError> {
    let mut targets = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let components: Vec<String> =
            rel.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect();
        let Some(anchor) = components.iter().position(|c| c == ROUTE_ANCHOR) else {
            continue;
        };
        let segments = components[anchor + 1..].to_vec();
        let Some(unit) = loader.load(entry.path(), rel)? else {
            continue;
        };
        targets.push(Target { rel: rel.to_path_buf(), segments, unit });
    }
    Ok(targets)
}

/// Discovers routes and services under `root`.
///
/// A missing root is not an error: it yields an empty route table and an
/// empty registry. See the module docs for the full algorithm.
pub fn discover(
    root: &Path,
    loader: &dyn UnitLoader,
) -> Result<(Vec<CompiledRoute>, Arc<ServiceRegistry>), DiscoveryError> {
    if !root.exists() {
        debug!(root = %root.display(), "route root does not exist, discovery is empty");
        return Ok((Vec::new(), Arc::new(ServiceRegistry::new())));
    }

    struct Prepared {
        rel: PathBuf,
        segments: Vec<String>,
        pattern: RoutePattern,
        aliases: Vec<String>,
        handlers: HashMap<Method, Handler>,
        service: Option<ServiceDef>,
    }

    let mut prepared = Vec::new();
    for target in collect_targets(root, loader)? {
        let pattern = RoutePattern::compile(&target.segments, ROUTE_ANCHOR)?;
        let aliases = derived_aliases(&target.segments);
        let (handlers, service) = target.unit.into_parts();
        prepared.push(Prepared { rel: target.rel, segments: target.segments, pattern, aliases, handlers, service });
    }

    let mut registry = ServiceRegistry::new();
    let mut built: HashMap<PathBuf, Service> = HashMap::new();
    let mut pending: Vec<(PathBuf, ServiceFactory, Vec<String>)> = Vec::new();

    for item in &prepared {
        match &item.service {
            Some(ServiceDef::Instance(service)) => {
                let service = registry.register(service.clone(), &item.aliases);
                built.insert(item.rel.clone(), service);
            }
            Some(ServiceDef::Factory(factory)) => {
                pending.push((item.rel.clone(), factory.clone(), item.aliases.clone()));
            }
            None => {}
        }
    }

    // Fixed-point construction: each pass builds what it can; a pass with no
    // progress while work remains means a circular or unsatisfiable graph.
    while !pending.is_empty() {
        let mut progress = false;
        let mut deferred = Vec::new();
        for (rel, factory, aliases) in pending {
            match DependencyResolver::new(&registry).construct(&factory) {
                Ok(service) => {
                    let service = registry.register(service, &aliases);
                    debug!(dir = %rel.display(), service = service.type_name(), "service constructed");
                    built.insert(rel, service);
                    progress = true;
                }
                Err(cause @ InjectError::MissingDependency { .. }) => {
                    debug!(dir = %rel.display(), %cause, "service deferred");
                    deferred.push((rel, factory, aliases));
                }
            }
        }
        if !progress {
            return Err(DiscoveryError::unresolved_services(
                deferred.iter().map(|(rel, _, _)| rel.display().to_string()),
            ));
        }
        pending = deferred;
    }

    let registry = Arc::new(registry);
    let mut routes: Vec<CompiledRoute> = prepared
        .into_iter()
        .map(|item| CompiledRoute {
            service: built.get(&item.rel).cloned(),
            segments: item.segments,
            pattern: item.pattern,
            handlers: item.handlers,
            registry: Arc::clone(&registry),
        })
        .collect();

    // Static, longer, more specific routes first; ties keep walk order.
    routes.sort_by_key(|route| std::cmp::Reverse((route.static_count(), route.segment_count())));

    for (dynamic, shadowed) in find_shadows(&routes) {
        warn!(
            dynamic = %routes[dynamic].route_path(),
            shadowed = %routes[shadowed].route_path(),
            "dynamic route also matches a static route's path"
        );
    }

    info!(routes = routes.len(), services = registry.len(), root = %root.display(), "discovery complete");
    Ok((routes, registry))
}

/// Finds (dynamic, static) route index pairs where the dynamic pattern also
/// matches the literal path claimed by a static route of equal length. Only
/// the first shadowed static route per dynamic route is reported.
pub(crate) fn find_shadows(routes: &[CompiledRoute]) -> Vec<(usize, usize)> {
    let mut shadows = Vec::new();
    for (d, dynamic) in routes.iter().enumerate() {
        if !dynamic.pattern.is_dynamic() {
            continue;
        }
        for (s, candidate) in routes.iter().enumerate() {
            if candidate.pattern.is_dynamic() || candidate.segment_count() != dynamic.segment_count() {
                continue;
            }
            if dynamic.pattern.matches(&candidate.route_path()) {
                shadows.push((d, s));
                break;
            }
        }
    }
    shadows
}

/// Whether a segment can stand as an identifier in generated names.
pub(crate) fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn camel_case<'a, I: IntoIterator<Item = &'a str>>(parts: I) -> String {
    let mut out = String::new();
    for part in parts {
        for sub in part.split('_').filter(|sub| !sub.is_empty()) {
            let mut chars = sub.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

/// The camel-cased `<Segments>Service` alias for a route, shared verbatim
/// with the codegen companion so generated names always match the registry.
pub(crate) fn service_alias(segments: &[String]) -> String {
    let normalized: Vec<&str> =
        segments.iter().map(|segment| strip_dynamic(segment)).filter(|segment| is_identifier(segment)).collect();
    let base = camel_case(normalized);
    if base.is_empty() { "RouteService".to_string() } else { format!("{base}Service") }
}

/// All aliases a route directory's service registers under: the
/// underscore-joined route key, the `<Segments>Service` name, and the final
/// path segment.
pub(crate) fn derived_aliases(segments: &[String]) -> Vec<String> {
    let mut aliases = vec![segments.join("_"), service_alias(segments)];
    if let Some(last) = segments.last() {
        aliases.push(last.clone());
    }
    aliases.retain(|alias| !alias.is_empty());
    aliases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inject::ParamSpec;
    use crate::registry::InjectKey;
    use std::fs;
    use tempfile::TempDir;

    struct UsersService;

    struct HelloService {
        message: String,
    }

    fn ok_handler() -> Handler {
        Handler::new("ok", Vec::new(), |_args| async { "ok" })
    }

    fn tree(dirs: &[&str]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for dir in dirs {
            fs::create_dir_all(tmp.path().join(dir)).unwrap();
        }
        tmp
    }

    #[test]
    fn missing_root_yields_empty_table() {
        let loader = crate::unit::UnitTable::new();
        let (routes, registry) = discover(Path::new("/definitely/not/here"), &loader).unwrap();
        assert!(routes.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn directories_outside_the_anchor_are_ignored() {
        let tmp = tree(&["api/hello", "internal/hidden"]);
        let loader = crate::unit::UnitTable::new()
            .route("api/hello", RouteUnit::new().get(ok_handler()))
            .route("internal/hidden", RouteUnit::new().get(ok_handler()));

        let (routes, _) = discover(tmp.path(), &loader).unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].route_path(), "/api/hello");
    }

    #[test]
    fn static_routes_sort_before_dynamic_of_equal_length() {
        let tmp = tree(&["api/hello", "api/[name]"]);
        let loader = crate::unit::UnitTable::new()
            .route("api/[name]", RouteUnit::new().get(ok_handler()))
            .route("api/hello", RouteUnit::new().get(ok_handler()));

        let (routes, _) = discover(tmp.path(), &loader).unwrap();
        assert_eq!(routes[0].route_path(), "/api/hello");
        assert_eq!(routes[1].route_path(), "/api/[name]");
    }

    #[test]
    fn longer_routes_sort_before_shorter_ones() {
        let tmp = tree(&["api/a", "api/a/b"]);
        let loader = crate::unit::UnitTable::new()
            .route("api/a", RouteUnit::new().get(ok_handler()))
            .route("api/a/b", RouteUnit::new().get(ok_handler()));

        let (routes, _) = discover(tmp.path(), &loader).unwrap();
        assert_eq!(routes[0].route_path(), "/api/a/b");
        assert_eq!(routes[1].route_path(), "/api/a");
    }

    #[test]
    fn shadowing_is_detected_for_equal_segment_counts_only() {
        let tmp = tree(&["api/hello", "api/[name]", "api/a/b"]);
        let loader = crate::unit::UnitTable::new()
            .route("api/hello", RouteUnit::new().get(ok_handler()))
            .route("api/[name]", RouteUnit::new().get(ok_handler()))
            .route("api/a/b", RouteUnit::new().get(ok_handler()));

        let (routes, _) = discover(tmp.path(), &loader).unwrap();
        let shadows = find_shadows(&routes);
        assert_eq!(shadows.len(), 1);
        let (dynamic, shadowed) = shadows[0];
        assert_eq!(routes[dynamic].route_path(), "/api/[name]");
        assert_eq!(routes[shadowed].route_path(), "/api/hello");
    }

    #[test]
    fn services_build_in_dependency_order_regardless_of_walk_order() {
        // api/hello sorts before api/users in the walk, but depends on it
        let tmp = tree(&["api/hello", "api/users"]);
        let hello_factory = ServiceFactory::new(
            "api/hello service",
            vec![ParamSpec::of::<UsersService, _>("users")],
            |args| {
                let _users = args.get::<UsersService>("users").expect("resolved by spec");
                Service::new(HelloService { message: "hello".to_string() })
            },
        );
        let loader = crate::unit::UnitTable::new()
            .route("api/hello", RouteUnit::new().get(ok_handler()).service_factory(hello_factory))
            .route("api/users", RouteUnit::new().get(ok_handler()).service_instance(UsersService));

        let (routes, registry) = discover(tmp.path(), &loader).unwrap();
        assert_eq!(registry.len(), 2);

        let hello = routes.iter().find(|r| r.route_path() == "/api/hello").unwrap();
        let service = hello.service().unwrap().downcast::<HelloService>().unwrap();
        assert_eq!(service.message, "hello");

        // derived aliases reach the same instance
        let aliased = registry.resolve(&InjectKey::alias("HelloService")).unwrap();
        assert!(aliased.downcast::<HelloService>().is_some());
        assert!(registry.resolve(&InjectKey::alias("hello")).is_some());
    }

    #[test]
    fn circular_services_fail_naming_both_directories() {
        struct A;
        struct B;
        let tmp = tree(&["api/a", "api/b"]);
        let a_factory = ServiceFactory::new("a", vec![ParamSpec::of::<B, _>("b")], |_| Service::new(A));
        let b_factory = ServiceFactory::new("b", vec![ParamSpec::of::<A, _>("a")], |_| Service::new(B));
        let loader = crate::unit::UnitTable::new()
            .route("api/a", RouteUnit::new().get(ok_handler()).service_factory(a_factory))
            .route("api/b", RouteUnit::new().get(ok_handler()).service_factory(b_factory));

        let err = discover(tmp.path(), &loader).unwrap_err();
        match err {
            DiscoveryError::UnresolvedServices { dirs } => {
                assert_eq!(dirs.len(), 2);
                assert!(dirs.iter().any(|d| d.contains("api/a")));
                assert!(dirs.iter().any(|d| d.contains("api/b")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn repeated_discovery_is_equivalent() {
        let tmp = tree(&["api/hello", "api/[name]"]);
        let loader = crate::unit::UnitTable::new()
            .route("api/hello", RouteUnit::new().get(ok_handler()).service_instance(UsersService))
            .route("api/[name]", RouteUnit::new().get(ok_handler()));

        let (first, _) = discover(tmp.path(), &loader).unwrap();
        let (second, _) = discover(tmp.path(), &loader).unwrap();

        let paths = |routes: &[CompiledRoute]| routes.iter().map(CompiledRoute::route_path).collect::<Vec<_>>();
        assert_eq!(paths(&first), paths(&second));
        assert!(second[0].pattern().matches("/api/hello"));
    }

    #[test]
    fn alias_derivation_matches_the_route_key_convention() {
        let segments = |parts: &[&str]| parts.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        assert_eq!(service_alias(&segments(&["hello"])), "HelloService");
        assert_eq!(service_alias(&segments(&["foo_bar_baz"])), "FooBarBazService");
        assert_eq!(service_alias(&segments(&["[name]"])), "NameService");
        assert_eq!(service_alias(&[]), "RouteService");

        assert_eq!(
            derived_aliases(&segments(&["users", "[id]"])),
            vec!["users_[id]".to_string(), "UsersIdService".to_string(), "[id]".to_string()]
        );
    }
}
