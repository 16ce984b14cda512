//! Editor-facing alias generation.
//!
//! Mirrors discovery's alias computation — the two share the same helpers,
//! so a generated name always matches what the registry exposes at runtime.
//! Static service routes become concrete marker types; dynamic routes have
//! no statically valid concrete name and become abstract trait markers.

use crate::discover::{collect_targets, is_identifier, service_alias};
use crate::error::DiscoveryError;
use crate::pattern::is_dynamic;
use crate::unit::UnitLoader;
use std::fs;
use std::path::Path;
use tracing::info;

const HEADER: &str = "\
//! Generated service alias markers.
//!
//! Do not edit by hand. Regenerate via the waypost CLI.
";

/// Renders the alias-marker source for every service-bearing route under
/// `root`. A missing root yields just the header.
pub fn generate(root: &Path, loader: &dyn UnitLoader) -> Result<String, DiscoveryError> {
    let mut concrete = Vec::new();
    let mut dynamic = Vec::new();

    if root.exists() {
        for target in collect_targets(root, loader)? {
            if target.unit.service_def().is_none() {
                continue;
            }
            let alias = service_alias(&target.segments);
            if target.segments.iter().any(|segment| is_dynamic(segment)) {
                dynamic.push(alias);
            } else if target.segments.iter().all(|segment| is_identifier(segment)) {
                concrete.push(alias);
            }
        }
    }

    concrete.sort_by_key(|alias| alias.to_lowercase());
    dynamic.sort_by_key(|alias| alias.to_lowercase());

    let mut out = String::from(HEADER);
    for alias in &concrete {
        out.push_str(&format!("\npub struct {alias};\n"));
    }
    for alias in &dynamic {
        out.push_str("\n/// Dynamic route: the concrete service is only known at runtime.\n");
        out.push_str(&format!("pub trait {alias} {{}}\n"));
    }
    Ok(out)
}

/// Writes the generated source to `out`, creating parent directories.
pub fn generate_to(root: &Path, loader: &dyn UnitLoader, out: &Path) -> Result<(), DiscoveryError> {
    let source = generate(root, loader)?;
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(out, source)?;
    info!(out = %out.display(), "service aliases generated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{Handler, RouteUnit, UnitTable};
    use std::fs;
    use tempfile::TempDir;

    struct Marker;

    fn unit_with_service() -> RouteUnit {
        RouteUnit::new()
            .get(Handler::new("ok", Vec::new(), |_args| async { "ok" }))
            .service_instance(Marker)
    }

    #[test]
    fn static_routes_become_structs_and_dynamic_routes_traits() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("api/hello")).unwrap();
        fs::create_dir_all(tmp.path().join("api/[name]")).unwrap();
        fs::create_dir_all(tmp.path().join("api/users")).unwrap();
        let loader = UnitTable::new()
            .route("api/hello", unit_with_service())
            .route("api/[name]", unit_with_service())
            .route("api/users", RouteUnit::new().get(Handler::new("ok", Vec::new(), |_args| async { "ok" })));

        let source = generate(tmp.path(), &loader).unwrap();

        assert!(source.contains("pub struct HelloService;"));
        assert!(source.contains("pub trait NameService {}"));
        // no service definition, no marker
        assert!(!source.contains("UsersService"));
    }

    #[test]
    fn generated_aliases_match_discovery_registrations() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("api/foo_bar_baz")).unwrap();
        let loader = UnitTable::new().route("api/foo_bar_baz", unit_with_service());

        let source = generate(tmp.path(), &loader).unwrap();
        assert!(source.contains("pub struct FooBarBazService;"));

        let (_, registry) = crate::discover::discover(tmp.path(), &loader).unwrap();
        assert!(registry.resolve(&crate::registry::InjectKey::alias("FooBarBazService")).is_some());
    }

    #[test]
    fn missing_root_emits_only_the_header() {
        let loader = UnitTable::new();
        let source = generate(Path::new("/definitely/not/here"), &loader).unwrap();
        assert!(source.starts_with("//! Generated service alias markers."));
        assert!(!source.contains("pub struct"));
    }

    #[test]
    fn generate_to_writes_the_file() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("api/hello")).unwrap();
        let loader = UnitTable::new().route("api/hello", unit_with_service());

        let out = tmp.path().join("generated/aliases.rs");
        generate_to(tmp.path(), &loader, &out).unwrap();

        let written = fs::read_to_string(out).unwrap();
        assert!(written.contains("pub struct HelloService;"));
    }
}
