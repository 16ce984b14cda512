use std::io;
use thiserror::Error;

/// Errors raised while a discovery pass is running.
///
/// Discovery either fully succeeds or fails with one of these; no partial
/// route table escapes a failed pass. A missing root directory is *not* an
/// error (it yields an empty route table).
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("empty dynamic segment name in route /{route}")]
    EmptyDynamicSegment { route: String },

    #[error("unresolved service dependencies in: {}", dirs.join(", "))]
    UnresolvedServices { dirs: Vec<String> },

    #[error("walk error: {source}")]
    Walk {
        #[from]
        source: walkdir::Error,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl DiscoveryError {
    pub fn empty_dynamic_segment(segments: &[String]) -> Self {
        Self::EmptyDynamicSegment { route: segments.join("/") }
    }

    pub fn unresolved_services<I: IntoIterator<Item = String>>(dirs: I) -> Self {
        Self::UnresolvedServices { dirs: dirs.into_iter().collect() }
    }
}

/// Errors raised while resolving a callable's parameters.
///
/// At request time a missing dependency is a server-side invocation failure
/// (the route matched; its handler signature could not be satisfied), never
/// a not-found outcome. During service construction the same error defers
/// the factory to the next fixed-point pass.
#[derive(Error, Debug)]
pub enum InjectError {
    #[error("cannot resolve dependency '{param}' for {target}")]
    MissingDependency { param: String, target: String },
}

impl InjectError {
    pub fn missing_dependency<P: ToString, T: ToString>(param: P, target: T) -> Self {
        Self::MissingDependency { param: param.to_string(), target: target.to_string() }
    }
}
