//! Route pattern compilation.
//!
//! A route is an ordered list of path segments taken from the directory tree.
//! A segment written as `[name]` is a dynamic capture; everything else is
//! matched verbatim. Compilation produces a fully anchored regex together
//! with the metadata route ordering and shadow detection rely on.

use crate::error::DiscoveryError;
use regex::Regex;

/// Returns true if `segment` denotes a dynamic capture (`[name]`).
pub fn is_dynamic(segment: &str) -> bool {
    segment.starts_with('[') && segment.ends_with(']') && segment.len() >= 2
}

/// Strips the bracket delimiters from a dynamic segment.
///
/// Returns the segment unchanged when it is not dynamic. The returned name
/// may be empty (`"[]"`); the compiler rejects that case.
pub fn strip_dynamic(segment: &str) -> &str {
    if is_dynamic(segment) { &segment[1..segment.len() - 1] } else { segment }
}

/// A compiled route matcher plus the metadata derived from its segments.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    regex: Regex,
    param_names: Vec<String>,
    static_count: usize,
    segment_count: usize,
}

impl RoutePattern {
    /// Compiles route segments under a fixed path prefix.
    ///
    /// The resulting pattern matches the entire request path, never a
    /// prefix of it. An empty segment list matches exactly `/<prefix>`
    /// with no trailing slash. Fails when a dynamic segment has an empty
    /// name (`[]`).
    pub fn compile(segments: &[String], prefix: &str) -> Result<Self, DiscoveryError> {
        if segments.is_empty() {
            let regex = Regex::new(&format!("^/{}$", regex::escape(prefix))).expect("escaped prefix is a valid regex");
            return Ok(Self { regex, param_names: Vec::new(), static_count: 0, segment_count: 0 });
        }

        let mut param_names = Vec::new();
        let mut pattern_parts = Vec::with_capacity(segments.len());
        let mut static_count = 0;
        for segment in segments {
            if is_dynamic(segment) {
                let name = strip_dynamic(segment);
                if name.is_empty() {
                    return Err(DiscoveryError::empty_dynamic_segment(segments));
                }
                param_names.push(name.to_string());
                pattern_parts.push("([^/]+)".to_string());
            } else {
                pattern_parts.push(regex::escape(segment));
                static_count += 1;
            }
        }

        let pattern = format!("^/{}/{}$", regex::escape(prefix), pattern_parts.join("/"));
        let regex = Regex::new(&pattern).expect("escaped segments form a valid regex");
        Ok(Self { regex, param_names, static_count, segment_count: segments.len() })
    }

    /// Returns true if the full request path matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Matches `path` and returns captured values zipped with their
    /// parameter names in left-to-right order.
    pub fn captures(&self, path: &str) -> Option<Vec<(String, String)>> {
        let captures = self.regex.captures(path)?;
        let values = self
            .param_names
            .iter()
            .zip(captures.iter().skip(1))
            .filter_map(|(name, group)| group.map(|m| (name.clone(), m.as_str().to_string())))
            .collect();
        Some(values)
    }

    /// The dynamic parameter names in left-to-right order.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Returns true if this pattern has at least one dynamic segment.
    pub fn is_dynamic(&self) -> bool {
        !self.param_names.is_empty()
    }

    /// The number of literal (non-dynamic) segments.
    pub fn static_count(&self) -> usize {
        self.static_count
    }

    /// The total number of segments.
    pub fn segment_count(&self) -> usize {
        self.segment_count
    }
}
