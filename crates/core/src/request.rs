//! Owned request data handed to handlers through the inject context.

use bytes::Bytes;
use http::{HeaderMap, Method};

/// Named path segments captured from the request URL.
///
/// For a route `api/users/[id]` matched against `/api/users/42`, the
/// parameter `id` holds `"42"`.
#[derive(Debug, Clone, Default)]
pub struct PathParams {
    values: Vec<(String, String)>,
}

impl PathParams {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_pairs(values: Vec<(String, String)>) -> Self {
        Self { values }
    }

    /// Looks a captured value up by parameter name.
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        let key = key.as_ref();
        self.values.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

/// One fully read HTTP request as seen by handlers.
///
/// The body has already been drained from the transport by the time a
/// handler runs; handlers never touch the wire.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Bytes,
    path_params: PathParams,
}

impl Request {
    pub fn new(method: Method, path: String, headers: HeaderMap, body: Bytes, path_params: PathParams) -> Self {
        Self { method, path, headers, body, path_params }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The request body decoded as text, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }
}
