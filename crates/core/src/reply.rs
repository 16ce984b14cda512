//! Reply normalization.
//!
//! Handlers return an unopinionated value — text, raw bytes, structured
//! data, or any of those paired with a status code — and this module
//! normalizes it into a proper HTTP response. The conversion is the last
//! step of every handler invocation.

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{Response, StatusCode};

/// A normalized handler return value.
#[derive(Debug, Clone)]
pub enum Reply {
    Empty,
    Text(String),
    Bytes(Bytes),
    Json(serde_json::Value),
    /// A reply with an overridden status code.
    Status(Box<Reply>, StatusCode),
}

impl Reply {
    pub fn text<S: Into<String>>(content: S) -> Self {
        Self::Text(content.into())
    }

    pub fn json(content: serde_json::Value) -> Self {
        Self::Json(content)
    }

    /// Returns this reply with a different status code.
    pub fn with_status(self, status: StatusCode) -> Self {
        match self {
            // collapse nested overrides; the outermost one wins
            Self::Status(inner, _) => Self::Status(inner, status),
            other => Self::Status(Box::new(other), status),
        }
    }

    /// Builds the final response: body bytes plus `content-type` and
    /// `content-length` headers.
    pub fn into_response(self) -> Response<Bytes> {
        match self {
            Self::Empty => with_type(Bytes::new(), mime::TEXT_PLAIN_UTF_8.as_ref(), StatusCode::OK),
            Self::Text(text) => with_type(Bytes::from(text), mime::TEXT_PLAIN_UTF_8.as_ref(), StatusCode::OK),
            Self::Bytes(bytes) => with_type(bytes, mime::APPLICATION_OCTET_STREAM.as_ref(), StatusCode::OK),
            Self::Json(value) => {
                let payload = serde_json::to_vec(&value).expect("serde_json::Value always serializes");
                with_type(Bytes::from(payload), mime::APPLICATION_JSON.as_ref(), StatusCode::OK)
            }
            Self::Status(inner, status) => {
                let mut response = inner.into_response();
                *response.status_mut() = status;
                response
            }
        }
    }
}

fn with_type(body: Bytes, content_type: &str, status: StatusCode) -> Response<Bytes> {
    let mut builder = Response::builder().status(status);
    let headers = builder.headers_mut().expect("fresh builder has no error");
    headers.insert(CONTENT_TYPE, content_type.parse().expect("static mime is a valid header value"));
    headers.insert(CONTENT_LENGTH, body.len().into());
    builder.body(body).expect("response parts are valid")
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Self::Empty
    }
}

impl From<String> for Reply {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Reply {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Bytes> for Reply {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<serde_json::Value> for Reply {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// Status-override pair, `(value, status)`.
impl<T: Into<Reply>> From<(T, StatusCode)> for Reply {
    fn from((value, status): (T, StatusCode)) -> Self {
        value.into().with_status(status)
    }
}
