//! The application object: lazy discovery plus request dispatch.
//!
//! An [`App`] is constructed explicitly by the entry point and passed by
//! reference to whatever serves it; there is no ambient global instance.
//! Discovery runs once, on first use, and the resulting route table and
//! registry are cached for the app's lifetime. Nothing mutates after that,
//! so concurrent requests share the state without locks.

use crate::discover::{discover, CompiledRoute};
use crate::error::DiscoveryError;
use crate::inject::{value_of, DependencyResolver, InjectContext};
use crate::registry::ServiceRegistry;
use crate::reply::Reply;
use crate::request::{PathParams, Request};
use crate::unit::UnitLoader;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use http::{HeaderMap, Method, Response, StatusCode};
use once_cell::sync::OnceCell;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;

struct AppState {
    routes: Vec<CompiledRoute>,
    registry: Arc<ServiceRegistry>,
}

/// A filesystem-routed application.
pub struct App {
    root: PathBuf,
    loader: Arc<dyn UnitLoader>,
    state: OnceCell<AppState>,
}

impl App {
    pub fn new<P: Into<PathBuf>>(root: P, loader: Arc<dyn UnitLoader>) -> Self {
        Self { root: root.into(), loader, state: OnceCell::new() }
    }

    /// The root directory discovery walks.
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn state(&self) -> Result<&AppState, DiscoveryError> {
        self.state.get_or_try_init(|| {
            let (routes, registry) = discover(&self.root, self.loader.as_ref())?;
            Ok(AppState { routes, registry })
        })
    }

    /// The discovered routes in matching order, triggering discovery on
    /// first use.
    pub fn routes(&self) -> Result<&[CompiledRoute], DiscoveryError> {
        Ok(&self.state()?.routes)
    }

    /// The shared service registry, triggering discovery on first use.
    pub fn registry(&self) -> Result<&Arc<ServiceRegistry>, DiscoveryError> {
        Ok(&self.state()?.registry)
    }

    /// Dispatches one request: match a route, drain the body, resolve the
    /// handler's parameters, and normalize whatever it returns.
    ///
    /// The body is read chunk by chunk from `body`, suspending until the
    /// transport signals the end of the stream. A parameter the resolver
    /// cannot satisfy is a server-side failure (500), never a 404: the
    /// route matched, its handler signature could not be satisfied.
    pub async fn handle<B>(&self, method: Method, path: &str, headers: HeaderMap, body: B) -> Response<Bytes>
    where
        B: Stream<Item = Bytes> + Send + Unpin,
    {
        let state = match self.state() {
            Ok(state) => state,
            Err(cause) => {
                error!(%cause, "route discovery failed");
                return Reply::from(("route discovery failed", StatusCode::INTERNAL_SERVER_ERROR)).into_response();
            }
        };

        let matched = state.routes.iter().find_map(|route| {
            let handler = route.handler(&method)?;
            let captured = route.pattern().captures(path)?;
            Some((handler, captured))
        });
        let Some((handler, captured)) = matched else {
            return Reply::from(("Not Found", StatusCode::NOT_FOUND)).into_response();
        };

        let mut body = body;
        let mut buffer = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buffer.extend_from_slice(&chunk);
        }

        let params = PathParams::from_pairs(captured);
        let request = Request::new(method, path.to_string(), headers, buffer.freeze(), params.clone());

        let mut ctx = InjectContext::new();
        ctx.insert("request", request);
        let params = value_of(params);
        ctx.insert_value("params", Arc::clone(&params));
        ctx.insert_value("path_params", params);

        let resolver = DependencyResolver::new(&state.registry);
        match resolver.invoke(handler, &ctx).await {
            Ok(reply) => reply.into_response(),
            Err(cause) => {
                error!(%cause, path, "handler invocation failed");
                Reply::from(("Internal Server Error", StatusCode::INTERNAL_SERVER_ERROR)).into_response()
            }
        }
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("root", &self.root)
            .field("discovered", &self.state.get().is_some())
            .finish_non_exhaustive()
    }
}
