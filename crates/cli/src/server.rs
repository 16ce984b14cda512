//! The HTTP transport adapter.
//!
//! The core never speaks the wire protocol: this module accepts TCP
//! connections, lets hyper parse HTTP/1.1, and hands the core a method, a
//! path, headers, and the body as an incremental stream of chunks. Whatever
//! `App::handle` returns goes back out as-is.

use crate::LaunchError;
use bytes::Bytes;
use futures::StreamExt;
use http::{Request, Response};
use http_body::Body;
use http_body_util::{BodyStream, Full};
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use waypost::App;

/// Converts one hyper request into the core's dispatch contract.
pub async fn dispatch<B>(app: &App, request: Request<B>) -> Response<Bytes>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Send,
{
    let (parts, body) = request.into_parts();
    // data frames only; a frame error ends the body early
    let chunks = BodyStream::new(body)
        .filter_map(|frame| async move { frame.ok().and_then(|frame| frame.into_data().ok()) });
    let path = parts.uri.path().to_string();
    app.handle(parts.method, &path, parts.headers, Box::pin(chunks)).await
}

/// Serves the app until the process is stopped.
///
/// Discovery runs to completion before the listener accepts anything, so
/// all registry mutation strictly precedes the first request.
pub async fn serve(app: Arc<App>, addr: SocketAddr) -> Result<(), LaunchError> {
    app.routes()?;

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "start listening");

    loop {
        let (stream, _remote_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(cause) => {
                warn!(%cause, "failed to accept");
                continue;
            }
        };

        let app = Arc::clone(&app);
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |request| {
                let app = Arc::clone(&app);
                async move {
                    let response = dispatch(app.as_ref(), request).await;
                    Ok::<_, Infallible>(response.map(Full::new))
                }
            });
            if let Err(cause) = hyper::server::conn::http1::Builder::new().serve_connection(io, service).await {
                error!(%cause, "connection error, connection shutdown");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use std::fs;
    use tempfile::TempDir;
    use waypost::{Handler, ParamSpec, Request as CoreRequest, RouteUnit, UnitTable};

    fn echo_app(tmp: &TempDir) -> App {
        fs::create_dir_all(tmp.path().join("api/echo")).unwrap();
        let handler = Handler::new("api/echo POST", vec![ParamSpec::new("request")], |args| async move {
            let request = args.get::<CoreRequest>("request").expect("request is always in context");
            request.text()
        });
        let loader = UnitTable::new().route("api/echo", RouteUnit::new().post(handler));
        App::new(tmp.path(), Arc::new(loader))
    }

    #[tokio::test]
    async fn dispatch_round_trips_method_path_and_body() {
        let tmp = TempDir::new().unwrap();
        let app = echo_app(&tmp);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/echo?verbose=1")
            .body(Full::new(Bytes::from_static(b"ping")))
            .unwrap();

        let response = dispatch(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), b"ping");
    }

    #[tokio::test]
    async fn dispatch_maps_unknown_paths_to_not_found() {
        let tmp = TempDir::new().unwrap();
        let app = echo_app(&tmp);

        let request =
            Request::builder().method(Method::GET).uri("/api/missing").body(Full::new(Bytes::new())).unwrap();

        let response = dispatch(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
