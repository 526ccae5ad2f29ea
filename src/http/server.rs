//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the Axum router (public `/health`, gated and versioned `/api`)
//! - Wire up middleware (request ID, CORS, tracing, timeout)
//! - Serve until the shutdown future resolves

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use url::Url;

use crate::auth::require_authentication;
use crate::discovery::resolve_port;
use crate::http::{handlers, version};
use crate::lifecycle::ReadyService;

/// The request pipeline for a bootstrapped service.
pub struct ApiServer {
    router: Router,
    ready: Arc<ReadyService>,
}

impl ApiServer {
    pub fn new(ready: ReadyService) -> Self {
        let ready = Arc::new(ready);
        let router = Self::build_router(ready.clone());
        Self { router, ready }
    }

    /// A clone of the router, for in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Listen address from the first `server.urls` entry.
    pub fn bind_address(&self) -> SocketAddr {
        bind_address(self.ready.settings.server.urls.as_deref())
    }

    #[allow(deprecated)]
    fn build_router(ready: Arc<ReadyService>) -> Router {
        let timeout = Duration::from_secs(ready.settings.server.request_timeout_secs);

        let api = Router::new()
            .route("/index", get(handlers::index_status))
            .route("/identity", get(handlers::identity))
            .layer(middleware::from_fn(version::negotiate_version))
            .layer(middleware::from_fn_with_state(
                ready.auth.clone(),
                require_authentication,
            ));

        Router::new()
            .route("/health", get(handlers::health))
            .nest("/api", api)
            .with_state(ready)
            .layer(TimeoutLayer::new(timeout))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Serve on `listener` until `shutdown` resolves, then drain in-flight requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Socket address for the first `;`-separated URL. Wildcard hosts (`*`, `+`)
/// and anything unparseable bind every interface.
pub fn bind_address(urls: Option<&str>) -> SocketAddr {
    let port = resolve_port(urls);
    let host = urls
        .and_then(|u| u.split(';').next())
        .map(str::trim)
        .and_then(|first| Url::parse(first).ok())
        .and_then(|url| url.host_str().map(|h| h.trim_matches(['[', ']']).to_string()));

    let ip = match host.as_deref() {
        Some("localhost") => IpAddr::V4(Ipv4Addr::LOCALHOST),
        Some(h) => h.parse().unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
    };
    SocketAddr::new(ip, port)
}
