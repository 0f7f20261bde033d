//! HTTP server for the chat relay.
//!
//! Provides:
//! - `GET /` health/info
//! - `POST /messages` chat turns

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ErrorBody, ErrorReply};
pub use routes::{MessageResponse, create_router};
pub use state::AppState;

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::middleware;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Build the full application: routes, `OPTIONS` short-circuit, CORS and tracing.
#[must_use]
pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    create_router(state)
        .layer(middleware::from_fn(routes::short_circuit_options))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind the listener on all interfaces.
///
/// # Errors
/// Returns the bind error, e.g. `AddrInUse` when the port is taken.
pub async fn bind(port: u16) -> io::Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("Chat relay listening on http://{addr}");
    Ok(listener)
}

/// Serve on an already bound listener until `shutdown_signal` completes.
///
/// # Errors
/// Returns an error if the server fails while running.
pub async fn run_server_with_shutdown<F>(
    state: Arc<AppState>,
    listener: TcpListener,
    shutdown_signal: F,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown_signal)
        .await
}

/// Resolve on Ctrl+C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!("Shutting down server...");
}
