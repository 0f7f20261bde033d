//! Process lifecycle for the chat relay server.
//!
//! The store is opened before the listener binds and closed after the server
//! stops, whichever way it stops.

use std::future::Future;
use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::chat::ChatOrchestrator;
use crate::config::RelayConfig;
use crate::llm::{ModelError, OpenAiChat};
use crate::server::{self, AppState};
use crate::store::{ConversationStore, SqliteConversationStore, StoreError};

/// Reasons the server could not start or keep running.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The conversation store could not be opened.
    #[error("failed to initialize store: {0}")]
    Store(#[from] StoreError),
    /// The model client could not be built.
    #[error("failed to create model client: {0}")]
    Model(#[from] ModelError),
    /// The listener could not bind.
    #[error("failed to start server on port {port}: {source}")]
    Bind {
        /// Requested port.
        port: u16,
        /// Underlying bind error.
        #[source]
        source: io::Error,
    },
    /// The server failed while running.
    #[error("server error: {0}")]
    Server(#[source] io::Error),
}

impl StartupError {
    /// Whether the failure happened before the server accepted connections.
    #[must_use]
    pub const fn before_serving(&self) -> bool {
        !matches!(self, Self::Server(_))
    }
}

/// Run the server until a termination signal arrives.
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    // Loaded first so `RUST_LOG` from the file reaches the subscriber.
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    if let Some(e) = dotenv.err().filter(|err| !err.not_found()) {
        warn!("Failed to load .env file: {e}");
    }

    info!("Starting chat relay v{}", env!("CARGO_PKG_VERSION"));

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(serve(&config, server::shutdown_signal())) {
        if e.before_serving() {
            error!("Failed to start server: {e}");
        } else {
            error!("Server stopped unexpectedly: {e}");
        }
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Open the store, bind, serve until `shutdown` completes, then close the store.
///
/// # Errors
/// Returns an error if the store cannot be opened, the model client cannot be
/// built, the port cannot be bound, or the server fails.
pub async fn serve<F>(config: &RelayConfig, shutdown: F) -> Result<(), StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let store = Arc::new(SqliteConversationStore::open(&config.storage).await?);

    let result = serve_with_store(config, store.clone(), shutdown).await;

    if let Err(e) = store.close().await {
        error!("Error closing database: {e}");
    }
    result
}

async fn serve_with_store<F>(
    config: &RelayConfig,
    store: Arc<SqliteConversationStore>,
    shutdown: F,
) -> Result<(), StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if config.llm.api_key.is_empty() {
        warn!("OPENAI_API_KEY is not set; model calls will be rejected");
    }
    let model = Arc::new(OpenAiChat::new(&config.llm)?);
    info!(model = %config.llm.model, base_url = %config.llm.base_url, "model client ready");

    let chat = ChatOrchestrator::new(store, model, config.llm.system_prompt.clone());
    let state = AppState::new(chat, config.server.environment);

    let port = config.server.port;
    let listener = server::bind(port).await.map_err(|source| {
        if source.kind() == io::ErrorKind::AddrInUse {
            error!("Port {port} is already in use. Please try a different port.");
            info!("Try setting the PORT environment variable, e.g. PORT={}", port.saturating_add(1));
        }
        StartupError::Bind { port, source }
    })?;
    info!("Health check: http://localhost:{port}/");
    info!("Messages endpoint: POST http://localhost:{port}/messages");

    server::run_server_with_shutdown(state, listener, shutdown)
        .await
        .map_err(StartupError::Server)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &tempfile::TempDir, port: u16) -> RelayConfig {
        let mut config = RelayConfig::default();
        config.server.port = port;
        config.storage.sqlite_path = dir.path().join("messages.db");
        config
    }

    fn free_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    #[tokio::test]
    async fn unopenable_store_fails_before_binding() {
        let dir = tempfile::tempdir().unwrap();
        let port = free_port();
        let mut config = config_in(&dir, port);
        config.storage.sqlite_path = dir.path().join("missing").join("messages.db");

        let err = serve(&config, std::future::pending::<()>())
            .await
            .unwrap_err();

        assert!(matches!(err, StartupError::Store(StoreError::Unavailable(_))));
        assert!(err.before_serving());
        // Nothing holds the port.
        assert!(std::net::TcpListener::bind(("0.0.0.0", port)).is_ok());
    }

    #[tokio::test]
    async fn occupied_port_is_a_bind_error() {
        let dir = tempfile::tempdir().unwrap();
        let taken = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let err = serve(&config_in(&dir, port), std::future::pending::<()>())
            .await
            .unwrap_err();

        assert!(matches!(err, StartupError::Bind { port: p, .. } if p == port));
        assert!(err.before_serving());
    }

    #[tokio::test]
    async fn shutdown_signal_stops_the_server_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, free_port());

        serve(&config, async {}).await.unwrap();

        // The database file was created and released.
        let reopened = SqliteConversationStore::open(&config.storage).await.unwrap();
        assert!(reopened.history("t1").await.unwrap().is_empty());
    }

    #[test]
    fn runtime_server_failures_are_not_reported_as_startup_failures() {
        let err = StartupError::Server(io::Error::other("connection reset"));
        assert!(!err.before_serving());
        assert_eq!(err.to_string(), "server error: connection reset");
    }
}
