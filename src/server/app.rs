//! Broadcast server application.
//!
//! Serves the client page at `/` and the WebSocket endpoint at `/ws` on one
//! port, with signal handling and graceful shutdown.

use std::future::Future;
use std::net::SocketAddr;

use axum::{response::Html, routing::get, Router};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::port::bind_available;
use super::socket::ws_handler;
use crate::bus::EventBus;
use crate::config::{Config, DEFAULT_PORT};
use crate::error::ServerError;
use crate::Result;

/// Page served to plain HTTP requests.
const INDEX_HTML: &str = include_str!("../../assets/index.html");

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port explicitly requested by the operator
    pub port: Option<u16>,
    /// First port tried when none was requested
    pub default_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: None,
            default_port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Server settings from the application config.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            default_port: DEFAULT_PORT,
        }
    }
}

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub bus: EventBus,
}

/// Build the router with all endpoints.
pub fn create_router(bus: EventBus) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .with_state(AppState { bus })
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::debug_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_response(
                    |response: &axum::response::Response,
                     _latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::debug!(status = %response.status(), "Request completed");
                    },
                ),
        )
        .layer(cors)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// HTTP + WebSocket server bound to a port.
pub struct BroadcastServer {
    listener: TcpListener,
    router: Router,
    addr: SocketAddr,
}

impl BroadcastServer {
    /// Bind the first free port at or above the configured one.
    ///
    /// # Errors
    ///
    /// Returns an error if no port can be bound.
    pub async fn bind(config: &ServerConfig, bus: EventBus) -> Result<Self> {
        let listener = bind_available(&config.host, config.port, config.default_port).await?;
        let addr = listener.local_addr()?;
        tracing::info!(%addr, "Server listening");

        Ok(Self {
            listener,
            router: create_router(bus),
            addr,
        })
    }

    /// Address actually bound.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until SIGTERM or Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails.
    pub async fn run(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serve until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        tracing::info!("Server shut down gracefully");
        Ok(())
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
