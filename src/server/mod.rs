//! Broadcast server.
//!
//! This module provides:
//! - The client page and WebSocket endpoint using axum
//! - Free-port selection
//! - Logging setup

mod app;
mod observability;
mod port;
mod socket;

pub use app::{create_router, AppState, BroadcastServer, ServerConfig};
pub use observability::{init_tracing, TracingConfig};
pub use port::bind_available;
pub use socket::wire_message;
