//! live-css
//!
//! Watches a folder for style sheet changes and pushes change notifications
//! to connected browsers over WebSocket.
//!
//! Data flows one way: the [`watcher::WatchEngine`] publishes file events on
//! the [`bus::EventBus`], and the [`registry::SessionRegistry`] and every
//! client connection of the [`server::BroadcastServer`] consume them.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bus;
pub mod config;
pub mod error;
pub mod registry;
pub mod server;
pub mod watcher;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{Error, Result};
