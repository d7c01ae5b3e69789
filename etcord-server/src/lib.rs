//! etcord-server: TCP chat server
//!
//! Accepts client connections, routes their requests through per-message
//! handlers, and fans chat traffic out to every connected client. Channels
//! are static, defined in configuration at startup; messages are held in
//! memory only.

pub mod channel;
pub mod config;
mod connection;
pub mod handlers;
pub mod registry;
pub mod server;

pub use config::AppConfig;
pub use server::{Server, SharedState};
