// HTTP and WebSocket Surface
//
// Thin shells over the core: JSON snapshot endpoints on the base port and one
// WebSocket listener per stream view on the three ports above it.

pub mod routes;
pub mod server;
pub mod state;
pub mod ws;

pub use server::ApiServer;
pub use state::{AppState, ConfigSnapshot};
