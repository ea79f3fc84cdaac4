//! API server implementation
//!
//! Serves endpoints from a shared proxy stream over HTTP.

pub mod handlers;
pub mod routes;
pub mod server;

pub use server::{ApiServer, AppState};
