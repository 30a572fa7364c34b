//! HTTP surface for mcpcli.
//!
//! Every request is answered within its own lifetime: configuration edits go
//! straight to the registry and agent operations run on a fresh bridge worker
//! that the handler awaits.

pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use bootstrap::{ServerConfig, bootstrap, start_server};
pub use routes::create_router;
