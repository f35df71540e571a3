//! HTTP content server for a directory of Markdown/MDX sources.
//!
//! Exposes three things over HTTP: a liveness check, a listing of the
//! servable documents, and raw document fetch by path. Filesystem access goes
//! through [`quire_content`]; this crate adds configuration, routing, CORS and
//! the server lifecycle.

pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod watcher;

pub use config::{ConfigError, CorsOrigins, ServerConfig, ServerSettings};
pub use error::{ApiError, ServerError};
pub use routes::{router, FILE_EXTENSION_HEADER};
pub use server::{shutdown_signal, ContentServer, ServerHandle};
pub use watcher::{ContentEvent, ContentWatcher};
