//! catalog-server
//!
//! HTTP surface of the product search service: `POST /search`,
//! `POST /hybrid-search`, `POST /import` and `GET /health`.

pub mod error;
pub mod response;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::app_router;
pub use state::AppState;

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise `default_directive` (e.g. "info").
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
