//! catalog-core
//!
//! Shared vocabulary of the catalog search workspace: request normalization,
//! the error taxonomy, the oracle/store/embedder seams and configuration.

pub mod config;
pub mod data_processor;
pub mod error;
pub mod request;
pub mod traits;
pub mod types;

pub use error::{Result, SearchError};
