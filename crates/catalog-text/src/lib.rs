//! catalog-text
//!
//! Lexical retrieval over product descriptions: an in-memory Tantivy index
//! with an Italian analyzer (`index`), and trigram similarity for typo
//! tolerant matching (`trigram`).

pub mod tantivy_utils;
pub mod index;
pub mod trigram;

pub use index::ProductTextIndex;
pub use trigram::{similarity, trigrams};
