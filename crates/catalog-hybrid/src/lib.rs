//! catalog-hybrid
//!
//! Request orchestration: supplier resolution, the mode router and weighted
//! score fusion. The scoring itself stays behind `RetrievalOracle`.

pub mod fusion;
pub mod resolver;
pub mod service;

pub use fusion::{fuse, normalize_channel};
pub use resolver::SupplierResolver;
pub use service::{SearchOutcome, SearchService};
