use thiserror::Error;

/// Failure taxonomy of a search or import request.
///
/// Every variant carries a human-readable message that is safe to show to
/// the caller. The HTTP layer maps each kind to one status class.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Bad or missing input (client error).
    #[error("{0}")]
    Validation(String),

    /// The embedding credential is missing or was rejected (server configuration).
    #[error("{0}")]
    ProviderAuth(String),

    /// The embedding provider call did not succeed (external failure).
    #[error("{0}")]
    ProviderUpstream(String),

    /// The retrieval layer rejected or failed the query.
    #[error("{0}")]
    Retrieval(String),

    /// Product insertion failed. `details` is opaque debugging payload.
    #[error("{message}")]
    Insert {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Anything not covered above.
    #[error("{0}")]
    Unexpected(String),
}

impl SearchError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn retrieval(message: impl Into<String>) -> Self {
        Self::Retrieval(message.into())
    }

    pub fn insert(message: impl Into<String>) -> Self {
        Self::Insert { message: message.into(), details: None }
    }

    /// Opaque debugging payload, when the failing collaborator provided one.
    pub fn details(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Insert { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
