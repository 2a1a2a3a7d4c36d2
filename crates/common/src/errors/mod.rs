//! Error types for ludobot services
//!
//! Provides distinct error types for the failure modes of the pipeline:
//! - Connection failures (fatal, abort the run)
//! - Validation failures (record rejected before any store write)
//! - Lookup inconsistencies (stale category enumeration, fatal)
//! - Store driver errors (surfaced per call site)

use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Which backing store an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Document,
    Graph,
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKind::Document => write!(f, "document store"),
            StoreKind::Graph => write!(f, "graph store"),
        }
    }
}

/// Shared error type for store adapters and models
#[derive(Debug, Error)]
pub enum AppError {
    /// A store was unreachable at startup
    #[error("failed to connect to {store}: {message}")]
    Connection { store: StoreKind, message: String },

    /// A record failed field validation before a store write
    #[error("record validation failed: {0}")]
    Validation(String),

    /// A category token has no assigned id in the enumeration it was
    /// supposed to come from
    #[error("no {kind} id assigned for token {token:?}")]
    LookupInconsistency { kind: String, token: String },

    /// Document store driver error
    #[error("document store error: {0}")]
    DocumentStore(#[from] mongodb::error::Error),

    /// Graph store driver error
    #[error("graph store error: {0}")]
    GraphStore(#[from] neo4rs::Error),

    /// A loaded record was missing or malformed
    #[error("malformed record: {0}")]
    MalformedRecord(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl AppError {
    /// Whether this error must abort the whole run rather than being
    /// collected as a per-item failure
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Connection { .. } | AppError::LookupInconsistency { .. }
        )
    }
}
