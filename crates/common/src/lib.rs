//! Ludobot Common Library
//!
//! Shared code for the ludobot services including:
//! - Record models and field validation
//! - Document store adapter (MongoDB)
//! - Graph store adapter (Neo4j)
//! - Error types and handling
//! - Configuration management

pub mod config;
pub mod errors;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use store::{DocumentStore, GraphStore};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Collection holding catalog records in the document store
pub const CATALOG_COLLECTION: &str = "games";
