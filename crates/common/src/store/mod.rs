//! Store adapters
//!
//! Both backing stores are external collaborators behind narrow interfaces:
//! - `DocumentStore`: flat catalog records, store-assigned ids (MongoDB)
//! - `GraphStore`: labeled nodes and typed, property-bearing edges with
//!   MERGE-based upsert semantics (Neo4j)
//!
//! Connections are explicitly constructed and passed in by the caller; there
//! are no module-level singletons.

mod document;
mod graph;

pub use document::DocumentStore;
pub use graph::GraphStore;
