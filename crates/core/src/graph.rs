//! Dependency graph queries.
//!
//! Intentionally 1-hop only: the store holds the full edge list, and a
//! single-hop lookup against it answers "what does this file import" and
//! "what imports this file" without needing an in-memory graph structure.

use crate::error::AtlasResult;
use crate::store::Store;
use crate::types::{DependencyLink, Direction};

/// Files `path` directly imports.
pub fn outbound(store: &Store, path: &str) -> AtlasResult<Vec<DependencyLink>> {
    store.dependencies_of(path, Direction::Outbound)
}

/// Files that directly import `path`.
pub fn inbound(store: &Store, path: &str) -> AtlasResult<Vec<DependencyLink>> {
    store.dependencies_of(path, Direction::Inbound)
}
