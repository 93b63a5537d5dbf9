//! # codeatlas-core
//!
//! Structural code-knowledge engine for statically-typed, class-and-decorator
//! server frameworks. Indexes a project's source tree into classes, methods,
//! and their dependency edges, embeds them for semantic retrieval, and
//! answers queries with deterministic, line-matchable context reports.
//!
//! ## Architecture
//!
//! The engine is split into decoupled subsystems:
//!
//! - **`config`** -- Layered configuration loading and validation
//! - **`error`** -- Hierarchical error type
//! - **`types`** -- Domain types shared across all subsystems
//! - **`hasher`** -- Content fingerprinting for change detection
//! - **`paths`** -- Path normalization and relative-import resolution
//! - **`parser`** -- Tree-sitter TypeScript AST parsing
//! - **`chunker`** -- Parent-child code chunking and skeleton extraction
//! - **`file_registry`** -- Change detection against the store
//! - **`store`** -- SQLite-backed file, chunk, and dependency-edge store
//! - **`vector`** -- Cosine similarity scoring
//! - **`graph`** -- 1-hop dependency graph queries
//! - **`embedder`** -- External embedding service client
//! - **`indexer`** -- Orchestrates scanning, analysis, and embedding
//! - **`retriever`** -- Query, context assembly, and structural analysis
//!
//! Each module exposes a small, focused API; `indexer::Indexer` and the
//! `retriever` functions are the primary entry points for consumers.

pub mod config;
pub mod error;
pub mod types;

pub mod hasher;
pub mod paths;

pub mod parser;
pub mod chunker;
pub mod file_registry;
pub mod store;
pub mod vector;
pub mod graph;
pub mod embedder;
pub mod indexer;
pub mod retriever;

pub use config::Config;
pub use error::AtlasError;
pub use indexer::Indexer;
