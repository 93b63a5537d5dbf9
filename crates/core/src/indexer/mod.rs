//! Indexing orchestrator.
//!
//! Wires together the subsystems into the top-level public API: scan a
//! project, analyze changed files, persist their chunks and dependency
//! edges, then embed whatever is still missing a vector.
//!
//! ## Architecture
//!
//! ```text
//! walk source_dir --> FileRegistry.status --> chunker::analyze_file
//!                                                    |
//!                    Pass A: store.upsert_file + insert_chunk, per changed file
//!                    Pass B: store.insert_edges (all buffered edges, one transaction)
//!                    Pass C: embedder.embed_chunks --> store.set_chunk_vector, batched
//! ```
//!
//! Each pass commits what it has before starting the next, so a crash
//! mid-run leaves the store in a consistent, resumable state. A crash
//! during Pass A leaves edges untouched; a crash during Pass B leaves no
//! partial edges (it's one transaction); unembedded chunks left over from
//! a Pass C failure are simply picked up again by the next call.
//!
//! The registry hash for a file is written during Pass A, before its chunks
//! are embedded in Pass C, so an unchanged file is never re-chunked. Pass C
//! itself is a global sweep over every chunk row still missing a vector, so
//! a chunk left behind by a failed batch is naturally picked up and retried
//! on the next `index_project` call, without needing its owning file to
//! change again.

use std::path::Path;

use crate::chunker;
use crate::config::Config;
use crate::embedder::{Embedder, EmbeddingClient};
use crate::error::AtlasResult;
use crate::file_registry::FileRegistry;
use crate::store::Store;
use crate::types::{ChangeStatus, IndexSummary};

/// Top-level entry point for indexing a project.
pub struct Indexer {
    config: Config,
    store: Store,
    embedder: Box<dyn EmbeddingClient>,
}

impl Indexer {
    /// Open (or create) the store for `config.repo_path` and build an indexer
    /// backed by the live HTTP embedding service.
    pub fn new(config: Config) -> AtlasResult<Self> {
        let embedder = Embedder::new(&config.embedding)?;
        Self::with_embedder(config, Box::new(embedder))
    }

    /// Build an indexer with an injected embedding client, e.g. a fake for tests.
    pub fn with_embedder(config: Config, embedder: Box<dyn EmbeddingClient>) -> AtlasResult<Self> {
        let store = Store::open(&config.store_path())?;
        Ok(Self {
            config,
            store,
            embedder,
        })
    }

    /// Run a full index: scan, analyze changed files, persist, embed.
    pub async fn index_project(&self) -> AtlasResult<IndexSummary> {
        let mut summary = IndexSummary::default();
        let root = self.config.repo_path.clone();
        let source_dir = root.join(&self.config.indexing.source_dir);

        let candidates = self.discover_files(&source_dir)?;
        summary.files_scanned = candidates.len();

        let known: std::collections::HashSet<String> = candidates
            .iter()
            .filter_map(|p| crate::paths::normalize_relative(&root, p).ok())
            .collect();
        let known_files = |p: &str| known.contains(p);

        let mut edge_buffer = Vec::new();

        // Pass A: analyze every changed file and register it, buffering edges.
        for abs_path in &candidates {
            let rel_path = match crate::paths::normalize_relative(&root, abs_path) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(path = %abs_path.display(), error = %e, "skipping unresolvable path");
                    summary.files_failed += 1;
                    continue;
                }
            };

            if chunker::is_test_spec(&rel_path, &self.config.indexing) {
                continue;
            }

            let content = match std::fs::read_to_string(abs_path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(path = %rel_path, error = %e, "failed to read file, skipping");
                    summary.files_failed += 1;
                    continue;
                }
            };

            let registry = FileRegistry::new(&self.store);
            let status = registry.status(&rel_path, content.as_bytes())?;
            if status == ChangeStatus::Unchanged {
                continue;
            }
            summary.files_changed += 1;

            let analysis =
                match chunker::analyze_file(&rel_path, &content, &self.config.indexing, &known_files) {
                    Ok(a) => a,
                    Err(e) => {
                        tracing::warn!(path = %rel_path, error = %e, "parse failed, skipping file");
                        summary.files_failed += 1;
                        continue;
                    }
                };

            let hash = crate::hasher::fingerprint(content.as_bytes());
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);

            self.store.clear_file_contents(&rel_path)?;
            self.store.upsert_file(&rel_path, &hash, now, &analysis.skeleton)?;
            for chunk in &analysis.chunks {
                self.store.insert_chunk(chunk)?;
            }
            summary.chunks_produced += analysis.chunks.len();

            edge_buffer.extend(analysis.edges);
        }

        // Pass B: persist every buffered edge in a single transaction.
        summary.edges_persisted = edge_buffer.len();
        self.store.insert_edges(&edge_buffer)?;

        // Pass C: snapshot everything still missing a vector once, then embed
        // it in fixed batches. Each batch is attempted exactly once; a failed
        // batch is logged and left unembedded, and every subsequent batch
        // still runs.
        let pending = self.store.all_unembedded_chunks()?;
        let batch_size = self.config.indexing.chunk_batch_size.max(1);
        for batch in pending.chunks(batch_size) {
            let vectors = self.embedder.embed_chunks(batch).await;
            for (chunk, vector) in batch.iter().zip(vectors.into_iter()) {
                if let Some(vector) = vector {
                    self.store.set_chunk_vector(&chunk.id, &vector)?;
                    summary.chunks_embedded += 1;
                } else {
                    tracing::warn!(chunk = %chunk.id, "chunk left unembedded this run");
                }
            }
        }

        tracing::info!(
            scanned = summary.files_scanned,
            changed = summary.files_changed,
            failed = summary.files_failed,
            chunks = summary.chunks_produced,
            embedded = summary.chunks_embedded,
            edges = summary.edges_persisted,
            "index run complete"
        );

        Ok(summary)
    }

    /// Access the underlying store, e.g. for query/retriever calls.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Access the embedding client, e.g. to embed an ad hoc query string.
    pub fn embedder(&self) -> &dyn EmbeddingClient {
        self.embedder.as_ref()
    }

    fn discover_files(&self, source_dir: &Path) -> AtlasResult<Vec<std::path::PathBuf>> {
        let mut exclude_builder = globset::GlobSetBuilder::new();
        for pattern in &self.config.indexing.exclude_patterns {
            if let Ok(glob) = globset::Glob::new(pattern) {
                exclude_builder.add(glob);
            }
        }
        let excludes = exclude_builder
            .build()
            .unwrap_or_else(|_| globset::GlobSetBuilder::new().build().expect("empty globset"));

        let mut out = Vec::new();
        if source_dir.exists() {
            self.walk_dir(source_dir, &excludes, &mut out)?;
        }
        Ok(out)
    }

    fn walk_dir(
        &self,
        dir: &Path,
        excludes: &globset::GlobSet,
        out: &mut Vec<std::path::PathBuf>,
    ) -> AtlasResult<()> {
        let entries = std::fs::read_dir(dir).map_err(|e| crate::error::AtlasError::io(dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| crate::error::AtlasError::io(dir, e))?;
            let path = entry.path();
            let relative = path.strip_prefix(&self.config.repo_path).unwrap_or(&path);
            if excludes.is_match(relative) {
                continue;
            }
            if path.is_dir() {
                self.walk_dir(&path, excludes, out)?;
            } else if path.extension().and_then(|e| e.to_str()) == Some(self.config.indexing.extension.as_str())
            {
                out.push(path);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::testing::FakeEmbedder;

    #[tokio::test]
    async fn index_empty_project_produces_zero_summary() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config = Config::defaults(dir.path());
        let indexer = Indexer::new(config).expect("create indexer");
        let summary = indexer.index_project().await.expect("index");
        assert_eq!(summary.files_scanned, 0);
        assert_eq!(summary.files_changed, 0);
    }

    #[tokio::test]
    async fn index_atomic_file_produces_one_chunk() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).expect("mkdir src");
        std::fs::write(
            src.join("user.dto.ts"),
            "export interface User {\n  id: string;\n}\n",
        )
        .expect("write file");

        let config = Config::defaults(dir.path());
        let indexer = Indexer::new(config).expect("create indexer");
        let summary = indexer.index_project().await.expect("index");

        assert_eq!(summary.files_scanned, 1);
        assert_eq!(summary.files_changed, 1);
        assert_eq!(summary.chunks_produced, 1);
    }

    #[tokio::test]
    async fn test_spec_files_are_excluded() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).expect("mkdir src");
        std::fs::write(
            src.join("user.service.spec.ts"),
            "describe('UserService', () => {});\n",
        )
        .expect("write file");

        let config = Config::defaults(dir.path());
        let indexer = Indexer::new(config).expect("create indexer");
        let summary = indexer.index_project().await.expect("index");

        assert_eq!(summary.files_changed, 0);
    }

    #[tokio::test]
    async fn relative_imports_persist_edges_resolved_against_the_scanned_tree() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).expect("mkdir src");
        std::fs::write(
            src.join("user.service.ts"),
            "export class UserService {\n  findAll() {\n    return [];\n  }\n}\n",
        )
        .expect("write user.service.ts");
        std::fs::write(
            src.join("app.module.ts"),
            "import { UserService } from './user.service';\nimport { Module } from '@nestjs/common';\n\nexport class AppModule {}\n",
        )
        .expect("write app.module.ts");

        let config = Config::defaults(dir.path());
        let indexer = Indexer::new(config).expect("create indexer");
        let summary = indexer.index_project().await.expect("index");

        assert_eq!(summary.files_scanned, 2);
        assert_eq!(summary.edges_persisted, 1);

        let outbound = crate::graph::outbound(indexer.store(), "src/app.module.ts").expect("outbound");
        assert_eq!(outbound.len(), 1);
        assert_eq!(outbound[0].other, "src/user.service.ts");
    }

    #[tokio::test]
    async fn reindex_of_unchanged_file_is_a_no_op() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).expect("mkdir src");
        std::fs::write(src.join("user.dto.ts"), "export interface User {}\n").expect("write");

        let config = Config::defaults(dir.path());
        let indexer = Indexer::new(config).expect("create indexer");
        indexer.index_project().await.expect("first index");
        let second = indexer.index_project().await.expect("second index");

        assert_eq!(second.files_changed, 0);
    }

    #[tokio::test]
    async fn fake_embedder_embeds_every_chunk_across_batches() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).expect("mkdir src");
        for i in 0..5 {
            std::fs::write(
                src.join(format!("user{i}.dto.ts")),
                format!("export interface User{i} {{\n  id: string;\n}}\n"),
            )
            .expect("write file");
        }

        let mut config = Config::defaults(dir.path());
        config.indexing.chunk_batch_size = 2;
        let indexer =
            Indexer::with_embedder(config, Box::new(FakeEmbedder::new(4))).expect("create indexer");
        let summary = indexer.index_project().await.expect("index");

        assert_eq!(summary.files_changed, 5);
        assert_eq!(summary.chunks_embedded, 5);

        let reindexed = indexer.index_project().await.expect("second index");
        assert_eq!(reindexed.chunks_embedded, 0);
    }
}
