//! HTTP client for an external embedding service.
//!
//! No local inference: embeddings are produced by a separate service the
//! engine calls over HTTP, one batch request per `chunk_batch_size` chunks.
//! Each chunk is prefixed with a short metadata line before being sent, so
//! the service sees what kind of symbol it's embedding.
//!
//! ## Failure handling
//!
//! If the service is unreachable, times out, or returns a mismatched
//! vector count, the whole batch is logged and skipped: affected chunks
//! are left without a vector and are retried on the next index run (they
//! are still selected by `all_unembedded_chunks`).

use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;
use crate::error::{AtlasError, AtlasResult};
use crate::types::{Chunk, ChunkType};

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Abstraction over the embedding backend.
///
/// `Embedder` is the only production implementation (an HTTP call to an
/// external service); tests substitute a fake so ranking, context report
/// rendering, and re-embed scenarios can run without a live network call.
#[async_trait::async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Expected output vector dimensionality.
    fn dimensions(&self) -> usize;

    /// Embed a batch of chunks. Returns one entry per input chunk, in order;
    /// `None` marks a chunk whose batch failed.
    async fn embed_chunks(&self, chunks: &[Chunk]) -> Vec<Option<Vec<f32>>>;

    /// Embed a single ad hoc query string, surfacing failures directly.
    async fn embed_query(&self, text: &str) -> AtlasResult<Vec<f32>>;
}

/// Client for the external embedding HTTP service.
pub struct Embedder {
    config: EmbeddingConfig,
    client: reqwest::Client,
}

impl Embedder {
    /// Build a client for the embedding service described by `config`.
    pub fn new(config: &EmbeddingConfig) -> AtlasResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AtlasError::Embedding {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    /// Expected output vector dimensionality.
    pub fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    /// Embed a batch of chunks, one request per `config.batch_size` chunks.
    ///
    /// Returns one entry per input chunk, in order. `None` marks a chunk
    /// whose batch failed; the caller leaves it unembedded for the next run.
    pub async fn embed_chunks(&self, chunks: &[Chunk]) -> Vec<Option<Vec<f32>>> {
        let texts: Vec<String> = chunks.iter().map(|c| format_chunk_for_embedding(c)).collect();
        let batches: Vec<&[String]> = texts.chunks(self.config.batch_size).collect();

        let requests = batches.iter().map(|batch| self.embed_batch(batch));
        let outcomes = futures_util::future::join_all(requests).await;

        let mut results = Vec::with_capacity(chunks.len());
        for (batch, outcome) in batches.iter().zip(outcomes) {
            match outcome {
                Ok(vectors) if vectors.len() == batch.len() => {
                    results.extend(vectors.into_iter().map(Some));
                }
                Ok(vectors) => {
                    tracing::warn!(
                        expected = batch.len(),
                        got = vectors.len(),
                        "embedding service returned the wrong vector count for a batch"
                    );
                    results.extend(std::iter::repeat(None).take(batch.len()));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "embedding batch failed; chunks left unembedded");
                    results.extend(std::iter::repeat(None).take(batch.len()));
                }
            }
        }

        results
    }

    /// Embed a single ad hoc query string, surfacing failures directly
    /// rather than swallowing them the way `embed_chunks` does for indexing.
    pub async fn embed_query(&self, text: &str) -> AtlasResult<Vec<f32>> {
        let inputs = vec![text.to_string()];
        let mut vectors = self.embed_batch(&inputs).await?;
        vectors.pop().ok_or_else(|| AtlasError::Embedding {
            message: "embedding service returned no vectors".to_string(),
        })
    }

    async fn embed_batch(&self, inputs: &[String]) -> AtlasResult<Vec<Vec<f32>>> {
        let mut request = self
            .client
            .post(format!("{}/embed", self.config.base_url))
            .json(&EmbedRequest { inputs });

        if let Some(key) = self.config.api_key() {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| AtlasError::Embedding {
            message: format!("embedding request failed: {e}"),
        })?;

        let response = response.error_for_status().map_err(|e| AtlasError::Embedding {
            message: format!("embedding service returned an error: {e}"),
        })?;

        let parsed: EmbedResponse = response.json().await.map_err(|e| AtlasError::Embedding {
            message: format!("failed to parse embedding response: {e}"),
        })?;

        Ok(parsed.embeddings)
    }
}

#[async_trait::async_trait]
impl EmbeddingClient for Embedder {
    fn dimensions(&self) -> usize {
        self.dimensions()
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Vec<Option<Vec<f32>>> {
        self.embed_chunks(chunks).await
    }

    async fn embed_query(&self, text: &str) -> AtlasResult<Vec<f32>> {
        self.embed_query(text).await
    }
}

/// Prefix a chunk's content with a short metadata line before embedding, so
/// the embedding service sees what kind of symbol it's looking at.
fn format_chunk_for_embedding(chunk: &Chunk) -> String {
    match chunk.metadata.method_name.as_deref() {
        Some(name) => format!("Method: {name}\n{}", chunk.content),
        None => {
            let name = chunk.metadata.class_name.as_deref().unwrap_or("Anonymous");
            format!("Class: {name}\n{}", chunk.content)
        }
    }
}

/// A fake `EmbeddingClient` for tests: deterministic, offline, no HTTP.
///
/// Vectors are derived from each chunk's content length so that distinct
/// chunks score distinctly under cosine similarity, without pulling in a
/// real model. Used by the crate's own tests and by downstream integration
/// suites that need to exercise ranking and context report rendering
/// end-to-end without a live embedding service.
pub mod testing {
    use super::{AtlasResult, Chunk, EmbeddingClient};

    /// Offline stand-in for `Embedder`.
    pub struct FakeEmbedder {
        dimensions: usize,
    }

    impl FakeEmbedder {
        /// Build a fake client producing vectors of the given dimensionality.
        pub fn new(dimensions: usize) -> Self {
            Self { dimensions }
        }

        fn vector_for(&self, text: &str) -> Vec<f32> {
            let mut v = vec![0.0; self.dimensions];
            for (i, byte) in text.bytes().enumerate() {
                v[i % self.dimensions] += f32::from(byte);
            }
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                for x in &mut v {
                    *x /= norm;
                }
            }
            v
        }
    }

    #[async_trait::async_trait]
    impl EmbeddingClient for FakeEmbedder {
        fn dimensions(&self) -> usize {
            self.dimensions
        }

        async fn embed_chunks(&self, chunks: &[Chunk]) -> Vec<Option<Vec<f32>>> {
            chunks
                .iter()
                .map(|c| Some(self.vector_for(&c.content)))
                .collect()
        }

        async fn embed_query(&self, text: &str) -> AtlasResult<Vec<f32>> {
            Ok(self.vector_for(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;

    fn method_chunk() -> Chunk {
        Chunk {
            id: "id-1".to_string(),
            file_path: "src/user.service.ts".to_string(),
            chunk_type: ChunkType::Method,
            content: "findAll(): User[] { return []; }".to_string(),
            parent_id: Some("parent-1".to_string()),
            metadata: ChunkMetadata {
                start_line: 1,
                end_line: 1,
                class_name: Some("UserService".to_string()),
                method_name: Some("findAll".to_string()),
                decorators: vec![],
            },
            vector: None,
        }
    }

    #[test]
    fn method_chunk_is_prefixed_with_method_name() {
        let text = format_chunk_for_embedding(&method_chunk());
        assert!(text.starts_with("Method: findAll\n"));
    }

    #[test]
    fn class_chunk_is_prefixed_with_class_name() {
        let mut chunk = method_chunk();
        chunk.chunk_type = ChunkType::ClassSignature;
        chunk.metadata.method_name = None;
        chunk.content = "class UserService {".to_string();
        let text = format_chunk_for_embedding(&chunk);
        assert!(text.starts_with("Class: UserService\n"));
    }

    #[test]
    fn file_chunk_is_prefixed_with_class_name() {
        let mut chunk = method_chunk();
        chunk.chunk_type = ChunkType::File;
        chunk.metadata.method_name = None;
        chunk.content = "export interface User { id: string; }".to_string();
        let text = format_chunk_for_embedding(&chunk);
        assert!(text.starts_with("Class: UserService\n"));
        assert!(text.ends_with(&chunk.content));
    }

    #[tokio::test]
    async fn dimensions_reflects_config() {
        let config = EmbeddingConfig {
            base_url: "http://127.0.0.1:0".to_string(),
            api_key_env: "ATLAS_EMBEDDING_API_KEY".to_string(),
            timeout_ms: 1000,
            batch_size: 10,
            dimensions: 768,
        };
        let embedder = Embedder::new(&config).expect("build embedder");
        assert_eq!(embedder.dimensions(), 768);
    }

    #[tokio::test]
    async fn unreachable_service_leaves_chunks_unembedded() {
        let config = EmbeddingConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key_env: "ATLAS_EMBEDDING_API_KEY".to_string(),
            timeout_ms: 200,
            batch_size: 10,
            dimensions: 768,
        };
        let embedder = Embedder::new(&config).expect("build embedder");
        let results = embedder.embed_chunks(&[method_chunk()]).await;
        assert_eq!(results, vec![None]);
    }
}
