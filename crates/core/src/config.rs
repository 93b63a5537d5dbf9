//! Configuration loading and validation.
//!
//! Configuration is resolved with the following precedence (highest wins):
//!
//! 1. Environment variables (`ATLAS_*`)
//! 2. Project config (`<repo>/.agent/config.toml`)
//! 3. Compiled-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AtlasError, AtlasResult};

/// Name of the directory, relative to the project root, that holds the
/// store database and the optional project config file.
pub const AGENT_DIR: &str = ".agent";

/// Top-level configuration for codeatlas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project root to index. Never serialized into the TOML overlay.
    #[serde(skip)]
    pub repo_path: PathBuf,

    /// Indexing-specific settings.
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Embedding service settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Indexing-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Directory, relative to the project root, to scan for source files.
    #[serde(default = "IndexingConfig::default_source_dir")]
    pub source_dir: String,

    /// File extension (without the dot) considered a source file.
    #[serde(default = "IndexingConfig::default_extension")]
    pub extension: String,

    /// Filename suffixes (before the extension) that mark a file as atomic
    /// (data-shape only, chunked whole rather than split by class/method).
    #[serde(default = "IndexingConfig::default_atomic_suffixes")]
    pub atomic_suffixes: Vec<String>,

    /// Filename suffix that marks a file as a test spec, excluded from indexing.
    #[serde(default = "IndexingConfig::default_test_suffix")]
    pub test_suffix: String,

    /// Glob patterns (relative to the project root) excluded from indexing.
    #[serde(default = "IndexingConfig::default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    /// Number of chunks embedded per batch during Pass C.
    #[serde(default = "IndexingConfig::default_chunk_batch_size")]
    pub chunk_batch_size: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            source_dir: Self::default_source_dir(),
            extension: Self::default_extension(),
            atomic_suffixes: Self::default_atomic_suffixes(),
            test_suffix: Self::default_test_suffix(),
            exclude_patterns: Self::default_exclude_patterns(),
            chunk_batch_size: Self::default_chunk_batch_size(),
        }
    }
}

impl IndexingConfig {
    fn default_source_dir() -> String {
        "src".into()
    }

    fn default_extension() -> String {
        "ts".into()
    }

    fn default_atomic_suffixes() -> Vec<String> {
        vec![
            "dto".into(),
            "entity".into(),
            "interface".into(),
            "enum".into(),
            "type".into(),
        ]
    }

    fn default_test_suffix() -> String {
        "spec".into()
    }

    fn default_exclude_patterns() -> Vec<String> {
        vec![
            "node_modules/**".into(),
            "dist/**".into(),
            ".git/**".into(),
            ".agent/**".into(),
        ]
    }

    fn default_chunk_batch_size() -> usize {
        10
    }
}

/// External embedding service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL of the external embedding HTTP service.
    #[serde(default = "EmbeddingConfig::default_base_url")]
    pub base_url: String,

    /// Name of the environment variable holding the service API key.
    #[serde(default = "EmbeddingConfig::default_api_key_env")]
    pub api_key_env: String,

    /// Request timeout, in milliseconds.
    #[serde(default = "EmbeddingConfig::default_timeout_ms")]
    pub timeout_ms: u64,

    /// Number of chunks per embedding HTTP request.
    #[serde(default = "EmbeddingConfig::default_batch_size")]
    pub batch_size: usize,

    /// Expected output vector dimensionality.
    #[serde(default = "EmbeddingConfig::default_dimensions")]
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            api_key_env: Self::default_api_key_env(),
            timeout_ms: Self::default_timeout_ms(),
            batch_size: Self::default_batch_size(),
            dimensions: Self::default_dimensions(),
        }
    }
}

impl EmbeddingConfig {
    fn default_base_url() -> String {
        "http://localhost:8088".into()
    }

    fn default_api_key_env() -> String {
        "ATLAS_EMBEDDING_API_KEY".into()
    }

    fn default_timeout_ms() -> u64 {
        30_000
    }

    fn default_batch_size() -> usize {
        10
    }

    fn default_dimensions() -> usize {
        768
    }

    /// Read the API key from the configured environment variable, if set.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok()
    }
}

/// Store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// File name of the SQLite database, created under `<repo>/.agent/`.
    #[serde(default = "StoreConfig::default_file_name")]
    pub file_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            file_name: Self::default_file_name(),
        }
    }
}

impl StoreConfig {
    fn default_file_name() -> String {
        "index.db".into()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Whether to emit logs as JSON rather than human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".into()
    }
}

impl Config {
    /// Load configuration: compiled defaults, overlaid by the project config
    /// file (if present), overlaid by environment variables.
    pub fn load(repo_path: &Path) -> AtlasResult<Self> {
        let mut config = Self::defaults(repo_path);

        let project_config_path = repo_path.join(AGENT_DIR).join("config.toml");
        if project_config_path.exists() {
            config.merge_from_file(&project_config_path)?;
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Create a default configuration for the given project root.
    pub fn defaults(repo_path: &Path) -> Self {
        Self {
            repo_path: repo_path.to_path_buf(),
            indexing: IndexingConfig::default(),
            embedding: EmbeddingConfig::default(),
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Directory holding the store database and project config file.
    pub fn agent_dir(&self) -> PathBuf {
        self.repo_path.join(AGENT_DIR)
    }

    /// Full path to the store database file.
    pub fn store_path(&self) -> PathBuf {
        self.agent_dir().join(&self.store.file_name)
    }

    /// Merge values from a TOML config file (non-destructive overlay, section by section).
    fn merge_from_file(&mut self, path: &Path) -> AtlasResult<()> {
        let content = std::fs::read_to_string(path).map_err(|e| AtlasError::io(path, e))?;
        let overlay: toml::Value = toml::from_str(&content)
            .map_err(|e| AtlasError::Config(format!("invalid TOML in {}: {e}", path.display())))?;

        if let Some(indexing) = overlay.get("indexing") {
            if let Ok(parsed) = indexing.clone().try_into::<IndexingConfig>() {
                self.indexing = parsed;
            }
        }
        if let Some(embedding) = overlay.get("embedding") {
            if let Ok(parsed) = embedding.clone().try_into::<EmbeddingConfig>() {
                self.embedding = parsed;
            }
        }
        if let Some(store) = overlay.get("store") {
            if let Ok(parsed) = store.clone().try_into::<StoreConfig>() {
                self.store = parsed;
            }
        }
        if let Some(logging) = overlay.get("logging") {
            if let Ok(parsed) = logging.clone().try_into::<LoggingConfig>() {
                self.logging = parsed;
            }
        }

        Ok(())
    }

    /// Apply `ATLAS_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("ATLAS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(base_url) = std::env::var("ATLAS_EMBEDDING_BASE_URL") {
            self.embedding.base_url = base_url;
        }
        if let Ok(batch_size) = std::env::var("ATLAS_CHUNK_BATCH_SIZE") {
            if let Ok(parsed) = batch_size.parse() {
                self.indexing.chunk_batch_size = parsed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::defaults(Path::new("/tmp/test-repo"));
        assert_eq!(config.indexing.source_dir, "src");
        assert_eq!(config.indexing.extension, "ts");
        assert_eq!(config.embedding.dimensions, 768);
        assert_eq!(config.store.file_name, "index.db");
    }

    #[test]
    fn store_path_is_under_agent_dir() {
        let config = Config::defaults(Path::new("/tmp/test-repo"));
        assert_eq!(
            config.store_path(),
            Path::new("/tmp/test-repo/.agent/index.db")
        );
    }

    #[test]
    fn env_override_changes_log_level() {
        std::env::set_var("ATLAS_LOG_LEVEL", "debug");
        let mut config = Config::defaults(Path::new("/tmp/test-repo"));
        config.apply_env_overrides();
        assert_eq!(config.logging.level, "debug");
        std::env::remove_var("ATLAS_LOG_LEVEL");
    }
}
