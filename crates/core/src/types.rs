//! Core domain types shared across all codeatlas-core subsystems.
//!
//! These form the API contract between modules; changing them requires
//! updating every consumer, so they should stay stable and minimal.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// A registry row: everything tracked about one indexed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the project root, forward-slash normalized.
    pub path: String,
    /// Hex-encoded 128-bit content fingerprint at last index time.
    pub hash: String,
    /// Monotonic epoch seconds of the last successful index of this file.
    pub last_indexed: i64,
    /// Structured skeleton, or `None` for files with no cached skeleton yet.
    pub skeleton: Option<Skeleton>,
}

/// Whether a file is new, has changed content, or is unchanged since the
/// last successful index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    /// No registry row exists for this path yet.
    New,
    /// A registry row exists but the content hash differs.
    Modified,
    /// A registry row exists and the hash matches current content.
    Unchanged,
}

// ---------------------------------------------------------------------------
// Skeletons
// ---------------------------------------------------------------------------

/// Structured summary of a logic file's classes and imports.
///
/// Atomic files don't get one of these; their skeleton is the fixed
/// marker string `"full"` (the whole file *is* the skeleton).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Skeleton {
    /// Atomic file: full text is the skeleton, represented by this marker.
    Full,
    /// Logic file: raw imports plus per-class method signatures.
    Structured {
        /// Verbatim text of each import statement in the file.
        imports: Vec<String>,
        /// One descriptor per top-level class declaration.
        classes: Vec<ClassDescriptor>,
    },
}

impl Skeleton {
    /// Render the skeleton for embedding into the human-readable context report.
    pub fn render(&self) -> String {
        match self {
            Self::Full => "full".to_string(),
            Self::Structured { imports, classes } => {
                let mut out = String::new();
                for import in imports {
                    out.push_str(import);
                    out.push('\n');
                }
                if !imports.is_empty() {
                    out.push('\n');
                }
                for class in classes {
                    out.push_str(&format!("class {} {{\n", class.name));
                    for sig in &class.methods {
                        out.push_str("  ");
                        out.push_str(sig);
                        out.push('\n');
                    }
                    out.push_str("}\n");
                }
                out
            }
        }
    }
}

/// One class's worth of structural summary: its name and its methods'
/// signatures (body-free).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassDescriptor {
    /// Class name as declared.
    pub name: String,
    /// Method signatures, e.g. `"findAll(): Promise<User[]>;"`.
    pub methods: Vec<String>,
}

// ---------------------------------------------------------------------------
// Chunks
// ---------------------------------------------------------------------------

/// The kind of code fragment a chunk represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    /// Whole-file chunk for atomic (data-shape) files.
    File,
    /// Class-level parent chunk: imports, decorators, fields, constructor.
    ClassSignature,
    /// A single method, parented by a `ClassSignature` chunk.
    Method,
    /// Module/bootstrap configuration file, chunked as logic.
    Config,
}

impl ChunkType {
    /// Database string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::ClassSignature => "class_signature",
            Self::Method => "method",
            Self::Config => "config",
        }
    }

    /// Parse from the database string form.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "file" => Self::File,
            "class_signature" => Self::ClassSignature,
            "method" => Self::Method,
            _ => Self::Config,
        }
    }
}

/// Line-range and structural metadata attached to a chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// 1-based starting line.
    pub start_line: u32,
    /// 1-based inclusive ending line.
    pub end_line: u32,
    /// Enclosing class name, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Method name, set only on `Method` chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_name: Option<String>,
    /// Decorator names attached to the class or method.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<String>,
}

/// A semantically meaningful fragment of a file, ready for embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// 128-bit random identifier, regenerated on every re-index of the owning file.
    pub id: String,
    /// Path of the owning file, forward-slash normalized.
    pub file_path: String,
    /// What kind of fragment this is.
    pub chunk_type: ChunkType,
    /// Raw source text of the fragment.
    pub content: String,
    /// Identifier of the parent `ClassSignature` chunk, set only for `Method` chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Structural metadata (line range, names, decorators).
    pub metadata: ChunkMetadata,
    /// Dense embedding vector, absent until the embedding pass succeeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

// ---------------------------------------------------------------------------
// Dependency edges
// ---------------------------------------------------------------------------

/// The kind of relationship a dependency edge represents.
///
/// Only `Import` is ever produced by the chunker today; the others are
/// reserved in the schema and callers must tolerate their absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// `source` has a relative import resolving to `target`.
    Import,
    /// `source`'s class extends `target`'s class. Reserved, unused.
    Extends,
    /// `source`'s class implements `target`'s interface. Reserved, unused.
    Implements,
    /// `source`'s class injects `target` via its constructor. Reserved, unused.
    Injects,
}

impl Relation {
    /// Database string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Extends => "extends",
            Self::Implements => "implements",
            Self::Injects => "injects",
        }
    }

    /// Parse from the database string form.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "extends" => Self::Extends,
            "implements" => Self::Implements,
            "injects" => Self::Injects,
            _ => Self::Import,
        }
    }
}

/// A directed dependency edge between two file paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Path of the file the edge originates from.
    pub source: String,
    /// Path (or unresolved specifier) the edge points to.
    pub target: String,
    /// Kind of relationship.
    pub relation: Relation,
}

/// Direction to traverse when querying the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Rows where `source` equals the queried path; `other` is the target.
    Outbound,
    /// Rows where `target` equals the queried path; `other` is the source.
    Inbound,
}

/// One endpoint returned from a `dependencies_of` lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyLink {
    /// The other file path in the relation.
    pub other: String,
    /// Kind of relationship.
    pub relation: Relation,
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// A single scored retrieval hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Cosine similarity of the chunk's vector to the query vector, in [-1, 1].
    pub score: f32,
    /// The matched chunk.
    pub chunk: Chunk,
}

/// The result of analyzing one file during an index run.
#[derive(Debug, Clone)]
pub struct FileAnalysisResult {
    /// Path relative to the project root, forward-slash normalized.
    pub path: String,
    /// Hex-encoded content fingerprint computed for this version of the file.
    pub hash: String,
    /// Chunks extracted from the file.
    pub chunks: Vec<Chunk>,
    /// Dependency edges extracted from the file.
    pub edges: Vec<DependencyEdge>,
    /// Structured or `"full"` skeleton for the file.
    pub skeleton: Skeleton,
}

/// Summary counters returned by a completed `index_project` run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexSummary {
    /// Number of candidate files discovered under `source_dir`.
    pub files_scanned: usize,
    /// Number of files whose hash differed (or were new) and were analyzed.
    pub files_changed: usize,
    /// Number of files that failed to parse and were skipped.
    pub files_failed: usize,
    /// Total chunks produced across all changed files.
    pub chunks_produced: usize,
    /// Total chunks that successfully received an embedding vector.
    pub chunks_embedded: usize,
    /// Total dependency edges persisted (insert-or-ignore, so this counts attempts).
    pub edges_persisted: usize,
}
