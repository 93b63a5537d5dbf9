//! SQLite-backed persistent store for files, chunks, and dependency edges.
//!
//! ## Concurrency
//!
//! SQLite is configured in WAL mode for concurrent reads during writes.
//! Only one writer is allowed at a time (SQLite constraint); the indexer
//! serializes its passes so this is never contended.

use std::path::Path;

use rusqlite::{params, Connection};

use crate::error::{AtlasError, AtlasResult};
use crate::types::{
    Chunk, ChunkMetadata, ChunkType, DependencyEdge, DependencyLink, Direction, FileRecord,
    Relation, Skeleton,
};

/// SQLite-backed metadata, chunk, and dependency-edge store.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create the store database at `db_path`.
    pub fn open(db_path: &Path) -> AtlasResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AtlasError::io(parent, e))?;
        }

        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> AtlasResult<()> {
        self.conn.execute_batch(include_str!("schema.sql"))?;
        Ok(())
    }

    /// Look up a file's registry row by path.
    ///
    /// Tries the caller-supplied form first, then the forward-slash
    /// normalized form, so native-separator paths still hit rows that are
    /// always persisted forward-slash.
    pub fn get_file(&self, path: &str) -> AtlasResult<Option<FileRecord>> {
        if let Some(record) = self.get_file_exact(path)? {
            return Ok(Some(record));
        }
        let normalized = crate::paths::to_forward_slash(path);
        if normalized != path {
            return self.get_file_exact(&normalized);
        }
        Ok(None)
    }

    fn get_file_exact(&self, path: &str) -> AtlasResult<Option<FileRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT path, hash, last_indexed, skeleton FROM files WHERE path = ?1")?;
        let mut rows = stmt.query(params![path])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let skeleton_json: Option<String> = row.get(3)?;
        let skeleton = skeleton_json
            .map(|s| serde_json::from_str::<Skeleton>(&s))
            .transpose()?;
        Ok(Some(FileRecord {
            path: row.get(0)?,
            hash: row.get(1)?,
            last_indexed: row.get(2)?,
            skeleton,
        }))
    }

    /// Insert or replace a file's registry row.
    pub fn upsert_file(
        &self,
        path: &str,
        hash: &str,
        last_indexed: i64,
        skeleton: &Skeleton,
    ) -> AtlasResult<()> {
        let skeleton_json = serde_json::to_string(skeleton)?;
        self.conn.execute(
            "INSERT INTO files (path, hash, last_indexed, skeleton) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(path) DO UPDATE SET hash = excluded.hash,
                last_indexed = excluded.last_indexed, skeleton = excluded.skeleton",
            params![path, hash, last_indexed, skeleton_json],
        )?;
        Ok(())
    }

    /// Delete all chunks and dependency edges owned by `path`, in preparation
    /// for re-indexing it. File registry row is left untouched by this call.
    pub fn clear_file_contents(&self, path: &str) -> AtlasResult<()> {
        self.conn
            .execute("DELETE FROM chunks WHERE file_path = ?1", params![path])?;
        self.conn
            .execute("DELETE FROM dependency_edges WHERE source = ?1", params![path])?;
        Ok(())
    }

    /// Insert a chunk. Callers must have cleared prior chunks for the owning
    /// file first (see `clear_file_contents`).
    pub fn insert_chunk(&self, chunk: &Chunk) -> AtlasResult<()> {
        let metadata_json = serde_json::to_string(&chunk.metadata)?;
        let vector_json = chunk
            .vector
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn.execute(
            "INSERT INTO chunks (id, file_path, chunk_type, content, parent_id, metadata, vector)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                chunk.id,
                chunk.file_path,
                chunk.chunk_type.as_str(),
                chunk.content,
                chunk.parent_id,
                metadata_json,
                vector_json,
            ],
        )?;
        Ok(())
    }

    /// Attach an embedding vector to an already-persisted chunk.
    pub fn set_chunk_vector(&self, chunk_id: &str, vector: &[f32]) -> AtlasResult<()> {
        let vector_json = serde_json::to_string(vector)?;
        self.conn.execute(
            "UPDATE chunks SET vector = ?1 WHERE id = ?2",
            params![vector_json, chunk_id],
        )?;
        Ok(())
    }

    /// Insert a dependency edge, ignoring duplicates (same source/target/relation).
    pub fn insert_edge(&self, edge: &DependencyEdge) -> AtlasResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO dependency_edges (source, target, relation) VALUES (?1, ?2, ?3)",
            params![edge.source, edge.target, edge.relation.as_str()],
        )?;
        Ok(())
    }

    /// Insert a whole run's buffered edges in a single transaction. Either
    /// all of them land or, on failure partway through, none do.
    pub fn insert_edges(&self, edges: &[DependencyEdge]) -> AtlasResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for edge in edges {
            tx.execute(
                "INSERT OR IGNORE INTO dependency_edges (source, target, relation) VALUES (?1, ?2, ?3)",
                params![edge.source, edge.target, edge.relation.as_str()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Return every chunk belonging to `path`, ordered by start line.
    pub fn chunks_for_file(&self, path: &str) -> AtlasResult<Vec<Chunk>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, file_path, chunk_type, content, parent_id, metadata, vector
             FROM chunks WHERE file_path = ?1",
        )?;
        let rows = stmt.query_map(params![path], Self::row_to_chunk)?;
        let mut chunks = rows.collect::<Result<Vec<_>, _>>()?;
        chunks.sort_by_key(|c| c.metadata.start_line);
        Ok(chunks)
    }

    /// Return every chunk that has an embedding vector, for a cosine scan.
    pub fn all_embedded_chunks(&self) -> AtlasResult<Vec<Chunk>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, file_path, chunk_type, content, parent_id, metadata, vector
             FROM chunks WHERE vector IS NOT NULL",
        )?;
        let rows = stmt.query_map([], Self::row_to_chunk)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(AtlasError::from)
    }

    /// Return every chunk lacking an embedding vector, for a Pass C snapshot.
    pub fn all_unembedded_chunks(&self) -> AtlasResult<Vec<Chunk>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, file_path, chunk_type, content, parent_id, metadata, vector
             FROM chunks WHERE vector IS NULL",
        )?;
        let rows = stmt.query_map([], Self::row_to_chunk)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(AtlasError::from)
    }

    /// 1-hop dependency lookup: every edge touching `path` in the given direction.
    ///
    /// Matches both the caller-supplied form and the forward-slash normalized
    /// form, so a native-separator path still finds edges persisted
    /// forward-slash.
    pub fn dependencies_of(&self, path: &str, direction: Direction) -> AtlasResult<Vec<DependencyLink>> {
        let normalized = crate::paths::to_forward_slash(path);
        let query = match direction {
            Direction::Outbound => {
                "SELECT target, relation FROM dependency_edges WHERE source = ?1 OR source = ?2"
            }
            Direction::Inbound => {
                "SELECT source, relation FROM dependency_edges WHERE target = ?1 OR target = ?2"
            }
        };
        let mut stmt = self.conn.prepare(query)?;
        let rows = stmt.query_map(params![path, normalized], |row| {
            let other: String = row.get(0)?;
            let relation: String = row.get(1)?;
            Ok(DependencyLink {
                other,
                relation: Relation::from_str_lossy(&relation),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(AtlasError::from)
    }

    /// Run the SQLite integrity check.
    pub fn check_integrity(&self) -> AtlasResult<bool> {
        let result: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }

    /// Access the raw connection. Use sparingly; prefer adding methods here.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chunk> {
        let chunk_type: String = row.get(2)?;
        let metadata_json: String = row.get(5)?;
        let vector_json: Option<String> = row.get(6)?;

        let metadata: ChunkMetadata = serde_json::from_str(&metadata_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let vector = vector_json
            .map(|v| serde_json::from_str::<Vec<f32>>(&v))
            .transpose()
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
            })?;

        Ok(Chunk {
            id: row.get(0)?,
            file_path: row.get(1)?,
            chunk_type: ChunkType::from_str_lossy(&chunk_type),
            content: row.get(3)?,
            parent_id: row.get(4)?,
            metadata,
            vector,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;

    fn sample_chunk(id: &str, file_path: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            file_path: file_path.to_string(),
            chunk_type: ChunkType::Method,
            content: "findAll() {}".to_string(),
            parent_id: None,
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
    fn open_creates_database() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("test.db");
        let store = Store::open(&db_path).expect("open database");
        assert!(store.check_integrity().expect("check integrity"));
    }

    #[test]
    fn upsert_and_get_file_round_trips() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = Store::open(&dir.path().join("test.db")).expect("open database");
        store
            .upsert_file("src/app.module.ts", "abc123", 1_700_000_000, &Skeleton::Full)
            .expect("upsert file");
        let record = store
            .get_file("src/app.module.ts")
            .expect("get file")
            .expect("file present");
        assert_eq!(record.hash, "abc123");
        assert_eq!(record.skeleton, Some(Skeleton::Full));
    }

    #[test]
    fn insert_chunk_and_fetch_by_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = Store::open(&dir.path().join("test.db")).expect("open database");
        let chunk = sample_chunk("chunk-1", "src/user.service.ts");
        store.insert_chunk(&chunk).expect("insert chunk");
        let chunks = store
            .chunks_for_file("src/user.service.ts")
            .expect("fetch chunks");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "chunk-1");
    }

    #[test]
    fn edge_insert_is_idempotent() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = Store::open(&dir.path().join("test.db")).expect("open database");
        let edge = DependencyEdge {
            source: "src/app.module.ts".to_string(),
            target: "src/user.service.ts".to_string(),
            relation: Relation::Import,
        };
        store.insert_edge(&edge).expect("insert edge");
        store.insert_edge(&edge).expect("insert edge again");
        let links = store
            .dependencies_of("src/app.module.ts", Direction::Outbound)
            .expect("query edges");
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn insert_edges_persists_whole_batch_in_one_transaction() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = Store::open(&dir.path().join("test.db")).expect("open database");
        let edges = vec![
            DependencyEdge {
                source: "src/app.module.ts".to_string(),
                target: "src/user.service.ts".to_string(),
                relation: Relation::Import,
            },
            DependencyEdge {
                source: "src/app.module.ts".to_string(),
                target: "src/user.controller.ts".to_string(),
                relation: Relation::Import,
            },
        ];
        store.insert_edges(&edges).expect("insert edges");
        let outbound = store
            .dependencies_of("src/app.module.ts", Direction::Outbound)
            .expect("outbound query");
        assert_eq!(outbound.len(), 2);
    }

    #[test]
    fn dependencies_of_respects_direction() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = Store::open(&dir.path().join("test.db")).expect("open database");
        let edge = DependencyEdge {
            source: "src/app.module.ts".to_string(),
            target: "src/user.service.ts".to_string(),
            relation: Relation::Import,
        };
        store.insert_edge(&edge).expect("insert edge");

        let outbound = store
            .dependencies_of("src/app.module.ts", Direction::Outbound)
            .expect("outbound query");
        assert_eq!(outbound[0].other, "src/user.service.ts");

        let inbound = store
            .dependencies_of("src/user.service.ts", Direction::Inbound)
            .expect("inbound query");
        assert_eq!(inbound[0].other, "src/app.module.ts");
    }

    #[test]
    fn get_file_round_trips_native_separator_path() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = Store::open(&dir.path().join("test.db")).expect("open database");
        store
            .upsert_file("src/app.module.ts", "abc123", 1_700_000_000, &Skeleton::Full)
            .expect("upsert file");
        let record = store
            .get_file("src\\app.module.ts")
            .expect("get file")
            .expect("file present despite native separators");
        assert_eq!(record.path, "src/app.module.ts");
    }

    #[test]
    fn dependencies_of_round_trips_native_separator_path() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = Store::open(&dir.path().join("test.db")).expect("open database");
        let edge = DependencyEdge {
            source: "src/app.module.ts".to_string(),
            target: "src/user.service.ts".to_string(),
            relation: Relation::Import,
        };
        store.insert_edge(&edge).expect("insert edge");

        let outbound = store
            .dependencies_of("src\\app.module.ts", Direction::Outbound)
            .expect("outbound query with native separators");
        assert_eq!(outbound.len(), 1);
        assert_eq!(outbound[0].other, "src/user.service.ts");
    }
}
