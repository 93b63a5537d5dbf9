//! Query, context assembly, and structural analysis over an existing index.

use std::collections::HashMap;

use crate::embedder::EmbeddingClient;
use crate::error::AtlasResult;
use crate::graph;
use crate::store::Store;
use crate::types::{Chunk, SearchHit};
use crate::vector::rank_by_similarity;

const CONTEXT_REPORT_LIMIT: usize = 4;
const MAX_IMPORTS_SHOWN: usize = 5;

/// Embed `text` and score every embedded chunk against it, descending, truncated to `limit`.
pub async fn query(
    store: &Store,
    embedder: &dyn EmbeddingClient,
    text: &str,
    limit: usize,
) -> AtlasResult<Vec<SearchHit>> {
    let vector = embedder.embed_query(text).await?;
    rank_chunks(store, &vector, limit)
}

fn rank_chunks(store: &Store, query_vector: &[f32], limit: usize) -> AtlasResult<Vec<SearchHit>> {
    let chunks = store.all_embedded_chunks()?;
    let candidates = chunks.iter().filter_map(|c| c.vector.as_deref().map(|v| (c, v)));
    let ranked = rank_by_similarity(query_vector, candidates, limit)?;
    Ok(ranked
        .into_iter()
        .map(|(chunk, score)| SearchHit {
            score,
            chunk: chunk.clone(),
        })
        .collect())
}

/// Build the human-readable, line-matchable context report for a query.
///
/// Embeds `text`, takes the top four hits, groups them by file (file
/// relevance is the highest hit's score within that file), and renders one
/// bordered section per file with its dependencies, skeleton, and snippets.
pub async fn context_report(store: &Store, embedder: &dyn EmbeddingClient, text: &str) -> AtlasResult<String> {
    let hits = query(store, embedder, text, CONTEXT_REPORT_LIMIT).await?;

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&SearchHit>> = HashMap::new();
    for hit in &hits {
        groups
            .entry(hit.chunk.file_path.clone())
            .or_insert_with(|| {
                order.push(hit.chunk.file_path.clone());
                Vec::new()
            })
            .push(hit);
    }

    let mut report = String::new();
    report.push_str(&format!("Query: \"{text}\"\n"));
    report.push_str(&format!("Found {} relevant files.\n", order.len()));

    for file_path in &order {
        let group = &groups[file_path];
        let relevance = group.iter().map(|h| h.score).fold(f32::MIN, f32::max);

        report.push_str("=================================================================\n");
        report.push_str(&format!("📂 **FILE:** {file_path}\n"));
        report.push_str(&format!("📊 **RELEVANCE:** {:.1}%\n", relevance * 100.0));

        report.push_str("🔗 **DEPENDENCIES (Imports):**\n");
        let imports = graph::outbound(store, file_path)?;
        if imports.is_empty() {
            report.push_str("   - (none)\n");
        } else {
            for link in imports.iter().take(MAX_IMPORTS_SHOWN) {
                report.push_str(&format!("   - {}\n", link.other));
            }
            if imports.len() > MAX_IMPORTS_SHOWN {
                report.push_str(&format!("   - (...and {} more)\n", imports.len() - MAX_IMPORTS_SHOWN));
            }
        }

        report.push_str("🏗️ **FILE SKELETON (MAP):**\n");
        let file_record = store.get_file(file_path)?;
        match file_record.and_then(|f| f.skeleton) {
            Some(skeleton) => report.push_str(&skeleton.render()),
            None => report.push_str("(no skeleton cached)\n"),
        }

        report.push_str("\n📝 **CODE SNIPPETS:**\n");
        for hit in group {
            report.push_str(&format!("   --- [{}] ---\n", snippet_label(&hit.chunk)));
            report.push_str(&hit.chunk.content);
            report.push('\n');
        }

        report.push_str(&format!(
            "\n💡 **AGENT HINT:** To edit this file or see full imports, run: read_file(\"{file_path}\")\n"
        ));
        report.push_str("=================================================================\n");
    }

    Ok(report)
}

fn snippet_label(chunk: &Chunk) -> String {
    chunk
        .metadata
        .method_name
        .clone()
        .unwrap_or_else(|| "Class Structure".to_string())
}

/// Look up a file's cached skeleton without re-indexing it.
///
/// Mirrors the teacher's lightweight structural-introspection entry points:
/// a single targeted read with no side effects.
pub fn analyze_structure(store: &Store, path: &str) -> AtlasResult<String> {
    let file = store.get_file(path)?;
    match file.and_then(|f| f.skeleton) {
        Some(skeleton) => Ok(format!(
            "skeleton for {path}:\n{}\n\n(tip: call contextReport for full context)",
            skeleton.render()
        )),
        None => Ok(format!("no skeleton found for {path} (not indexed yet)")),
    }
}
