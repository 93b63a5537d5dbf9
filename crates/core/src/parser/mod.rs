//! AST parsing, backed by tree-sitter-typescript.
//!
//! ## Architecture
//!
//! ```text
//! Source File -> tree-sitter TypeScript grammar -> Incremental Parse -> CST
//! ```
//!
//! The parser is stateless; a fresh `tree_sitter::Parser` is created per call
//! so this can be invoked from multiple threads via `spawn_blocking`.

use std::path::Path;

use tree_sitter::{Node, Tree};

use crate::error::AtlasError;

/// Parse `source` as TypeScript and return the resulting concrete syntax tree.
///
/// `file_path` is used only to annotate parse errors.
pub fn parse(file_path: &Path, source: &[u8]) -> Result<Tree, AtlasError> {
    let mut parser = tree_sitter::Parser::new();
    let language = tree_sitter_typescript::LANGUAGE_TYPESCRIPT;
    parser
        .set_language(&language.into())
        .map_err(|e| AtlasError::Parse {
            path: file_path.to_path_buf(),
            message: format!("failed to set tree-sitter language: {e}"),
        })?;

    parser.parse(source, None).ok_or_else(|| AtlasError::Parse {
        path: file_path.to_path_buf(),
        message: "tree-sitter returned None (parse timeout or cancellation)".into(),
    })
}

/// Return the verbatim source text spanned by `node`.
pub fn node_text<'a>(node: Node<'_>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or_default()
}

/// 1-based starting line of `node`.
pub fn start_line(node: Node<'_>) -> u32 {
    node.start_position().row as u32 + 1
}

/// 1-based inclusive ending line of `node`.
pub fn end_line(node: Node<'_>) -> u32 {
    node.end_position().row as u32 + 1
}

/// Depth-first iterator over every named descendant of `node`, node itself excluded.
pub fn walk_named<'a>(node: Node<'a>) -> Vec<Node<'a>> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.is_named() {
            out.push(child);
        }
        out.extend(walk_named(child));
    }
    out
}

/// Find the first direct named child of `node` with kind `kind`.
pub fn first_child_of_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| c.kind() == kind)
}
