//! Parent-child code chunker.
//!
//! Atomic files (DTOs, entities, interfaces, enums, type aliases) are
//! chunked whole: their entire value as a retrieval unit is their shape, and
//! splitting them would scatter related fields across chunks. Logic files
//! are split into one `class_signature` parent chunk per class (imports,
//! decorators, fields, constructor) plus one `method` child chunk per
//! method, linked back to the parent via `parent_id`.

use uuid::Uuid;

use crate::config::IndexingConfig;
use crate::error::AtlasResult;
use crate::parser::{self, end_line, first_child_of_kind, node_text, start_line};
use crate::paths::resolve_import;
use crate::types::{
    Chunk, ChunkMetadata, ChunkType, ClassDescriptor, DependencyEdge, FileAnalysisResult, Relation,
    Skeleton,
};

/// Returns true if `path` (with its configured extension already stripped)
/// carries one of the configured atomic suffixes, e.g. `user.dto`.
pub fn is_atomic(path: &str, config: &IndexingConfig) -> bool {
    let stem = path.strip_suffix(&format!(".{}", config.extension)).unwrap_or(path);
    config
        .atomic_suffixes
        .iter()
        .any(|suffix| stem.ends_with(&format!(".{suffix}")))
}

/// Returns true if `path` (with its configured extension already stripped)
/// carries the configured test-spec suffix, e.g. `user.service.spec`.
pub fn is_test_spec(path: &str, config: &IndexingConfig) -> bool {
    let stem = path.strip_suffix(&format!(".{}", config.extension)).unwrap_or(path);
    stem.ends_with(&format!(".{}", config.test_suffix))
}

/// Analyze one file: produce its chunks, dependency edges, and skeleton.
///
/// `known_files` answers whether a root-relative candidate path exists in
/// the project, used to resolve relative import specifiers.
pub fn analyze_file(
    path: &str,
    source: &str,
    config: &IndexingConfig,
    known_files: &impl Fn(&str) -> bool,
) -> AtlasResult<FileAnalysisResult> {
    if is_atomic(path, config) {
        return Ok(analyze_atomic_file(path, source));
    }
    analyze_logic_file(path, source, known_files)
}

fn analyze_atomic_file(path: &str, source: &str) -> FileAnalysisResult {
    let total_lines = source.lines().count().max(1) as u32;
    let chunk = Chunk {
        id: Uuid::new_v4().to_string(),
        file_path: path.to_string(),
        chunk_type: ChunkType::File,
        content: source.to_string(),
        parent_id: None,
        metadata: ChunkMetadata {
            start_line: 1,
            end_line: total_lines,
            class_name: None,
            method_name: None,
            decorators: vec![],
        },
        vector: None,
    };

    FileAnalysisResult {
        path: path.to_string(),
        hash: String::new(),
        chunks: vec![chunk],
        edges: Vec::new(),
        skeleton: Skeleton::Full,
    }
}

fn analyze_logic_file(
    path: &str,
    source: &str,
    known_files: &impl Fn(&str) -> bool,
) -> AtlasResult<FileAnalysisResult> {
    let bytes = source.as_bytes();
    let tree = parser::parse(std::path::Path::new(path), bytes)?;
    let root = tree.root_node();

    let mut imports = Vec::new();
    let mut edges = Vec::new();
    let mut chunks = Vec::new();
    let mut classes = Vec::new();

    // First pass: collect every import statement (and its dependency edge, if
    // any) regardless of where classes fall relative to them, so the parent
    // class_signature chunk can be given the complete raw import block.
    let mut cursor = root.walk();
    for statement in root.children(&mut cursor) {
        let unwrapped = unwrap_export(statement);
        if unwrapped.kind() != "import_statement" {
            continue;
        }

        let text = node_text(statement, bytes).to_string();
        if let Some(specifier) = import_specifier(unwrapped, bytes) {
            if specifier.starts_with('.') {
                if let Some(target) = resolve_import(path, &specifier, known_files) {
                    edges.push(DependencyEdge {
                        source: path.to_string(),
                        target,
                        relation: Relation::Import,
                    });
                }
            }
        }
        imports.push(text);
    }
    let import_block = imports.join("\n");

    // Second pass: chunk every top-level class declaration.
    let mut cursor = root.walk();
    for statement in root.children(&mut cursor) {
        let unwrapped = unwrap_export(statement);
        if unwrapped.kind() != "class_declaration" {
            continue;
        }
        let (class_chunk, method_chunks, descriptor) =
            chunk_class(path, unwrapped, bytes, &import_block);
        classes.push(descriptor);
        chunks.push(class_chunk);
        chunks.extend(method_chunks);
    }

    if chunks.is_empty() {
        let total_lines = source.lines().count().max(1) as u32;
        chunks.push(Chunk {
            id: Uuid::new_v4().to_string(),
            file_path: path.to_string(),
            chunk_type: ChunkType::Config,
            content: source.to_string(),
            parent_id: None,
            metadata: ChunkMetadata {
                start_line: 1,
                end_line: total_lines,
                class_name: None,
                method_name: None,
                decorators: vec![],
            },
            vector: None,
        });
    }

    let skeleton = Skeleton::Structured { imports, classes };

    Ok(FileAnalysisResult {
        path: path.to_string(),
        hash: String::new(),
        chunks,
        edges,
        skeleton,
    })
}

fn unwrap_export(node: tree_sitter::Node<'_>) -> tree_sitter::Node<'_> {
    if node.kind() == "export_statement" {
        for kind in ["class_declaration", "import_statement"] {
            if let Some(inner) = first_child_of_kind(node, kind) {
                return inner;
            }
        }
    }
    node
}

fn import_specifier(node: tree_sitter::Node<'_>, source: &[u8]) -> Option<String> {
    let string_node = first_child_of_kind(node, "string")?;
    let text = node_text(string_node, source);
    Some(text.trim_matches(|c| c == '\'' || c == '"').to_string())
}

fn decorators_of(node: tree_sitter::Node<'_>, source: &[u8]) -> Vec<String> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|c| c.kind() == "decorator")
        .map(|d| node_text(d, source).trim_start_matches('@').to_string())
        .collect()
}

fn chunk_class(
    path: &str,
    class_node: tree_sitter::Node<'_>,
    source: &[u8],
    import_block: &str,
) -> (Chunk, Vec<Chunk>, ClassDescriptor) {
    let class_name = first_child_of_kind(class_node, "type_identifier")
        .map(|n| node_text(n, source).to_string())
        .unwrap_or_else(|| "Anonymous".to_string());
    let class_decorators = decorators_of(class_node, source);

    let mut method_chunks = Vec::new();
    let mut method_signatures = Vec::new();
    let mut non_method_end = end_line(class_node);

    if let Some(body) = first_child_of_kind(class_node, "class_body") {
        let mut cursor = body.walk();
        for member in body.children(&mut cursor) {
            if member.kind() != "method_definition" {
                continue;
            }
            let method_name = first_child_of_kind(member, "property_identifier")
                .map(|n| node_text(n, source).to_string())
                .unwrap_or_else(|| "anonymous".to_string());

            if method_name == "constructor" {
                continue;
            }

            let decorators = decorators_of(member, source);
            method_signatures.push(method_signature(member, source, &method_name));
            non_method_end = non_method_end.min(start_line(member).saturating_sub(1).max(1));

            method_chunks.push((member, method_name, decorators));
        }
    }

    let class_chunk_id = Uuid::new_v4().to_string();
    let class_chunk = Chunk {
        id: class_chunk_id.clone(),
        file_path: path.to_string(),
        chunk_type: ChunkType::ClassSignature,
        content: class_signature_content(class_node, source, import_block),
        parent_id: None,
        metadata: ChunkMetadata {
            start_line: start_line(class_node),
            end_line: non_method_end.max(start_line(class_node)),
            class_name: Some(class_name.clone()),
            method_name: None,
            decorators: class_decorators,
        },
        vector: None,
    };

    let method_result_chunks = method_chunks
        .into_iter()
        .map(|(member, method_name, decorators)| Chunk {
            id: Uuid::new_v4().to_string(),
            file_path: path.to_string(),
            chunk_type: ChunkType::Method,
            content: node_text(member, source).to_string(),
            parent_id: Some(class_chunk_id.clone()),
            metadata: ChunkMetadata {
                start_line: start_line(member),
                end_line: end_line(member),
                class_name: Some(class_name.clone()),
                method_name: Some(method_name),
                decorators,
            },
            vector: None,
        })
        .collect();

    let descriptor = ClassDescriptor {
        name: class_name,
        methods: method_signatures,
    };

    (class_chunk, method_result_chunks, descriptor)
}

/// Deterministic content for a class_signature chunk: the file's raw import
/// block, then the class header (decorators, `class Name {`), then each
/// property declaration and the first constructor in source order, then a
/// sentinel comment marking that methods are indexed as child chunks, then
/// the closing brace.
fn class_signature_content(class_node: tree_sitter::Node<'_>, source: &[u8], import_block: &str) -> String {
    let Some(body) = first_child_of_kind(class_node, "class_body") else {
        return node_text(class_node, source).to_string();
    };

    let header_end = body.start_byte();
    let header = std::str::from_utf8(&source[class_node.start_byte()..header_end]).unwrap_or("");

    let mut cursor = body.walk();
    let mut members = String::new();
    for member in body.children(&mut cursor) {
        let is_plain_method = member.kind() == "method_definition"
            && first_child_of_kind(member, "property_identifier")
                .map(|n| node_text(n, source) != "constructor")
                .unwrap_or(false);
        if is_plain_method {
            continue;
        }
        if member.kind() == "{" || member.kind() == "}" {
            continue;
        }
        members.push_str(node_text(member, source));
        members.push('\n');
    }

    let mut out = String::new();
    if !import_block.is_empty() {
        out.push_str(import_block);
        out.push_str("\n\n");
    }
    out.push_str(header);
    out.push_str("{\n");
    out.push_str(&members);
    out.push_str("// methods indexed separately as child chunks\n");
    out.push_str("}\n");
    out
}

fn method_signature(member: tree_sitter::Node<'_>, source: &[u8], name: &str) -> String {
    let params = first_child_of_kind(member, "formal_parameters")
        .map(|n| node_text(n, source).to_string())
        .unwrap_or_else(|| "()".to_string());
    let return_type = member
        .child_by_field_name("return_type")
        .map(|n| node_text(n, source).to_string())
        .unwrap_or_default();
    format!("{name}{params}{return_type};")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> IndexingConfig {
        IndexingConfig::default()
    }

    #[test]
    fn atomic_suffix_is_detected() {
        let cfg = config();
        assert!(is_atomic("src/user.dto.ts", &cfg));
        assert!(is_atomic("src/user.entity.ts", &cfg));
        assert!(!is_atomic("src/user.service.ts", &cfg));
    }

    #[test]
    fn test_spec_suffix_is_detected() {
        let cfg = config();
        assert!(is_test_spec("src/user.service.spec.ts", &cfg));
        assert!(!is_test_spec("src/user.service.ts", &cfg));
    }

    #[test]
    fn atomic_file_produces_single_file_chunk() {
        let cfg = config();
        let source = "export interface User {\n  id: string;\n}\n";
        let known = |_: &str| false;
        let result = analyze_file("src/user.dto.ts", source, &cfg, &known).expect("analyze");
        assert_eq!(result.chunks.len(), 1);
        assert_eq!(result.chunks[0].chunk_type, ChunkType::File);
        assert_eq!(result.skeleton, Skeleton::Full);
    }

    #[test]
    fn logic_file_splits_class_and_methods() {
        let cfg = config();
        let source = "import { Injectable } from '@nestjs/common';\n\n@Injectable()\nexport class UserService {\n  constructor(private repo: Repo) {}\n\n  findAll(): User[] {\n    return [];\n  }\n\n  findOne(id: string): User {\n    return this.repo.get(id);\n  }\n}\n";
        let known = |_: &str| false;
        let result = analyze_file("src/user.service.ts", source, &cfg, &known).expect("analyze");

        let class_chunks: Vec<_> = result
            .chunks
            .iter()
            .filter(|c| c.chunk_type == ChunkType::ClassSignature)
            .collect();
        let method_chunks: Vec<_> = result
            .chunks
            .iter()
            .filter(|c| c.chunk_type == ChunkType::Method)
            .collect();

        assert_eq!(class_chunks.len(), 1);
        assert_eq!(method_chunks.len(), 2);
        for method in &method_chunks {
            assert_eq!(method.parent_id.as_deref(), Some(class_chunks[0].id.as_str()));
        }
    }

    #[test]
    fn class_signature_content_includes_imports_and_sentinel() {
        let cfg = config();
        let source = "import { Injectable } from '@nestjs/common';\n\n@Injectable()\nexport class UserService {\n  constructor(private repo: Repo) {}\n\n  findAll(): User[] {\n    return [];\n  }\n}\n";
        let known = |_: &str| false;
        let result = analyze_file("src/user.service.ts", source, &cfg, &known).expect("analyze");
        let class_chunk = result
            .chunks
            .iter()
            .find(|c| c.chunk_type == ChunkType::ClassSignature)
            .expect("class chunk present");

        assert!(class_chunk.content.starts_with("import { Injectable } from '@nestjs/common';"));
        assert!(class_chunk.content.contains("class UserService"));
        assert!(class_chunk.content.contains("constructor(private repo: Repo) {}"));
        assert!(class_chunk.content.contains("// methods indexed separately as child chunks"));
        assert!(!class_chunk.content.contains("findAll"));
    }

    #[test]
    fn relative_import_produces_dependency_edge() {
        let cfg = config();
        let source = "import { UserService } from './user.service';\n\nexport class AppModule {}\n";
        let known = |p: &str| p == "src/user.service.ts";
        let result = analyze_file("src/app.module.ts", source, &cfg, &known).expect("analyze");
        assert_eq!(result.edges.len(), 1);
        assert_eq!(result.edges[0].target, "src/user.service.ts");
        assert_eq!(result.edges[0].relation, Relation::Import);
    }

    #[test]
    fn bare_package_import_is_not_a_dependency_edge() {
        let cfg = config();
        let source = "import { Injectable } from '@nestjs/common';\n\nexport class AppModule {}\n";
        let known = |_: &str| false;
        let result = analyze_file("src/app.module.ts", source, &cfg, &known).expect("analyze");
        assert!(result.edges.is_empty());
    }
}
