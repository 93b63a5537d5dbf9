//! Path normalization and relative-import resolution.
//!
//! All paths stored in the index are project-root-relative and use forward
//! slashes, regardless of host OS, so the database is portable and `LIKE`
//! queries behave consistently.

use std::path::{Component, Path, PathBuf};

use crate::error::{AtlasError, AtlasResult};

/// Candidate file extensions tried, in order, when resolving a bare import
/// specifier such as `./user.service`.
const CANDIDATE_EXTENSIONS: &[&str] = &["ts", "tsx"];

/// Normalize `path` (relative to `root`) into a forward-slash, root-relative
/// string. Returns `AtlasError::Argument` if the resulting path would escape
/// `root`.
pub fn normalize_relative(root: &Path, path: &Path) -> AtlasResult<String> {
    let relative = if path.is_absolute() {
        path.strip_prefix(root)
            .map_err(|_| AtlasError::Argument(format!("{} is outside project root", path.display())))?
    } else {
        path
    };

    let mut normalized = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(AtlasError::Argument(format!(
                        "{} escapes project root",
                        path.display()
                    )));
                }
            }
            Component::CurDir => {}
            Component::Normal(part) => normalized.push(part),
            Component::RootDir | Component::Prefix(_) => {
                return Err(AtlasError::Argument(format!(
                    "{} is not a relative path",
                    path.display()
                )));
            }
        }
    }

    Ok(normalized.to_string_lossy().replace('\\', "/"))
}

/// Verify that `candidate` (a root-relative, forward-slash path) stays
/// within the project root. Rejects any path containing a `..` segment.
pub fn is_contained(candidate: &str) -> bool {
    !candidate.split('/').any(|segment| segment == "..")
}

/// Flip native path separators to forward slashes, without touching an
/// already-normalized path. Used by store lookups so callers may pass either
/// form and still hit rows that are always persisted forward-slash.
pub fn to_forward_slash(path: &str) -> String {
    path.replace('\\', "/")
}

/// Resolve a relative import specifier written in `importing_file` to a
/// root-relative path, following the `file`, `<spec>.<ext>`, and
/// `<spec>/index.<ext>` barrel conventions. Returns `None` when no candidate
/// matches anything in `known_files`; callers must drop the edge in that case.
pub fn resolve_import(
    importing_file: &str,
    specifier: &str,
    known_files: &impl Fn(&str) -> bool,
) -> Option<String> {
    let importer_dir = Path::new(importing_file)
        .parent()
        .unwrap_or_else(|| Path::new(""));
    let joined = join_specifier(importer_dir, specifier);

    if known_files(&joined) {
        return Some(joined);
    }

    for ext in CANDIDATE_EXTENSIONS {
        let with_ext = format!("{joined}.{ext}");
        if known_files(&with_ext) {
            return Some(with_ext);
        }
    }

    for ext in CANDIDATE_EXTENSIONS {
        let barrel = format!("{joined}/index.{ext}");
        if known_files(&barrel) {
            return Some(barrel);
        }
    }

    None
}

fn join_specifier(base_dir: &Path, specifier: &str) -> String {
    let mut result = base_dir.to_path_buf();
    for segment in specifier.split('/') {
        match segment {
            "." | "" => {}
            ".." => {
                result.pop();
            }
            other => result.push(other),
        }
    }
    result.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_root_and_flips_separators() {
        let root = Path::new("/project");
        let path = Path::new("/project/src/app.module.ts");
        assert_eq!(normalize_relative(root, path).unwrap(), "src/app.module.ts");
    }

    #[test]
    fn normalize_rejects_escape() {
        let root = Path::new("/project");
        let path = Path::new("../outside.ts");
        assert!(normalize_relative(root, path).is_err());
    }

    #[test]
    fn is_contained_rejects_dotdot() {
        assert!(!is_contained("src/../../etc/passwd"));
        assert!(is_contained("src/app.module.ts"));
    }

    #[test]
    fn to_forward_slash_flips_native_separators() {
        assert_eq!(to_forward_slash("src\\app.module.ts"), "src/app.module.ts");
        assert_eq!(to_forward_slash("src/app.module.ts"), "src/app.module.ts");
    }

    #[test]
    fn resolve_import_prefers_exact_file() {
        let known = |p: &str| p == "src/user.service.ts";
        let resolved = resolve_import("src/app.module.ts", "./user.service", &known);
        assert_eq!(resolved, Some("src/user.service.ts".to_string()));
    }

    #[test]
    fn resolve_import_falls_back_to_barrel() {
        let known = |p: &str| p == "src/users/index.ts";
        let resolved = resolve_import("src/app.module.ts", "./users", &known);
        assert_eq!(resolved, Some("src/users/index.ts".to_string()));
    }

    #[test]
    fn resolve_import_is_none_when_unresolved() {
        let known = |_: &str| false;
        let resolved = resolve_import("src/app.module.ts", "./missing", &known);
        assert_eq!(resolved, None);
    }
}
