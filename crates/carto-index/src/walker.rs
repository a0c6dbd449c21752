//! Directory walking with change detection.

use crate::digest::content_digest;
use crate::extract::{extract_bytes, extractor_for_extension};
use carto_core::{CartoError, WalkResult};
use ignore::WalkBuilder;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Directories never descended into, independent of ignore files.
pub const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "__pycache__",
    ".venv",
    "venv",
    "dist",
    "build",
    ".next",
    "coverage",
    "target",
];

/// Walk `root` and extract every supported source file.
///
/// With `incremental` set, files whose content digest matches the entry in
/// `known_hashes` (keyed by root-relative path) are skipped; their digest is
/// still carried into the result so the hash table stays complete. Per-file
/// failures (unreadable, undecodable) are collected as errors and the walk
/// continues. A missing root directory is the one hard error.
pub fn walk_directory(
    root: &Path,
    known_hashes: &HashMap<String, String>,
    incremental: bool,
    extra_ignored_dirs: &[String],
) -> Result<WalkResult, CartoError> {
    if !root.is_dir() {
        return Err(CartoError::DirectoryNotFound(root.display().to_string()));
    }

    // filter_entry needs an owned set (the predicate must be 'static).
    let ignored: HashSet<String> = IGNORED_DIRS
        .iter()
        .map(|s| s.to_string())
        .chain(extra_ignored_dirs.iter().cloned())
        .collect();

    let mut result = WalkResult::default();

    let walk = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_path(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            if !is_dir {
                return true;
            }
            entry
                .file_name()
                .to_str()
                .map_or(true, |name| !ignored.contains(name))
        })
        .build();

    for entry in walk {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                result.errors.push(e.to_string());
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if extractor_for_extension(ext).is_none() {
            continue;
        }

        let rel_path = match path.strip_prefix(root) {
            Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
            Err(_) => path.to_string_lossy().into_owned(),
        };

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(file = %rel_path, error = %e, "failed to read file");
                result.errors.push(format!("failed to read {rel_path}: {e}"));
                continue;
            }
        };

        let hash = content_digest(&bytes);
        if incremental && known_hashes.get(&rel_path) == Some(&hash) {
            result.files_skipped += 1;
            result.new_hashes.insert(rel_path, hash);
            continue;
        }

        let extraction = extract_bytes(&bytes, &rel_path);
        if !extraction.errors.is_empty() {
            for error in &extraction.errors {
                tracing::warn!(file = %rel_path, "{error}");
            }
            result.errors.extend(extraction.errors);
            continue;
        }

        result.nodes.extend(extraction.nodes);
        result.edges.extend(extraction.edges);
        result.new_hashes.insert(rel_path, hash);
        result.files_processed += 1;
    }

    tracing::debug!(
        root = %root.display(),
        processed = result.files_processed,
        skipped = result.files_skipped,
        errors = result.errors.len(),
        "walked directory"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    struct TempTree {
        root: PathBuf,
    }

    impl TempTree {
        fn new(tag: &str) -> Self {
            let root = std::env::temp_dir().join(format!(
                "carto_walker_{tag}_{}",
                std::process::id()
            ));
            let _ = fs::remove_dir_all(&root);
            fs::create_dir_all(&root).unwrap();
            Self { root }
        }

        fn write(&self, rel: &str, content: &str) {
            let path = self.root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
    }

    impl Drop for TempTree {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.root);
        }
    }

    #[test]
    fn missing_root_is_a_hard_error() {
        let err = walk_directory(
            Path::new("/nonexistent/carto/root"),
            &HashMap::new(),
            false,
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, CartoError::DirectoryNotFound(_)));
    }

    #[test]
    fn walks_supported_files_with_relative_paths() {
        let tree = TempTree::new("walks");
        tree.write("a.py", "def foo():\n    pass\n");
        tree.write("src/b.ts", "export function g() {}\n");
        tree.write("README.md", "# readme\n");

        let result = walk_directory(&tree.root, &HashMap::new(), false, &[]).unwrap();
        assert_eq!(result.files_processed, 2);
        let paths: HashSet<&str> = result.nodes.iter().map(|n| n.file_path.as_str()).collect();
        assert!(paths.contains("a.py"));
        assert!(paths.contains("src/b.ts"));
    }

    #[test]
    fn ignored_directories_are_pruned() {
        let tree = TempTree::new("pruned");
        tree.write("keep.py", "def k():\n    pass\n");
        tree.write("node_modules/lib.js", "function x() {}\n");
        tree.write("__pycache__/cached.py", "def c():\n    pass\n");
        tree.write(".git/hook.py", "def h():\n    pass\n");
        tree.write("custom_out/gen.py", "def g():\n    pass\n");

        let result = walk_directory(&tree.root, &HashMap::new(), false, &[]).unwrap();
        assert_eq!(result.files_processed, 2);

        let extra = vec!["custom_out".to_string()];
        let result = walk_directory(&tree.root, &HashMap::new(), false, &extra).unwrap();
        assert_eq!(result.files_processed, 1);
    }

    #[test]
    fn incremental_skips_unchanged_files() {
        let tree = TempTree::new("incr");
        tree.write("a.py", "def foo():\n    pass\n");
        tree.write("b.py", "def bar():\n    pass\n");

        let first = walk_directory(&tree.root, &HashMap::new(), true, &[]).unwrap();
        assert_eq!(first.files_processed, 2);

        tree.write("b.py", "def bar():\n    return 1\n");
        let second = walk_directory(&tree.root, &first.new_hashes, true, &[]).unwrap();
        assert_eq!(second.files_processed, 1);
        assert_eq!(second.files_skipped, 1);
        // Both hashes are carried forward, skipped or not.
        assert_eq!(second.new_hashes.len(), 2);
        assert!(second.nodes.iter().all(|n| n.file_path == "b.py"));
    }

    #[test]
    fn full_walk_ignores_known_hashes() {
        let tree = TempTree::new("full");
        tree.write("a.py", "def foo():\n    pass\n");

        let first = walk_directory(&tree.root, &HashMap::new(), true, &[]).unwrap();
        let full = walk_directory(&tree.root, &first.new_hashes, false, &[]).unwrap();
        assert_eq!(full.files_processed, 1);
        assert_eq!(full.files_skipped, 0);
    }

    #[test]
    fn undecodable_file_degrades_gracefully() {
        let tree = TempTree::new("binary");
        tree.write("good.py", "def ok():\n    pass\n");
        fs::write(tree.root.join("bad.py"), b"\x00\xff\xfe\x01").unwrap();

        let result = walk_directory(&tree.root, &HashMap::new(), false, &[]).unwrap();
        assert_eq!(result.files_processed, 1);
        assert_eq!(result.errors.len(), 1);
        // No hash is recorded for the failed file, so a later fix gets
        // picked up even by an incremental walk.
        assert!(!result.new_hashes.contains_key("bad.py"));
    }

    #[test]
    fn walk_order_is_deterministic() {
        let tree = TempTree::new("order");
        tree.write("z.py", "def z():\n    pass\n");
        tree.write("a.py", "def a():\n    pass\n");
        tree.write("m/mid.py", "def m():\n    pass\n");

        let first = walk_directory(&tree.root, &HashMap::new(), false, &[]).unwrap();
        let second = walk_directory(&tree.root, &HashMap::new(), false, &[]).unwrap();
        let ids = |r: &WalkResult| r.nodes.iter().map(|n| n.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }
}
