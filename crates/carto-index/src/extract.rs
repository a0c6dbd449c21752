//! Single-file extraction: decoding, language dispatch.

use crate::digest::content_digest;
use crate::languages::{LanguageExtractor, EXTRACTORS};
use carto_core::{CartoError, ExtractionResult};
use std::path::Path;

/// Look up the extractor for a file extension (without the dot).
pub fn extractor_for_extension(ext: &str) -> Option<&'static (dyn LanguageExtractor + Sync)> {
    let ext = ext.to_lowercase();
    EXTRACTORS
        .iter()
        .find(|e| e.extensions().contains(&ext.as_str()))
        .copied()
}

/// Canonical names of all supported languages, sorted.
pub fn supported_languages() -> Vec<&'static str> {
    let mut langs: Vec<&'static str> = EXTRACTORS.iter().map(|e| e.language()).collect();
    langs.sort_unstable();
    langs
}

/// All file extensions handled, without the leading dot.
pub fn supported_extensions() -> Vec<&'static str> {
    EXTRACTORS.iter().flat_map(|e| e.extensions()).copied().collect()
}

/// Decode raw file bytes to text.
///
/// Strict UTF-8 first (with BOM tolerance). On invalid UTF-8, bytes
/// containing NUL are rejected as binary; anything else falls back to
/// Latin-1, which accepts any byte sequence.
fn decode(bytes: &[u8], file_path: &str) -> Result<String, CartoError> {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(s.to_string()),
        Err(_) => {
            if bytes.contains(&0) {
                Err(CartoError::Extract(format!(
                    "undecodable file (binary content): {file_path}"
                )))
            } else {
                Ok(bytes.iter().map(|&b| b as char).collect())
            }
        }
    }
}

/// Extract declarations from raw file bytes.
///
/// `file_path` is the sync-root-relative path that seeds every node id.
/// Unsupported extensions and undecodable content come back as an empty
/// result carrying a per-file error, never a hard failure.
pub fn extract_bytes(bytes: &[u8], file_path: &str) -> ExtractionResult {
    let ext = file_path.rsplit('.').next().unwrap_or("");
    let Some(extractor) = extractor_for_extension(ext) else {
        return ExtractionResult::with_error(
            file_path,
            format!("unsupported file type: {file_path}"),
        );
    };

    let file_hash = content_digest(bytes);
    match decode(bytes, file_path) {
        Ok(source) => extractor.extract(&source, file_path, &file_hash),
        Err(e) => ExtractionResult::with_error(file_path, e.to_string()),
    }
}

/// Extract declarations from a file on disk.
///
/// `rel_path` is the path recorded in node ids (relative to the sync root);
/// `path` is where the bytes actually live. An unreadable file is a hard
/// error here; callers walking a tree turn it into a per-file error.
pub fn extract_file(path: &Path, rel_path: &str) -> Result<ExtractionResult, CartoError> {
    let bytes = std::fs::read(path)?;
    Ok(extract_bytes(&bytes, rel_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_by_extension() {
        let py = extract_bytes(b"def foo():\n    pass\n", "a.py");
        assert_eq!(py.language, "python");
        assert!(py.errors.is_empty());

        let ts = extract_bytes(b"export function f() {}\n", "a.ts");
        assert_eq!(ts.language, "typescript");

        let go = extract_bytes(b"package main\nfunc main() {\n}\n", "main.go");
        assert_eq!(go.language, "go");
    }

    #[test]
    fn extension_lookup_is_case_insensitive() {
        assert!(extractor_for_extension("TSX").is_some());
        assert!(extractor_for_extension("rb").is_none());
    }

    #[test]
    fn unsupported_extension_is_a_per_file_error() {
        let result = extract_bytes(b"whatever", "notes.txt");
        assert!(result.nodes.is_empty());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn utf8_bom_is_tolerated() {
        let mut bytes = b"\xef\xbb\xbf".to_vec();
        bytes.extend_from_slice(b"def foo():\n    pass\n");
        let result = extract_bytes(&bytes, "a.py");
        assert!(result.errors.is_empty());
        assert!(result.nodes.iter().any(|n| n.name == "foo"));
    }

    #[test]
    fn latin1_fallback_decodes_non_utf8_text() {
        // 0xE9 is 'é' in Latin-1 and invalid as a lone UTF-8 byte.
        let bytes = b"# caf\xe9\ndef foo():\n    pass\n";
        let result = extract_bytes(bytes, "a.py");
        assert!(result.errors.is_empty());
        assert!(result.nodes.iter().any(|n| n.name == "foo"));
    }

    #[test]
    fn binary_content_is_a_per_file_error() {
        let bytes = b"\x00\x01\x02\xff\xfe";
        let result = extract_bytes(bytes, "a.py");
        assert!(result.nodes.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("undecodable"));
    }

    #[test]
    fn hash_is_over_raw_bytes() {
        let bytes = b"def foo():\n    pass\n";
        let result = extract_bytes(bytes, "a.py");
        assert_eq!(result.file_hash, crate::digest::content_digest(bytes));
    }

    #[test]
    fn supported_languages_are_distinct() {
        let langs = supported_languages();
        assert_eq!(langs.len(), 4);
        assert!(langs.contains(&"typescript"));
        assert!(langs.contains(&"go"));
    }
}
