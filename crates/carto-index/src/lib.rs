//! carto-index: structural extraction and incremental sync.
//!
//! Walks a project tree, extracts declarations and relationships from
//! supported source files with per-language pattern tables, and merges the
//! result into a [`carto_storage::Store`] through the [`sync::SyncEngine`].

pub mod digest;
pub mod extract;
pub mod languages;
pub mod sync;
pub mod walker;

pub use extract::{extract_bytes, extract_file, supported_extensions, supported_languages};
pub use sync::SyncEngine;
pub use walker::{walk_directory, IGNORED_DIRS};
