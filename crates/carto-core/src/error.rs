/// Unified error type for carto.
#[derive(Debug, thiserror::Error)]
pub enum CartoError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Extraction error: {0}")]
    Extract(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown {taxonomy} kind: {name}")]
    UnknownKind { taxonomy: &'static str, name: String },

    #[error("Invalid kind name: {0}")]
    InvalidKindName(String),

    #[error("Invalid direction: {0}")]
    InvalidDirection(String),

    #[error("Invalid visibility: {0}")]
    InvalidVisibility(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
