use thiserror::Error;

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("residue not found: {0}")]
    ResidueNotFound(String),

    #[error("pattern not found: {0}")]
    PatternNotFound(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("unsupported snapshot version: {0}")]
    UnsupportedVersion(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FieldError>;
