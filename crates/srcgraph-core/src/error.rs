use thiserror::Error;

#[derive(Error, Debug)]
pub enum SrcGraphError {
    #[error("invalid project path: {0}")]
    PathInvalid(String),

    #[error("package loading failed: {}", .0.join("; "))]
    LoadFailed(Vec<String>),

    #[error("type information unavailable: {0}")]
    TypeCheckFailed(String),

    #[error("parse failed for {file}: {message}")]
    ParseFailed { file: String, message: String },

    #[error("graph build failed: {0}")]
    BuildFailed(String),

    #[error("graph sink rejected operation: {0}")]
    SinkFailed(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SrcGraphError>;
