use thiserror::Error;

/// Errors that can occur while mirroring a repository
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Not found on remote: {path}")]
    NotFound { path: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rate limited by remote service: {message}")]
    RateLimited { message: String },

    #[error("Access denied by remote service: {message}")]
    Unauthorized { message: String },

    #[error("Invalid remote structure: {message}")]
    InvalidStructure { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("State error: {message}")]
    State { message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Refusing to write outside destination: {path}")]
    UnsafePath { path: String },
}

/// Result type alias for mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;
