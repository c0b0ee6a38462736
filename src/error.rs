use thiserror::Error;

/// Main error type for MovieRAG
#[derive(Error, Debug)]
pub enum MovieragError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Language model transport or response errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// The classifier asked for a lookup the router does not support.
    /// Fatal for the request; never mapped to an empty result.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A model call or store lookup exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Generated query rejected before execution
    #[error("Unsafe query: {0}")]
    UnsafeQuery(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using MovieragError
pub type Result<T> = std::result::Result<T, MovieragError>;
