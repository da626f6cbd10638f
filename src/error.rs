use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("cannot read input file {}: {source}", path.display())]
    InputAccess {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid column index: {token:?}")]
    ParseIndex { token: String },

    #[error("column index {index} exceeds row of {width} field(s)")]
    OutOfRange { index: usize, width: usize },

    #[error("search backend error: {0}")]
    Backend(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("pipeline task failed: {0}")]
    Join(String),
}

impl Error {
    /// Whether the error was raised before any job was issued.
    pub fn is_startup(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::InputAccess { .. }
                | Error::ParseIndex { .. }
        )
    }
}
