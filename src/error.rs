use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, UupError>;

#[derive(Error, Debug)]
pub enum UupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Rate limited by {url} (HTTP 429)")]
    RateLimited { url: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("No Windows build found for channel '{channel}'")]
    NotFound { channel: String },

    #[error("Unexpected upstream response: {message}")]
    StructuralParse { message: String },

    #[error("Gave up after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<UupError>,
    },

    #[error("Configuration file not found: {path}")]
    ConfigMissing { path: PathBuf },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Archive {path} is corrupt: {message}")]
    ArchiveCorrupt { path: PathBuf, message: String },

    #[error("Post-processing failed: {message}")]
    PostProcess { message: String },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },
}

impl UupError {
    /// Whether a fresh attempt of the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            UupError::RateLimited { .. } | UupError::Transport { .. }
        )
    }

    pub fn parse_error<S: Into<String>>(message: S) -> Self {
        UupError::StructuralParse {
            message: message.into(),
        }
    }

    pub fn config_error<S: Into<String>>(message: S) -> Self {
        UupError::ConfigError {
            message: message.into(),
        }
    }

    pub fn archive_error<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Self {
        UupError::ArchiveCorrupt {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn transport_error<U: Into<String>, S: Into<String>>(url: U, message: S) -> Self {
        UupError::Transport {
            url: url.into(),
            message: message.into(),
        }
    }
}
