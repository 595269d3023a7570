use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process unavailable: {0}")]
    ProcessUnavailable(String),

    #[error("Access violation reading {len} bytes at {address:#x}: {message}")]
    AccessViolation {
        address: u64,
        len: usize,
        message: String,
    },

    #[error("Layout mismatch: {0}")]
    LayoutMismatch(String),

    #[error("Process context already released")]
    ContextClosed,

    #[error("Invalid game state: {0}")]
    InvalidGameState(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn access_violation(address: u64, len: usize, message: impl Into<String>) -> Self {
        Error::AccessViolation {
            address,
            len,
            message: message.into(),
        }
    }

    /// Whether the failure is local to one record (room, unit) and the
    /// enclosing read cycle may carry on without it.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::AccessViolation { .. })
    }

    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
