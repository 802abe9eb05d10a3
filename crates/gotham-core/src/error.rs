use thiserror::Error;

#[derive(Debug, Error)]
pub enum GothamError {
    #[error("config file not found: {0}")]
    ConfigNotFound(String),

    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GothamError>;

/// Failure of a single device command. Produced at the client boundary and
/// never allowed to abort a celebration.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("vendor rejected request (http {status}, code {code:?}): {message}")]
    VendorRejected {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("malformed vendor response: {0}")]
    Malformed(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl DeviceError {
    /// True when the command never left the process.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, DeviceError::InvalidInput(_))
    }
}
