use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gotham_core::error::{DeviceError, GothamError};

// ---------------------------------------------------------------------------
// Internal sentinels for explicit status codes
// ---------------------------------------------------------------------------

/// Carries an explicit HTTP status through the `anyhow::Error` chain.
#[derive(Debug)]
struct StatusError {
    status: StatusCode,
    message: String,
}

impl std::fmt::Display for StatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StatusError {}

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    fn with_status(status: StatusCode, msg: impl Into<String>) -> Self {
        Self(
            StatusError {
                status,
                message: msg.into(),
            }
            .into(),
        )
    }

    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    /// Construct a 503 Service Unavailable error for unconfigured integrations.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::with_status(StatusCode::SERVICE_UNAVAILABLE, msg)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if let Some(s) = self.0.downcast_ref::<StatusError>() {
            s.status
        } else if let Some(e) = self.0.downcast_ref::<DeviceError>() {
            match e {
                DeviceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                DeviceError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                DeviceError::Transport(_)
                | DeviceError::VendorRejected { .. }
                | DeviceError::Malformed(_) => StatusCode::BAD_GATEWAY,
            }
        } else if let Some(e) = self.0.downcast_ref::<GothamError>() {
            match e {
                GothamError::MissingConfig(_) => StatusCode::SERVICE_UNAVAILABLE,
                GothamError::ConfigNotFound(_)
                | GothamError::InvalidConfig(_)
                | GothamError::Io(_)
                | GothamError::Yaml(_)
                | GothamError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
