//! Error kinds surfaced by the Contents sync routine.
//!
//! Remote failures keep the HTTP status and the response body verbatim so the
//! caller can show them as a diagnostic without further interpretation.

use reqwest::StatusCode;

/// Result alias for sync operations
pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Non-success response from the read endpoint
    #[error("remote read failed: {status} - {body}")]
    RemoteRead { status: StatusCode, body: String },

    /// Non-success response from the write endpoint, after recovery ran out
    #[error("remote write failed: {status} - {body}")]
    RemoteWrite { status: StatusCode, body: String },

    /// Connection-level failure (DNS, TLS, reset); not classified further
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The read response did not inline the file (too large, or an unknown encoding)
    #[error("content not inlined by the remote store: {0}")]
    UnsupportedEncoding(String),

    #[error("invalid transport encoding: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("stored content is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid remote location: {0}")]
    InvalidLocation(String),
}

impl SyncError {
    /// HTTP status carried by remote failures
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SyncError::RemoteRead { status, .. } | SyncError::RemoteWrite { status, .. } => {
                Some(*status)
            }
            SyncError::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// Response body carried by remote failures
    pub fn body(&self) -> Option<&str> {
        match self {
            SyncError::RemoteRead { body, .. } | SyncError::RemoteWrite { body, .. } => {
                Some(body.as_str())
            }
            _ => None,
        }
    }

    /// The document does not exist at the requested location
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::RemoteRead { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    /// The write was rejected because the version tag was stale or missing
    pub fn is_conflict(&self) -> bool {
        matches!(self, SyncError::RemoteWrite { status, .. } if is_conflict_status(*status))
    }
}

/// GitHub signals a stale or missing `sha` with either of these codes.
pub(crate) fn is_conflict_status(status: StatusCode) -> bool {
    status == StatusCode::CONFLICT || status == StatusCode::UNPROCESSABLE_ENTITY
}
