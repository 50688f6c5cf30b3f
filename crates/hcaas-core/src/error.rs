use std::time::Duration;

use thiserror::Error;

/// Response bodies kept in error messages are cut after this many bytes.
pub const MAX_BODY_SNIPPET: usize = 4096;

#[derive(Debug, Error)]
pub enum HcaasError {
    /// Host or token could not be determined; raised before any request.
    #[error("Connection resolution failed: {0}")]
    Resolution(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote event lock is held. Retried by the executor and only seen
    /// by callers as the last reason of a [`HcaasError::Timeout`].
    #[error("Event lock conflict: {0}")]
    LockConflict(String),

    #[error("Bad status code: {status}, body: {body:?}")]
    Api { status: u16, body: String },

    #[error("Timed out after {waited:?} ({attempts} attempts), last error: {last}")]
    Timeout {
        waited: Duration,
        attempts: u32,
        last: String,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Failed to encode request body: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HcaasError {
    pub fn api(status: u16, body: &str) -> Self {
        Self::Api {
            status,
            body: snippet(body),
        }
    }

    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockConflict(_))
    }

    /// HTTP status carried by an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HcaasError>;

fn snippet(body: &str) -> String {
    if body.len() <= MAX_BODY_SNIPPET {
        return body.to_string();
    }
    let mut end = MAX_BODY_SNIPPET;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes truncated)", &body[..end], body.len() - end)
}

/// Renders an error together with its whole `source()` chain, so markers
/// buried in an inner cause are still visible to substring checks.
pub(crate) fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut msg = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        msg.push_str(": ");
        msg.push_str(&inner.to_string());
        cause = inner.source();
    }
    msg
}
