use http::StatusCode;
use thiserror::Error;

/// Errors raised by the CSRF protocol.
///
/// Only [`CsrfError::InvalidToken`] is a client fault. Every other variant
/// means the host wired the protection incorrectly and maps to a 500.
#[derive(Error, Debug)]
pub enum CsrfError {
    #[error("Invalid CSRF token")]
    InvalidToken,

    #[error("Invalid CSRF option: {0}")]
    InvalidOption(String),

    #[error("No CSRF secret exists for this request")]
    MissingSecret,

    #[error("No session exists for this request (looked under '{0}')")]
    NoSession(String),

    #[error("No cookie jar exists for this request")]
    NoCookieJar,

    #[error("Signed CSRF cookies require a cookie signing secret")]
    MissingSigningSecret,

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CsrfError {
    /// Whether this error is a deployment/wiring defect rather than a client action.
    pub fn is_configuration_fault(&self) -> bool {
        !matches!(self, CsrfError::InvalidToken)
    }

    /// HTTP status a host should answer with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CsrfError::InvalidToken => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, CsrfError>;
