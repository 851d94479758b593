use thiserror::Error;

#[derive(Error, Debug)]
pub enum EufyError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Authentication required: {0}")]
    AuthRequired(String),

    #[error("Verification required: {0}")]
    VerificationRequired(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EufyError>;

impl From<serde_json::Error> for EufyError {
    fn from(err: serde_json::Error) -> Self {
        EufyError::Protocol(err.to_string())
    }
}

impl EufyError {
    /// Whether the caller can act on this error without giving up
    /// (log in again, supply a code, pick another device).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EufyError::AuthRequired(_)
                | EufyError::VerificationRequired(_)
                | EufyError::DeviceNotFound(_)
        )
    }
}
