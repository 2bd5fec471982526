use thiserror::Error;
use tracing::warn;

/// Coarse classification used when reporting a failure to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is invalid; nothing was processed.
    MalformedRequest,
    /// The request was valid but analysing one of its videos failed.
    Processing,
}

#[derive(Debug, Error)]
pub enum PostureError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid video format: {0}. Supported formats: {1}")]
    UnsupportedFormat(String, String),

    #[error("File too large: {size} bytes, maximum is {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Invalid user metadata: {0}")]
    InvalidMetadata(String),

    #[error("Video processing error: could not open video {0}")]
    Decode(String),

    #[error("Video processing error: Insufficient pose detection quality")]
    InsufficientPoseQuality,

    #[error("Video processing error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PostureError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_)
            | Self::UnsupportedFormat(..)
            | Self::FileTooLarge { .. }
            | Self::InvalidMetadata(_) => ErrorKind::MalformedRequest,
            Self::Decode(_) | Self::InsufficientPoseQuality | Self::Internal(_) => ErrorKind::Processing,
        }
    }

    /// status_code returns the HTTP status a transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::FileTooLarge { .. } => 413,
            _ if self.kind() == ErrorKind::MalformedRequest => 400,
            _ => 422,
        }
    }

    pub fn is_malformed_request(&self) -> bool {
        self.kind() == ErrorKind::MalformedRequest
    }
}

impl From<std::io::Error> for PostureError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(anyhow::Error::new(err))
    }
}

/// log_error records a failed request at a level matching its kind.
pub fn log_error(error: &PostureError) {
    match error {
        PostureError::Internal(e) => warn!("Analysis -> internal error: {:?}", e),
        e if e.is_malformed_request() => warn!("Analysis -> rejected request: {}", e),
        e => warn!("Analysis -> processing failed: {}", e),
    }
}
