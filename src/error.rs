//! Error Types

use thiserror::Error;

/// Main error type
///
/// Each pipeline stage produces exactly one kind; the orchestrator passes
/// them through untouched so callers can map them to responses.
#[derive(Debug, Clone, Error)]
pub enum SlowReverbError {
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },
    #[error("Unsupported format: {message}")]
    UnsupportedFormat { message: String },
    #[error("Encoding error: {message}")]
    Encoding { message: String },
    #[error("{message}")]
    DurationExceeded { message: String },
    #[error("Config error: {message}")]
    Config { message: String },
    #[error("IO error: {message}")]
    Io { message: String },
}

impl SlowReverbError {
    pub fn invalid_parameter<S: Into<String>>(msg: S) -> Self { Self::InvalidParameter { message: msg.into() } }
    pub fn unsupported_format<S: Into<String>>(msg: S) -> Self { Self::UnsupportedFormat { message: msg.into() } }
    pub fn encoding<S: Into<String>>(msg: S) -> Self { Self::Encoding { message: msg.into() } }
    pub fn duration_exceeded<S: Into<String>>(msg: S) -> Self { Self::DurationExceeded { message: msg.into() } }
    pub fn config<S: Into<String>>(msg: S) -> Self { Self::Config { message: msg.into() } }
    pub fn io<S: Into<String>>(msg: S) -> Self { Self::Io { message: msg.into() } }

    /// Short machine-readable tag, used in logs and error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::Encoding { .. } => "encoding_error",
            Self::DurationExceeded { .. } => "duration_exceeded",
            Self::Config { .. } => "config",
            Self::Io { .. } => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, SlowReverbError>;

impl From<std::io::Error> for SlowReverbError {
    fn from(err: std::io::Error) -> Self { Self::io(err.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = SlowReverbError::invalid_parameter("speed");
        assert!(e.to_string().contains("Invalid parameter"));

        let e = SlowReverbError::duration_exceeded("Audio file too long");
        assert_eq!(e.to_string(), "Audio file too long");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(SlowReverbError::encoding("x").kind(), "encoding_error");
        assert_eq!(SlowReverbError::unsupported_format("x").kind(), "unsupported_format");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let e: SlowReverbError = io.into();
        assert!(matches!(e, SlowReverbError::Io { .. }));
    }
}
