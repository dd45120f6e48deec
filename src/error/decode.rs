// Decode error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Decode error code constants
///
/// Single source of truth for the numeric codes attached to decode
/// failures, kept stable so host applications can match on them.
///
/// Error code range: 2001-2003
pub struct DecodeErrorCodes {}

impl DecodeErrorCodes {
    /// Input bytes are not a format the decoder understands
    pub const UNSUPPORTED_FORMAT: i32 = 2001;

    /// Input claimed a supported format but its payload is broken
    pub const MALFORMED: i32 = 2002;

    /// Decoded stream contained no samples
    pub const EMPTY_STREAM: i32 = 2003;
}

/// Log a decode error with structured context
///
/// The failing slot stays empty after a decode error; this logs the cause
/// so "unavailable" readouts in the UI can be traced back.
pub fn log_decode_error(err: &DecodeError, context: &str) {
    error!(
        "Decode error in {}: code={}, component=Decoder, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors produced while decoding user-supplied audio into sample buffers
///
/// These are the only errors surfaced to callers of `Engine::load_source`;
/// everything downstream degrades to an "unavailable" display state instead
/// of failing.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Input bytes are not a format the decoder understands
    UnsupportedFormat { details: String },

    /// Input claimed a supported format but its payload is broken
    Malformed { details: String },

    /// Decoded stream contained no samples
    EmptyStream,
}

impl ErrorCode for DecodeError {
    fn code(&self) -> i32 {
        match self {
            DecodeError::UnsupportedFormat { .. } => DecodeErrorCodes::UNSUPPORTED_FORMAT,
            DecodeError::Malformed { .. } => DecodeErrorCodes::MALFORMED,
            DecodeError::EmptyStream => DecodeErrorCodes::EMPTY_STREAM,
        }
    }

    fn message(&self) -> String {
        match self {
            DecodeError::UnsupportedFormat { details } => {
                format!("Unsupported audio format: {}", details)
            }
            DecodeError::Malformed { details } => {
                format!("Malformed audio data: {}", details)
            }
            DecodeError::EmptyStream => "Audio stream contained no samples".to_string(),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DecodeError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for DecodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_codes() {
        assert_eq!(
            DecodeError::UnsupportedFormat {
                details: "test".to_string()
            }
            .code(),
            DecodeErrorCodes::UNSUPPORTED_FORMAT
        );
        assert_eq!(
            DecodeError::Malformed {
                details: "test".to_string()
            }
            .code(),
            DecodeErrorCodes::MALFORMED
        );
        assert_eq!(
            DecodeError::EmptyStream.code(),
            DecodeErrorCodes::EMPTY_STREAM
        );
    }

    #[test]
    fn test_decode_error_messages() {
        let err = DecodeError::UnsupportedFormat {
            details: "not a wav".to_string(),
        };
        assert!(err.message().contains("not a wav"));

        let err = DecodeError::EmptyStream;
        assert!(err.message().contains("no samples"));
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::EmptyStream;
        let display = format!("{}", err);
        assert!(display.contains("EmptyStream"));
        assert!(display.contains(&err.code().to_string()));
    }
}
