// Playback error types and constants

use crate::error::ErrorCode;
use std::fmt;

/// Playback error code constants
///
/// Error code range: 1001-1003
pub struct PlaybackErrorCodes {}

impl PlaybackErrorCodes {
    /// Sink is already playing a scheduled pair
    pub const ALREADY_STARTED: i32 = 1001;

    /// Failed to open the audio output stream
    pub const STREAM_OPEN_FAILED: i32 = 1002;

    /// Output hardware rejected an operation
    pub const HARDWARE_ERROR: i32 = 1003;
}

/// Errors produced by the playback sink
///
/// None of these are fatal to the engine: `AlreadyStarted` is swallowed by
/// the transport (a harmless double-invocation), the others leave the
/// transport stopped and the display in its degraded state.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// Sink is already playing a scheduled pair
    AlreadyStarted,

    /// Failed to open the audio output stream
    StreamOpenFailed { reason: String },

    /// Output hardware rejected an operation
    HardwareError { details: String },
}

impl ErrorCode for PlaybackError {
    fn code(&self) -> i32 {
        match self {
            PlaybackError::AlreadyStarted => PlaybackErrorCodes::ALREADY_STARTED,
            PlaybackError::StreamOpenFailed { .. } => PlaybackErrorCodes::STREAM_OPEN_FAILED,
            PlaybackError::HardwareError { .. } => PlaybackErrorCodes::HARDWARE_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            PlaybackError::AlreadyStarted => {
                "Playback already scheduled. Call stop() first.".to_string()
            }
            PlaybackError::StreamOpenFailed { reason } => {
                format!("Failed to open audio output stream: {}", reason)
            }
            PlaybackError::HardwareError { details } => {
                format!("Audio output error: {}", details)
            }
        }
    }
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PlaybackError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for PlaybackError {}
