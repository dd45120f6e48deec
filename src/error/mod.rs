// Error types for the A/B pitch comparison engine
//
// This module defines custom error types for decode and playback operations,
// providing structured error handling with stable numeric codes suitable for
// logging and host-application display.

mod decode;
mod playback;

pub use decode::{log_decode_error, DecodeError, DecodeErrorCodes};
pub use playback::{PlaybackError, PlaybackErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages from
/// custom error types, enabling consistent error handling across module
/// boundaries.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
