//! Protocol error types for the UDS protocol layer.
//!
//! Structured error types for protocol-level failures, so callers can
//! branch on the failure mode: transport errors propagate and end the
//! session, malformed frames and payloads are fatal, and ordering
//! violations never appear here at all (they end the session as a clean
//! close, by contract).

use std::io;

use forgeline_core::envelope::EnvelopeError;
use thiserror::Error;

/// Maximum frame size in bytes (16 MiB).
///
/// Frames above this size are rejected before allocation.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Protocol errors for the UDS protocol layer.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame exceeds maximum allowed size.
    ///
    /// Detected from the length prefix BEFORE allocation.
    #[error("frame too large: {size} bytes exceeds maximum {max} bytes")]
    FrameTooLarge {
        /// Actual frame size from the length prefix.
        size: usize,
        /// Maximum allowed frame size.
        max: usize,
    },

    /// Frame data is invalid: empty, unknown tag, or trailing garbage.
    #[error("invalid frame: {reason}")]
    InvalidFrame {
        /// Description of the framing error.
        reason: String,
    },

    /// A required message field was absent.
    #[error("missing field: {field}")]
    MissingField {
        /// Name of the absent field.
        field: &'static str,
    },

    /// A nested self-describing payload could not be unwrapped.
    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    /// A frame payload could not be decoded as the expected message.
    #[error("decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Underlying I/O error from the transport.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ProtocolError {
    /// Create a frame too large error.
    #[must_use]
    pub const fn frame_too_large(size: usize, max: usize) -> Self {
        Self::FrameTooLarge { size, max }
    }

    /// Create an invalid frame error.
    #[must_use]
    pub fn invalid_frame(reason: impl Into<String>) -> Self {
        Self::InvalidFrame {
            reason: reason.into(),
        }
    }

    /// Create a missing field error.
    #[must_use]
    pub const fn missing_field(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    /// Returns `true` if this error indicates a protocol violation by the
    /// peer rather than an environmental failure.
    #[must_use]
    pub const fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::FrameTooLarge { .. }
                | Self::InvalidFrame { .. }
                | Self::MissingField { .. }
                | Self::Envelope(_)
                | Self::Decode(_)
        )
    }
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_too_large_error() {
        let err = ProtocolError::frame_too_large(20_000_000, MAX_FRAME_SIZE);
        assert!(err.is_protocol_violation());

        let msg = err.to_string();
        assert!(msg.contains("20000000"));
        assert!(msg.contains(&MAX_FRAME_SIZE.to_string()));
    }

    #[test]
    fn test_io_error_is_not_a_violation() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        let err = ProtocolError::from(io_err);
        assert!(!err.is_protocol_violation());
    }

    #[test]
    fn test_missing_field_error() {
        let err = ProtocolError::missing_field("ordered_build_event");
        assert!(err.is_protocol_violation());
        assert!(err.to_string().contains("ordered_build_event"));
    }
}
