//! Self-describing payload encapsulation.
//!
//! A [`TypedPayload`] carries serialized message bytes together with a type
//! URL, so a payload can be decoded without external schema context. The
//! build event stream uses it to nest tool events inside the generic event
//! envelope, and the operation encoder uses it for operation metadata and
//! execute responses.
//!
//! Encapsulation is bounded: payloads larger than [`MAX_PAYLOAD_SIZE`]
//! are refused in both directions, before any decode work is done.

use prost::Message;
use thiserror::Error;

/// Maximum encapsulated payload size in bytes (16 MiB).
///
/// Matches the transport frame cap; oversized payloads are refused at the
/// point of encapsulation, in both directions.
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// A serialized message together with the type URL identifying it.
#[derive(Clone, PartialEq, Message)]
pub struct TypedPayload {
    /// URL uniquely identifying the type of `value`.
    #[prost(string, tag = "1")]
    pub type_url: String,

    /// Serialized bytes of the message.
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

/// Messages that can travel inside a [`TypedPayload`].
pub trait TypedMessage: Message + Default {
    /// URL stamped on the envelope and verified on unpack.
    const TYPE_URL: &'static str;
}

impl TypedMessage for crate::wire::ToolBuildEvent {
    const TYPE_URL: &'static str = "type.forgeline.dev/forgeline.v1.ToolBuildEvent";
}

impl TypedMessage for crate::wire::ExecuteOperationMetadata {
    const TYPE_URL: &'static str = "type.forgeline.dev/forgeline.v1.ExecuteOperationMetadata";
}

impl TypedMessage for crate::wire::ExecuteResponse {
    const TYPE_URL: &'static str = "type.forgeline.dev/forgeline.v1.ExecuteResponse";
}

/// Errors from packing or unpacking a [`TypedPayload`].
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The payload exceeds [`MAX_PAYLOAD_SIZE`].
    #[error("payload too large: {size} bytes exceeds maximum {max} bytes")]
    PayloadTooLarge {
        /// Encoded payload size.
        size: usize,
        /// Maximum allowed payload size.
        max: usize,
    },

    /// The envelope's type URL does not match the requested type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Type URL of the requested type.
        expected: &'static str,
        /// Type URL found on the envelope.
        actual: String,
    },

    /// The payload bytes are not a valid message of the requested type.
    #[error("malformed payload: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// Encapsulates a message as a self-describing payload.
///
/// # Errors
///
/// Returns [`EnvelopeError::PayloadTooLarge`] if the encoded message exceeds
/// [`MAX_PAYLOAD_SIZE`].
pub fn pack<M: TypedMessage>(message: &M) -> Result<TypedPayload, EnvelopeError> {
    let size = message.encoded_len();
    if size > MAX_PAYLOAD_SIZE {
        return Err(EnvelopeError::PayloadTooLarge {
            size,
            max: MAX_PAYLOAD_SIZE,
        });
    }
    Ok(TypedPayload {
        type_url: M::TYPE_URL.to_string(),
        value: message.encode_to_vec(),
    })
}

/// Decodes a self-describing payload as the requested type.
///
/// # Errors
///
/// Returns [`EnvelopeError::TypeMismatch`] if the envelope carries a
/// different type, [`EnvelopeError::PayloadTooLarge`] if the payload exceeds
/// [`MAX_PAYLOAD_SIZE`], or [`EnvelopeError::Decode`] if the bytes do not
/// decode as `M`.
pub fn unpack<M: TypedMessage>(payload: &TypedPayload) -> Result<M, EnvelopeError> {
    if payload.type_url != M::TYPE_URL {
        return Err(EnvelopeError::TypeMismatch {
            expected: M::TYPE_URL,
            actual: payload.type_url.clone(),
        });
    }
    if payload.value.len() > MAX_PAYLOAD_SIZE {
        return Err(EnvelopeError::PayloadTooLarge {
            size: payload.value.len(),
            max: MAX_PAYLOAD_SIZE,
        });
    }
    M::decode(payload.value.as_slice()).map_err(EnvelopeError::from)
}
