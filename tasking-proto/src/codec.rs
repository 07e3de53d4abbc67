//! JSON encoding and decoding for API payloads.
//!
//! Thin wrappers over `serde_json` so that every caller reports payload
//! problems through the same [`CodecError`].

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::activity::ActivitySnapshot;
use crate::project::{Project, UserDetails};
use crate::task::TaskCollection;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// The payload is not valid JSON or does not match the expected shape.
    #[error("invalid {what} payload: {reason}")]
    InvalidPayload {
        /// Which payload was being decoded.
        what: &'static str,
        /// Parser message.
        reason: String,
    },
}

/// Encodes any payload as JSON bytes.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the value cannot be serialized.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(value).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a JSON payload, tagging failures with `what`.
///
/// # Errors
///
/// Returns `CodecError::InvalidPayload` if the bytes do not decode.
pub fn decode<T: DeserializeOwned>(what: &'static str, bytes: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::InvalidPayload {
        what,
        reason: e.to_string(),
    })
}

/// Decodes a project task collection.
///
/// # Errors
///
/// Returns `CodecError::InvalidPayload` on malformed input.
pub fn decode_tasks(bytes: &[u8]) -> Result<TaskCollection, CodecError> {
    decode("tasks", bytes)
}

/// Decodes a latest-activity feed.
///
/// # Errors
///
/// Returns `CodecError::InvalidPayload` on malformed input.
pub fn decode_activity(bytes: &[u8]) -> Result<ActivitySnapshot, CodecError> {
    decode("activity", bytes)
}

/// Decodes a project summary.
///
/// # Errors
///
/// Returns `CodecError::InvalidPayload` on malformed input.
pub fn decode_project(bytes: &[u8]) -> Result<Project, CodecError> {
    decode("project", bytes)
}

/// Decodes the current user's profile.
///
/// # Errors
///
/// Returns `CodecError::InvalidPayload` on malformed input.
pub fn decode_user(bytes: &[u8]) -> Result<UserDetails, CodecError> {
    decode("user", bytes)
}
