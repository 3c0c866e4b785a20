//! Error types for kodilink
//!
//! Two error types live here:
//!
//! - **Error**: application-level errors for internal use (thiserror)
//! - **RpcErrorData**: the wire-format error object a device reply carries
//!
//! # Propagation Policy
//!
//! The dispatch engine is deliberately best-effort: no error from this
//! module ever reaches a `send_command` caller. Failures surface as an
//! absent reply plus a log entry. The `Error` type exists for the seams
//! where a `Result` is still the right contract — the codec, the
//! transport, and the builder.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for kodilink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Application-level error type
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The device actively rejected a command (wire-format error object)
    #[error("device error: {0}")]
    Device(#[from] RpcErrorData),

    /// An inbound fragment could not be parsed as JSON-RPC
    ///
    /// The offending fragment is logged and skipped; processing continues
    /// with the remaining fragments of the same batch.
    #[error("malformed frame: {0}")]
    Frame(String),

    /// Serialization of an outbound request failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The underlying TCP stream failed or is gone
    #[error("transport error: {0}")]
    Transport(String),

    /// No transport is currently bound or the connection is closed
    #[error("not connected")]
    NotConnected,
}

/// JSON-RPC 2.0 error object as carried in a reply's `error` field
///
/// # Examples
///
/// ```rust
/// use kodilink_core::RpcErrorData;
///
/// let err: RpcErrorData = serde_json::from_str(
///     r#"{"code":-32601,"message":"Method not found"}"#
/// ).unwrap();
/// assert_eq!(err.code, -32601);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("{message} (code {code})")]
pub struct RpcErrorData {
    /// Numeric error code per the JSON-RPC 2.0 specification
    pub code: i64,
    /// Human-readable error description
    pub message: String,
    /// Optional additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}
