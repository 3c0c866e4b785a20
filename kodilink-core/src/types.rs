//! Wire types for the Kodi JSON-RPC 2.0 dialect
//!
//! Kodi speaks JSON-RPC 2.0 over a persistent, newline-terminated TCP
//! stream. This module defines the three message shapes that cross that
//! stream:
//!
//! 1. **Request**: an outbound call carrying an `id` for correlation
//! 2. **Reply**: an inbound response whose `id` matches a request
//! 3. **Push**: an unsolicited inbound event (`method` present, no `id`)
//!
//! # Request Keys
//!
//! The engine uses the **method name itself** as the request identifier
//! rather than a monotonically increasing counter. This means at most one
//! in-flight request per distinct method is tracked at a time: a newer
//! request for the same method coalesces with the queued one instead of
//! duplicating it. [`RequestKey`] is a tagged union so that this choice is
//! explicit at every use site and testable in isolation.

use crate::error::RpcErrorData;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Correlation key for an outbound request
///
/// The only scheme in use is [`RequestKey::Method`]: the identifier equals
/// the method name. Two consequences follow directly:
///
/// - enqueuing a second request for the same method **replaces** the
///   queued one in place rather than adding a duplicate, and
/// - a reply is attributed to whichever entry currently holds that
///   method name, which is unambiguous only because the dispatcher
///   serializes one awaited exchange at a time.
///
/// # Examples
///
/// ```rust
/// use kodilink_core::RequestKey;
///
/// let key = RequestKey::from("Player.GetActivePlayers");
/// assert_eq!(key.as_str(), "Player.GetActivePlayers");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestKey {
    /// Method-name-as-identifier scheme. Serializes as a bare JSON string.
    Method(String),
}

impl RequestKey {
    /// The identifier as sent on the wire.
    pub fn as_str(&self) -> &str {
        match self {
            RequestKey::Method(m) => m,
        }
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for RequestKey {
    fn from(s: String) -> Self {
        RequestKey::Method(s)
    }
}

impl From<&str> for RequestKey {
    fn from(s: &str) -> Self {
        RequestKey::Method(s.to_string())
    }
}

/// Outbound JSON-RPC 2.0 request
///
/// Serialized as `{"jsonrpc":"2.0","id":<method>,"method":...,"params":...}`
/// with `params` omitted entirely when `None`. Field order matches the
/// outbound frame layout the device expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version, always "2.0"
    pub jsonrpc: String,
    /// Correlation key; equal to the method name by construction
    pub id: RequestKey,
    /// Name of the remote method to invoke
    pub method: String,
    /// Optional parameters, omitted from the frame when `None`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl RpcRequest {
    /// Create a request whose id is derived from the method name
    ///
    /// # Examples
    ///
    /// ```rust
    /// use kodilink_core::RpcRequest;
    /// use serde_json::json;
    ///
    /// let req = RpcRequest::new(
    ///     "Application.SetVolume",
    ///     Some(json!({"volume": 42})),
    /// );
    /// assert_eq!(req.id.as_str(), "Application.SetVolume");
    /// ```
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        let method = method.into();
        Self {
            jsonrpc: "2.0".to_string(),
            id: RequestKey::Method(method.clone()),
            method,
            params,
        }
    }
}

/// Inbound JSON-RPC 2.0 reply, correlated to a request by `id`
///
/// Exactly one of `result` or `error` is present in practice; the device
/// actively rejecting a command (`error` set) is distinct from silence,
/// and only silence is ever retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcReply {
    /// JSON-RPC version, always "2.0"
    pub jsonrpc: String,
    /// Correlation key from the originating request
    pub id: RequestKey,
    /// Result payload on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error object when the device rejected the command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorData>,
}

impl RpcReply {
    /// Whether the device accepted the command.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Whether the device actively rejected the command.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Unsolicited server push (`method` present, no `id`)
///
/// Pushes announce device-side state changes (player started, volume
/// changed, screensaver). They are routed by method name and never touch
/// the pending queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcPush {
    /// JSON-RPC version, always "2.0"
    pub jsonrpc: String,
    /// Name of the pushed event
    pub method: String,
    /// Event payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// Any single decoded inbound message
///
/// Untagged: a fragment with an `id` field decodes as [`Inbound::Reply`],
/// one with only a `method` as [`Inbound::Push`]. Fragments matching
/// neither are malformed and reported by the codec.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Inbound {
    /// Response to a queued request
    Reply(RpcReply),
    /// Unsolicited event
    Push(RpcPush),
}

impl Inbound {
    /// Returns true for the `Reply` variant.
    pub fn is_reply(&self) -> bool {
        matches!(self, Inbound::Reply(_))
    }

    /// Returns true for the `Push` variant.
    pub fn is_push(&self) -> bool {
        matches!(self, Inbound::Push(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_key_roundtrip() {
        let key = RequestKey::from("JSONRPC.Ping");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"JSONRPC.Ping\"");

        let back: RequestKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_request_id_equals_method() {
        let req = RpcRequest::new("Input.Home", None);
        assert_eq!(req.id, RequestKey::from("Input.Home"));
        assert_eq!(req.method, "Input.Home");
    }

    #[test]
    fn test_request_serialization_omits_params() {
        let req = RpcRequest::new("JSONRPC.Ping", None);
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"id\":\"JSONRPC.Ping\""));
        assert!(!json.contains("\"params\""));
    }

    #[test]
    fn test_reply_success() {
        let json = r#"{"jsonrpc":"2.0","id":"JSONRPC.Ping","result":"pong"}"#;
        let reply: RpcReply = serde_json::from_str(json).unwrap();
        assert!(reply.is_success());
        assert_eq!(reply.id.as_str(), "JSONRPC.Ping");
    }

    #[test]
    fn test_inbound_discrimination() {
        let reply = r#"{"jsonrpc":"2.0","id":"JSONRPC.Ping","result":"pong"}"#;
        let push = r#"{"jsonrpc":"2.0","method":"Player.OnStop","params":{}}"#;

        assert!(serde_json::from_str::<Inbound>(reply).unwrap().is_reply());
        assert!(serde_json::from_str::<Inbound>(push).unwrap().is_push());
    }
}
