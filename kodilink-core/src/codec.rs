//! Codec for the Kodi text-stream framing
//!
//! Outbound frames are compact JSON terminated by CRLF. Inbound data is
//! messier: the device delivers one or more JSON objects that may be
//! concatenated **without any separator** (a `}{` boundary), and a known
//! server quirk occasionally repeats an identical fragment inside the
//! same batch. The inbound pipeline is therefore:
//!
//! 1. [`split_frames`] — cut the raw text on every `}{` boundary
//! 2. [`dedup_frames`] — drop repeated fragments, keeping first-seen order
//! 3. [`decode`] — parse one fragment into an [`Inbound`] message
//!
//! A fragment that fails to parse yields [`Error::Frame`] so the caller
//! can log it and continue with the rest of the batch.

use crate::error::{Error, Result};
use crate::types::{Inbound, RpcRequest};

/// Terminator appended to every outbound frame
pub const FRAME_TERMINATOR: &str = "\r\n";

/// Encode a request as a compact JSON frame with CRLF terminator
///
/// # Examples
///
/// ```rust
/// use kodilink_core::{codec, RpcRequest};
///
/// let frame = codec::encode_request(&RpcRequest::new("JSONRPC.Ping", None)).unwrap();
/// assert!(frame.ends_with("\r\n"));
/// assert!(frame.contains("\"id\":\"JSONRPC.Ping\""));
/// ```
pub fn encode_request(req: &RpcRequest) -> Result<String> {
    let mut frame =
        serde_json::to_string(req).map_err(|e| Error::Serialization(e.to_string()))?;
    frame.push_str(FRAME_TERMINATOR);
    Ok(frame)
}

/// Split a raw inbound batch on `}{` boundaries
///
/// The device concatenates complete JSON objects back to back when
/// several messages are in flight, so `}{` only ever occurs between two
/// objects. A literal `}{` inside a string value is not distinguished;
/// the device does not produce one in practice.
pub fn split_frames(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if !trimmed.contains("}{") {
        return vec![trimmed.to_string()];
    }

    let parts: Vec<&str> = trimmed.split("}{").collect();
    let last = parts.len() - 1;
    parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            let mut frame = String::with_capacity(part.len() + 2);
            if i > 0 {
                frame.push('{');
            }
            frame.push_str(part);
            if i < last {
                frame.push('}');
            }
            frame
        })
        .collect()
}

/// Drop identical fragments from a batch, preserving first-seen order
///
/// The device is known to occasionally emit the same object twice within
/// one batch; processing it twice would double listener notifications.
pub fn dedup_frames(frames: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    frames
        .into_iter()
        .filter(|frame| {
            let fresh = seen.insert(frame.clone());
            if !fresh {
                tracing::debug!(frame = %frame, "dropping duplicate fragment from batch");
            }
            fresh
        })
        .collect()
}

/// Decode a single fragment into an inbound message
///
/// A fragment with an `id` field becomes [`Inbound::Reply`]; one with a
/// `method` but no `id` becomes [`Inbound::Push`]. Anything else is a
/// malformed frame.
pub fn decode(fragment: &str) -> Result<Inbound> {
    // Two-step decode: parse the JSON first so a structural mismatch is
    // distinguishable from invalid JSON in the log line.
    let value: serde_json::Value =
        serde_json::from_str(fragment).map_err(|e| Error::Frame(format!("invalid JSON: {e}")))?;
    serde_json::from_value(value)
        .map_err(|e| Error::Frame(format!("not a JSON-RPC reply or push: {e}")))
}
