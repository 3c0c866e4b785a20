//! Shared test infrastructure for engine integration tests
//!
//! Provides a mock transport that records outbound frames in memory and
//! helpers for building connected engines and wire-format fixtures.

#![allow(dead_code)]

use kodilink_client::{KodiEngine, Transport};
use kodilink_core::Result;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Transport double that records every outbound frame
pub struct MockTransport {
    frames: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            frames: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Every frame sent so far, in order.
    pub fn sent(&self) -> Vec<String> {
        self.frames.lock().unwrap().clone()
    }

    /// Method field of every sent frame, in order.
    pub fn sent_methods(&self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|frame| {
                let value: Value = serde_json::from_str(frame.trim_end()).ok()?;
                Some(value["method"].as_str()?.to_string())
            })
            .collect()
    }

    /// Decoded params of the nth sent frame.
    pub fn sent_params(&self, index: usize) -> Value {
        let frames = self.sent();
        let value: Value = serde_json::from_str(frames[index].trim_end()).unwrap();
        value["params"].clone()
    }

    /// Forget all recorded frames.
    pub fn clear(&self) {
        self.frames.lock().unwrap().clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    fn send(&self, frame: String) -> Result<()> {
        self.frames.lock().unwrap().push(frame);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Install a test subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Connected engine with a short reply window and no init burst
pub async fn connected_engine() -> (KodiEngine, Arc<MockTransport>) {
    connected_engine_with_retries(2).await
}

/// Same as [`connected_engine`] with an explicit retry budget
pub async fn connected_engine_with_retries(retries: u32) -> (KodiEngine, Arc<MockTransport>) {
    init_tracing();
    let engine = KodiEngine::builder()
        .send_retries(retries)
        .reply_timeout(Duration::from_millis(200))
        .init_commands(false)
        .build();
    let transport = MockTransport::new();
    engine.bind_transport(transport.clone());
    engine.connection_established().await;
    (engine, transport)
}

/// Wire frame for a successful reply
pub fn reply_frame(id: &str, result: Value) -> String {
    json!({"jsonrpc": "2.0", "id": id, "result": result}).to_string()
}

/// Wire frame for an error reply
pub fn error_reply_frame(id: &str, code: i64, message: &str) -> String {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}}).to_string()
}

/// Wire frame for an unsolicited push
pub fn push_frame(method: &str, params: Option<Value>) -> String {
    match params {
        Some(params) => json!({"jsonrpc": "2.0", "method": method, "params": params}).to_string(),
        None => json!({"jsonrpc": "2.0", "method": method}).to_string(),
    }
}

/// Push the device would never send; drives a retry cycle without
/// touching any listener state.
pub fn nudge_frame() -> String {
    push_frame("Player.OnSeek", None)
}
