//! Retry discipline integration tests
//!
//! Each inbound batch runs exactly one retry cycle over the head of the
//! pending queue. An unrelated push frame is used to drive cycles
//! without disturbing queue or listener state.

mod common;

use common::{connected_engine_with_retries, nudge_frame, reply_frame};
use serde_json::json;

#[tokio::test]
async fn test_unanswered_command_is_resent_then_dropped() {
    let (engine, transport) = connected_engine_with_retries(2).await;

    engine.send_command("JSONRPC.Ping", None, false).await;
    assert_eq!(transport.sent().len(), 1);

    // Two cycles within budget: resend each time.
    engine.handle_data(&nudge_frame()).await;
    assert_eq!(transport.sent().len(), 2);
    engine.handle_data(&nudge_frame()).await;
    assert_eq!(transport.sent().len(), 3);

    // Third cycle exhausts the budget: dropped, nothing resent.
    engine.handle_data(&nudge_frame()).await;
    assert_eq!(transport.sent().len(), 3);
    assert_eq!(engine.pending_count().await, 0);
}

#[tokio::test]
async fn test_drop_promotes_next_command_immediately() {
    let (engine, transport) = connected_engine_with_retries(0).await;

    engine.send_command("JSONRPC.Ping", None, false).await;
    engine.send_command("Input.Home", None, false).await;
    assert_eq!(transport.sent().len(), 2);

    // Zero budget: the head is dropped and the new head earns one
    // immediate send instead of waiting for the next cycle.
    engine.handle_data(&nudge_frame()).await;
    let methods = transport.sent_methods();
    assert_eq!(methods.len(), 3);
    assert_eq!(methods[2], "Input.Home");
    assert_eq!(engine.pending_count().await, 1);

    engine.handle_data(&nudge_frame()).await;
    assert_eq!(transport.sent().len(), 3);
    assert_eq!(engine.pending_count().await, 0);
}

#[tokio::test]
async fn test_reply_resets_retry_budget() {
    let (engine, transport) = connected_engine_with_retries(1).await;

    engine.send_command("JSONRPC.Ping", None, false).await;
    engine.handle_data(&nudge_frame()).await;
    assert_eq!(transport.sent().len(), 2);

    // Reply clears the failure counter along with the entry.
    engine
        .handle_data(&reply_frame("JSONRPC.Ping", json!("pong")))
        .await;
    assert_eq!(engine.pending_count().await, 0);

    // A fresh send of the same method starts with a full budget: the
    // next cycle resends instead of dropping.
    engine.send_command("JSONRPC.Ping", None, false).await;
    engine.handle_data(&nudge_frame()).await;
    assert_eq!(engine.pending_count().await, 1);
    assert_eq!(transport.sent().len(), 4);
}

#[tokio::test]
async fn test_only_head_is_retried() {
    let (engine, transport) = connected_engine_with_retries(5).await;

    engine.send_command("JSONRPC.Ping", None, false).await;
    engine.send_command("Input.Home", None, false).await;

    engine.handle_data(&nudge_frame()).await;
    engine.handle_data(&nudge_frame()).await;

    // Every resend targets the head; the second entry waits its turn.
    let methods = transport.sent_methods();
    assert_eq!(
        methods,
        ["JSONRPC.Ping", "Input.Home", "JSONRPC.Ping", "JSONRPC.Ping"]
    );
    assert_eq!(engine.pending_count().await, 2);
}
