//! Pending command queue and retry bookkeeping
//!
//! The queue holds every outbound request from the moment it is sent
//! until a reply for its key is observed, the device rejects it, or its
//! retry budget is exhausted. Insertion order is significant: the retry
//! discipline is strictly head-of-line, so only the oldest entry is ever
//! actively retried and later entries wait behind it.
//!
//! # Coalescing
//!
//! Keys are method names (see [`RequestKey`]), so enqueuing a request
//! whose key is already present **replaces** that entry in place. The
//! queue never holds two entries with the same key, and a replaced entry
//! keeps its original position so retry fairness is preserved.
//!
//! # Failure Counters
//!
//! Each key has a consecutive-failure count, scoped to the key's
//! presence in the queue: reset the instant any reply for the key is
//! observed, removed when the entry is dropped.

use kodilink_core::{RequestKey, RpcRequest};
use std::collections::HashMap;

/// Outcome of one retry cycle (see [`CommandQueue::retry_cycle`])
#[derive(Debug, Clone)]
pub enum RetryAction {
    /// Nothing pending.
    Idle,
    /// Resend the head entry unchanged, fire-and-forget.
    Resend(RpcRequest),
    /// Head exhausted its budget and was dropped; if a new head exists it
    /// is sent exactly once, fire-and-forget, without waiting a cycle.
    DropAndSendNext(Option<RpcRequest>),
}

/// Ordered collection of pending requests, keyed by request identifier
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Vec<RpcRequest>,
    failures: HashMap<RequestKey, u32>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the tail, or replace in place on a key collision
    ///
    /// Invariant: no two entries share a key.
    pub fn enqueue(&mut self, request: RpcRequest) {
        match self.pending.iter_mut().find(|e| e.id == request.id) {
            Some(slot) => {
                tracing::debug!(id = %request.id, "coalescing with queued request");
                *slot = request;
            }
            None => self.pending.push(request),
        }
    }

    /// Remove and return the entry with this key, if present
    ///
    /// A no-op when the entry was already removed, e.g. by a racing
    /// reply in the same batch.
    pub fn remove(&mut self, key: &RequestKey) -> Option<RpcRequest> {
        let index = self.pending.iter().position(|e| &e.id == key)?;
        Some(self.pending.remove(index))
    }

    /// Peek the oldest pending entry without removing it.
    pub fn oldest(&self) -> Option<&RpcRequest> {
        self.pending.first()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Stable snapshot of the pending entries, oldest first.
    pub fn snapshot(&self) -> Vec<RpcRequest> {
        self.pending.clone()
    }

    /// Reset the failure counter for a key
    ///
    /// Called the instant any reply for the key is observed, error
    /// replies included.
    pub fn clear_failures(&mut self, key: &RequestKey) {
        self.failures.remove(key);
    }

    /// Current consecutive-failure count for a key.
    pub fn failure_count(&self, key: &RequestKey) -> u32 {
        self.failures.get(key).copied().unwrap_or(0)
    }

    /// Run one retry cycle over the head entry
    ///
    /// Invoked once per inbound-data processing cycle, after any matched
    /// replies have been removed. Increments the head's failure counter;
    /// within budget the head is resent unchanged, otherwise it is
    /// dropped permanently and the new head (if any) earns one immediate
    /// fire-and-forget send.
    pub fn retry_cycle(&mut self, send_retries: u32) -> RetryAction {
        let Some(head) = self.pending.first() else {
            return RetryAction::Idle;
        };
        let key = head.id.clone();
        let count = self.failures.entry(key.clone()).or_insert(0);
        *count += 1;

        if *count <= send_retries {
            tracing::debug!(
                id = %key,
                attempt = *count,
                max = send_retries,
                "resending unanswered command"
            );
            RetryAction::Resend(head.clone())
        } else {
            tracing::debug!(
                id = %key,
                max = send_retries,
                "giving up on unanswered command after maximum retries"
            );
            self.failures.remove(&key);
            self.pending.remove(0);
            let next = self.pending.first().cloned();
            if let Some(ref req) = next {
                tracing::debug!(id = %req.id, "sending next queued command");
            }
            RetryAction::DropAndSendNext(next)
        }
    }
}
