//! Dispatcher facade: the single entry point for command exchange
//!
//! [`KodiEngine`] owns the concurrency discipline of the protocol:
//!
//! - a single **command lock** serializes callers, so only one logical
//!   request/response cycle is in flight waiting for acknowledgment at
//!   a time — this is what keeps method-name request keys unambiguous;
//! - a **notify handle** lets the inbound-data path wake a caller
//!   blocked on its reply, with a bounded wait so a lost reply falls
//!   through to the retry path instead of hanging;
//! - one **state mutex** guards the pending queue, failure counters,
//!   active player list, and the reply slot. All state mutation happens
//!   on the inbound-data path, which runs without the command lock.
//!
//! # Error Policy
//!
//! `send_command` never raises: when the device is unreachable or a
//! reply does not arrive, the caller gets `None` ("unknown outcome") and
//! the details go to the log. This engine drives best-effort home
//! automation signals, not transactions.
//!
//! # Cloning
//!
//! `KodiEngine` is cheaply cloneable using `Arc` internally; all clones
//! share the same queue, listeners, and transport.

use crate::channel::{Channel, Listener, ListenerRegistry};
use crate::correlator;
use crate::events;
use crate::metrics::EngineMetrics;
use crate::queue::{CommandQueue, RetryAction};
use crate::transport::Transport;
use kodilink_core::{codec, Inbound, RequestKey, RpcReply, RpcRequest};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};

/// Shared engine state, guarded by a single mutex
///
/// One lock is sufficient at this request volume; no finer-grained
/// locking is attempted.
pub(crate) struct EngineState {
    pub(crate) queue: CommandQueue,
    pub(crate) active_players: Vec<i64>,
    /// Key the blocked `send_command` caller (if any) is waiting on
    awaited: Option<RequestKey>,
    /// Correlated reply for that caller, filled by the inbound path
    reply: Option<RpcReply>,
}

pub(crate) struct EngineInner {
    pub(crate) state: Mutex<EngineState>,
    /// Serializes callers: one command exchange at a time
    cmd_lock: Mutex<()>,
    /// Wakes the caller blocked on a reply
    reply_ready: Notify,
    /// Device reachable flag, driven by transport callbacks
    reachable: AtomicBool,
    transport: std::sync::Mutex<Option<Arc<dyn Transport>>>,
    pub(crate) listeners: ListenerRegistry,
    pub(crate) send_retries: u32,
    pub(crate) reply_timeout: Duration,
    init_commands: bool,
    pub(crate) metrics: Option<Arc<EngineMetrics>>,
}

/// Command dispatch and reply-correlation engine for one Kodi device
#[derive(Clone)]
pub struct KodiEngine {
    pub(crate) inner: Arc<EngineInner>,
}

impl KodiEngine {
    /// Start configuring an engine.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Bind the transport used for all outbound frames.
    pub fn bind_transport(&self, transport: Arc<dyn Transport>) {
        *self
            .inner
            .transport
            .lock()
            .expect("transport slot poisoned") = Some(transport);
    }

    /// Register a listener for a channel.
    pub fn register_listener(&self, channel: Channel, listener: Listener) {
        self.inner.listeners.register(channel, listener);
    }

    /// Register a listener under a channel name from host configuration
    ///
    /// Unknown names are logged and skipped.
    pub fn register_listener_named(&self, name: &str, listener: Listener) {
        self.inner.listeners.register_named(name, listener);
    }

    /// Whether the device is currently marked reachable.
    pub fn is_reachable(&self) -> bool {
        self.inner.reachable.load(Ordering::SeqCst)
    }

    /// Number of requests pending a reply.
    pub async fn pending_count(&self) -> usize {
        self.inner.state.lock().await.queue.len()
    }

    /// Diagnostic snapshot of the pending queue, oldest first.
    pub async fn pending_commands(&self) -> Vec<RpcRequest> {
        self.inner.state.lock().await.queue.snapshot()
    }

    /// Most recently observed active player ids.
    pub async fn active_players(&self) -> Vec<i64> {
        self.inner.state.lock().await.active_players.clone()
    }

    /// Send a command, optionally waiting for the correlated reply
    ///
    /// Returns `None` without touching the queue when the device is not
    /// reachable, when `wait` is false, or when no reply arrives within
    /// the configured window. A `None` means "unknown outcome", never
    /// confirmed failure: the unanswered entry stays queued and the
    /// retry discipline takes over on the next inbound cycle.
    pub async fn send_command(
        &self,
        method: &str,
        params: Option<Value>,
        wait: bool,
    ) -> Option<RpcReply> {
        if !self.is_reachable() {
            tracing::debug!(method, "command requested without an established connection");
            return None;
        }

        let _guard = self.inner.cmd_lock.lock().await;

        let request = RpcRequest::new(method, params);
        let key = request.id.clone();
        let frame = match codec::encode_request(&request) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(method, error = %e, "could not encode command");
                return None;
            }
        };

        {
            let mut state = self.inner.state.lock().await;
            state.reply = None;
            state.awaited = wait.then(|| key.clone());
            state.queue.enqueue(request);
        }

        tracing::debug!(method, wait, "sending command");
        self.send_frame(frame);
        if let Some(m) = &self.inner.metrics {
            m.record_command(method);
        }

        if !wait {
            return None;
        }

        // Condvar-style wait loop: a stale wakeup permit re-checks the
        // reply slot and keeps waiting until the deadline.
        let deadline = Instant::now() + self.inner.reply_timeout;
        loop {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                break;
            };
            if tokio::time::timeout(remaining, self.inner.reply_ready.notified())
                .await
                .is_err()
            {
                break;
            }
            if self.inner.state.lock().await.reply.is_some() {
                break;
            }
        }

        let mut state = self.inner.state.lock().await;
        state.awaited = None;
        let reply = state.reply.take();
        if reply.is_none() {
            tracing::debug!(method, "no reply within the wait window");
        }
        reply
    }

    /// Inbound-data callback: process one raw chunk from the transport
    ///
    /// Splits concatenated fragments, drops duplicates, correlates
    /// replies, routes pushes, then runs exactly one retry cycle over
    /// the head of the pending queue. Malformed fragments are logged and
    /// skipped; the rest of the batch is still processed.
    pub async fn handle_data(&self, raw: &str) {
        tracing::debug!(len = raw.len(), "inbound data");
        let frames = codec::dedup_frames(codec::split_frames(raw));

        // Frames produced under the state lock, sent after it is released.
        let mut outgoing: Vec<RpcRequest> = Vec::new();
        let mut fanouts: Vec<RpcRequest> = Vec::new();

        {
            let mut state = self.inner.state.lock().await;

            for fragment in &frames {
                match codec::decode(fragment) {
                    Ok(Inbound::Reply(reply)) => {
                        let matched = {
                            let EngineState {
                                queue,
                                active_players,
                                ..
                            } = &mut *state;
                            correlator::handle_reply(
                                queue,
                                active_players,
                                &self.inner.listeners,
                                &reply,
                            )
                        };
                        match matched {
                            Some(followups) => {
                                if let Some(m) = &self.inner.metrics {
                                    m.record_reply(reply.id.as_str());
                                }
                                fanouts.extend(followups);
                                if state.awaited.as_ref() == Some(&reply.id) {
                                    state.reply = Some(reply);
                                    self.inner.reply_ready.notify_one();
                                }
                            }
                            None => {
                                tracing::debug!(id = %reply.id, "reply without a pending entry")
                            }
                        }
                    }
                    Ok(Inbound::Push(push)) => {
                        if let Some(m) = &self.inner.metrics {
                            m.record_push(&push.method);
                        }
                        events::route_push(&mut state.queue, &self.inner.listeners, &push);
                    }
                    Err(e) => {
                        if let Some(m) = &self.inner.metrics {
                            m.record_frame_error();
                        }
                        tracing::warn!(
                            error = %e,
                            fragment = %fragment,
                            "skipping malformed inbound fragment"
                        );
                    }
                }
            }

            let head_key = state.queue.oldest().map(|r| r.id.clone());
            match state.queue.retry_cycle(self.inner.send_retries) {
                RetryAction::Idle => {}
                RetryAction::Resend(head) => {
                    if let Some(m) = &self.inner.metrics {
                        m.record_retry();
                    }
                    outgoing.push(head);
                }
                RetryAction::DropAndSendNext(next) => {
                    if let (Some(m), Some(key)) = (&self.inner.metrics, head_key) {
                        m.record_drop(key.as_str());
                    }
                    outgoing.extend(next);
                }
            }

            // Fan-out sub-queries enter the queue after the retry cycle
            // so they start with a fresh budget and a single send now.
            for request in fanouts {
                state.queue.enqueue(request.clone());
                outgoing.push(request);
            }
        }

        for request in outgoing {
            match codec::encode_request(&request) {
                Ok(frame) => self.send_frame(frame),
                Err(e) => tracing::error!(id = %request.id, error = %e, "could not encode frame"),
            }
        }
    }

    /// Transport connect callback
    ///
    /// Marks the device reachable and, when nothing is pending, issues
    /// the init command burst to prime listener state (ping, volume and
    /// mute, favourites, active players).
    pub async fn connection_established(&self) {
        self.inner.reachable.store(true, Ordering::SeqCst);
        if let Some(m) = &self.inner.metrics {
            m.update_connection_state(true);
        }
        tracing::info!("device reachable");

        if !self.inner.init_commands {
            return;
        }
        let queue_empty = self.inner.state.lock().await.queue.is_empty();
        if queue_empty {
            for (method, params) in crate::commands::init_commands() {
                tracing::debug!(method, "sending init command");
                self.send_command(method, params, false).await;
            }
        }
    }

    /// Transport disconnect callback
    ///
    /// Marks the device unreachable and pushes `false` to "on_off"
    /// listeners. Pending entries stay queued; they resume retrying once
    /// data flows again.
    pub async fn connection_lost(&self) {
        self.inner.reachable.store(false, Ordering::SeqCst);
        if let Some(m) = &self.inner.metrics {
            m.update_connection_state(false);
        }
        tracing::info!("device unreachable");
        self.inner.listeners.notify(Channel::OnOff, &json!(false));
    }

    pub(crate) fn send_frame(&self, frame: String) {
        let transport = self
            .inner
            .transport
            .lock()
            .expect("transport slot poisoned")
            .clone();
        match transport {
            Some(t) => {
                if let Err(e) = t.send(frame) {
                    tracing::warn!(error = %e, "transport send failed");
                }
            }
            None => tracing::debug!("no transport bound, dropping frame"),
        }
    }
}

/// Builder for [`KodiEngine`]
///
/// # Examples
///
/// ```rust
/// use kodilink_client::KodiEngine;
/// use std::time::Duration;
///
/// let engine = KodiEngine::builder()
///     .send_retries(3)
///     .reply_timeout(Duration::from_millis(500))
///     .build();
/// ```
pub struct EngineBuilder {
    send_retries: u32,
    reply_timeout: Duration,
    init_commands: bool,
    metrics: Option<Arc<EngineMetrics>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            send_retries: 2,
            reply_timeout: Duration::from_secs(1),
            init_commands: true,
            metrics: None,
        }
    }

    /// Maximum consecutive unanswered cycles before a command is dropped.
    pub fn send_retries(mut self, retries: u32) -> Self {
        self.send_retries = retries;
        self
    }

    /// Bounded window a `send_command(wait = true)` caller blocks for.
    pub fn reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// Whether to issue the init command burst on connect (default true)
    ///
    /// Hosts doing their own warmup sequence can disable it.
    pub fn init_commands(mut self, enabled: bool) -> Self {
        self.init_commands = enabled;
        self
    }

    /// Attach OpenTelemetry instruments.
    pub fn with_metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> KodiEngine {
        KodiEngine {
            inner: Arc::new(EngineInner {
                state: Mutex::new(EngineState {
                    queue: CommandQueue::new(),
                    active_players: Vec::new(),
                    awaited: None,
                    reply: None,
                }),
                cmd_lock: Mutex::new(()),
                reply_ready: Notify::new(),
                reachable: AtomicBool::new(false),
                transport: std::sync::Mutex::new(None),
                listeners: ListenerRegistry::new(),
                send_retries: self.send_retries,
                reply_timeout: self.reply_timeout,
                init_commands: self.init_commands,
                metrics: self.metrics,
            }),
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
