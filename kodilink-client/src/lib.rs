//! JSON-RPC 2.0 command engine for Kodi media centers over raw TCP
//!
//! This crate drives a persistent TCP connection to a Kodi device:
//! it sends commands, correlates replies by method name, retries
//! unanswered commands, and routes unsolicited player/application
//! pushes to per-channel listeners.
//!
//! # Core Features
//!
//! - **Command Dispatch**: Fire-and-forget or bounded-wait exchanges
//! - **Reply Correlation**: Method-name keys, one pending entry per method
//! - **Retry Discipline**: Per-batch retry cycle with a configurable budget
//! - **Push Routing**: Player, volume, and screensaver events to listeners
//! - **Item Updates**: Writable channels mapped to device command templates
//! - **Observability**: OpenTelemetry instruments via `with_metrics`
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use kodilink_client::{Channel, KodiEngine, TcpTransport};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> kodilink_core::Result<()> {
//!     let engine = KodiEngine::builder().build();
//!
//!     engine.register_listener(
//!         Channel::Title,
//!         Arc::new(|value, _source| println!("now playing: {value}")),
//!     );
//!
//!     TcpTransport::connect("127.0.0.1:9090", engine.clone()).await?;
//!
//!     // Host item changed: set the volume.
//!     engine.update_item(Channel::Volume, &json!(80), "web-ui").await;
//!
//!     // Bounded-wait exchange.
//!     let reply = engine.send_command("JSONRPC.Ping", None, true).await;
//!     println!("ping reply: {reply:?}");
//!     Ok(())
//! }
//! ```

mod channel;
mod commands;
mod correlator;
mod dispatcher;
mod events;
mod metrics;
mod queue;
mod transport;

pub use channel::{Channel, Listener, ListenerRegistry, SOURCE_TAG};
pub use commands::{macro_steps, MacroStep, INPUT_ACTIONS, PLAYER_ACTIONS};
pub use dispatcher::{EngineBuilder, KodiEngine};
pub use events::PushEvent;
pub use metrics::EngineMetrics;
pub use queue::{CommandQueue, RetryAction};
pub use transport::{TcpTransport, Transport};
