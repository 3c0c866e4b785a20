//! KODILINK - Kodi JSON-RPC command engine over TCP
//!
//! This is the main convenience crate that re-exports all kodilink
//! sub-crates. Use this crate if you want a single dependency for
//! driving a Kodi media center from a home-automation host.
//!
//! # Architecture
//!
//! kodilink is organized into modular crates:
//!
//! - **kodilink-core**: Wire types, frame codec, error handling
//! - **kodilink-client**: Dispatch engine, retry discipline, push routing,
//!   channel listeners, TCP transport
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use kodilink::{Channel, KodiEngine, TcpTransport};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> kodilink::core::Result<()> {
//!     let engine = KodiEngine::builder().build();
//!
//!     engine.register_listener(
//!         Channel::State,
//!         Arc::new(|value, _source| println!("player state: {value}")),
//!     );
//!
//!     TcpTransport::connect("192.168.1.20:9090", engine.clone()).await?;
//!
//!     let reply = engine.send_command("JSONRPC.Ping", None, true).await;
//!     println!("ping reply: {reply:?}");
//!     Ok(())
//! }
//! ```

// Re-export all public APIs from sub-crates
// This allows users to access everything through `kodilink::` prefix
pub use kodilink_client as client;
pub use kodilink_core as core;

// Convenience re-exports of the most commonly used types
// This avoids needing to write `kodilink::client::KodiEngine`
pub use kodilink_client::{Channel, KodiEngine, TcpTransport};
