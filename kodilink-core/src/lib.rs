//! Core wire types and codec for kodilink
//!
//! This crate holds everything the dispatch engine needs to talk the
//! Kodi JSON-RPC dialect, independent of any transport or runtime:
//!
//! - **types**: request/reply/push messages and the [`RequestKey`]
//!   correlation scheme (method-name-as-identifier)
//! - **codec**: CRLF framing, `}{` batch splitting, fragment dedup
//! - **error**: application error taxonomy and the wire error object
//!
//! # Examples
//!
//! ```rust
//! use kodilink_core::{codec, Inbound, RpcRequest};
//!
//! let frame = codec::encode_request(&RpcRequest::new("JSONRPC.Ping", None)).unwrap();
//!
//! let inbound = codec::decode(r#"{"jsonrpc":"2.0","id":"JSONRPC.Ping","result":"pong"}"#).unwrap();
//! assert!(matches!(inbound, Inbound::Reply(_)));
//! ```

pub mod codec;
pub mod error;
pub mod types;

pub use error::{Error, Result, RpcErrorData};
pub use types::{Inbound, RequestKey, RpcPush, RpcReply, RpcRequest};
