//! Transport seam
//!
//! The engine treats the connection as an opaque reliable stream with a
//! send operation plus connect/disconnect/inbound callbacks. [`Transport`]
//! is that seam; tests substitute a mock that records frames.
//!
//! [`TcpTransport`] is a thin tokio TCP line client: a writer task fed
//! by an unbounded channel drains outbound frames, a reader task buffers
//! inbound bytes to complete-object boundaries before handing them to
//! the engine, and fires the connection callbacks. Reconnection and
//! keepalive are the host's concern, not implemented here.

use crate::dispatcher::KodiEngine;
use kodilink_core::{Error, Result};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// Opaque outbound half of the connection
pub trait Transport: Send + Sync {
    /// Queue one wire frame for transmission.
    fn send(&self, frame: String) -> Result<()>;

    /// Tear the connection down; subsequent sends fail.
    fn close(&self);
}

/// Persistent TCP line transport for a Kodi device
pub struct TcpTransport {
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl TcpTransport {
    /// Connect to the device and wire the stream to an engine
    ///
    /// Binds itself as the engine's transport, fires the connect
    /// callback (which issues the init command burst), and spawns the
    /// reader and writer tasks. The reader fires the disconnect callback
    /// when the peer closes the stream.
    pub async fn connect(addr: &str, engine: KodiEngine) -> Result<Arc<Self>> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        tracing::info!(addr, "connected to device");

        let (mut read_half, mut write_half) = stream.into_split();
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        let transport = Arc::new(Self {
            outbound: Mutex::new(Some(tx)),
        });

        // Writer task: drains queued frames until the channel closes.
        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Err(e) = write_half.write_all(frame.as_bytes()).await {
                    tracing::warn!(error = %e, "write failed, stopping writer");
                    break;
                }
            }
        });

        engine.bind_transport(transport.clone());
        engine.connection_established().await;

        // Reader task: buffers to object boundaries, forwards to the engine.
        let reader_engine = engine.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            let mut pending: Vec<u8> = Vec::new();
            loop {
                match read_half.read(&mut buf).await {
                    Ok(0) => {
                        tracing::info!("device closed the connection");
                        break;
                    }
                    Ok(n) => {
                        pending.extend_from_slice(&buf[..n]);
                        let end = complete_boundary(&pending);
                        if end > 0 {
                            let batch = String::from_utf8_lossy(&pending[..end]).into_owned();
                            pending.drain(..end);
                            reader_engine.handle_data(&batch).await;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "read failed");
                        break;
                    }
                }
            }
            reader_engine.connection_lost().await;
        });

        Ok(transport)
    }
}

/// Index one past the last complete top-level JSON object in `buf`
///
/// A read can end mid-object or mid-UTF-8-sequence, so bytes are only
/// handed to the engine once their object is brace-balanced; the
/// remainder stays buffered for the next read. Braces inside string
/// values are skipped, escapes included. Returns 0 when no object is
/// complete yet.
fn complete_boundary(buf: &[u8]) -> usize {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut end = 0;
    for (i, &byte) in buf.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    end = i + 1;
                }
            }
            _ => {}
        }
    }
    end
}

impl Transport for TcpTransport {
    fn send(&self, frame: String) -> Result<()> {
        let outbound = self.outbound.lock().expect("transport sender poisoned");
        match outbound.as_ref() {
            Some(tx) => tx
                .send(frame)
                .map_err(|_| Error::Transport("writer task gone".to_string())),
            None => Err(Error::NotConnected),
        }
    }

    fn close(&self) {
        // Dropping the sender ends the writer task, which closes the
        // write half; the peer's close then unblocks the reader.
        self.outbound
            .lock()
            .expect("transport sender poisoned")
            .take();
        tracing::debug!("transport closed");
    }
}
