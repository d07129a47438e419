//! Encrypted transport: one persistent TLS connection to one device.
//!
//! Responsibilities:
//! - TCP connect + TLS handshake before any application data moves.
//! - Reader task: chunk -> frame buffer -> decoded envelopes -> router.
//! - Writer task: outbound envelope queue -> frames -> socket.
//! - Exactly one disconnect signal per connection, whatever ends it.
//!
//! Cast devices present self-signed certificates, so verification is
//! disabled on purpose; the channel is encrypted but not authenticated.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use castv2_core::protocol::envelope::Envelope;
use castv2_core::protocol::framing::{encode_frame, FrameBuffer};
use castv2_core::protocol::wire;
use castv2_core::{CastError, Result};

use crate::config::SenderConfig;
use crate::router::Router;

const OUTBOUND_QUEUE: usize = 64;
const READ_CHUNK: usize = 4096;

/// Cheap handle held by controllers: the outbound queue plus the inbound
/// router. Tests build one around their own channel to fake a device.
#[derive(Clone)]
pub struct Link {
    out: mpsc::Sender<Envelope>,
    router: Arc<Router>,
}

impl Link {
    pub fn new(out: mpsc::Sender<Envelope>, router: Arc<Router>) -> Self {
        Self { out, router }
    }

    /// Queue one envelope for the wire. Fails once the connection is gone.
    pub async fn send(&self, env: Envelope) -> Result<()> {
        self.out.send(env).await.map_err(|_| CastError::Disconnected)
    }

    pub fn subscribe(&self, namespace: &str) -> mpsc::UnboundedReceiver<Envelope> {
        self.router.subscribe(namespace)
    }
}

/// One live connection. Dropping it tears the socket tasks down.
pub struct Transport {
    link: Link,
    closed_rx: watch::Receiver<bool>,
    closed_tx: Arc<watch::Sender<bool>>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Transport {
    /// Connect and complete the TLS handshake, then start the socket tasks.
    /// Returns only once the handshake is done, so no application data can
    /// precede it.
    pub async fn connect(host: &str, port: u16, cfg: &SenderConfig) -> Result<Transport> {
        let addr = format!("{host}:{port}");
        let tcp = tokio::time::timeout(cfg.connect_timeout(), TcpStream::connect(&addr))
            .await
            .map_err(|_| CastError::Transport(format!("connect to {addr} timed out")))?
            .map_err(|e| CastError::Transport(format!("connect to {addr} failed: {e}")))?;

        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|e| CastError::Transport(format!("tls connector: {e}")))?;
        let connector = tokio_native_tls::TlsConnector::from(connector);
        let tls = connector
            .connect(host, tcp)
            .await
            .map_err(|e| CastError::Transport(format!("tls handshake with {addr} failed: {e}")))?;

        tracing::info!(%addr, "cast transport connected");

        let (read_half, write_half) = tokio::io::split(tls);
        let router = Arc::new(Router::new());
        let (out_tx, out_rx) = mpsc::channel(OUTBOUND_QUEUE);
        let (closed_tx, closed_rx) = watch::channel(false);
        let closed_tx = Arc::new(closed_tx);

        let writer = tokio::spawn(write_loop(write_half, out_rx, Arc::clone(&closed_tx)));
        let reader = tokio::spawn(read_loop(
            read_half,
            Arc::clone(&router),
            cfg.max_frame_len,
            Arc::clone(&closed_tx),
        ));

        Ok(Transport {
            link: Link::new(out_tx, router),
            closed_rx,
            closed_tx,
            reader,
            writer,
        })
    }

    pub fn link(&self) -> Link {
        self.link.clone()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed_rx.borrow()
    }

    /// Resolves when the connection is gone, whichever side ended it.
    pub async fn closed(&self) {
        let mut rx = self.closed_rx.clone();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Tear down the socket tasks and mark the connection closed.
    pub fn shutdown(&self) {
        self.reader.abort();
        self.writer.abort();
        self.closed_tx.send_replace(true);
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn write_loop<W>(
    mut sock: W,
    mut out_rx: mpsc::Receiver<Envelope>,
    closed: Arc<watch::Sender<bool>>,
) where
    W: AsyncWrite + Unpin + Send,
{
    let mut closed_rx = closed.subscribe();
    loop {
        tokio::select! {
            env = out_rx.recv() => {
                let Some(env) = env else { break };
                let frame = match encode_frame(&env) {
                    Ok(f) => f,
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping unencodable envelope");
                        continue;
                    }
                };
                tracing::trace!(namespace = %env.namespace, destination = %env.destination_id, "envelope sent");
                if let Err(e) = sock.write_all(&frame).await {
                    tracing::info!(error = %e, "cast write failed");
                    break;
                }
            }
            _ = closed_rx.changed() => {
                if *closed_rx.borrow() {
                    break;
                }
            }
        }
    }
    closed.send_replace(true);
}

async fn read_loop<R>(
    mut sock: R,
    router: Arc<Router>,
    max_frame_len: usize,
    closed: Arc<watch::Sender<bool>>,
) where
    R: AsyncRead + Unpin + Send,
{
    let mut frames = FrameBuffer::new(max_frame_len);
    let mut chunk = [0u8; READ_CHUNK];
    'read: loop {
        let n = match sock.read(&mut chunk).await {
            Ok(0) => {
                tracing::info!("cast connection closed by peer");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                tracing::info!(error = %e, "cast read failed");
                break;
            }
        };
        frames.extend(&chunk[..n]);

        // A chunk may complete zero or more frames; drain them all.
        loop {
            match frames.next_frame() {
                Ok(Some(body)) => match wire::decode_envelope(body) {
                    Ok(env) => {
                        tracing::trace!(namespace = %env.namespace, source = %env.source_id, "envelope received");
                        router.publish(&env);
                    }
                    Err(e) if !e.is_connection_fatal() => {
                        // Isolation is per-envelope: drop it, keep reading.
                        tracing::warn!(error = %e, "dropping malformed payload");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "frame corruption, closing connection");
                        break 'read;
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "frame corruption, closing connection");
                    break 'read;
                }
            }
        }
    }
    closed.send_replace(true);
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;

    use castv2_core::protocol::NS_HEARTBEAT;

    use super::*;

    fn env(n: u32) -> Envelope {
        Envelope::new("receiver-0", "sender-0", NS_HEARTBEAT, json!({"type": "PONG", "n": n}))
    }

    #[tokio::test]
    async fn read_loop_routes_split_and_batched_frames() {
        let router = Arc::new(Router::new());
        let mut sub = router.subscribe(NS_HEARTBEAT);
        let (closed_tx, mut closed_rx) = watch::channel(false);

        // Two frames in one write, then one frame split mid-header.
        let mut stream = encode_frame(&env(1)).unwrap().to_vec();
        stream.extend_from_slice(&encode_frame(&env(2)).unwrap());
        stream.extend_from_slice(&encode_frame(&env(3)).unwrap());
        let (mut tx, rx) = tokio::io::duplex(1024);

        let task = tokio::spawn(read_loop(
            rx,
            Arc::clone(&router),
            castv2_core::protocol::framing::DEFAULT_MAX_FRAME_LEN,
            Arc::new(closed_tx),
        ));

        let split = stream.len() - 7;
        tx.write_all(&stream[..split]).await.unwrap();
        tx.flush().await.unwrap();
        tx.write_all(&stream[split..]).await.unwrap();
        drop(tx);

        for n in 1..=3 {
            assert_eq!(sub.recv().await.unwrap().payload["n"], n);
        }
        task.await.unwrap();
        assert!(*closed_rx.borrow_and_update());
    }

    #[tokio::test]
    async fn malformed_payload_is_dropped_without_closing() {
        let router = Arc::new(Router::new());
        let mut sub = router.subscribe(NS_HEARTBEAT);
        let (closed_tx, _closed_rx) = watch::channel(false);

        // Valid CastMessage whose text payload is not JSON, then a good one.
        let bad = Envelope::new("receiver-0", "sender-0", NS_HEARTBEAT, json!("x"));
        let mut bad_frame = encode_frame(&bad).unwrap().to_vec();
        // Corrupt the JSON text in place: `"x"` -> `}x"`.
        let pos = bad_frame.len() - 3;
        bad_frame[pos] = b'}';

        let (mut tx, rx) = tokio::io::duplex(1024);
        tokio::spawn(read_loop(
            rx,
            Arc::clone(&router),
            castv2_core::protocol::framing::DEFAULT_MAX_FRAME_LEN,
            Arc::new(closed_tx),
        ));

        tx.write_all(&bad_frame).await.unwrap();
        tx.write_all(&encode_frame(&env(9)).unwrap()).await.unwrap();

        assert_eq!(sub.recv().await.unwrap().payload["n"], 9);
    }
}
