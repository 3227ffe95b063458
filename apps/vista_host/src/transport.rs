//! Bridge transports
//!
//! A transport only knows how to ship one serialized message toward the
//! map runtime; ordering and queueing guarantees are layered on by the
//! controller. The implementation is platform-selected at construction:
//! an in-process channel pair for an embedded runtime sharing the
//! process, or a framed socket for a runtime living in its own process.

use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tracing::warn;

use vista_protocol::{BridgeWrite, ProtocolError, Result};

/// Delivery of one serialized bridge message toward the runtime
pub trait BridgeTransport: Send {
    fn send(&self, serialized: &str) -> Result<()>;
}

/// In-process transport over a paired unbounded channel
///
/// The receiver end is handed to the embedded runtime's inbound loop.
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    /// Create a transport and the receiver the runtime consumes from
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl BridgeTransport for ChannelTransport {
    fn send(&self, serialized: &str) -> Result<()> {
        self.tx
            .send(serialized.to_string())
            .map_err(|_| ProtocolError::ConnectionClosed)
    }
}

/// Out-of-process transport writing length-prefixed frames to the
/// runtime's socket
///
/// Writing happens on a dedicated task so `send` stays non-blocking;
/// a failed write ends the task and later sends report the closed
/// connection.
pub struct SocketTransport {
    tx: mpsc::UnboundedSender<String>,
}

impl SocketTransport {
    /// Spawn the writer task over the socket's write half
    pub fn spawn<W>(mut writer: W) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                if let Err(e) = writer.write_frame(&text).await {
                    warn!("Bridge socket write failed: {}", e);
                    break;
                }
            }
        });

        Self { tx }
    }
}

impl BridgeTransport for SocketTransport {
    fn send(&self, serialized: &str) -> Result<()> {
        self.tx
            .send(serialized.to_string())
            .map_err(|_| ProtocolError::ConnectionClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_transport_preserves_order() {
        let (transport, mut rx) = ChannelTransport::pair();

        transport.send("one").unwrap();
        transport.send("two").unwrap();
        transport.send("three").unwrap();

        assert_eq!(rx.try_recv().unwrap(), "one");
        assert_eq!(rx.try_recv().unwrap(), "two");
        assert_eq!(rx.try_recv().unwrap(), "three");
    }

    #[test]
    fn test_channel_transport_reports_closed_peer() {
        let (transport, rx) = ChannelTransport::pair();
        drop(rx);

        assert!(matches!(
            transport.send("one").unwrap_err(),
            ProtocolError::ConnectionClosed
        ));
    }
}
