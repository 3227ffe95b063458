use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, Result};
use crate::message::BridgeMessage;

/// Default maximum frame size: 64 KiB (configurable via max_frame_size)
///
/// A full `setData` for a dense city screen stays well below this.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Extension trait for reading bridge messages from a byte stream
///
/// Frame format: `[4 bytes length, big-endian][UTF-8 JSON bytes]`.
pub trait BridgeRead {
    /// Read one bridge message with the default max frame size
    async fn read_bridge_message(&mut self) -> Result<BridgeMessage>;

    /// Read one bridge message with a custom max frame size
    async fn read_bridge_message_with_max_size(&mut self, max_size: usize)
    -> Result<BridgeMessage>;
}

/// Extension trait for writing bridge messages to a byte stream
///
/// Frame format: `[4 bytes length, big-endian][UTF-8 JSON bytes]`.
pub trait BridgeWrite {
    /// Write one bridge message
    async fn write_bridge_message(&mut self, message: &BridgeMessage) -> Result<()>;

    /// Write an already-serialized message text as a single frame
    async fn write_frame(&mut self, text: &str) -> Result<()>;
}

impl<S: AsyncRead + Unpin + Send> BridgeRead for S {
    async fn read_bridge_message(&mut self) -> Result<BridgeMessage> {
        self.read_bridge_message_with_max_size(DEFAULT_MAX_FRAME_SIZE)
            .await
    }

    async fn read_bridge_message_with_max_size(
        &mut self,
        max_size: usize,
    ) -> Result<BridgeMessage> {
        // Read frame length (4 bytes, big-endian)
        let len = self.read_u32().await? as usize;

        if len > max_size {
            return Err(ProtocolError::FrameTooLarge(len, max_size));
        }

        if len == 0 {
            return Err(ProtocolError::ConnectionClosed);
        }

        // Read frame data
        let mut buffer = vec![0u8; len];
        self.read_exact(&mut buffer).await?;

        let text = String::from_utf8(buffer).map_err(|_| ProtocolError::InvalidEncoding)?;
        BridgeMessage::from_text(&text).map_err(Into::into)
    }
}

impl<S: AsyncWrite + Unpin + Send> BridgeWrite for S {
    async fn write_bridge_message(&mut self, message: &BridgeMessage) -> Result<()> {
        let text = message.to_text()?;
        self.write_frame(&text).await
    }

    async fn write_frame(&mut self, text: &str) -> Result<()> {
        let data = text.as_bytes();

        if data.len() > DEFAULT_MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge(
                data.len(),
                DEFAULT_MAX_FRAME_SIZE,
            ));
        }

        // Write length (4 bytes, big-endian), then the JSON bytes
        self.write_u32(data.len() as u32).await?;
        self.write_all(data).await?;

        // Bridge messages are small and latency-sensitive, flush each frame
        self.flush().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Coordinate;

    #[tokio::test]
    async fn test_frame_roundtrip() {
        let (mut a, mut b) = tokio::io::duplex(1024);

        let msg = BridgeMessage::MapClick {
            lng_lat: Coordinate::new(2.17, 41.38),
        };
        a.write_bridge_message(&msg).await.unwrap();

        let received = b.read_bridge_message().await.unwrap();
        assert_eq!(received, msg);
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let (mut a, mut b) = tokio::io::duplex(1024);

        a.write_bridge_message(&BridgeMessage::Ready).await.unwrap();

        let err = b.read_bridge_message_with_max_size(4).await.unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge(_, 4)));
    }

    #[tokio::test]
    async fn test_invalid_payload_is_an_error() {
        let (mut a, mut b) = tokio::io::duplex(1024);

        a.write_frame("{\"type\":\"warp\"}").await.unwrap();

        assert!(matches!(
            b.read_bridge_message().await.unwrap_err(),
            ProtocolError::Serialization(_)
        ));
    }
}
