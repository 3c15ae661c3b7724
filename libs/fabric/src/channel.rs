use usb2snes_core::Command;

use crate::codec::{Codec, Response};
use crate::error::Result;
use crate::transport::{Frame, Transport, WebSocketTransport};

/// High-level channel for bidirectional communication
///
/// Combines a transport and codec for persistent connections
pub struct Channel<C> {
    transport: Box<dyn Transport>,
    codec: C,
}

impl<C: Codec> Channel<C> {
    /// Create a channel from an existing transport
    pub fn from_transport(transport: impl Transport + 'static, codec: C) -> Self {
        Self {
            transport: Box::new(transport),
            codec,
        }
    }

    /// Open a WebSocket channel
    pub async fn connect(address: impl Into<String>, codec: C) -> Result<Self> {
        let transport = WebSocketTransport::connect(address).await?;
        Ok(Self::from_transport(transport, codec))
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Encode and send a command
    pub async fn send(&mut self, command: &Command) -> Result<()> {
        let frame = self.codec.encode(command)?;
        self.transport.send(frame).await
    }

    /// Send an already encoded frame
    pub async fn send_frame(&mut self, frame: Frame) -> Result<()> {
        self.transport.send(frame).await
    }

    /// Receive the next raw frame
    pub async fn receive_frame(&mut self) -> Result<Frame> {
        self.transport.receive().await
    }

    /// Receive and decode the next frame
    pub async fn receive(&mut self) -> Result<Response> {
        let frame = self.transport.receive().await?;
        self.codec.decode(frame)
    }

    /// Close the channel
    pub async fn close(mut self) -> Result<()> {
        self.transport.close().await
    }

    /// Close the underlying transport without consuming the channel
    pub async fn shutdown(&mut self) -> Result<()> {
        self.transport.close().await
    }
}
