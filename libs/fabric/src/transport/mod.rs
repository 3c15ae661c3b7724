use crate::error::Result;

pub mod memory;
pub mod websocket;

pub use self::memory::MemoryTransport;
pub use self::websocket::{WebSocketTransport, WebSocketTransportBuilder};

/// A single message on the connection
///
/// The server answers with text frames for structured results and binary
/// frames for raw memory or file data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }
}

/// Transport trait for sending and receiving frames
///
/// Each transport instance represents a single connection. `receive` must be
/// cancellation safe: dropping its future before completion loses no frame.
/// A closed connection is reported as [`Error::Closed`](crate::Error::Closed).
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Send a frame over the transport
    async fn send(&mut self, frame: Frame) -> Result<()>;

    /// Receive the next frame from the transport
    async fn receive(&mut self) -> Result<Frame>;

    /// Close the transport connection
    async fn close(&mut self) -> Result<()>;
}
