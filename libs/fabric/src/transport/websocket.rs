use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{CloseInfo, Error, Result};
use crate::transport::{Frame, Transport};

/// WebSocket transport, one protocol message per WebSocket message
///
/// Works over any stream tungstenite can drive: the default is the TCP/TLS
/// stream produced by [`WebSocketTransport::connect`], tests wrap the server
/// side of an accepted socket.
pub struct WebSocketTransport<S = MaybeTlsStream<TcpStream>> {
    stream: WebSocketStream<S>,
    send_timeout: Option<Duration>,
}

impl WebSocketTransport {
    /// Connect to a `ws://` or `wss://` address with no timeouts
    pub async fn connect(address: impl Into<String>) -> Result<Self> {
        Self::builder().address(address).connect().await
    }

    /// Create a builder for configuring the transport
    pub fn builder() -> WebSocketTransportBuilder {
        WebSocketTransportBuilder::new()
    }
}

impl<S> WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an established WebSocket stream
    pub fn new(stream: WebSocketStream<S>) -> Self {
        Self {
            stream,
            send_timeout: None,
        }
    }
}

fn to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Binary(bytes) => Message::Binary(bytes),
    }
}

fn close_info(frame: Option<CloseFrame<'_>>) -> CloseInfo {
    match frame {
        Some(frame) => CloseInfo::new(u16::from(frame.code), frame.reason.to_string()),
        None => CloseInfo::new(u16::from(CloseCode::Status), ""),
    }
}

#[async_trait::async_trait]
impl<S> Transport for WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, frame: Frame) -> Result<()> {
        let send_op = async {
            self.stream.send(to_message(frame)).await?;
            Ok::<(), Error>(())
        };

        if let Some(timeout) = self.send_timeout {
            tokio::time::timeout(timeout, send_op)
                .await
                .map_err(|_| Error::Custom("Send timeout exceeded".to_string()))?
        } else {
            send_op.await
        }
    }

    async fn receive(&mut self) -> Result<Frame> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Frame::Text(text)),
                Some(Ok(Message::Binary(bytes))) => return Ok(Frame::Binary(bytes)),
                Some(Ok(Message::Close(frame))) => return Err(Error::Closed(close_info(frame))),
                // tungstenite queues the pong itself
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => return Err(Error::Closed(CloseInfo::abnormal())),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Builder for configuring WebSocket transport
#[derive(Default)]
pub struct WebSocketTransportBuilder {
    address: Option<String>,
    connect_timeout: Option<Duration>,
    send_timeout: Option<Duration>,
}

impl WebSocketTransportBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the address to connect to
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the send timeout
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = Some(timeout);
        self
    }

    /// Connect with the configured settings
    pub async fn connect(self) -> Result<WebSocketTransport> {
        let address = self
            .address
            .ok_or_else(|| Error::Custom("Address not set".to_string()))?;

        let connect_op = connect_async(address.as_str());

        let connected = if let Some(timeout) = self.connect_timeout {
            tokio::time::timeout(timeout, connect_op)
                .await
                .map_err(|_| Error::Connection("Connect timeout exceeded".to_string()))?
        } else {
            connect_op.await
        };
        let (stream, _response) =
            connected.map_err(|e| Error::Connection(format!("{}: {}", address, e)))?;

        tracing::info!(%address, "connected");

        Ok(WebSocketTransport {
            stream,
            send_timeout: self.send_timeout,
        })
    }
}
