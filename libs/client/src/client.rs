//! Client handle and the task that owns the connection.
//!
//! [`Client`] is a cloneable handle. Every operation is a message to a single
//! spawned task that exclusively owns the channel, the [`Dispatcher`] and the
//! listener lists, so queue mutation and inbound handling never interleave.
//!
//! # Example
//!
//! ```no_run
//! use usb2snes_client::Client;
//! use usb2snes_core::{Command, Opcode};
//!
//! # async fn example() -> Result<(), usb2snes_client::Error> {
//! let client = Client::builder().name("probe").connect().await?;
//! let devices = client.device_list().await?;
//! client.attach(&devices[0])?;
//!
//! // Both commands are queued at once; replies come back in order
//! let info = client.send(Command::new(Opcode::Info));
//! let wram = client.send(Command::new(Opcode::GetAddress).operands(["F50010", "2"]));
//! let info = info.await?.into_results()?;
//! let wram = wram.await?.into_bytes()?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use usb2snes_core::{Command, Opcode, DEFAULT_ADDRESS};
use usb2snes_fabric::{
    Channel, CloseInfo, Codec, Error as FabricError, Frame, JsonCodec, Response, Transport,
    WebSocketTransport,
};

use crate::dispatch::{Dispatcher, PendingCommand, Status};
use crate::error::{Error, Result};
use crate::listener::{CloseListener, ErrorListener, Listeners};

enum Request {
    Enqueue(PendingCommand),
    Immediate(Command),
    Binary(Vec<u8>),
    ErrorListener(ErrorListener),
    CloseListener(CloseListener),
    RejectPending(oneshot::Sender<usize>),
    Status(oneshot::Sender<Status>),
    Close(oneshot::Sender<Result<()>>),
}

/// Handle to a running USB2SNES client
///
/// Cloning is cheap; all clones drive the same connection and queue. The
/// connection task stops on [`Client::close`] or once every handle is dropped.
#[derive(Clone)]
pub struct Client {
    requests: mpsc::UnboundedSender<Request>,
}

impl Client {
    /// Create a new client builder
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Connect to a server with default settings
    pub async fn connect(address: impl Into<String>) -> Result<Self> {
        Self::builder().address(address).connect().await
    }

    /// Drive an established transport with the JSON codec
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_transport(transport: impl Transport + 'static) -> Self {
        Self::from_channel(Channel::from_transport(transport, JsonCodec))
    }

    /// Drive an established channel
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_channel<C>(channel: Channel<C>) -> Self
    where
        C: Codec + Clone + 'static,
    {
        let (requests, inbox) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(channel.codec().clone());
        let task = ClientTask {
            channel,
            dispatcher,
            listeners: Listeners::default(),
            inbox,
            open: true,
        };
        tokio::spawn(task.run());
        Self { requests }
    }

    /// Queue a command and return a future for its reply
    ///
    /// The command is queued before this returns, so replies pair with
    /// commands in the order `send` was called. There is no timeout: a reply
    /// that never comes stalls the queue.
    pub fn send(&self, command: Command) -> ResponseFuture {
        let (pending, rx) = PendingCommand::new(command);
        if let Err(mpsc::error::SendError(Request::Enqueue(pending))) =
            self.requests.send(Request::Enqueue(pending))
        {
            pending.resolve(Err(Error::ClientGone));
        }
        ResponseFuture { rx }
    }

    /// Send a command the server never answers, bypassing the queue
    ///
    /// Only for opcodes such as `Attach`, `Name` and `Close`. A command that
    /// does produce a reply desynchronizes the queue. Failures are reported
    /// to the error listeners.
    pub fn send_immediate(&self, command: Command) -> Result<()> {
        self.request(Request::Immediate(command))
    }

    /// Send a raw binary frame, bypassing the queue
    ///
    /// Carries the data announced by `PutAddress`, `PutFile` or `PutIPS`.
    pub fn send_binary(&self, data: impl Into<Vec<u8>>) -> Result<()> {
        self.request(Request::Binary(data.into()))
    }

    /// Register a callback for transport errors and desyncs
    pub fn add_error_listener<F>(&self, listener: F) -> Result<()>
    where
        F: Fn(&Error) + Send + 'static,
    {
        self.request(Request::ErrorListener(Box::new(listener)))
    }

    /// Register a callback for the server closing the connection
    pub fn add_close_listener<F>(&self, listener: F) -> Result<()>
    where
        F: Fn(&CloseInfo) + Send + 'static,
    {
        self.request(Request::CloseListener(Box::new(listener)))
    }

    /// Reject every queued command with [`Error::Abandoned`]
    ///
    /// Pending commands are not rejected when the connection drops; call this
    /// from a close listener to release waiting callers.
    pub async fn reject_pending(&self) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.request(Request::RejectPending(tx))?;
        rx.await.map_err(|_| Error::ClientGone)
    }

    /// Snapshot of the dispatch state
    pub async fn status(&self) -> Result<Status> {
        let (tx, rx) = oneshot::channel();
        self.request(Request::Status(tx))?;
        rx.await.map_err(|_| Error::ClientGone)
    }

    /// Close the client
    ///
    /// Tells the server with a `Close` command if the connection is still
    /// open, then closes the transport and stops the task. Commands still
    /// queued resolve with [`Error::Abandoned`]. Closing twice is a no-op.
    pub async fn close(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        if self.requests.send(Request::Close(tx)).is_err() {
            return Ok(());
        }
        rx.await.unwrap_or(Ok(()))
    }

    /// Ports of the devices the server can attach to
    pub async fn device_list(&self) -> Result<Vec<String>> {
        Ok(self
            .send(Command::new(Opcode::DeviceList))
            .await?
            .into_results()?)
    }

    /// Attach to a device returned by [`Client::device_list`]
    pub fn attach(&self, device: impl Into<String>) -> Result<()> {
        self.send_immediate(Command::new(Opcode::Attach).operand(device))
    }

    /// Announce this client's name to the server
    pub fn set_name(&self, name: impl Into<String>) -> Result<()> {
        self.send_immediate(Command::new(Opcode::Name).operand(name))
    }

    /// Version string of the server application
    pub async fn app_version(&self) -> Result<String> {
        let results = self
            .send(Command::new(Opcode::AppVersion))
            .await?
            .into_results()?;
        results.into_iter().next().ok_or_else(|| {
            Error::Fabric(FabricError::Protocol(
                "AppVersion returned no results".to_string(),
            ))
        })
    }

    /// Firmware version, version string, running ROM and flags
    pub async fn info(&self) -> Result<Vec<String>> {
        Ok(self.send(Command::new(Opcode::Info)).await?.into_results()?)
    }

    /// Read `size` bytes of console memory starting at `address`
    pub async fn get_address(&self, address: u32, size: usize) -> Result<Vec<u8>> {
        let command = Command::new(Opcode::GetAddress)
            .operand(format!("{:X}", address))
            .operand(format!("{:X}", size));
        Ok(self.send(command).await?.into_bytes()?)
    }

    /// Directory listing as alternating entry type and name
    pub async fn list(&self, path: impl Into<String>) -> Result<Vec<String>> {
        Ok(self
            .send(Command::new(Opcode::List).operand(path))
            .await?
            .into_results()?)
    }

    fn request(&self, request: Request) -> Result<()> {
        self.requests.send(request).map_err(|_| Error::ClientGone)
    }
}

/// Future for the reply to a queued command
///
/// Resolves with [`Error::Abandoned`] if the client stops before the reply
/// arrives.
#[must_use = "the reply is lost unless the future is awaited"]
pub struct ResponseFuture {
    rx: oneshot::Receiver<Result<Response>>,
}

impl Future for ResponseFuture {
    type Output = Result<Response>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(Error::Abandoned)))
    }
}

struct ClientTask<C> {
    channel: Channel<C>,
    dispatcher: Dispatcher<C>,
    listeners: Listeners,
    inbox: mpsc::UnboundedReceiver<Request>,
    open: bool,
}

impl<C: Codec> ClientTask<C> {
    async fn run(mut self) {
        loop {
            tokio::select! {
                request = self.inbox.recv() => {
                    let Some(request) = request else {
                        tracing::debug!("all client handles dropped");
                        break;
                    };
                    if self.handle_request(request).await.is_break() {
                        break;
                    }
                }
                frame = self.channel.receive_frame(), if self.open => {
                    self.handle_frame(frame).await;
                }
            }
        }

        let abandoned = self.dispatcher.len();
        if abandoned > 0 {
            tracing::debug!(abandoned, "client stopped with commands pending");
        }
    }

    async fn handle_request(&mut self, request: Request) -> ControlFlow<()> {
        match request {
            Request::Enqueue(pending) => {
                if let Some(frame) = self.dispatcher.enqueue(pending) {
                    self.transmit(frame).await;
                }
            }
            Request::Immediate(command) => {
                tracing::debug!(opcode = %command.opcode, "sending immediately");
                let encoded = self.channel.codec().encode(&command);
                match encoded {
                    Ok(frame) => self.transmit(frame).await,
                    Err(e) => self.listeners.error(&e.into()),
                }
            }
            Request::Binary(data) => self.transmit(Frame::Binary(data)).await,
            Request::ErrorListener(listener) => self.listeners.add_error(listener),
            Request::CloseListener(listener) => self.listeners.add_close(listener),
            Request::RejectPending(ack) => {
                let _ = ack.send(self.dispatcher.reject_pending());
            }
            Request::Status(ack) => {
                let _ = ack.send(self.dispatcher.status());
            }
            Request::Close(ack) => {
                // Later sends fail fast instead of queueing into a dead task
                self.inbox.close();
                let _ = ack.send(self.shutdown().await);
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    async fn handle_frame(&mut self, frame: usb2snes_fabric::Result<Frame>) {
        match frame {
            Ok(frame) => match self.dispatcher.on_inbound(frame) {
                Ok(Some(next)) => self.transmit(next).await,
                Ok(None) => {}
                Err(e) => self.listeners.error(&e),
            },
            Err(FabricError::Closed(info)) => {
                tracing::info!(code = info.code, reason = %info.reason, "connection closed by server");
                self.open = false;
                self.listeners.close(&info);
            }
            Err(e) => {
                tracing::warn!("connection lost: {}", e);
                self.open = false;
                self.listeners.error(&e.into());
                self.listeners.close(&CloseInfo::abnormal());
            }
        }
    }

    async fn transmit(&mut self, frame: Frame) {
        if let Err(e) = self.channel.send_frame(frame).await {
            tracing::warn!("send failed: {}", e);
            self.listeners.error(&e.into());
        }
    }

    async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("closing client");
        let farewell = if self.open {
            let encoded = self.channel.codec().encode(&Command::new(Opcode::Close));
            match encoded {
                Ok(frame) => self.channel.send_frame(frame).await,
                Err(e) => Err(e),
            }
        } else {
            Ok(())
        };
        self.open = false;
        let closed = self.channel.shutdown().await;
        farewell.and(closed).map_err(Error::from)
    }
}

/// Builder for connecting a client
pub struct ClientBuilder {
    address: String,
    connect_timeout: Option<Duration>,
    send_timeout: Option<Duration>,
    name: Option<String>,
    device: Option<String>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            connect_timeout: None,
            send_timeout: None,
            name: None,
            device: None,
        }
    }
}

impl ClientBuilder {
    /// Create a new builder targeting [`DEFAULT_ADDRESS`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the address to connect to
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Give up on a single outbound frame after `timeout`
    ///
    /// A stalled send is reported to the error listeners; it does not time
    /// out the reply to a queued command.
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = Some(timeout);
        self
    }

    /// Announce a client name right after connecting
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach to a device right after connecting
    pub fn attach(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Connect with the configured settings
    pub async fn connect(self) -> Result<Client> {
        let mut transport = WebSocketTransport::builder().address(self.address);
        if let Some(timeout) = self.connect_timeout {
            transport = transport.connect_timeout(timeout);
        }
        if let Some(timeout) = self.send_timeout {
            transport = transport.send_timeout(timeout);
        }
        let client = Client::from_transport(transport.connect().await?);

        if let Some(name) = self.name {
            client.set_name(name)?;
        }
        if let Some(device) = self.device {
            client.attach(device)?;
        }
        Ok(client)
    }
}
