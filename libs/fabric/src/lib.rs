//! USB2SNES Fabric - transport and codec layer
//!
//! Provides the WebSocket and in-memory transports, the JSON envelope codec
//! and a [`Channel`] that pairs the two.
//!
//! # Example
//!
//! ```no_run
//! use usb2snes_core::{Command, Opcode};
//! use usb2snes_fabric::{codec::JsonCodec, request::request, Channel};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // One-off request
//! let devices = request("ws://localhost:23074", &Command::new(Opcode::DeviceList), JsonCodec)
//!     .await?
//!     .into_results()?;
//!
//! // Or use a persistent channel
//! let mut channel = Channel::connect("ws://localhost:23074", JsonCodec).await?;
//! channel.send(&Command::new(Opcode::Attach).operand(&devices[0])).await?;
//! channel.send(&Command::new(Opcode::Info)).await?;
//! let info = channel.receive().await?.into_results()?;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod codec;
pub mod error;
pub mod request;
pub mod transport;

// Re-exports for convenience
pub use channel::Channel;
pub use codec::{Codec, JsonCodec, Response};
pub use error::{CloseInfo, Error, Result};
pub use transport::{Frame, MemoryTransport, Transport, WebSocketTransport};
