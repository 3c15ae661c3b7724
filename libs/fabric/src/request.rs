use usb2snes_core::Command;

use crate::channel::Channel;
use crate::codec::{Codec, Response};
use crate::error::Result;

/// Perform a one-off request/response
///
/// Opens a connection, sends the command, receives the reply, and closes the
/// connection. Only suitable for opcodes that need no prior `Attach`, such as
/// `DeviceList` or `AppVersion`.
pub async fn request<C>(address: impl Into<String>, command: &Command, codec: C) -> Result<Response>
where
    C: Codec,
{
    let mut channel = Channel::connect(address, codec).await?;
    channel.send(command).await?;
    let response = channel.receive().await?;
    channel.close().await?;
    Ok(response)
}
