use usb2snes_core::Command;

use crate::error::{Error, Result};
use crate::transport::Frame;

pub mod json;

pub use self::json::JsonCodec;

/// Decoded reply to a single command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Raw payload, passed through undecoded
    Binary(Vec<u8>),
    /// The `Results` field of a structured reply
    Results(Vec<String>),
}

impl Response {
    pub fn into_results(self) -> Result<Vec<String>> {
        match self {
            Self::Results(results) => Ok(results),
            Self::Binary(bytes) => Err(Error::Protocol(format!(
                "Expected structured results, got {} binary bytes",
                bytes.len()
            ))),
        }
    }

    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            Self::Binary(bytes) => Ok(bytes),
            Self::Results(results) => Err(Error::Protocol(format!(
                "Expected binary payload, got results {:?}",
                results
            ))),
        }
    }
}

/// Codec trait for framing commands and decoding replies
pub trait Codec: Send + Sync {
    /// Encode a command into an outbound frame
    fn encode(&self, command: &Command) -> Result<Frame>;

    /// Decode an inbound frame into a response
    fn decode(&self, frame: Frame) -> Result<Response>;
}
