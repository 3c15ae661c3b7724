use std::fmt;

use thiserror::Error;

/// Close status reported when the connection ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
}

impl CloseInfo {
    /// Status used when the stream ended without a close handshake
    pub const ABNORMAL: u16 = 1006;

    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    pub fn abnormal() -> Self {
        Self::new(Self::ABNORMAL, "")
    }
}

impl fmt::Display for CloseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Connection closed ({})", self.code)?;
        if !self.reason.is_empty() {
            write!(f, ": {}", self.reason)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("{0}")]
    Closed(CloseInfo),

    #[error("{0}")]
    Custom(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;

        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => {
                Self::Closed(CloseInfo::abnormal())
            }
            WsError::Io(e) => Self::Io(e),
            other => Self::Connection(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_info_formats_code_and_reason() {
        assert_eq!(
            CloseInfo::new(1000, "bye").to_string(),
            "Connection closed (1000): bye"
        );
        assert_eq!(CloseInfo::abnormal().to_string(), "Connection closed (1006)");
    }
}
