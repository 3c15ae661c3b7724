use tokio::sync::mpsc;

use crate::error::{CloseInfo, Error, Result};
use crate::transport::{Frame, Transport};

/// In-process transport backed by a pair of unbounded channels
///
/// Frames sent on one end arrive on the other in order. Closing or dropping
/// one end makes the other end's `receive` fail with a normal close.
pub struct MemoryTransport {
    tx: Option<mpsc::UnboundedSender<Frame>>,
    rx: mpsc::UnboundedReceiver<Frame>,
}

impl MemoryTransport {
    /// Create two connected ends
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (
            Self {
                tx: Some(a_tx),
                rx: a_rx,
            },
            Self {
                tx: Some(b_tx),
                rx: b_rx,
            },
        )
    }
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, frame: Frame) -> Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or(Error::Closed(CloseInfo::new(1000, "closed locally")))?;
        tx.send(frame)
            .map_err(|_| Error::Closed(CloseInfo::abnormal()))
    }

    async fn receive(&mut self) -> Result<Frame> {
        self.rx
            .recv()
            .await
            .ok_or(Error::Closed(CloseInfo::new(1000, "")))
    }

    async fn close(&mut self) -> Result<()> {
        self.tx = None;
        Ok(())
    }
}
