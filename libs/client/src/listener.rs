use usb2snes_fabric::CloseInfo;

use crate::error::Error;

/// Callback for transport errors and desyncs
pub type ErrorListener = Box<dyn Fn(&Error) + Send>;

/// Callback for the connection closing from the server side
pub type CloseListener = Box<dyn Fn(&CloseInfo) + Send>;

/// Observers registered on a client, owned by its task
#[derive(Default)]
pub(crate) struct Listeners {
    on_error: Vec<ErrorListener>,
    on_close: Vec<CloseListener>,
}

impl Listeners {
    pub(crate) fn add_error(&mut self, listener: ErrorListener) {
        self.on_error.push(listener);
    }

    pub(crate) fn add_close(&mut self, listener: CloseListener) {
        self.on_close.push(listener);
    }

    pub(crate) fn error(&self, err: &Error) {
        if self.on_error.is_empty() {
            tracing::warn!("unobserved client error: {}", err);
        }
        for listener in &self.on_error {
            listener(err);
        }
    }

    pub(crate) fn close(&self, info: &CloseInfo) {
        for listener in &self.on_close {
            listener(info);
        }
    }
}
