//! USB2SNES Client - command correlation and dispatch
//!
//! The USB2SNES protocol has no request identifiers: each reply belongs to
//! the oldest unanswered command. This crate queues commands, keeps exactly
//! one on the wire, and pairs replies with callers in arrival order.
//!
//! - [`dispatch`] holds the queue and state machine, free of I/O.
//! - [`Client`] runs it on a tokio task over a [`usb2snes_fabric::Channel`].

pub mod client;
pub mod dispatch;
pub mod error;
pub mod listener;

// Re-exports for convenience
pub use client::{Client, ClientBuilder, ResponseFuture};
pub use dispatch::{DispatchState, Status};
pub use error::{Error, Result};
pub use usb2snes_fabric::{CloseInfo, Response};
