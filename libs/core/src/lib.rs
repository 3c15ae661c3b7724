//! USB2SNES Core - protocol vocabulary
//!
//! Names the opcodes, address spaces and command records exchanged with a
//! USB2SNES / QUsb2snes server. Nothing here performs I/O; the transport and
//! codec layers live in `usb2snes-fabric`.
//!
//! # Example
//!
//! ```
//! use usb2snes_core::{Command, Opcode, Space};
//!
//! let read = Command::new(Opcode::GetAddress)
//!     .operands(["F50010", "2"])
//!     .space(Space::Snes);
//! assert_eq!(read.opcode, "GetAddress");
//! ```

pub mod command;
pub mod error;
pub mod protocol;

pub use command::Command;
pub use error::{Error, Result};
pub use protocol::{Opcode, Space, DEFAULT_ADDRESS};
