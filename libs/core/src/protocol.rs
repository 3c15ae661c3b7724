use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Endpoint QUsb2snes listens on out of the box
pub const DEFAULT_ADDRESS: &str = "ws://localhost:23074";

/// Addressing context of a command
///
/// `Snes` addresses console memory, `Cmd` the cart's internal command space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Space {
    #[default]
    #[serde(rename = "SNES")]
    Snes,
    #[serde(rename = "CMD")]
    Cmd,
}

impl Space {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Snes => "SNES",
            Self::Cmd => "CMD",
        }
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Space {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SNES" => Ok(Self::Snes),
            "CMD" => Ok(Self::Cmd),
            other => Err(Error::UnknownSpace(other.to_string())),
        }
    }
}

macro_rules! opcodes {
    ($($(#[$doc:meta])* $variant:ident => $wire:literal,)+) => {
        /// Opcodes understood by the server
        ///
        /// The client treats opcodes as opaque strings; this catalog only
        /// saves callers from spelling them by hand.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $($(#[$doc])* $variant,)+
        }

        impl Opcode {
            /// Every opcode in catalog order
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant,)+];

            /// Wire spelling of the opcode
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl FromStr for Opcode {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(Error::UnknownOpcode(other.to_string())),
                }
            }
        }
    };
}

opcodes! {
    /// `{port...}` of every attachable device
    DeviceList => "DeviceList",
    /// `[device]`, no reply
    Attach => "Attach",
    /// `{version}` of the server application
    AppVersion => "AppVersion",
    /// `[name]` of this client, no reply
    Name => "Name",
    /// Closes the connection server side, no reply
    Close => "Close",
    /// `{firmware, version, rom, flags...}`
    Info => "Info",
    /// `[rom]`
    Boot => "Boot",
    Menu => "Menu",
    Reset => "Reset",
    Binary => "Binary",
    Stream => "Stream",
    Fence => "Fence",
    /// `[offset, size...]` answered with raw bytes
    GetAddress => "GetAddress",
    /// `[offset, size...]` followed by a binary upload
    PutAddress => "PutAddress",
    /// `[name, size]` followed by a binary upload
    PutIPS => "PutIPS",
    /// `[path]` answered with `{size}` then the file bytes
    GetFile => "GetFile",
    /// `[path, size]` followed by a binary upload
    PutFile => "PutFile",
    /// `[dir]` answered with `{type, name, type, name...}`
    List => "List",
    Remove => "Remove",
    Rename => "Rename",
    MakeDir => "MakeDir",
}

impl Opcode {
    /// Whether the server answers this opcode
    ///
    /// Opcodes that return `false` must be sent without queueing, otherwise
    /// the next reply would be paired with the wrong command.
    pub fn expects_response(self) -> bool {
        !matches!(self, Self::Attach | Self::Name | Self::Close)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Opcode> for String {
    fn from(opcode: Opcode) -> Self {
        opcode.as_str().to_string()
    }
}
