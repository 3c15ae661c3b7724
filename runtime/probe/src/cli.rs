use std::time::Duration;

use clap::{Parser, Subcommand};
use usb2snes_core::{Space, DEFAULT_ADDRESS};

#[derive(Parser, Debug)]
#[command(version, about = "Query a USB2SNES server", long_about = None)]
pub struct Cli {
    /// WebSocket address of the server
    #[arg(long, env = "USB2SNES_ADDRESS", default_value = DEFAULT_ADDRESS)]
    pub address: String,

    /// Client name announced to the server
    #[arg(long, env = "USB2SNES_NAME", default_value = "usb2snes-probe")]
    pub name: String,

    /// Device to attach to; defaults to the first one listed
    #[arg(long, env = "USB2SNES_DEVICE")]
    pub device: Option<String>,

    /// Connect and per-frame send timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    pub timeout_ms: u64,

    #[command(subcommand)]
    pub action: Action,
}

impl Cli {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Subcommand, Debug)]
pub enum Action {
    /// List attachable devices
    Devices,
    /// Show the server application version
    Version,
    /// Show firmware and ROM information of the device
    Info,
    /// Read console memory
    Read {
        /// Start address, hexadecimal
        #[arg(value_parser = parse_hex)]
        address: u32,
        /// Number of bytes
        size: usize,
    },
    /// List a directory on the cart
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Send an arbitrary opcode and print the reply
    Raw {
        opcode: String,
        operands: Vec<String>,
        #[arg(long = "flag")]
        flags: Vec<String>,
        #[arg(long, default_value = "SNES")]
        space: Space,
        /// The opcode gets no reply; send it without waiting
        #[arg(long)]
        no_reply: bool,
    },
}

impl Action {
    /// Whether the action talks to a device rather than the server itself
    pub fn needs_device(&self) -> bool {
        !matches!(self, Self::Devices | Self::Version)
    }
}

fn parse_hex(value: &str) -> Result<u32, String> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix('$'))
        .unwrap_or(value);
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid hex address '{}': {}", value, e))
}

/// Classic 16-bytes-per-line hex dump
pub fn hex_dump(base: u32, bytes: &[u8]) -> Vec<String> {
    bytes
        .chunks(16)
        .enumerate()
        .map(|(row, chunk)| {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
            format!("{:06X}  {}", base as usize + row * 16, hex.join(" "))
        })
        .collect()
}

/// Pair up the alternating type/name entries of a `List` reply
pub fn directory_entries(results: &[String]) -> Vec<String> {
    results
        .chunks(2)
        .map(|entry| match entry {
            [kind, name] if kind == "0" => format!("{}/", name),
            [_, name] => name.clone(),
            [name] => name.clone(),
            _ => String::new(),
        })
        .collect()
}
