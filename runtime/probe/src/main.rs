//! Command-line probe for USB2SNES servers.

mod cli;

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use usb2snes_client::{Client, Response};
use usb2snes_core::Command;

use crate::cli::{directory_entries, hex_dump, Action, Cli};

#[derive(Error, Debug)]
enum ProbeError {
    #[error(transparent)]
    Client(#[from] usb2snes_client::Error),

    #[error("No device available on the server")]
    NoDevice,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), ProbeError> {
    let client = Client::builder()
        .address(cli.address.clone())
        .connect_timeout(cli.timeout())
        .send_timeout(cli.timeout())
        .name(cli.name.clone())
        .connect()
        .await?;
    client.add_error_listener(|e| tracing::error!("{}", e))?;
    client.add_close_listener(|info| tracing::warn!("{}", info))?;

    let outcome = execute(&client, &cli).await;
    client.close().await?;
    outcome
}

async fn execute(client: &Client, cli: &Cli) -> Result<(), ProbeError> {
    if cli.action.needs_device() {
        let device = match &cli.device {
            Some(device) => device.clone(),
            None => client
                .device_list()
                .await?
                .into_iter()
                .next()
                .ok_or(ProbeError::NoDevice)?,
        };
        tracing::info!(%device, "attaching");
        client.attach(device)?;
    }

    match &cli.action {
        Action::Devices => print_lines(client.device_list().await?),
        Action::Version => println!("{}", client.app_version().await?),
        Action::Info => print_lines(client.info().await?),
        Action::Read { address, size } => {
            let bytes = client.get_address(*address, *size).await?;
            print_lines(hex_dump(*address, &bytes));
        }
        Action::Ls { path } => print_lines(directory_entries(&client.list(path.clone()).await?)),
        Action::Raw {
            opcode,
            operands,
            flags,
            space,
            no_reply,
        } => {
            let mut command = Command::new(opcode.clone())
                .operands(operands.iter().cloned())
                .space(*space);
            for flag in flags {
                command = command.flag(flag.clone());
            }

            if *no_reply {
                client.send_immediate(command)?;
            } else {
                match client.send(command).await? {
                    Response::Results(results) => print_lines(results),
                    Response::Binary(bytes) => print_lines(hex_dump(0, &bytes)),
                }
            }
        }
    }
    Ok(())
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}
