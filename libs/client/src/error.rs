use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Fabric(#[from] usb2snes_fabric::Error),

    /// An inbound frame arrived with no pending command to pair it with
    #[error("Desynchronized: inbound frame arrived with no pending command")]
    Desync,

    #[error("Command abandoned before its response arrived")]
    Abandoned,

    #[error("Client task is no longer running")]
    ClientGone,
}

pub type Result<T> = std::result::Result<T, Error>;
