use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown opcode: {0}")]
    UnknownOpcode(String),

    #[error("Unknown address space: {0}")]
    UnknownSpace(String),
}

pub type Result<T> = std::result::Result<T, Error>;
