use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that cross crate boundaries in the voxbridge pipeline.
#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("transport closed")]
    TransportClosed,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("unknown call id {0}")]
    UnknownCall(u32),

    #[error("resource unavailable: {0}")]
    Resource(String),
}
