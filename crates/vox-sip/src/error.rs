use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed SIP message: {0}")]
    Malformed(String),

    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("unsupported authentication scheme: {0}")]
    UnsupportedAuthScheme(String),
}
