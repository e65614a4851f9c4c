use thiserror::Error;

use crate::dnssec::DnssecError;
use crate::zone::ZoneError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Zone(#[from] ZoneError),

    #[error("{0}")]
    Dnssec(#[from] DnssecError),

    #[error("data source error: {0}")]
    DataSource(String),

    #[error("external tool error: {0}")]
    ExternalTool(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
