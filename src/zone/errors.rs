use std::fmt;

/// Zone synthesis and versioning errors
#[derive(Debug, Clone)]
pub enum ZoneError {
    /// Domain has no NS records and no defaults apply
    MissingNameServers(String),
    /// Zone file read/write failure
    Io(String),
}

impl fmt::Display for ZoneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingNameServers(domain) => {
                write!(f, "domain {} has no NS records", domain)
            }
            Self::Io(msg) => write!(f, "zone file IO error: {}", msg),
        }
    }
}

impl std::error::Error for ZoneError {}

pub type Result<T> = std::result::Result<T, ZoneError>;
