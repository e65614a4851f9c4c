use std::fmt;

/// DNSSEC key-management and signing errors
#[derive(Debug, Clone)]
pub enum DnssecError {
    /// Key-generator invocation failed
    KeyGeneration(String),
    /// Generated key files could not be moved to their canonical names
    KeyRename(String),
    /// Zone-signer invocation failed; carries the captured tool output
    Signing(String),
}

impl fmt::Display for DnssecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyGeneration(msg) => write!(f, "unable to create signing keys: {}", msg),
            Self::KeyRename(msg) => write!(f, "key rename failed: {}", msg),
            Self::Signing(msg) => write!(f, "error signing zone: {}", msg),
        }
    }
}

impl std::error::Error for DnssecError {}

pub type Result<T> = std::result::Result<T, DnssecError>;
