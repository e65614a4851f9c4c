pub mod errors;
pub mod keys;
pub mod signer;

pub use errors::{DnssecError, Result};
pub use keys::{KeyType, ensure_keys};
pub use signer::sign_zone;
