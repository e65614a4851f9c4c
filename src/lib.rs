pub mod config;
pub mod db;
pub mod dnssec;
pub mod error;
pub mod exec;
pub mod net;
pub mod nsd;
pub mod resolver;
pub mod updater;
pub mod zone;

pub use error::{Error, Result};
