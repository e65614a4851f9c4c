pub mod builder;
pub mod errors;
pub mod record;
pub mod render;
pub mod versioner;

pub use builder::{BuildContext, Domain, ZoneDefaults};
pub use errors::{Result, ZoneError};
pub use record::DnsRecord;
pub use render::render;
pub use versioner::reconcile_and_write;

/// Zone policy constants
pub mod constants {
    /// Default TTL stamped into every zone header (30 minutes)
    pub const DEFAULT_TTL: u32 = 1800;

    /// SOA refresh interval (2 hours)
    pub const REFRESH: u32 = 7200;

    /// SOA retry interval (30 minutes)
    pub const RETRY: u32 = 1800;

    /// SOA expire interval (2 weeks)
    pub const EXPIRE: u32 = 1_209_600;

    /// SOA negative-caching TTL (30 minutes)
    pub const NEGATIVE_TTL: u32 = 1800;

    /// Mailbox name published in the SOA RNAME field
    pub const HOSTMASTER: &str = "hostmaster";

    /// How long zone file backup copies are kept (2 weeks)
    pub const BACKUP_RETENTION_HOURS: u32 = 336;
}
