use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Runtime configuration, loaded from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database server host
    pub db_host: String,

    /// Database server port
    #[serde(default = "default_db_port")]
    pub db_port: u16,

    pub db_user: String,
    pub db_password: String,
    pub db_name: String,

    /// Directory the NSD configuration fragment is written to
    pub nsd_dir: PathBuf,

    /// Directory holding the generated zone files
    pub zone_file_directory: PathBuf,

    /// Shared secret published in the transfer key block
    pub zone_password: String,

    /// Root of the per-domain DKIM key tree ({root}/{domain}/mail.txt)
    pub dkim_keys_path: PathBuf,

    /// TLS certificate whose fingerprint goes into TLSA records
    pub tls_certificate_path: PathBuf,

    /// Optional Postfix virtual-domains file merged into the zone set
    #[serde(default)]
    pub postfix_virtual_domains_path: Option<PathBuf>,

    /// Address of the DNS master; decides this host's role
    pub dns_master_ip: String,

    /// Space-separated addresses of the DNS slaves
    pub dns_slave_ips: String,

    /// Directory holding DNSSEC signing keys
    pub dnssec_key_dir: PathBuf,

    /// DNSSEC signing algorithm passed to the key generator
    #[serde(default = "default_signing_algorithm")]
    pub signing_algorithm: String,

    /// Rewrite (and thus re-sign) otherwise unchanged zones when their
    /// signature expiration comes within three days
    #[serde(default)]
    pub resign_before_expiry: bool,
}

fn default_db_port() -> u16 {
    5432
}

fn default_signing_algorithm() -> String {
    "RSASHA256".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&text).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
db_host = "db.internal"
db_user = "dns"
db_password = "hunter2"
db_name = "dnsconfig"
nsd_dir = "/etc/nsd"
zone_file_directory = "/etc/nsd/zones"
zone_password = "transfer-secret"
dkim_keys_path = "/etc/dkim/keys"
tls_certificate_path = "/etc/ssl/certs/mail.pem"
dns_master_ip = "203.0.113.1"
dns_slave_ips = "203.0.113.2 203.0.113.3"
dnssec_key_dir = "/etc/nsd/keys"
"#;

    #[test]
    fn test_load_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zonewright.toml");
        fs::write(&path, SAMPLE).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.db_port, 5432);
        assert_eq!(config.signing_algorithm, "RSASHA256");
        assert!(!config.resign_before_expiry);
        assert!(config.postfix_virtual_domains_path.is_none());
        assert_eq!(config.dns_master_ip, "203.0.113.1");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::load(Path::new("/nonexistent/zonewright.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_missing_field_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zonewright.toml");
        fs::write(&path, "db_host = \"db\"").unwrap();
        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
    }
}
