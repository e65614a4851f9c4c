use std::collections::HashSet;
use std::fs;
use std::thread;
use std::time::Duration;

use tracing::{error, info};

use crate::config::Config;
use crate::db::DnsBackend;
use crate::dnssec;
use crate::error::{Error, Result};
use crate::exec::Commander;
use crate::net;
use crate::nsd;
use crate::resolver::NameResolver;
use crate::zone::{self, BuildContext, Domain, ZoneDefaults};

/// Drives one full run: fetch domains, synthesize and reconcile every
/// zone, sign what changed, and emit the server configuration.
pub struct ZoneUpdater<'a> {
    config: &'a Config,
    commander: &'a dyn Commander,
    resolver: &'a dyn NameResolver,
    defaults: ZoneDefaults,
    is_master: bool,
}

impl std::fmt::Debug for ZoneUpdater<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneUpdater")
            .field("config", &self.config)
            .field("defaults", &self.defaults)
            .field("is_master", &self.is_master)
            .finish_non_exhaustive()
    }
}

impl<'a> ZoneUpdater<'a> {
    /// The master/slave role is decided once per run from the host's
    /// addresses. The zone directory must already exist; refusing to
    /// create it keeps a misconfigured run from scattering zone files.
    pub fn new(
        config: &'a Config,
        commander: &'a dyn Commander,
        resolver: &'a dyn NameResolver,
        local_addresses: &[String],
    ) -> Result<Self> {
        if !config.zone_file_directory.exists() {
            return Err(Error::Config(format!(
                "zone file directory {} does not exist",
                config.zone_file_directory.display()
            )));
        }
        let is_master = net::is_master(local_addresses, &config.dns_master_ip);
        info!(
            "running as {}",
            if is_master { "master" } else { "slave" }
        );
        Ok(Self {
            config,
            commander,
            resolver,
            defaults: ZoneDefaults::default(),
            is_master,
        })
    }

    pub fn is_master(&self) -> bool {
        self.is_master
    }

    /// Process every domain, then emit the server configuration and
    /// reload when anything changed. Schema/fetch failures abort the
    /// run; per-domain build and signing failures skip that domain,
    /// and the first one is surfaced after the loop.
    pub fn run(&self, backend: &mut dyn DnsBackend) -> Result<()> {
        backend.create_schema()?;
        let mut domains = backend.get_domains()?;
        self.merge_virtual_domains(&mut domains)?;
        info!("processing {} domains", domains.len());

        let mut updated_any = false;
        let mut first_error = None;
        for domain in &mut domains {
            if let Err(e) = self.process_domain(domain, &mut updated_any) {
                error!("{}: {}", domain.name, e);
                first_error.get_or_insert(e);
            }
        }

        if updated_any {
            nsd::write_config(
                &self.config.nsd_dir,
                &domains,
                self.is_master,
                &self.config.zone_password,
                &self.config.dns_master_ip,
                &self.config.dns_slave_ips,
            )?;
            if self.is_master {
                // give config files a moment to finish closing
                thread::sleep(Duration::from_secs(1));
                nsd::reload_server(self.commander)?;
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Build, reconcile and (when rewritten) sign one domain's zone.
    ///
    /// A write is recorded in `updated` before signing runs, so a zone
    /// that reached the disk counts toward config emission even when
    /// its signing step fails.
    fn process_domain(&self, domain: &mut Domain, updated: &mut bool) -> Result<()> {
        let dkim_key_path = self
            .config
            .dkim_keys_path
            .join(&domain.name)
            .join("mail.txt");
        let ctx = BuildContext {
            dkim_key_path: &dkim_key_path,
            tls_certificate_path: &self.config.tls_certificate_path,
            resolver: self.resolver,
            commander: self.commander,
            defaults: &self.defaults,
        };
        domain.build_records(&ctx)?;
        let written = zone::reconcile_and_write(
            domain,
            &self.config.zone_file_directory,
            self.config.resign_before_expiry,
        )?;
        *updated |= written;
        if written {
            dnssec::sign_zone(
                self.commander,
                &domain.name,
                &self.config.zone_file_directory,
                &self.config.dnssec_key_dir,
                &self.config.signing_algorithm,
            )?;
        }
        Ok(())
    }

    /// Append apex-only domains listed in the Postfix virtual-domains
    /// file (one name per line) that the database does not know about.
    fn merge_virtual_domains(&self, domains: &mut Vec<Domain>) -> Result<()> {
        let Some(path) = &self.config.postfix_virtual_domains_path else {
            return Ok(());
        };
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("cannot read {}: {}", path.display(), e)))?;
        let known: HashSet<String> = domains.iter().map(|d| d.name.clone()).collect();
        for line in text.lines() {
            let name = line.trim();
            if name.is_empty() || known.contains(name) {
                continue;
            }
            domains.push(Domain::new(name));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::MockCommander;
    use crate::resolver::StaticResolver;
    use std::path::PathBuf;

    fn config(zone_dir: PathBuf) -> Config {
        Config {
            db_host: "db".to_string(),
            db_port: 5432,
            db_user: "dns".to_string(),
            db_password: "pw".to_string(),
            db_name: "dns".to_string(),
            nsd_dir: zone_dir.clone(),
            zone_file_directory: zone_dir,
            zone_password: "secret".to_string(),
            dkim_keys_path: PathBuf::from("/nonexistent/dkim"),
            tls_certificate_path: PathBuf::from("/nonexistent/cert.pem"),
            postfix_virtual_domains_path: None,
            dns_master_ip: "203.0.113.1".to_string(),
            dns_slave_ips: "203.0.113.2".to_string(),
            dnssec_key_dir: PathBuf::from("/nonexistent/keys"),
            signing_algorithm: "RSASHA256".to_string(),
            resign_before_expiry: false,
        }
    }

    #[test]
    fn test_missing_zone_directory_rejected() {
        let mut config = config(PathBuf::from("/nonexistent/zones"));
        config.zone_file_directory = PathBuf::from("/nonexistent/zones");
        let commander = MockCommander::new();
        let resolver = StaticResolver::new();
        let err = ZoneUpdater::new(&config, &commander, &resolver, &[]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_role_detection() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path().to_path_buf());
        let commander = MockCommander::new();
        let resolver = StaticResolver::new();

        let master = ZoneUpdater::new(
            &config,
            &commander,
            &resolver,
            &["203.0.113.1".to_string()],
        )
        .unwrap();
        assert!(master.is_master());

        let slave = ZoneUpdater::new(
            &config,
            &commander,
            &resolver,
            &["203.0.113.9".to_string()],
        )
        .unwrap();
        assert!(!slave.is_master());
    }

    #[test]
    fn test_merge_virtual_domains() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("virtual_domains");
        fs::write(&list, "example.com\n\nexample.net\n  \nexample.org\n").unwrap();
        let mut config = config(dir.path().to_path_buf());
        config.postfix_virtual_domains_path = Some(list);
        let commander = MockCommander::new();
        let resolver = StaticResolver::new();
        let updater = ZoneUpdater::new(&config, &commander, &resolver, &[]).unwrap();

        let mut domains = vec![Domain::new("example.com")];
        updater.merge_virtual_domains(&mut domains).unwrap();
        let names: Vec<&str> = domains.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["example.com", "example.net", "example.org"]);
    }
}
