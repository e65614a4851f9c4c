use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};
use crate::exec::{CommandLine, Commander};
use crate::zone::Domain;

/// Name of the generated configuration fragment under the NSD directory.
pub const ZONE_CONFIG_FILE: &str = "zones.conf";

const SERVICE_BIN: &str = "/usr/sbin/service";

/// Render the NSD configuration fragment for the whole zone set: a
/// shared-secret key block followed by one stanza per zone referencing
/// its signed zone file, with transfer directives matching this host's
/// role.
pub fn render_config(
    zones: &[Domain],
    is_master: bool,
    password: &str,
    master_ip: &str,
    slave_ips: &str,
) -> String {
    let mut config = format!(
        "key:\n  name: \"sec_key\"\n  algorithm: hmac-sha256\n  secret: \"{}\"",
        password
    );
    for zone in zones {
        config.push_str(&format!(
            "\n\nzone:\n  name: {}\n  zonefile: {}.txt.signed\n\n",
            zone.name, zone.name
        ));
        if is_master {
            config.push_str(&format!(
                "  notify: {} sec_key\n  provide-xfr: {} sec_key",
                slave_ips, slave_ips
            ));
        } else {
            config.push_str(&format!(
                "  allow-notify: {} sec_key\n  request-xfr: AXFR {}@53 sec_key",
                master_ip, master_ip
            ));
        }
    }
    config
}

/// Write the configuration fragment to `{nsd_dir}/zones.conf`.
pub fn write_config(
    nsd_dir: &Path,
    zones: &[Domain],
    is_master: bool,
    password: &str,
    master_ip: &str,
    slave_ips: &str,
) -> Result<()> {
    let path = nsd_dir.join(ZONE_CONFIG_FILE);
    let config = render_config(zones, is_master, password, master_ip, slave_ips);
    fs::write(&path, config)
        .map_err(|e| Error::Io(format!("cannot write {}: {}", path.display(), e)))?;
    info!("wrote {} ({} zones)", path.display(), zones.len());
    Ok(())
}

/// Ask the local NSD to pick up the new zone set.
pub fn reload_server(commander: &dyn Commander) -> Result<()> {
    let cmd = CommandLine::new(SERVICE_BIN).args(["nsd", "reload"]);
    commander
        .combined_output(&cmd)
        .map_err(|e| Error::ExternalTool(format!("unable to reload NSD server: {}", e)))?;
    info!("reloaded NSD server");
    Ok(())
}
