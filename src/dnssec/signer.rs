use std::path::Path;

use chrono::{Local, TimeDelta};
use tracing::info;

use super::errors::{DnssecError, Result};
use super::keys;
use crate::exec::{CommandLine, Commander};

/// Path of the external zone signer.
pub const SIGNZONE_BIN: &str = "/usr/bin/ldns-signzone";

/// How far out signatures are dated.
const SIGNATURE_VALIDITY_DAYS: i64 = 30;

/// Sign a freshly written zone file, creating `{domain}.txt.signed`.
///
/// Missing key material is generated first; signer failure carries the
/// tool's combined output and is fatal for this domain's signing step.
pub fn sign_zone(
    commander: &dyn Commander,
    domain: &str,
    zone_dir: &Path,
    key_dir: &Path,
    algorithm: &str,
) -> Result<()> {
    let (ksk, zsk) = keys::ensure_keys(commander, domain, algorithm, key_dir)?;
    let expiration = (Local::now() + TimeDelta::days(SIGNATURE_VALIDITY_DAYS))
        .format("%Y%m%d")
        .to_string();
    let zone_file = zone_dir.join(format!("{}.txt", domain));
    let cmd = CommandLine::new(SIGNZONE_BIN)
        .args(["-e", &expiration, "-n"])
        .arg(zone_file.display().to_string())
        .arg(ksk)
        .arg(zsk);
    commander
        .combined_output(&cmd)
        .map_err(|e| DnssecError::Signing(e.to_string()))?;
    info!("signed zone {}", domain);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::MockCommander;
    use std::fs;

    fn key_files(dir: &Path) {
        for prefix in ["example.com.RSASHA256.KSK", "example.com.RSASHA256.ZSK"] {
            for ext in ["private", "ds", "key"] {
                fs::write(dir.join(format!("{}.{}", prefix, ext)), "key").unwrap();
            }
        }
    }

    #[test]
    fn test_sign_zone_invokes_signer() {
        let dir = tempfile::tempdir().unwrap();
        key_files(dir.path());
        let commander = MockCommander::new();
        let expiration = (Local::now() + TimeDelta::days(30))
            .format("%Y%m%d")
            .to_string();
        let expected = format!(
            "{} -e {} -n {}/example.com.txt {}/example.com.RSASHA256.KSK {}/example.com.RSASHA256.ZSK",
            SIGNZONE_BIN,
            expiration,
            dir.path().display(),
            dir.path().display(),
            dir.path().display()
        );
        commander.expect(expected.clone(), "");
        sign_zone(&commander, "example.com", dir.path(), dir.path(), "RSASHA256").unwrap();
        assert_eq!(commander.calls(), vec![expected]);
    }

    #[test]
    fn test_signer_failure_surfaces_output() {
        let dir = tempfile::tempdir().unwrap();
        key_files(dir.path());
        let commander = MockCommander::new();
        let expiration = (Local::now() + TimeDelta::days(30))
            .format("%Y%m%d")
            .to_string();
        commander.fail(
            format!(
                "{} -e {} -n {}/example.com.txt {}/example.com.RSASHA256.KSK {}/example.com.RSASHA256.ZSK",
                SIGNZONE_BIN,
                expiration,
                dir.path().display(),
                dir.path().display(),
                dir.path().display()
            ),
            "ldns-signzone: cannot read zone",
        );
        let err =
            sign_zone(&commander, "example.com", dir.path(), dir.path(), "RSASHA256").unwrap_err();
        assert!(err.to_string().contains("cannot read zone"));
    }
}
