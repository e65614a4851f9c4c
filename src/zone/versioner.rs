use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{Local, NaiveDateTime, TimeDelta};
use tracing::{info, warn};

use super::builder::Domain;
use super::constants;
use super::errors::{Result, ZoneError};
use super::render::render;

/// Compare the fresh render against the zone file on disk and rewrite
/// it with a bumped serial when (and only when) the content changed.
///
/// Serial numbers use the `YYYYMMDDnn` convention: a same-day rewrite
/// increments the existing serial, any other rewrite starts at today's
/// `nn = 00` base. Returns whether a write happened.
///
/// When `resign_before_expiry` is set, an otherwise unchanged zone is
/// also rewritten once the RRSIG SOA expiration in `{file}.signed`
/// comes within three days, forcing a fresh signing pass downstream.
pub fn reconcile_and_write(
    domain: &Domain,
    directory: &Path,
    resign_before_expiry: bool,
) -> Result<bool> {
    let path = directory.join(format!("{}.txt", domain.name));
    let current_text = fs::read_to_string(&path).unwrap_or_default();
    let current_serial = extract_serial(&current_text);

    let unchanged = !current_text.is_empty() && current_text == render(domain, &current_serial);
    let expiring = resign_before_expiry
        && signature_near_expiry(&signed_path(&path), Local::now().naive_local());
    if unchanged && !expiring {
        return Ok(false);
    }

    let today = Local::now().format("%Y%m%d").to_string();
    let serial = next_serial(&current_serial, &today);
    fs::write(&path, render(domain, &serial))
        .map_err(|e| ZoneError::Io(format!("cannot write {}: {}", path.display(), e)))?;
    info!("updated {} (serial {})", path.display(), serial);

    if let Err(e) = backup(&path) {
        warn!("backup of {} failed: {}", path.display(), e);
    }
    prune_backups(directory, &format!("{}.txt_", domain.name));
    Ok(true)
}

fn signed_path(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.signed", path.display()))
}

/// Pull the serial out of the SOA line: the first digit run following
/// the opening parenthesis.
fn extract_serial(text: &str) -> String {
    for line in text.lines() {
        if !line.contains("\tSOA\t") {
            continue;
        }
        if let Some(pos) = line.find('(') {
            return line[pos + 1..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
        }
    }
    String::new()
}

fn next_serial(current: &str, today: &str) -> String {
    if current.len() == 10 && current.starts_with(today) {
        if let Ok(serial) = current.parse::<u64>() {
            return (serial + 1).to_string();
        }
    }
    format!("{}00", today)
}

/// A missing or unparseable signed artifact counts as expiring, so the
/// zone gets (re)signed on the next pass.
fn signature_near_expiry(signed: &Path, now: NaiveDateTime) -> bool {
    let text = match fs::read_to_string(signed) {
        Ok(text) => text,
        Err(_) => return true,
    };
    match rrsig_soa_expiration(&text) {
        Some(expiration) => expiration - TimeDelta::days(3) <= now,
        None => true,
    }
}

/// Expiration timestamp (14-digit, second resolution) of the RRSIG
/// covering the SOA record.
fn rrsig_soa_expiration(text: &str) -> Option<NaiveDateTime> {
    for line in text.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(i) = tokens.iter().position(|t| *t == "RRSIG") else {
            continue;
        };
        if tokens.get(i + 1) != Some(&"SOA") {
            continue;
        }
        // RRSIG SOA <alg> <labels> <origttl> <expiration> ...
        let Some(stamp) = tokens.get(i + 5) else {
            continue;
        };
        if stamp.len() == 14 {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S") {
                return Some(parsed);
            }
        }
    }
    None
}

fn backup(path: &Path) -> io::Result<()> {
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    fs::copy(path, format!("{}_{}", path.display(), stamp))?;
    Ok(())
}

/// Best-effort removal of backup copies past the retention window.
fn prune_backups(directory: &Path, prefix: &str) {
    let Ok(entries) = fs::read_dir(directory) else {
        return;
    };
    let cutoff =
        SystemTime::now() - Duration::from_secs(u64::from(constants::BACKUP_RETENTION_HOURS) * 3600);
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.starts_with(prefix) {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if let Ok(modified) = metadata.modified() {
            if modified < cutoff {
                let _ = fs::remove_file(entry.path());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::record::DnsRecord;

    fn domain() -> Domain {
        let mut domain = Domain::new("example.com");
        domain.default_ttl = 1800;
        domain.records.push(DnsRecord::soa(
            "example.com",
            "ns1",
            "hostmaster",
            7200,
            1800,
            1209600,
            1800,
        ));
        domain
            .records
            .push(DnsRecord::a("example.com.", "192.0.2.1"));
        domain
    }

    fn today() -> String {
        Local::now().format("%Y%m%d").to_string()
    }

    #[test]
    fn test_initial_write_uses_day_base_serial() {
        let dir = tempfile::tempdir().unwrap();
        let written = reconcile_and_write(&domain(), dir.path(), false).unwrap();
        assert!(written);
        let text = fs::read_to_string(dir.path().join("example.com.txt")).unwrap();
        assert!(text.contains(&format!("({}00 ", today())));
    }

    #[test]
    fn test_unchanged_zone_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let domain = domain();
        assert!(reconcile_and_write(&domain, dir.path(), false).unwrap());
        let before = fs::read_to_string(dir.path().join("example.com.txt")).unwrap();
        assert!(!reconcile_and_write(&domain, dir.path(), false).unwrap());
        let after = fs::read_to_string(dir.path().join("example.com.txt")).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_same_day_change_increments_serial() {
        let dir = tempfile::tempdir().unwrap();
        let mut domain = domain();
        assert!(reconcile_and_write(&domain, dir.path(), false).unwrap());
        domain
            .records
            .push(DnsRecord::a("www.example.com.", "192.0.2.2"));
        assert!(reconcile_and_write(&domain, dir.path(), false).unwrap());
        let text = fs::read_to_string(dir.path().join("example.com.txt")).unwrap();
        assert!(text.contains(&format!("({}01 ", today())));
    }

    #[test]
    fn test_cross_day_change_resets_serial() {
        let dir = tempfile::tempdir().unwrap();
        let mut domain = domain();
        assert!(reconcile_and_write(&domain, dir.path(), false).unwrap());
        let path = dir.path().join("example.com.txt");
        let text = fs::read_to_string(&path).unwrap();
        fs::write(&path, text.replace(&format!("{}00", today()), "2020010107")).unwrap();
        domain
            .records
            .push(DnsRecord::a("www.example.com.", "192.0.2.2"));
        assert!(reconcile_and_write(&domain, dir.path(), false).unwrap());
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains(&format!("({}00 ", today())));
    }

    #[test]
    fn test_backup_created_on_write() {
        let dir = tempfile::tempdir().unwrap();
        assert!(reconcile_and_write(&domain(), dir.path(), false).unwrap());
        let backups = fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with("example.com.txt_")
            })
            .count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn test_resign_trigger_ignored_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let domain = domain();
        assert!(reconcile_and_write(&domain, dir.path(), false).unwrap());
        // no .signed file at all, but the feature is off
        assert!(!reconcile_and_write(&domain, dir.path(), false).unwrap());
    }

    #[test]
    fn test_resign_trigger_forces_rewrite_near_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let domain = domain();
        assert!(reconcile_and_write(&domain, dir.path(), true).unwrap());
        let signed = dir.path().join("example.com.txt.signed");

        let soon = (Local::now() + TimeDelta::days(1))
            .format("%Y%m%d%H%M%S")
            .to_string();
        fs::write(
            &signed,
            format!(
                "example.com.\t1800\tIN\tRRSIG\tSOA 8 2 1800 {} 20240101000000 12345 example.com. AbCdEf==\n",
                soon
            ),
        )
        .unwrap();
        assert!(reconcile_and_write(&domain, dir.path(), true).unwrap());

        let far = (Local::now() + TimeDelta::days(20))
            .format("%Y%m%d%H%M%S")
            .to_string();
        fs::write(
            &signed,
            format!(
                "example.com.\t1800\tIN\tRRSIG\tSOA 8 2 1800 {} 20240101000000 12345 example.com. AbCdEf==\n",
                far
            ),
        )
        .unwrap();
        assert!(!reconcile_and_write(&domain, dir.path(), true).unwrap());
    }

    #[test]
    fn test_next_serial() {
        assert_eq!(next_serial("", "20240215"), "2024021500");
        assert_eq!(next_serial("2024021503", "20240215"), "2024021504");
        assert_eq!(next_serial("2024021400", "20240215"), "2024021500");
        assert_eq!(next_serial("bogus", "20240215"), "2024021500");
    }

    #[test]
    fn test_extract_serial() {
        let text = "\n$ORIGIN example.com.\n$TTL 1800\n\nexample.com.\t\tIN\tSOA\tns1.example.com. hostmaster.example.com. (2024021503 7200 1800 1209600 1800)\n";
        assert_eq!(extract_serial(text), "2024021503");
        assert_eq!(extract_serial("no soa here"), "");
    }

    #[test]
    fn test_rrsig_soa_expiration() {
        let text = "example.com. 1800 IN RRSIG A 8 2 1800 20300101000000 20240101000000 1 example.com. xx\nexample.com. 1800 IN RRSIG SOA 8 2 1800 20301224131415 20240101000000 1 example.com. yy\n";
        let expiration = rrsig_soa_expiration(text).unwrap();
        assert_eq!(
            expiration,
            NaiveDateTime::parse_from_str("20301224131415", "%Y%m%d%H%M%S").unwrap()
        );
        assert!(rrsig_soa_expiration("nothing signed").is_none());
    }
}
