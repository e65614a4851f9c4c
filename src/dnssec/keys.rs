use std::fs;
use std::path::Path;

use tracing::info;

use super::errors::{DnssecError, Result};
use crate::exec::{CommandLine, Commander};

/// Path of the external key generator.
pub const KEYGEN_BIN: &str = "/usr/bin/ldns-keygen";

const KEY_FILE_EXTENSIONS: [&str; 3] = ["private", "ds", "key"];

/// The two DNSSEC key roles per zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Ksk,
    Zsk,
}

impl KeyType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ksk => "KSK",
            Self::Zsk => "ZSK",
        }
    }

    /// Key-signing keys are 2048-bit, zone-signing keys 1024-bit.
    fn bits(self) -> &'static str {
        match self {
            Self::Ksk => "2048",
            Self::Zsk => "1024",
        }
    }
}

/// Make sure the KSK and ZSK triples for a domain exist under their
/// canonical prefixes (`{domain}.{algorithm}.{KSK|ZSK}`), generating
/// and renaming them when any file of a triple is missing. Returns the
/// two canonical prefixes for the signer.
pub fn ensure_keys(
    commander: &dyn Commander,
    domain: &str,
    algorithm: &str,
    key_dir: &Path,
) -> Result<(String, String)> {
    let ksk = canonical_prefix(key_dir, domain, algorithm, KeyType::Ksk);
    let zsk = canonical_prefix(key_dir, domain, algorithm, KeyType::Zsk);
    if !keys_exist(&ksk) {
        generate_keys(commander, key_dir, domain, algorithm, KeyType::Ksk)?;
    }
    if !keys_exist(&zsk) {
        generate_keys(commander, key_dir, domain, algorithm, KeyType::Zsk)?;
    }
    Ok((ksk, zsk))
}

fn canonical_prefix(key_dir: &Path, domain: &str, algorithm: &str, key_type: KeyType) -> String {
    key_dir
        .join(format!("{}.{}.{}", domain, algorithm, key_type.as_str()))
        .display()
        .to_string()
}

/// A key pair is present only when its private, DS and public key files
/// all exist; a partial triple is regenerated from scratch.
fn keys_exist(prefix: &str) -> bool {
    KEY_FILE_EXTENSIONS
        .iter()
        .all(|ext| Path::new(&format!("{}.{}", prefix, ext)).exists())
}

fn generate_keys(
    commander: &dyn Commander,
    key_dir: &Path,
    domain: &str,
    algorithm: &str,
    key_type: KeyType,
) -> Result<()> {
    info!(
        "generating {} for {} ({})",
        key_type.as_str(),
        domain,
        algorithm
    );
    let mut cmd = CommandLine::new(KEYGEN_BIN)
        .args(["-a", algorithm, "-b", key_type.bits()])
        .dir(key_dir);
    if key_type == KeyType::Ksk {
        cmd = cmd.arg("-k");
    }
    cmd = cmd.arg(domain);
    let output = commander
        .output(&cmd)
        .map_err(|e| DnssecError::KeyGeneration(e.to_string()))?;
    rename_key_files(key_dir, output.trim(), domain, algorithm, key_type)
}

/// The generator names its output after the key tag; move the triple to
/// the canonical prefix so later runs can find it.
fn rename_key_files(
    key_dir: &Path,
    generated_prefix: &str,
    domain: &str,
    algorithm: &str,
    key_type: KeyType,
) -> Result<()> {
    let old_prefix = key_dir.join(generated_prefix).display().to_string();
    let new_prefix = canonical_prefix(key_dir, domain, algorithm, key_type);
    for ext in KEY_FILE_EXTENSIONS {
        fs::rename(
            format!("{}.{}", old_prefix, ext),
            format!("{}.{}", new_prefix, ext),
        )
        .map_err(|e| DnssecError::KeyRename(e.to_string()))?;
    }
    Ok(())
}
