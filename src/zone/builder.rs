use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use super::constants;
use super::errors::{Result, ZoneError};
use super::record::{self, DnsRecord};
use crate::exec::{CommandLine, Commander};
use crate::resolver::NameResolver;

/// Raw A record input: a static IP, or a dynamic FQDN resolved at build
/// time. A blank name addresses the zone apex.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ARecord {
    pub name: String,
    #[serde(rename = "ipaddress")]
    pub ip_address: String,
    #[serde(rename = "dynamicfqdn")]
    pub dynamic_fqdn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CnameRecord {
    pub name: String,
    #[serde(rename = "canonicalname")]
    pub canonical_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DkimRecord {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DmarcRecord {
    pub name: String,
    /// DMARC disposition policy (none/quarantine/reject)
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MxRecord {
    pub name: String,
    pub value: String,
    pub priority: i16,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NsRecord {
    pub name: String,
    pub value: String,
    #[serde(rename = "sortorder")]
    pub sort_order: i16,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpfRecord {
    pub name: String,
    /// SPF allow clause (e.g. "mx", "include:...", "ip4:...")
    pub value: String,
}

/// Built-in record sets applied when a domain configures none of its
/// own. Values are relative, so each domain defaults to self-hosted
/// name and mail servers.
#[derive(Debug, Clone)]
pub struct ZoneDefaults {
    pub ns: Vec<NsRecord>,
    pub mx: Vec<MxRecord>,
}

impl Default for ZoneDefaults {
    fn default() -> Self {
        Self {
            ns: vec![
                NsRecord {
                    name: String::new(),
                    value: "ns1".to_string(),
                    sort_order: 1,
                },
                NsRecord {
                    name: String::new(),
                    value: "ns2".to_string(),
                    sort_order: 2,
                },
            ],
            mx: vec![
                MxRecord {
                    name: String::new(),
                    value: "mail1".to_string(),
                    priority: 10,
                },
                MxRecord {
                    name: String::new(),
                    value: "mail2".to_string(),
                    priority: 20,
                },
            ],
        }
    }
}

/// Collaborators and key material paths for one build pass.
pub struct BuildContext<'a> {
    pub dkim_key_path: &'a Path,
    pub tls_certificate_path: &'a Path,
    pub resolver: &'a dyn NameResolver,
    pub commander: &'a dyn Commander,
    pub defaults: &'a ZoneDefaults,
}

/// One mail/DNS domain: raw configuration rows plus the synthesized
/// record list. Record order is deterministic and significant — the
/// versioner's idempotence check compares rendered bytes.
#[derive(Debug, Clone, Default)]
pub struct Domain {
    pub id: i32,
    pub name: String,
    pub default_ttl: u32,
    pub records: Vec<DnsRecord>,
    pub a_records: Vec<ARecord>,
    pub cname_records: Vec<CnameRecord>,
    pub dkim_records: Vec<DkimRecord>,
    pub dmarc_records: Vec<DmarcRecord>,
    pub mx_records: Vec<MxRecord>,
    pub ns_records: Vec<NsRecord>,
    pub spf_records: Vec<SpfRecord>,
}

impl Domain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Synthesize the full, ordered record list for this domain.
    ///
    /// Emission order is fixed: SOA, TLSA (25, 443), default DKIM
    /// selector, NS set, MX set (each with a scoped DKIM selector for
    /// in-domain targets), raw SPF/DKIM/DMARC rows, A records with
    /// their derived SPF/DMARC policies, CNAMEs.
    pub fn build_records(&mut self, ctx: &BuildContext) -> Result<()> {
        self.default_ttl = constants::DEFAULT_TTL;
        self.apply_defaults(ctx.defaults);
        if self.ns_records.is_empty() {
            return Err(ZoneError::MissingNameServers(self.name.clone()));
        }

        let dkim_value = dkim_key_value(ctx.dkim_key_path);
        let tlsa_key = tlsa_fingerprint(ctx.commander, ctx.tls_certificate_path);

        let mut spf_seen = HashSet::new();
        let mut dmarc_seen = HashSet::new();
        let mut records = Vec::new();

        records.push(DnsRecord::soa(
            &self.name,
            &self.ns_records[0].value,
            constants::HOSTMASTER,
            constants::REFRESH,
            constants::RETRY,
            constants::EXPIRE,
            constants::NEGATIVE_TTL,
        ));
        records.push(DnsRecord::tlsa(25, &tlsa_key));
        records.push(DnsRecord::tlsa(443, &tlsa_key));
        records.push(DnsRecord::dkim("", &dkim_value));

        for ns in &self.ns_records {
            records.push(DnsRecord::ns(&self.name, &ns.name, &ns.value));
        }
        for mx in &self.mx_records {
            records.push(DnsRecord::mx(&self.name, &mx.name, &mx.value, mx.priority));
            // Mail handled outside this domain signs with its own keys
            if let Some(selector) = self.mail_selector(&mx.value) {
                records.push(DnsRecord::dkim(&selector, &dkim_value));
            }
        }
        for spf in &self.spf_records {
            push_spf(&self.name, &spf.name, &spf.value, &mut records, &mut spf_seen);
        }
        for dkim in &self.dkim_records {
            records.push(DnsRecord::dkim(&dkim.name, &dkim_value));
        }
        for dmarc in &self.dmarc_records {
            push_dmarc(
                &self.name,
                &dmarc.name,
                &dmarc.value,
                &mut records,
                &mut dmarc_seen,
            );
        }
        for a in &self.a_records {
            let ip = if !a.ip_address.is_empty() {
                Some(a.ip_address.clone())
            } else if !a.dynamic_fqdn.is_empty() {
                ctx.resolver.resolve(&a.dynamic_fqdn)
            } else {
                None
            };
            if let Some(ip) = &ip {
                records.push(DnsRecord::a(&record::owner(&a.name, &self.name), ip));
            }
            let (allow, policy) = self.sender_policy(&a.name, ip.as_deref());
            push_spf(&self.name, &a.name, &allow, &mut records, &mut spf_seen);
            push_dmarc(&self.name, &a.name, policy, &mut records, &mut dmarc_seen);
        }
        for cname in &self.cname_records {
            records.push(DnsRecord::cname(&cname.name, &cname.canonical_name));
        }

        self.records = records;
        Ok(())
    }

    fn apply_defaults(&mut self, defaults: &ZoneDefaults) {
        if self.ns_records.is_empty() {
            self.ns_records = defaults.ns.clone();
        }
        if self.mx_records.is_empty() {
            self.mx_records = defaults.mx.clone();
        }
    }

    /// SPF allow clause and DMARC policy for the host an A record
    /// describes: the apex may send via its MX set, a mail host may
    /// send from its own address, everything else sends no mail.
    fn sender_policy(&self, name: &str, ip: Option<&str>) -> (String, &'static str) {
        if name.is_empty() {
            return ("mx".to_string(), "quarantine");
        }
        if self.is_mail_host(name) {
            if let Some(ip) = ip {
                return (format!("ip4:{}", ip), "quarantine");
            }
        }
        (String::new(), "reject")
    }

    fn is_mail_host(&self, name: &str) -> bool {
        self.mx_records.iter().any(|mx| {
            mx.value == name || self.mail_selector(&mx.value).as_deref() == Some(name)
        })
    }

    /// DKIM selector for an MX target, or None when the target is an
    /// absolute FQDN outside this domain.
    fn mail_selector(&self, target: &str) -> Option<String> {
        match target.strip_suffix('.') {
            Some(stripped) => {
                let suffix = format!(".{}", self.name);
                stripped.strip_suffix(suffix.as_str()).map(str::to_string)
            }
            None => Some(target.to_string()),
        }
    }
}

fn push_spf(
    domain: &str,
    name: &str,
    allow: &str,
    records: &mut Vec<DnsRecord>,
    seen: &mut HashSet<String>,
) {
    if seen.insert(record::owner(name, domain)) {
        records.push(DnsRecord::spf(domain, name, allow));
    }
}

fn push_dmarc(
    domain: &str,
    name: &str,
    policy: &str,
    records: &mut Vec<DnsRecord>,
    seen: &mut HashSet<String>,
) {
    if seen.insert(record::owner(name, domain)) {
        records.push(DnsRecord::dmarc(domain, name, policy));
    }
}

/// Read the DKIM public-key span (the parenthesized TXT value) from the
/// key file. A missing file yields a sentinel string so the zone stays
/// buildable with incomplete key material.
fn dkim_key_value(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(text) => match (text.find('('), text.rfind(')')) {
            (Some(start), Some(end)) if end >= start => text[start..=end].to_string(),
            _ => text.trim().to_string(),
        },
        Err(_) => format!("DKIM_KEY_NOT_FOUND_AT_{}", path.display()),
    }
}

/// SHA-256 fingerprint of the DER-encoded certificate, computed through
/// the external openssl pipeline. Missing certificate yields a sentinel
/// string, same rationale as the DKIM key.
fn tlsa_fingerprint(commander: &dyn Commander, cert_path: &Path) -> String {
    if !cert_path.exists() {
        return format!("TLSA_KEY_FILE_NOT_FOUND_AT_{}", cert_path.display());
    }
    let der = CommandLine::new("openssl")
        .args(["x509", "-in"])
        .arg(cert_path.to_string_lossy())
        .args(["-outform", "DER"]);
    let digest = CommandLine::new("openssl").args(["dgst", "-sha256"]);
    match commander.pipe(&der, &digest) {
        Ok(output) => {
            // openssl dgst prefixes the digest with "(stdin)= "
            match output.rsplit_once("= ") {
                Some((_, hex)) => hex.trim().to_string(),
                None => output.trim().to_string(),
            }
        }
        Err(e) => {
            warn!("TLSA fingerprint pipeline failed: {}", e);
            String::new()
        }
    }
}
