/// A single resource record destined for a zone file.
///
/// Immutable once constructed; the constructors below encapsulate the
/// master-file text rules (trailing-dot normalization, field composition)
/// so the rest of the pipeline only ever deals with finished records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Owner name (relative to zone origin, or absolute with trailing dot)
    pub name: String,
    /// Time to live in seconds; None means "use the zone default"
    pub ttl: Option<u32>,
    /// Record class (always IN here)
    pub class: &'static str,
    /// Record type mnemonic (A, MX, TXT, ...)
    pub rtype: &'static str,
    /// Record data in master-file text format
    pub data: String,
}

/// Placeholder embedded in SOA data until the versioner picks a serial.
pub const SERIAL_PLACEHOLDER: &str = "SERIALNUMBER";

impl DnsRecord {
    fn new(name: impl Into<String>, rtype: &'static str, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ttl: None,
            class: "IN",
            rtype,
            data: data.into(),
        }
    }

    /// SOA record for the zone apex. The serial field carries the
    /// `SERIALNUMBER` placeholder; the versioner substitutes the real
    /// serial at render time.
    pub fn soa(
        domain: &str,
        primary_ns: &str,
        hostmaster: &str,
        refresh: u32,
        retry: u32,
        expire: u32,
        negative_ttl: u32,
    ) -> Self {
        Self::new(
            format!("{}.", domain),
            "SOA",
            format!(
                "{} {}.{}. ({} {} {} {} {})",
                absolute(primary_ns, domain),
                hostmaster,
                domain,
                SERIAL_PLACEHOLDER,
                refresh,
                retry,
                expire,
                negative_ttl
            ),
        )
    }

    pub fn a(name: &str, ip: &str) -> Self {
        Self::new(name, "A", ip)
    }

    /// MX record. A blank name addresses the apex; relative names and
    /// values are absolutized against the domain.
    pub fn mx(domain: &str, name: &str, value: &str, priority: i16) -> Self {
        Self::new(
            owner(name, domain),
            "MX",
            format!("{} {}", priority, absolute(value, domain)),
        )
    }

    /// NS record. The value may point cross-domain (kept absolute) or be
    /// relativized against the domain.
    pub fn ns(domain: &str, name: &str, value: &str) -> Self {
        Self::new(owner(name, domain), "NS", absolute(value, domain))
    }

    /// SPF policy as a TXT record.
    pub fn spf(domain: &str, name: &str, allow: &str) -> Self {
        Self::new(
            owner(name, domain),
            "TXT",
            format!("\"v=spf1 {} -all\"", allow),
        )
    }

    /// DMARC policy as a TXT record at `_dmarc` (apex) or `_dmarc.{name}`.
    /// Failure reports go to a per-domain mailbox.
    pub fn dmarc(domain: &str, name: &str, policy: &str) -> Self {
        let record_name = if name.is_empty() {
            "_dmarc".to_string()
        } else {
            format!("_dmarc.{}", name)
        };
        Self::new(
            record_name,
            "TXT",
            format!(
                "\"v=DMARC1; p={}; rua=mailto:dmarc-report@{}\"",
                policy, domain
            ),
        )
    }

    /// DKIM public key as a TXT record. The selector defaults to `mail`
    /// when no name is given.
    pub fn dkim(name: &str, value: &str) -> Self {
        let record_name = if name.is_empty() {
            "mail._domainkey".to_string()
        } else {
            format!("{}._domainkey", name)
        };
        Self::new(record_name, "TXT", value)
    }

    /// TLSA record binding the certificate fingerprint to a TCP port
    /// (usage 3, selector 0, matching type 1: full-cert SHA-256).
    pub fn tlsa(port: u16, key: &str) -> Self {
        Self::new(format!("_{}._tcp", port), "TLSA", format!("3 0 1 {}", key))
    }

    pub fn cname(name: &str, canonical: &str) -> Self {
        Self::new(name, "CNAME", canonical)
    }

    /// Serialize as one tab-separated zone file line. The TTL column is
    /// left empty when the record inherits the zone default.
    pub fn to_line(&self) -> String {
        let ttl = self.ttl.map(|t| t.to_string()).unwrap_or_default();
        format!(
            "{}\t{}\t{}\t{}\t{}\n",
            self.name, ttl, self.class, self.rtype, self.data
        )
    }
}

/// Owner-name rule shared by MX/NS/TXT constructors: blank means the
/// apex, a trailing dot is kept as-is, anything else is made absolute
/// under the domain.
pub(crate) fn owner(name: &str, domain: &str) -> String {
    if name.is_empty() {
        format!("{}.", domain)
    } else if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{}.{}.", name, domain)
    }
}

/// Absolutize a record value against the domain unless it already
/// carries a trailing dot.
pub(crate) fn absolute(value: &str, domain: &str) -> String {
    if value.ends_with('.') {
        value.to_string()
    } else {
        format!("{}.{}.", value, domain)
    }
}
