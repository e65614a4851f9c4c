use super::builder::Domain;
use super::record::SERIAL_PLACEHOLDER;

/// Serialize a domain's synthesized records into master-file text.
///
/// The output is a deterministic function of the record list and the
/// serial: the versioner relies on that to compare a fresh render
/// against the file on disk while varying only the serial.
pub fn render(domain: &Domain, serial: &str) -> String {
    let mut text = String::new();
    text.push('\n');
    text.push_str(&format!("$ORIGIN {}.\n", domain.name));
    text.push_str(&format!("$TTL {}\n", domain.default_ttl));
    text.push('\n');
    for record in &domain.records {
        text.push_str(&record.to_line());
    }
    text.replacen(SERIAL_PLACEHOLDER, serial, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::builder::NsRecord;
    use crate::zone::record::DnsRecord;

    fn domain() -> Domain {
        let mut domain = Domain::new("example.com");
        domain.default_ttl = 1800;
        domain.ns_records.push(NsRecord {
            value: "ns1".to_string(),
            ..Default::default()
        });
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

    #[test]
    fn test_render_header_and_serial() {
        let text = render(&domain(), "2024010100");
        assert!(text.starts_with("\n$ORIGIN example.com.\n$TTL 1800\n\n"));
        assert!(text.contains("(2024010100 7200 1800 1209600 1800)"));
        assert!(!text.contains("SERIALNUMBER"));
        assert!(text.contains("example.com.\t\tIN\tA\t192.0.2.1\n"));
    }

    #[test]
    fn test_render_is_deterministic() {
        assert_eq!(render(&domain(), "42"), render(&domain(), "42"));
        assert_ne!(render(&domain(), "42"), render(&domain(), "43"));
    }
}
