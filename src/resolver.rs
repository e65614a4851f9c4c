use std::cell::RefCell;
use std::collections::HashMap;
use std::io;

use hickory_resolver::Resolver;
use tracing::debug;

/// Port for resolving a dynamic FQDN to an IP address. Resolution
/// failure is a soft failure by design: it yields `None`, never an
/// error, and the builder degrades to "no A record".
pub trait NameResolver {
    fn resolve(&self, fqdn: &str) -> Option<String>;
}

/// Memoizing resolver: results are cached for the process lifetime so a
/// fleet of domains pointing at the same dynamic host costs one lookup
/// per run. Failed lookups are not cached; they are retried on the next
/// ask. The lookup itself is injected, with the system resolver as the
/// production choice.
pub struct CachingResolver {
    lookup: Box<dyn Fn(&str) -> Option<String>>,
    cache: RefCell<HashMap<String, String>>,
}

impl CachingResolver {
    pub fn from_system_conf() -> io::Result<Self> {
        let resolver = Resolver::from_system_conf()?;
        Ok(Self::with_lookup(move |fqdn| {
            match resolver.lookup_ip(fqdn) {
                // Zone A records need an IPv4 address
                Ok(lookup) => lookup.iter().find(|ip| ip.is_ipv4()).map(|ip| ip.to_string()),
                Err(e) => {
                    debug!("resolution of {} failed: {}", fqdn, e);
                    None
                }
            }
        }))
    }

    pub fn with_lookup(lookup: impl Fn(&str) -> Option<String> + 'static) -> Self {
        Self {
            lookup: Box::new(lookup),
            cache: RefCell::new(HashMap::new()),
        }
    }
}

impl NameResolver for CachingResolver {
    fn resolve(&self, fqdn: &str) -> Option<String> {
        if let Some(ip) = self.cache.borrow().get(fqdn) {
            return Some(ip.clone());
        }
        let ip = (self.lookup)(fqdn)?;
        self.cache
            .borrow_mut()
            .insert(fqdn.to_string(), ip.clone());
        Some(ip)
    }
}

/// Test adapter backed by a fixed name→IP table.
#[derive(Default)]
pub struct StaticResolver {
    entries: HashMap<String, String>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fqdn: impl Into<String>, ip: impl Into<String>) {
        self.entries.insert(fqdn.into(), ip.into());
    }
}

impl NameResolver for StaticResolver {
    fn resolve(&self, fqdn: &str) -> Option<String> {
        self.entries.get(fqdn).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn counting_resolver(ip: Option<&'static str>) -> (CachingResolver, Rc<RefCell<u32>>) {
        let lookups = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&lookups);
        let resolver = CachingResolver::with_lookup(move |_| {
            *counter.borrow_mut() += 1;
            ip.map(str::to_string)
        });
        (resolver, lookups)
    }

    #[test]
    fn test_repeated_resolution_hits_the_cache() {
        let (resolver, lookups) = counting_resolver(Some("198.51.100.7"));
        assert_eq!(
            resolver.resolve("dyn.example.net").as_deref(),
            Some("198.51.100.7")
        );
        assert_eq!(
            resolver.resolve("dyn.example.net").as_deref(),
            Some("198.51.100.7")
        );
        assert_eq!(*lookups.borrow(), 1);
    }

    #[test]
    fn test_failed_lookups_are_retried() {
        let (resolver, lookups) = counting_resolver(None);
        assert_eq!(resolver.resolve("gone.example.net"), None);
        assert_eq!(resolver.resolve("gone.example.net"), None);
        assert_eq!(*lookups.borrow(), 2);
    }

    #[test]
    fn test_static_resolver() {
        let mut resolver = StaticResolver::new();
        resolver.insert("dyn.example.net", "198.51.100.7");
        assert_eq!(
            resolver.resolve("dyn.example.net").as_deref(),
            Some("198.51.100.7")
        );
        assert_eq!(resolver.resolve("missing.example.net"), None);
    }
}
