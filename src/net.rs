use std::io;

use sysinfo::Networks;

/// Port for host IP-address introspection, used once per run to decide
/// the master/slave role.
pub trait AddressLister {
    fn local_addresses(&self) -> io::Result<Vec<String>>;
}

/// Production adapter enumerating the host's network interfaces.
pub struct SystemAddresses;

impl AddressLister for SystemAddresses {
    fn local_addresses(&self) -> io::Result<Vec<String>> {
        let networks = Networks::new_with_refreshed_list();
        let mut addresses = Vec::new();
        for (_name, data) in networks.iter() {
            for network in data.ip_networks() {
                if !network.addr.is_loopback() {
                    addresses.push(network.addr.to_string());
                }
            }
        }
        Ok(addresses)
    }
}

/// A host is the master when one of its addresses equals the configured
/// master IP.
pub fn is_master(addresses: &[String], master_ip: &str) -> bool {
    addresses.iter().any(|address| address == master_ip)
}
