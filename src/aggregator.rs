use std::collections::{HashMap, HashSet};
use std::net::{Ipv4Addr, Ipv6Addr};

use tracing::trace;

use crate::resourcerecord::{InternalResourceRecord, ResourceRecord};
use crate::utils::{normalize_name, trim_dots};

/// One discovered service, assembled from PTR/SRV/TXT/A/AAAA records that
/// may arrive out of order, duplicated, and across several sockets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceEntry {
    /// Instance name, eg `Printer._http._tcp.local.`
    pub name: String,
    /// FQDN the SRV record pointed at
    pub host: String,
    pub ipv4: Vec<Ipv4Addr>,
    pub ipv6: Vec<Ipv6Addr>,
    pub port: u16,
    /// First TXT string, the common single-string case
    pub txt: String,
    /// Every TXT string, in record order
    pub txt_fields: Vec<String>,

    pub(crate) has_txt: bool,
    pub(crate) sent: bool,
}

impl ServiceEntry {
    fn new(name: String) -> Self {
        ServiceEntry {
            name,
            host: String::new(),
            ipv4: vec![],
            ipv6: vec![],
            port: 0,
            txt: String::new(),
            txt_fields: vec![],
            has_txt: false,
            sent: false,
        }
    }

    /// An entry is complete once it has at least one address, a port from
    /// SRV, and a TXT record (possibly empty) has been seen.
    pub fn complete(&self) -> bool {
        (!self.ipv4.is_empty() || !self.ipv6.is_empty()) && self.port != 0 && self.has_txt
    }
}

/// Reassembles streaming records into [ServiceEntry] values and hands each
/// one back the moment it completes.
///
/// Entries live in an arena; the name map holds indices so a PTR can alias
/// its owner name onto the target entry with a plain index copy.
pub struct Aggregator {
    entries: Vec<ServiceEntry>,
    by_name: HashMap<String, usize>,
    completed: HashSet<String>,
    /// `<service>.<domain>.` the caller asked for, lowercased
    pattern: String,
}

impl Aggregator {
    pub fn new(service: &str, domain: &str) -> Self {
        Aggregator {
            entries: vec![],
            by_name: HashMap::new(),
            completed: HashSet::new(),
            pattern: format!("{}.{}.", trim_dots(service), trim_dots(domain)).to_lowercase(),
        }
    }

    fn ensure_entry(&mut self, name: &str) -> usize {
        match self.by_name.get(name) {
            Some(index) => *index,
            None => {
                let index = self.entries.len();
                self.entries.push(ServiceEntry::new(name.to_string()));
                self.by_name.insert(name.to_string(), index);
                index
            }
        }
    }

    /// Feeds one record through the table, returning every entry that
    /// became complete because of it.
    pub fn ingest(&mut self, record: &ResourceRecord) -> Vec<ServiceEntry> {
        let name = normalize_name(&record.name);
        let index = self.ensure_entry(&name);
        if self.entries[index].host.is_empty() {
            self.entries[index].host = name.clone();
        }

        match &record.rdata {
            InternalResourceRecord::PTR { ptrdname } => {
                let target = ptrdname.normalized();
                let target_index = self.ensure_entry(&target);
                self.entries[target_index].name = target;
                // alias: the PTR's owner name now resolves to the target
                // entry, so records keyed either way land in one place
                self.by_name.insert(name, target_index);
            }
            InternalResourceRecord::SRV { port, target, .. } => {
                let host = target.normalized();
                self.entries[index].host = host.clone();
                self.entries[index].port = *port;
                // the host's A/AAAA records may have landed first, pull
                // whatever its entry already collected
                if let Some(host_index) = self.by_name.get(&host).copied() {
                    if host_index != index {
                        let (ipv4, ipv6) = {
                            let host_entry = &self.entries[host_index];
                            (host_entry.ipv4.clone(), host_entry.ipv6.clone())
                        };
                        for address in ipv4 {
                            if !self.entries[index].ipv4.contains(&address) {
                                self.entries[index].ipv4.push(address);
                            }
                        }
                        for address in ipv6 {
                            if !self.entries[index].ipv6.contains(&address) {
                                self.entries[index].ipv6.push(address);
                            }
                        }
                    }
                }
            }
            InternalResourceRecord::A { address } => {
                if !self.entries[index].ipv4.contains(address) {
                    self.entries[index].ipv4.push(*address);
                }
                // A records arrive at the host name; entries keyed by an
                // instance name need the addresses too
                for other in self.host_referrers(index, &name) {
                    if !self.entries[other].ipv4.contains(address) {
                        self.entries[other].ipv4.push(*address);
                    }
                }
            }
            InternalResourceRecord::AAAA { address } => {
                if !self.entries[index].ipv6.contains(address) {
                    self.entries[index].ipv6.push(*address);
                }
                for other in self.host_referrers(index, &name) {
                    if !self.entries[other].ipv6.contains(address) {
                        self.entries[other].ipv6.push(*address);
                    }
                }
            }
            InternalResourceRecord::TXT { .. } => {
                let texts = record.rdata.texts();
                self.entries[index].txt = texts.first().cloned().unwrap_or_default();
                self.entries[index].txt_fields = texts;
                self.entries[index].has_txt = true;
            }
            InternalResourceRecord::NSEC | InternalResourceRecord::Other { .. } => {}
        }

        self.drain_completed()
    }

    /// Distinct live entries other than `index` whose host is `host`.
    fn host_referrers(&self, index: usize, host: &str) -> Vec<usize> {
        let mut distinct: Vec<usize> = self.by_name.values().copied().collect();
        distinct.sort_unstable();
        distinct.dedup();
        distinct
            .into_iter()
            .filter(|other| *other != index && self.entries[*other].host == host)
            .collect()
    }

    /// Scans for entries that just crossed the completeness line. Emission
    /// order is the order completeness was first attained; a name is only
    /// ever emitted once.
    fn drain_completed(&mut self) -> Vec<ServiceEntry> {
        let mut emitted = vec![];
        for index in 0..self.entries.len() {
            let entry = &self.entries[index];
            if entry.sent || !entry.complete() || self.completed.contains(&entry.name) {
                continue;
            }
            if !self.matches(&entry.name) {
                trace!("Complete entry {} doesn't match {}", entry.name, self.pattern);
                continue;
            }
            self.entries[index].sent = true;
            self.completed.insert(self.entries[index].name.clone());
            emitted.push(self.entries[index].clone());
        }
        emitted
    }

    /// True when `name` is the service type itself or an instance of it:
    /// it ends with `<service>.<domain>.`, or dropping the first label
    /// leaves exactly that.
    fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        if name.ends_with(&self.pattern) {
            return true;
        }
        match name.split_once('.') {
            Some((_instance, rest)) => rest == self.pattern,
            None => false,
        }
    }
}
