use crate::enums::RecordType;
use crate::error::HollerError;
use crate::resourcerecord::{DNSCharString, DomainName, InternalResourceRecord, ResourceRecord};
use crate::utils::{default_host_name, normalize_name, trim_dots};
use crate::Question;

use async_trait::async_trait;
use holler_lib::validators::{valid_fqdn, valid_service_name};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use tracing::trace;

/// Something that can answer an mDNS question with resource records.
pub trait Zone {
    /// All records answering `question`, empty when the name isn't ours.
    fn records(&self, question: &Question) -> Vec<ResourceRecord>;
}

/// Resolves a host name to addresses. [ServiceZoneBuilder] reaches for this
/// when no addresses were supplied, injectable so tests don't touch real DNS.
#[async_trait]
pub trait HostResolver {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, HollerError>;
}

/// The default resolver, backed by the OS through tokio.
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, HollerError> {
        let addrs = tokio::net::lookup_host((trim_dots(host), 0))
            .await
            .map_err(|err| {
                HollerError::InvalidArgument(format!("Failed to resolve {host:?}: {err}"))
            })?;
        Ok(addrs.map(|sockaddr| sockaddr.ip()).collect())
    }
}

/// One advertised service: the DNS-SD instance/service/domain triple, the
/// host it lives on, and the four canonical names derived from them.
/// Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceZone {
    /// Instance label, eg `Printer`
    pub instance: String,
    /// Service type, eg `_http._tcp.`
    pub service: String,
    /// Domain, practically always `local.`
    pub domain: String,
    /// FQDN of the advertising host
    pub host_name: String,
    pub port: u16,
    pub ips: Vec<IpAddr>,
    /// TXT payload strings, conventionally `k=v`
    pub txt: Vec<String>,

    /// `<service>.<domain>.`
    service_addr: String,
    /// `<instance>.<service>.<domain>.`
    instance_addr: String,
    /// `_services._dns-sd._udp.<domain>.`, the DNS-SD meta-query name
    enum_addr: String,
}

impl ServiceZone {
    pub fn builder(
        instance: impl Into<String>,
        service: impl Into<String>,
        port: u16,
    ) -> ServiceZoneBuilder {
        ServiceZoneBuilder {
            instance: instance.into(),
            service: service.into(),
            domain: "local.".to_string(),
            host_name: None,
            port,
            ips: vec![],
            txt: vec![],
        }
    }

    /// `<service>.<domain>.`
    pub fn service_addr(&self) -> &str {
        &self.service_addr
    }

    /// `<instance>.<service>.<domain>.`
    pub fn instance_addr(&self) -> &str {
        &self.instance_addr
    }

    /// `_services._dns-sd._udp.<domain>.`
    pub fn enum_addr(&self) -> &str {
        &self.enum_addr
    }

    fn ipv4(&self) -> Vec<Ipv4Addr> {
        self.ips
            .iter()
            .filter_map(|ip| match ip {
                IpAddr::V4(addr) => Some(*addr),
                IpAddr::V6(_) => None,
            })
            .collect()
    }

    fn ipv6(&self) -> Vec<Ipv6Addr> {
        self.ips
            .iter()
            .filter_map(|ip| match ip {
                IpAddr::V4(_) => None,
                IpAddr::V6(addr) => Some(*addr),
            })
            .collect()
    }

    fn a_records(&self) -> Vec<ResourceRecord> {
        self.ipv4()
            .into_iter()
            .map(|address| {
                ResourceRecord::new(
                    self.host_name.clone(),
                    InternalResourceRecord::A { address },
                )
            })
            .collect()
    }

    fn aaaa_records(&self) -> Vec<ResourceRecord> {
        self.ipv6()
            .into_iter()
            .map(|address| {
                ResourceRecord::new(
                    self.host_name.clone(),
                    InternalResourceRecord::AAAA { address },
                )
            })
            .collect()
    }

    /// SRV plus the host's address records, the way a resolver wants them.
    fn srv_records(&self) -> Vec<ResourceRecord> {
        let mut records = vec![ResourceRecord::new(
            self.instance_addr.clone(),
            InternalResourceRecord::SRV {
                priority: 10,
                weight: 1,
                port: self.port,
                target: DomainName::from(self.host_name.as_str()),
            },
        )];
        records.extend(self.a_records());
        records.extend(self.aaaa_records());
        records
    }

    fn txt_record(&self) -> ResourceRecord {
        ResourceRecord::new(
            self.instance_addr.clone(),
            InternalResourceRecord::TXT {
                strings: self
                    .txt
                    .iter()
                    .map(|entry| DNSCharString::from(entry.as_str()))
                    .collect(),
            },
        )
    }

    /// Everything a service instance advertises: SRV (with addresses) + TXT.
    fn instance_records(&self) -> Vec<ResourceRecord> {
        let mut records = self.srv_records();
        records.push(self.txt_record());
        records
    }
}

impl Zone for ServiceZone {
    fn records(&self, question: &Question) -> Vec<ResourceRecord> {
        let qname = question.normalized_name();
        let qtype = question.qtype;

        if qname == normalize_name(&self.enum_addr) {
            // DNS-SD service enumeration only ever points at the type
            if matches!(qtype, RecordType::ANY | RecordType::PTR) {
                return vec![ResourceRecord::new(
                    self.enum_addr.clone(),
                    InternalResourceRecord::PTR {
                        ptrdname: DomainName::from(self.service_addr.as_str()),
                    },
                )];
            }
            return vec![];
        }

        if qname == normalize_name(&self.service_addr) {
            if matches!(qtype, RecordType::ANY | RecordType::PTR) {
                // the PTR answer plus the whole instance bundle, saving the
                // querier a round-trip
                let mut records = vec![ResourceRecord::new(
                    self.service_addr.clone(),
                    InternalResourceRecord::PTR {
                        ptrdname: DomainName::from(self.instance_addr.as_str()),
                    },
                )];
                records.extend(self.instance_records());
                return records;
            }
            return vec![];
        }

        if qname == normalize_name(&self.instance_addr) {
            return match qtype {
                RecordType::ANY => self.instance_records(),
                RecordType::SRV => self.srv_records(),
                RecordType::TXT => vec![self.txt_record()],
                RecordType::A => self.a_records(),
                RecordType::AAAA => self.aaaa_records(),
                _ => vec![],
            };
        }

        if qname == normalize_name(&self.host_name) {
            return match qtype {
                RecordType::A => self.a_records(),
                RecordType::AAAA => self.aaaa_records(),
                _ => vec![],
            };
        }

        trace!("Question {qname} doesn't match {}", self.instance_addr);
        vec![]
    }
}

/// Builder for a [ServiceZone], filling host name and addresses from the OS
/// when not supplied.
#[derive(Clone, Debug)]
pub struct ServiceZoneBuilder {
    instance: String,
    service: String,
    domain: String,
    host_name: Option<String>,
    port: u16,
    ips: Vec<IpAddr>,
    txt: Vec<String>,
}

impl ServiceZoneBuilder {
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn with_host_name(mut self, host_name: impl Into<String>) -> Self {
        self.host_name = Some(host_name.into());
        self
    }

    pub fn with_ips(mut self, ips: Vec<IpAddr>) -> Self {
        self.ips = ips;
        self
    }

    pub fn with_txt(mut self, txt: Vec<String>) -> Self {
        self.txt = txt;
        self
    }

    pub async fn build(self) -> Result<ServiceZone, HollerError> {
        self.build_with_resolver(&SystemResolver).await
    }

    pub async fn build_with_resolver(
        self,
        resolver: &(dyn HostResolver + Sync),
    ) -> Result<ServiceZone, HollerError> {
        if self.instance.is_empty() {
            return Err(HollerError::InvalidArgument(
                "Instance name must not be empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(HollerError::InvalidArgument(
                "Port must be non-zero".to_string(),
            ));
        }
        if !valid_service_name(&self.service) {
            return Err(HollerError::InvalidArgument(format!(
                "Invalid service type {:?}",
                self.service
            )));
        }
        let domain = normalize_name(&self.domain);
        if !valid_fqdn(&domain) {
            return Err(HollerError::InvalidArgument(format!(
                "Invalid domain {:?}",
                self.domain
            )));
        }

        let host_name = match &self.host_name {
            Some(name) => normalize_name(name),
            None => default_host_name(&domain)?,
        };
        if !valid_fqdn(&host_name) {
            return Err(HollerError::InvalidArgument(format!(
                "Invalid host name {host_name:?}"
            )));
        }

        let ips = match self.ips.is_empty() {
            false => self.ips,
            true => resolver.lookup(&host_name).await?,
        };
        if ips.is_empty() {
            return Err(HollerError::InvalidArgument(format!(
                "No addresses for host {host_name:?}"
            )));
        }

        let service = format!("{}.", trim_dots(&self.service));
        let service_addr = format!("{service}{domain}");
        let instance_addr = format!("{}.{service_addr}", self.instance);
        let enum_addr = format!("_services._dns-sd._udp.{domain}");

        Ok(ServiceZone {
            instance: self.instance,
            service,
            domain,
            host_name,
            port: self.port,
            ips,
            txt: self.txt,
            service_addr,
            instance_addr,
            enum_addr,
        })
    }
}

/// An ordered pile of zones answering as one. Answers concatenate in
/// insertion order, duplicates across zones are the caller's business.
#[derive(Clone, Default)]
pub struct ZoneSet {
    zones: Vec<Arc<dyn Zone + Send + Sync>>,
}

impl ZoneSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, zone: Arc<dyn Zone + Send + Sync>) {
        self.zones.push(zone);
    }

    /// Drops a previously added zone, matching by identity.
    pub fn remove(&mut self, zone: &Arc<dyn Zone + Send + Sync>) -> bool {
        let before = self.zones.len();
        self.zones.retain(|existing| !Arc::ptr_eq(existing, zone));
        before != self.zones.len()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

impl Zone for ZoneSet {
    fn records(&self, question: &Question) -> Vec<ResourceRecord> {
        self.zones
            .iter()
            .flat_map(|zone| zone.records(question))
            .collect()
    }
}
