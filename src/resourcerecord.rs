use crate::enums::{RecordClass, RecordType};
use crate::error::HollerError;
use crate::utils::name_as_bytes;
use crate::{CLASS_TOP_BIT, DEFAULT_TTL};

use std::fmt::Display;
use std::net::{Ipv4Addr, Ipv6Addr};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DomainName {
    pub name: String,
}

impl DomainName {
    /// Push the DomainName through the name_as_bytes function
    pub fn as_bytes(&self) -> Result<Vec<u8>, HollerError> {
        name_as_bytes(&self.name)
    }

    /// Lowercased, dot-terminated form for comparisons.
    pub fn normalized(&self) -> String {
        crate::utils::normalize_name(&self.name)
    }
}

impl From<&str> for DomainName {
    fn from(input: &str) -> Self {
        DomainName {
            name: String::from(input),
        }
    }
}

impl From<String> for DomainName {
    fn from(name: String) -> Self {
        DomainName { name }
    }
}

impl Display for DomainName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// <character-string> is a single length octet followed by that number of characters, up to 255 of them.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DNSCharString {
    pub data: Vec<u8>,
}

impl From<&str> for DNSCharString {
    fn from(input: &str) -> Self {
        DNSCharString { data: input.into() }
    }
}

impl From<&[u8]> for DNSCharString {
    fn from(input: &[u8]) -> Self {
        DNSCharString {
            data: input.to_vec(),
        }
    }
}

impl Display for DNSCharString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.data))
    }
}

impl DNSCharString {
    /// Returns the bytes for a packet, ie - the length and then the string (automagically truncated to 255 bytes)
    pub fn as_bytes(&self) -> Vec<u8> {
        let mut data = self.data.clone();
        data.truncate(255);
        let mut res: Vec<u8> = vec![data.len() as u8];
        res.extend(&data);
        res
    }
}

/// The typed RDATA payloads the codec understands. Everything else comes
/// off the wire as [InternalResourceRecord::Other] and is skipped whole.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum InternalResourceRecord {
    /// A single host address
    A { address: Ipv4Addr },
    /// IPv6 host address <https://www.rfc-editor.org/rfc/rfc3596#section-2.1>
    AAAA { address: Ipv6Addr },
    /// A domain name pointer
    PTR { ptrdname: DomainName },
    /// Service location, ref [RFC2782](https://www.rfc-editor.org/rfc/rfc2782)
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: DomainName,
    },
    /// Text strings
    TXT { strings: Vec<DNSCharString> },
    /// Recognized on the reader path, payload ignored
    NSEC,
    /// Anything we don't speak, carried as its raw type code
    Other { rrtype: u16 },
}

impl PartialEq<RecordType> for InternalResourceRecord {
    fn eq(&self, other: &RecordType) -> bool {
        &RecordType::from(self) == other
    }
}

impl InternalResourceRecord {
    /// The RDATA on the wire, without the leading rdlength.
    pub fn as_bytes(&self) -> Result<Vec<u8>, HollerError> {
        match self {
            InternalResourceRecord::A { address } => Ok(address.octets().to_vec()),
            InternalResourceRecord::AAAA { address } => Ok(address.octets().to_vec()),
            InternalResourceRecord::PTR { ptrdname } => ptrdname.as_bytes(),
            InternalResourceRecord::SRV {
                priority,
                weight,
                port,
                target,
            } => {
                let mut res: Vec<u8> = vec![];
                res.extend(priority.to_be_bytes());
                res.extend(weight.to_be_bytes());
                res.extend(port.to_be_bytes());
                res.extend(target.as_bytes()?);
                Ok(res)
            }
            InternalResourceRecord::TXT { strings } => {
                let mut res: Vec<u8> = vec![];
                for entry in strings {
                    res.extend(entry.as_bytes());
                }
                Ok(res)
            }
            InternalResourceRecord::NSEC | InternalResourceRecord::Other { .. } => Ok(vec![]),
        }
    }

    /// TXT payload as lossy strings, empty for everything else.
    pub fn texts(&self) -> Vec<String> {
        match self {
            InternalResourceRecord::TXT { strings } => {
                strings.iter().map(|s| s.to_string()).collect()
            }
            _ => vec![],
        }
    }
}

/// The answer, authority, and additional sections all share the same
/// format: a variable number of resource records, where the number of
/// records is specified in the corresponding count field in the header.
///
/// Ref [RFC1035 Section 4.1.3](https://www.rfc-editor.org/rfc/rfc1035.html#section-4.1.3),
/// with the mDNS cache-flush reinterpretation of the class field's top bit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceRecord {
    /// A domain name to which this resource record pertains.
    pub name: String,
    /// Two octets which specify the class of the data in the RDATA field.
    pub class: RecordClass,
    /// Top bit of the wire class field: this record supersedes cached
    /// records of the same name/type. Ref [RFC6762 section 10.2](https://www.rfc-editor.org/rfc/rfc6762#section-10.2).
    pub cache_flush: bool,
    /// A 32 bit unsigned integer that specifies the time interval (in seconds) that the resource record may be cached before it should be discarded.
    pub ttl: u32,
    /// The typed payload; the RR type code on the wire comes from its tag.
    pub rdata: InternalResourceRecord,
}

impl ResourceRecord {
    /// An IN-class record with the standard mDNS TTL.
    pub fn new(name: impl Into<String>, rdata: InternalResourceRecord) -> Self {
        ResourceRecord {
            name: name.into(),
            class: RecordClass::Internet,
            cache_flush: false,
            ttl: DEFAULT_TTL,
            rdata,
        }
    }

    pub fn with_cache_flush(mut self, cache_flush: bool) -> Self {
        self.cache_flush = cache_flush;
        self
    }

    pub fn record_type(&self) -> RecordType {
        RecordType::from(&self.rdata)
    }

    pub fn as_bytes(&self) -> Result<Vec<u8>, HollerError> {
        let mut retval: Vec<u8> = vec![];

        retval.extend(name_as_bytes(&self.name)?);
        // type
        retval.extend((self.record_type() as u16).to_be_bytes());
        // class, with the cache-flush bit on top
        let mut class = self.class as u16;
        if self.cache_flush {
            class |= CLASS_TOP_BIT;
        }
        retval.extend(class.to_be_bytes());
        retval.extend(self.ttl.to_be_bytes());
        // rdlength then rdata
        let rdata = self.rdata.as_bytes()?;
        retval.extend((rdata.len() as u16).to_be_bytes());
        retval.extend(rdata);

        Ok(retval)
    }
}

impl Display for ResourceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{} {} {} ttl={}",
            self.name,
            self.record_type(),
            self.class,
            self.ttl
        ))
    }
}
