use crate::resourcerecord::InternalResourceRecord;
use enum_iterator::Sequence;
use packed_struct::prelude::*;
use std::fmt::Display;

#[derive(Debug, Eq, PartialEq, PrimitiveEnum_u8, Copy, Clone)]
/// A four bit field that specifies kind of query in this message.
/// This value is set by the originator of a query and copied into the response.
pub enum OpCode {
    /// A standard query (QUERY)
    Query = 0,
    // IQuery = 1, an inverse query (IQUERY) - obsolete in https://www.rfc-editor.org/rfc/rfc3425
    /// Server status request (STATUS)
    Status = 2,
    /// 3-15            reserved for future use
    Reserved = 15,
}

impl From<u8> for OpCode {
    fn from(input: u8) -> Self {
        match input {
            0 => Self::Query,
            2 => Self::Status,
            _ => Self::Reserved,
        }
    }
}

#[derive(PrimitiveEnum_u8, Clone, Copy, Debug, Eq, PartialEq)]
/// Response code, things like NOERROR, FORMATERROR, SERVFAIL etc.
///
/// mDNS messages received with a non-zero RCODE are silently ignored
/// (RFC 6762 section 18.11), so the responder only ever emits [Rcode::NoError].
pub enum Rcode {
    // No error condition
    NoError = 0,
    // Format error - The name server was unable to interpret the query.
    FormatError = 1,
    // Server failure - The name server was unable to process this query due to a problem with the name server.
    ServFail = 2,
    /// Name Error - Meaningful only for responses from an authoritative name server, this code signifies that the domain name referenced in the query does not exist.
    NameError = 3,
    /// Not Implemented - The name server does not support the requested kind of query.
    NotImplemented = 4,
    /// Refused - The name server refuses to perform the specified operation for policy reasons.
    Refused = 5,
    // 6..15 - Reserved for future use
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Sequence)]
/// RRType, the subset mDNS service discovery traffics in.
pub enum RecordType {
    /// A host address
    A = 1,
    /// A domain name pointer, the DNS-SD enumeration primitive
    PTR = 12,
    /// Text strings
    TXT = 16,
    /// IPv6 Records <https://www.rfc-editor.org/rfc/rfc3596#section-2.1>
    AAAA = 28,
    /// Service location <https://www.rfc-editor.org/rfc/rfc2782>
    SRV = 33,
    /// Next-secure, advertised by mDNS responders to assert nonexistence.
    /// Recognized and skipped on the reader path.
    NSEC = 47,
    /// 255 A request for all records (*)
    ANY = 255,
    InvalidType,
}

impl From<&u16> for RecordType {
    fn from(input: &u16) -> Self {
        match input {
            1 => Self::A,
            12 => Self::PTR,
            16 => Self::TXT,
            28 => Self::AAAA, // https://www.rfc-editor.org/rfc/rfc3596#section-2.1
            33 => Self::SRV,
            47 => Self::NSEC,
            255 => Self::ANY,
            _ => Self::InvalidType,
        }
    }
}

impl From<&str> for RecordType {
    fn from(input: &str) -> Self {
        match input {
            "A" => Self::A,
            "AAAA" => Self::AAAA,
            "ANY" => Self::ANY,
            "NSEC" => Self::NSEC,
            "PTR" => Self::PTR,
            "SRV" => Self::SRV,
            "TXT" => Self::TXT,
            _ => Self::InvalidType,
        }
    }
}

impl From<RecordType> for &'static str {
    fn from(input: RecordType) -> &'static str {
        match input {
            RecordType::A => "A",
            RecordType::AAAA => "AAAA",
            RecordType::ANY => "ANY",
            RecordType::NSEC => "NSEC",
            RecordType::PTR => "PTR",
            RecordType::SRV => "SRV",
            RecordType::TXT => "TXT",
            RecordType::InvalidType => "",
        }
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let res: &'static str = self.to_owned().into();
        f.write_fmt(format_args!("{res}"))
    }
}

impl From<&InternalResourceRecord> for RecordType {
    fn from(input: &InternalResourceRecord) -> RecordType {
        match input {
            InternalResourceRecord::A { .. } => RecordType::A,
            InternalResourceRecord::AAAA { .. } => RecordType::AAAA,
            InternalResourceRecord::PTR { .. } => RecordType::PTR,
            InternalResourceRecord::SRV { .. } => RecordType::SRV,
            InternalResourceRecord::TXT { .. } => RecordType::TXT,
            InternalResourceRecord::NSEC => RecordType::NSEC,
            InternalResourceRecord::Other { .. } => RecordType::InvalidType,
        }
    }
}

impl RecordType {
    /// The types the responder will answer for.
    pub fn supported(self: RecordType) -> bool {
        #[allow(clippy::match_like_matches_macro)]
        match self {
            RecordType::A
            | RecordType::AAAA
            | RecordType::ANY
            | RecordType::PTR
            | RecordType::SRV
            | RecordType::TXT => true,
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Sequence)]
/// CLASS fields appear in resource records, most entries should be IN. Ref RFC1035 3.2.4.
///
/// On the mDNS wire the top bit of the 16-bit class field is repurposed
/// (unicast-response on questions, cache-flush on records), so conversions
/// here only ever see the low 15 bits.
pub enum RecordClass {
    /// IN - Internet
    Internet = 1,
    /// CH - Chaos
    Chaos = 3,

    InvalidType = 0,
}

impl Display for RecordClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{}",
            match self {
                RecordClass::Internet => "IN",
                RecordClass::Chaos => "CHAOS",
                RecordClass::InvalidType => "Invalid",
            }
        ))
    }
}

impl From<&u16> for RecordClass {
    fn from(input: &u16) -> Self {
        match input & crate::CLASS_MASK {
            1 => Self::Internet,
            3 => Self::Chaos,
            _ => Self::InvalidType,
        }
    }
}

#[derive(Debug, PrimitiveEnum_u8, Clone, Copy, Eq, PartialEq)]
pub enum PacketType {
    Query = 0,
    Answer = 1,
}

impl From<bool> for PacketType {
    fn from(input: bool) -> Self {
        match input {
            false => Self::Query,
            true => Self::Answer,
        }
    }
}
