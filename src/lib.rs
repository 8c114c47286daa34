use crate::enums::*;
use crate::error::HollerError;
use packed_struct::prelude::*;
use std::fmt::Display;
use std::net::{Ipv4Addr, Ipv6Addr};

/// The record aggregation engine behind the querier
pub mod aggregator;
/// CLI argument handling
pub mod cli;
/// Configuration handling for the binary and the socket layer
pub mod config;
pub mod enums;
pub mod error;
pub mod logging;
/// The DNS wire codec: packing and parsing whole messages
pub mod message;
/// The query side: send a PTR question, stream back completed services
pub mod querier;
/// The answer side: an mDNS responder serving one or more zones
pub mod responder;
pub mod resourcerecord;
/// Multicast/unicast UDP socket construction
pub mod sockets;
#[cfg(test)]
mod tests;
pub mod utils;
pub mod zones;

/// The size of a DNS message header
pub const HEADER_BYTES: usize = 12;
/// mDNS messages can carry up to 9000 octets of payload, ref [RFC6762 section 17](https://www.rfc-editor.org/rfc/rfc6762#section-17)
pub const UDP_BUFFER_SIZE: usize = 9000;

/// The well-known mDNS port
pub const MDNS_PORT: u16 = 5353;
/// The link-local IPv4 mDNS group
pub const MDNS_GROUP_V4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);
/// The link-local IPv6 mDNS group (`ff02::fb`)
pub const MDNS_GROUP_V6: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0xfb);

/// TTL on every record we serve
pub const DEFAULT_TTL: u32 = 120;

/// Top bit of the 16-bit class field: unicast-response on questions,
/// cache-flush on resource records.
pub const CLASS_TOP_BIT: u16 = 0x8000;
/// Low 15 bits of the class field hold the actual class code.
pub const CLASS_MASK: u16 = 0x7FFF;

/// The header of a DNS transmission, either a Query or Reply. Ref [RFC1035](https://www.rfc-editor.org/rfc/rfc1035#section-4.1.1) section 4.1.1.
#[derive(Debug, PackedStruct, PartialEq, Eq, Clone)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "12")]
pub struct Header {
    /// The query ID. 0 on multicast responses, the query's id on unicast ones.
    #[packed_field(bits = "0..=15", endian = "msb")]
    pub id: u16,
    // Is it a query or response
    #[packed_field(bits = "16", ty = "enum")]
    pub qr: PacketType, // bit 16
    #[packed_field(bits = "17..=20", ty = "enum")]
    pub opcode: OpCode, // 17-20 actually 4 bits
    #[packed_field(bits = "21")]
    pub authoritative: bool, // 21
    #[packed_field(bits = "22")]
    pub truncated: bool, // 22
    #[packed_field(bits = "23")]
    pub recursion_desired: bool, // 23
    #[packed_field(bits = "24")]
    pub recursion_available: bool, // 24
    /// reserved, must be all 0's
    #[packed_field(bits = "25")]
    pub z: bool, // 25-27
    #[packed_field(bits = "26")]
    pub ad: bool,
    #[packed_field(bits = "27")]
    pub cd: bool,
    #[packed_field(bits = "28..=31", ty = "enum")]
    pub rcode: Rcode, // bits 28-31
    /// an unsigned 16 bit integer specifying the number of entries in the question section.
    #[packed_field(bits = "32..=47", endian = "msb")]
    pub qdcount: u16, // bits 32-47
    /// an unsigned 16 bit integer specifying the number of entries in the answer section.
    #[packed_field(bits = "48..=63", endian = "msb")]
    pub ancount: u16, // 48-63
    /// an unsigned 16 bit integer specifying the number of name server resource records in the authority records section.
    #[packed_field(bits = "64..=79", endian = "msb")]
    pub nscount: u16, // 64-79
    /// an unsigned 16 bit integer specifying the number of resource records in the additional records section.
    #[packed_field(bits = "80..=95", endian = "msb")]
    pub arcount: u16, // 80-95
}

impl Default for Header {
    fn default() -> Self {
        Header {
            id: 0,
            qr: PacketType::Query,
            opcode: OpCode::Query,
            authoritative: false,
            truncated: false,
            recursion_desired: false,
            recursion_available: false,
            z: false,
            ad: false,
            cd: false,
            rcode: Rcode::NoError,
            qdcount: 0,
            ancount: 0,
            nscount: 0,
            arcount: 0,
        }
    }
}

impl Header {
    /// An mDNS response header: QR and AA set, everything else zero
    /// (flag bytes `0x84 0x00`). Ref [RFC6762 section 18](https://www.rfc-editor.org/rfc/rfc6762#section-18).
    pub fn response(id: u16, ancount: u16) -> Header {
        Header {
            id,
            qr: PacketType::Answer,
            authoritative: true,
            ancount,
            ..Default::default()
        }
    }

    /// A query header for one question, all flags zero.
    pub fn query(id: u16) -> Header {
        Header {
            id,
            qdcount: 1,
            ..Default::default()
        }
    }
}

impl Display for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "id={} qr={:?} opcode={:?} rcode={:?} qd={} an={} ns={} ar={}",
            self.id,
            self.qr,
            self.opcode,
            self.rcode,
            self.qdcount,
            self.ancount,
            self.nscount,
            self.arcount
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// A DNS Question section entry, from Ref [RFC1035](https://www.rfc-editor.org/rfc/rfc1035#section-4.1.2) section 4.1.2,
/// with the mDNS reinterpretation of the class field's top bit.
pub struct Question {
    /// The name which is being queried
    pub qname: String,
    /// The Record type that is being requested, eg PTR, SRV, TXT etc.
    pub qtype: RecordType,
    /// The class, (typically IN for "Internet")
    pub qclass: RecordClass,
    /// The U-bit: the querier would prefer a unicast reply.
    /// Ref [RFC6762 section 18.12](https://www.rfc-editor.org/rfc/rfc6762#section-18.12).
    pub unicast_response: bool,
}

impl Question {
    pub fn new(qname: impl Into<String>, qtype: RecordType) -> Self {
        Question {
            qname: qname.into(),
            qtype,
            qclass: RecordClass::Internet,
            unicast_response: false,
        }
    }

    pub fn with_unicast_response(mut self, unicast_response: bool) -> Self {
        self.unicast_response = unicast_response;
        self
    }

    /// The question name in lowercased, dot-terminated form.
    pub fn normalized_name(&self) -> String {
        crate::utils::normalize_name(&self.qname)
    }

    /// turn a question into a vec of bytes to send over the wire
    pub fn to_bytes(&self) -> Result<Vec<u8>, HollerError> {
        let mut retval: Vec<u8> = vec![];

        retval.extend(crate::utils::name_as_bytes(&self.qname)?);
        retval.extend((self.qtype as u16).to_be_bytes());
        let mut qclass = self.qclass as u16;
        if self.unicast_response {
            qclass |= CLASS_TOP_BIT;
        }
        retval.extend(qclass.to_be_bytes());
        Ok(retval)
    }
}

impl Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "QNAME={} QTYPE={:?} QCLASS={}{}",
            self.qname,
            self.qtype,
            self.qclass,
            match self.unicast_response {
                true => " QU",
                false => "",
            }
        ))
    }
}
