use packed_struct::prelude::*;
use tracing::trace;

use crate::enums::{RecordClass, RecordType};
use crate::error::HollerError;
use crate::resourcerecord::{DNSCharString, DomainName, InternalResourceRecord, ResourceRecord};
use crate::{CLASS_TOP_BIT, HEADER_BYTES, Header, Question};

/// A whole DNS message: header plus the four record sections.
///
/// Packing writes names uncompressed; parsing accepts compression pointers
/// anywhere a name can appear and is total - malformed input comes back as
/// an error, never a panic.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<ResourceRecord>,
    pub authorities: Vec<ResourceRecord>,
    pub additionals: Vec<ResourceRecord>,
}

impl Default for Message {
    fn default() -> Self {
        Message {
            header: Header::default(),
            questions: vec![],
            answers: vec![],
            authorities: vec![],
            additionals: vec![],
        }
    }
}

impl Message {
    /// True when the message carries anything the aggregator could use.
    pub fn has_records(&self) -> bool {
        !self.answers.is_empty() || !self.additionals.is_empty()
    }

    /// Serializes the message, recomputing the section counts from the
    /// section lengths so the header can't lie.
    pub fn as_bytes(&self) -> Result<Vec<u8>, HollerError> {
        let mut header = self.header.clone();
        header.qdcount = self.questions.len() as u16;
        header.ancount = self.answers.len() as u16;
        header.nscount = self.authorities.len() as u16;
        header.arcount = self.additionals.len() as u16;

        let mut retval: Vec<u8> = vec![];
        retval.extend(header.pack()?);
        for question in &self.questions {
            retval.extend(question.to_bytes()?);
        }
        for record in self
            .answers
            .iter()
            .chain(self.authorities.iter())
            .chain(self.additionals.iter())
        {
            retval.extend(record.as_bytes()?);
        }
        Ok(retval)
    }

    /// Parses a datagram. Any structural failure - short read, label over
    /// 63 octets, a pointer out of bounds or revisiting an offset, rdlength
    /// past the end of the packet - fails the whole parse.
    pub fn from_bytes(buf: &[u8]) -> Result<Message, HollerError> {
        if buf.len() < HEADER_BYTES {
            return Err(HollerError::Parse(format!(
                "Packet of {} bytes is shorter than a header",
                buf.len()
            )));
        }
        let mut split_header: [u8; HEADER_BYTES] = [0; HEADER_BYTES];
        split_header.copy_from_slice(&buf[0..HEADER_BYTES]);
        let header = Header::unpack(&split_header)
            .map_err(|err| HollerError::Parse(format!("Failed to unpack header: {err:?}")))?;
        trace!("Parsed header: {header}");

        let mut reader = PacketReader::new(buf);
        reader.seek(HEADER_BYTES)?;

        // counts come off the wire, so no preallocation from them
        let mut questions = Vec::new();
        for _ in 0..header.qdcount {
            questions.push(reader.read_question()?);
        }
        let mut answers = Vec::new();
        for _ in 0..header.ancount {
            answers.push(reader.read_record()?);
        }
        let mut authorities = Vec::new();
        for _ in 0..header.nscount {
            authorities.push(reader.read_record()?);
        }
        let mut additionals = Vec::new();
        for _ in 0..header.arcount {
            additionals.push(reader.read_record()?);
        }

        Ok(Message {
            header,
            questions,
            answers,
            authorities,
            additionals,
        })
    }
}

/// Cursor over one datagram. Names may jump backwards through compression
/// pointers; the reader tracks which offsets a name has already visited so
/// a pointer cycle fails the parse instead of spinning.
pub(crate) struct PacketReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        PacketReader { buf, pos: 0 }
    }

    fn seek(&mut self, pos: usize) -> Result<(), HollerError> {
        if pos > self.buf.len() {
            return Err(HollerError::Parse(format!(
                "Seek to {pos} is past the end of a {} byte packet",
                self.buf.len()
            )));
        }
        self.pos = pos;
        Ok(())
    }

    fn read_u8(&mut self) -> Result<u8, HollerError> {
        let byte = *self
            .buf
            .get(self.pos)
            .ok_or_else(|| HollerError::Parse("Short read at end of packet".to_string()))?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_u16(&mut self) -> Result<u16, HollerError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, HollerError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], HollerError> {
        if self.pos + len > self.buf.len() {
            return Err(HollerError::Parse(format!(
                "Wanted {len} bytes at offset {} but the packet is {} bytes",
                self.pos,
                self.buf.len()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Reads a possibly-compressed name into lowercased dotted form with a
    /// trailing dot. The cursor lands after the name's first pointer (or
    /// after the terminator when there wasn't one).
    fn read_name(&mut self) -> Result<String, HollerError> {
        let mut labels: Vec<String> = vec![];
        let mut visited: Vec<usize> = vec![];
        let mut return_pos: Option<usize> = None;

        loop {
            let len = self.read_u8()?;
            if len == 0 {
                break;
            }
            if len & 0xC0 == 0xC0 {
                let low = self.read_u8()?;
                let target = (((len & 0x3F) as usize) << 8) | low as usize;
                if visited.contains(&target) {
                    return Err(HollerError::Parse(format!(
                        "Compression pointer loop via offset {target}"
                    )));
                }
                visited.push(target);
                if return_pos.is_none() {
                    return_pos = Some(self.pos);
                }
                self.seek(target)?;
                continue;
            }
            if len & 0xC0 != 0 {
                return Err(HollerError::Parse(format!(
                    "Unsupported label flags in length octet {len:#04x}"
                )));
            }
            let label = self.take(len as usize)?;
            let label = std::str::from_utf8(label)
                .map_err(|err| HollerError::Parse(format!("Label is not UTF-8: {err:?}")))?;
            labels.push(label.to_lowercase());
        }

        if let Some(pos) = return_pos {
            self.seek(pos)?;
        }

        let name = match labels.is_empty() {
            true => ".".to_string(),
            false => format!("{}.", labels.join(".")),
        };
        if name.len() > 256 {
            return Err(HollerError::Parse(format!(
                "Name length over 255 while parsing: {name:?}"
            )));
        }
        Ok(name)
    }

    fn read_question(&mut self) -> Result<Question, HollerError> {
        let qname = self.read_name()?;
        let qtype = RecordType::from(&self.read_u16()?);
        let raw_class = self.read_u16()?;
        Ok(Question {
            qname,
            qtype,
            qclass: RecordClass::from(&raw_class),
            unicast_response: raw_class & CLASS_TOP_BIT != 0,
        })
    }

    /// Reads one resource record. The specialized RDATA parsers may consume
    /// fewer bytes than rdlength (and PTR/SRV targets may jump elsewhere in
    /// the packet), so the cursor is always re-set to `rdata start +
    /// rdlength` afterwards.
    fn read_record(&mut self) -> Result<ResourceRecord, HollerError> {
        let name = self.read_name()?;
        let rrtype = self.read_u16()?;
        let raw_class = self.read_u16()?;
        let ttl = self.read_u32()?;
        let rdlength = self.read_u16()? as usize;

        let rdata_start = self.pos;
        if rdata_start + rdlength > self.buf.len() {
            return Err(HollerError::Parse(format!(
                "rdlength {rdlength} at offset {rdata_start} runs past a {} byte packet",
                self.buf.len()
            )));
        }

        let rdata = match RecordType::from(&rrtype) {
            RecordType::A => {
                if rdlength < 4 {
                    return Err(HollerError::Parse(format!(
                        "A record with rdlength {rdlength}"
                    )));
                }
                let octets = self.take(4)?;
                InternalResourceRecord::A {
                    address: std::net::Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]),
                }
            }
            RecordType::AAAA => {
                if rdlength < 16 {
                    return Err(HollerError::Parse(format!(
                        "AAAA record with rdlength {rdlength}"
                    )));
                }
                let mut octets = [0u8; 16];
                octets.copy_from_slice(self.take(16)?);
                InternalResourceRecord::AAAA {
                    address: std::net::Ipv6Addr::from(octets),
                }
            }
            RecordType::PTR => InternalResourceRecord::PTR {
                ptrdname: DomainName::from(self.read_name()?),
            },
            RecordType::SRV => {
                if rdlength < 7 {
                    return Err(HollerError::Parse(format!(
                        "SRV record with rdlength {rdlength}"
                    )));
                }
                let priority = self.read_u16()?;
                let weight = self.read_u16()?;
                let port = self.read_u16()?;
                let target = DomainName::from(self.read_name()?);
                InternalResourceRecord::SRV {
                    priority,
                    weight,
                    port,
                    target,
                }
            }
            RecordType::TXT => {
                let mut strings: Vec<DNSCharString> = vec![];
                while self.pos < rdata_start + rdlength {
                    let len = self.read_u8()? as usize;
                    if self.pos + len > rdata_start + rdlength {
                        return Err(HollerError::Parse(format!(
                            "TXT character-string of {len} bytes runs past rdlength {rdlength}"
                        )));
                    }
                    strings.push(DNSCharString::from(self.take(len)?));
                }
                InternalResourceRecord::TXT { strings }
            }
            RecordType::NSEC => InternalResourceRecord::NSEC,
            _ => InternalResourceRecord::Other { rrtype },
        };

        // Skip whatever the specialized parser didn't consume.
        self.seek(rdata_start + rdlength)?;

        Ok(ResourceRecord {
            name,
            class: RecordClass::from(&raw_class),
            cache_flush: raw_class & CLASS_TOP_BIT != 0,
            ttl,
            rdata,
        })
    }
}
