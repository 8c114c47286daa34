use packed_struct::prelude::*;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::enums::{PacketType, RecordClass, RecordType};
use crate::message::Message;
use crate::resourcerecord::{DNSCharString, DomainName, InternalResourceRecord, ResourceRecord};
use crate::{Header, Question, HEADER_BYTES};

#[test]
fn test_response_header_flags() {
    let header = Header::response(0x3DE1, 1);
    let packed = header.pack().expect("Failed to pack header");
    assert_eq!(
        packed,
        [0x3D, 0xE1, 0x84, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00]
    );
}

#[test]
fn test_query_header_flags_all_zero() {
    let header = Header::query(0xA370);
    let packed = header.pack().expect("Failed to pack header");
    assert_eq!(packed[2], 0x00);
    assert_eq!(packed[3], 0x00);
    assert_eq!(&packed[4..6], [0x00, 0x01]);
}

#[test]
fn test_question_unicast_class_bytes() {
    let question = Question::new("_http._tcp.local.", RecordType::PTR).with_unicast_response(true);
    let bytes = question.to_bytes().expect("Failed to pack question");
    assert_eq!(
        bytes,
        [
            0x05, 0x5F, 0x68, 0x74, 0x74, 0x70, // _http
            0x04, 0x5F, 0x74, 0x63, 0x70, // _tcp
            0x05, 0x6C, 0x6F, 0x63, 0x61, 0x6C, // local
            0x00, // terminator
            0x00, 0x0C, // PTR
            0x80, 0x01, // IN with the U-bit on top
        ]
    );
}

#[test]
fn test_question_class_without_unicast() {
    let question = Question::new("_http._tcp.local.", RecordType::PTR);
    let bytes = question.to_bytes().expect("Failed to pack question");
    assert_eq!(&bytes[bytes.len() - 2..], [0x00, 0x01]);
}

fn round_trip_fixture() -> Message {
    Message {
        header: Header {
            id: 0x1234,
            qr: PacketType::Answer,
            authoritative: true,
            qdcount: 1,
            ancount: 3,
            arcount: 2,
            ..Default::default()
        },
        questions: vec![Question::new("_http._tcp.local.", RecordType::PTR)],
        answers: vec![
            ResourceRecord::new(
                "_http._tcp.local.",
                InternalResourceRecord::PTR {
                    ptrdname: DomainName::from("printer._http._tcp.local."),
                },
            ),
            ResourceRecord::new(
                "printer._http._tcp.local.",
                InternalResourceRecord::SRV {
                    priority: 10,
                    weight: 1,
                    port: 80,
                    target: DomainName::from("box.local."),
                },
            ),
            ResourceRecord::new(
                "printer._http._tcp.local.",
                InternalResourceRecord::TXT {
                    strings: vec![DNSCharString::from("path=/"), DNSCharString::from("v=1")],
                },
            ),
        ],
        authorities: vec![],
        additionals: vec![
            ResourceRecord::new(
                "box.local.",
                InternalResourceRecord::A {
                    address: Ipv4Addr::new(192, 168, 1, 2),
                },
            )
            .with_cache_flush(true),
            ResourceRecord::new(
                "box.local.",
                InternalResourceRecord::AAAA {
                    address: Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0x42),
                },
            ),
        ],
    }
}

#[test]
fn test_message_round_trip() {
    let message = round_trip_fixture();
    let bytes = message.as_bytes().expect("Failed to pack message");
    let parsed = Message::from_bytes(&bytes).expect("Failed to parse own bytes");
    assert_eq!(parsed, message);
}

#[test]
fn test_parse_preserves_cache_flush_and_class() {
    let bytes = round_trip_fixture()
        .as_bytes()
        .expect("Failed to pack message");
    let parsed = Message::from_bytes(&bytes).expect("Failed to parse");
    assert!(parsed.additionals[0].cache_flush);
    assert_eq!(parsed.additionals[0].class, RecordClass::Internet);
    assert!(!parsed.answers[0].cache_flush);
}

#[test]
fn test_parse_short_buffer() {
    assert!(Message::from_bytes(&[]).is_err());
    assert!(Message::from_bytes(&[0x00; 5]).is_err());
}

#[test]
fn test_parse_missing_question() {
    // header promises one question and delivers nothing
    let header = Header::query(1).pack().expect("Failed to pack header");
    assert!(Message::from_bytes(&header).is_err());
}

#[test]
fn test_parse_oversized_label() {
    let mut buf = Header::query(1).pack().expect("Failed to pack header").to_vec();
    // a label flagged with 0x80 is neither a length nor a pointer
    buf.push(0x80);
    buf.extend([b'x'; 16]);
    buf.push(0);
    buf.extend([0x00, 0x0C, 0x00, 0x01]);
    assert!(Message::from_bytes(&buf).is_err());
}

#[test]
fn test_parse_pointer_loop() {
    let mut buf = Header::query(1).pack().expect("Failed to pack header").to_vec();
    // question name is a pointer aimed at itself
    buf.extend([0xC0, HEADER_BYTES as u8]);
    buf.extend([0x00, 0x0C, 0x00, 0x01]);
    assert!(Message::from_bytes(&buf).is_err());
}

#[test]
fn test_parse_rdlength_past_end() {
    let header = Header {
        ancount: 1,
        ..Default::default()
    };
    let mut buf = header.pack().expect("Failed to pack header").to_vec();
    buf.extend(crate::utils::name_as_bytes("box.local.").expect("Failed to encode name"));
    buf.extend([0x00, 0x01, 0x00, 0x01]); // A IN
    buf.extend(120u32.to_be_bytes());
    buf.extend(40u16.to_be_bytes()); // rdlength far past the packet end
    buf.extend([192, 168, 1, 2]);
    assert!(Message::from_bytes(&buf).is_err());
}

#[test]
fn test_parse_compressed_owner_name() {
    // question name written in full, answer owner pointing back at it
    let mut buf = Header {
        qdcount: 1,
        ancount: 1,
        ..Default::default()
    }
    .pack()
    .expect("Failed to pack header")
    .to_vec();
    buf.extend(crate::utils::name_as_bytes("_http._tcp.local.").expect("Failed to encode name"));
    buf.extend([0x00, 0x0C, 0x00, 0x01]);

    buf.extend([0xC0, HEADER_BYTES as u8]);
    buf.extend([0x00, 0x0C, 0x00, 0x01]);
    buf.extend(120u32.to_be_bytes());
    let rdata =
        crate::utils::name_as_bytes("printer._http._tcp.local.").expect("Failed to encode name");
    buf.extend((rdata.len() as u16).to_be_bytes());
    buf.extend(rdata);

    let parsed = Message::from_bytes(&buf).expect("Failed to parse compressed packet");
    assert_eq!(parsed.answers[0].name, "_http._tcp.local.");
    assert_eq!(
        parsed.answers[0].rdata,
        InternalResourceRecord::PTR {
            ptrdname: DomainName::from("printer._http._tcp.local.")
        }
    );
}

#[test]
fn test_parse_compressed_rdata_target() {
    // SRV target compressed as a pointer into the question name
    let mut buf = Header {
        qdcount: 1,
        ancount: 1,
        ..Default::default()
    }
    .pack()
    .expect("Failed to pack header")
    .to_vec();
    buf.extend(crate::utils::name_as_bytes("box.local.").expect("Failed to encode name"));
    buf.extend([0x00, 0x21, 0x00, 0x01]);

    buf.extend(
        crate::utils::name_as_bytes("printer._http._tcp.local.").expect("Failed to encode name"),
    );
    buf.extend([0x00, 0x21, 0x00, 0x01]); // SRV IN
    buf.extend(120u32.to_be_bytes());
    let mut rdata: Vec<u8> = vec![];
    rdata.extend(10u16.to_be_bytes());
    rdata.extend(1u16.to_be_bytes());
    rdata.extend(80u16.to_be_bytes());
    rdata.extend([0xC0, HEADER_BYTES as u8]);
    buf.extend((rdata.len() as u16).to_be_bytes());
    buf.extend(rdata);

    let parsed = Message::from_bytes(&buf).expect("Failed to parse compressed SRV");
    match &parsed.answers[0].rdata {
        InternalResourceRecord::SRV { port, target, .. } => {
            assert_eq!(*port, 80);
            assert_eq!(target.name, "box.local.");
        }
        other => panic!("Expected SRV, got {other:?}"),
    }
}

#[test]
fn test_parse_skips_unknown_types() {
    let mut buf = Header {
        ancount: 2,
        ..Default::default()
    }
    .pack()
    .expect("Failed to pack header")
    .to_vec();
    // type 99 with five bytes of who-knows-what
    buf.extend(crate::utils::name_as_bytes("mystery.local.").expect("Failed to encode name"));
    buf.extend([0x00, 99, 0x00, 0x01]);
    buf.extend(120u32.to_be_bytes());
    buf.extend(5u16.to_be_bytes());
    buf.extend([1, 2, 3, 4, 5]);
    // then a perfectly normal A record
    buf.extend(crate::utils::name_as_bytes("box.local.").expect("Failed to encode name"));
    buf.extend([0x00, 0x01, 0x00, 0x01]);
    buf.extend(120u32.to_be_bytes());
    buf.extend(4u16.to_be_bytes());
    buf.extend([192, 168, 1, 2]);

    let parsed = Message::from_bytes(&buf).expect("Failed to parse");
    assert_eq!(
        parsed.answers[0].rdata,
        InternalResourceRecord::Other { rrtype: 99 }
    );
    assert_eq!(
        parsed.answers[1].rdata,
        InternalResourceRecord::A {
            address: Ipv4Addr::new(192, 168, 1, 2)
        }
    );
}

#[test]
fn test_parse_nsec_recognized_and_ignored() {
    let mut buf = Header {
        ancount: 1,
        ..Default::default()
    }
    .pack()
    .expect("Failed to pack header")
    .to_vec();
    buf.extend(crate::utils::name_as_bytes("box.local.").expect("Failed to encode name"));
    buf.extend([0x00, 47, 0x00, 0x01]);
    buf.extend(120u32.to_be_bytes());
    buf.extend(6u16.to_be_bytes());
    buf.extend([0, 0, 0, 0, 0, 0]);

    let parsed = Message::from_bytes(&buf).expect("Failed to parse");
    assert_eq!(parsed.answers[0].rdata, InternalResourceRecord::NSEC);
}

#[test]
fn test_parse_lowercases_names() {
    let mut buf = Header::query(7).pack().expect("Failed to pack header").to_vec();
    buf.extend(crate::utils::name_as_bytes("BOX.Local.").expect("Failed to encode name"));
    buf.extend([0x00, 0x01, 0x00, 0x01]);
    let parsed = Message::from_bytes(&buf).expect("Failed to parse");
    assert_eq!(parsed.questions[0].qname, "box.local.");
}

#[test]
fn test_parse_garbage_is_total() {
    // whatever the bytes, the parser returns instead of panicking
    for seed in 0u8..32 {
        let buf: Vec<u8> = (0..64).map(|i| seed.wrapping_mul(31).wrapping_add(i)).collect();
        let _ = Message::from_bytes(&buf);
    }
}
