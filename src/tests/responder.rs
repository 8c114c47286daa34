use crate::enums::{OpCode, PacketType, Rcode, RecordType};
use crate::message::Message;
use crate::responder::{answer_buckets, build_response};
use crate::tests::printer_zone;
use crate::zones::Zone;
use crate::{Header, Question};

fn query(questions: Vec<Question>) -> Message {
    Message {
        header: Header {
            id: 0xBEEF,
            qdcount: questions.len() as u16,
            ..Default::default()
        },
        questions,
        answers: vec![],
        authorities: vec![],
        additionals: vec![],
    }
}

#[tokio::test]
async fn test_multicast_bucket_for_plain_question() {
    let zone = printer_zone().await;
    let message = query(vec![Question::new("_http._tcp.local.", RecordType::PTR)]);

    let (multicast, unicast) =
        answer_buckets(&message, &zone).expect("Query should not be discarded");
    assert!(!multicast.is_empty());
    assert!(unicast.is_empty());

    // group-wide answers always go out under id 0
    let response = build_response(0, multicast);
    assert_eq!(response.header.id, 0);
    assert_eq!(response.header.qdcount, 0);
    assert!(response.questions.is_empty());
}

#[tokio::test]
async fn test_unicast_bucket_for_qu_question() {
    let zone = printer_zone().await;
    let message = query(vec![
        Question::new("_http._tcp.local.", RecordType::PTR).with_unicast_response(true),
    ]);

    let (multicast, unicast) =
        answer_buckets(&message, &zone).expect("Query should not be discarded");
    assert!(multicast.is_empty());
    assert!(!unicast.is_empty());

    // unicast responses echo the query id
    let response = build_response(message.header.id, unicast);
    assert_eq!(response.header.id, 0xBEEF);
}

#[tokio::test]
async fn test_mixed_questions_fill_both_buckets() {
    let zone = printer_zone().await;
    let message = query(vec![
        Question::new("_http._tcp.local.", RecordType::PTR),
        Question::new("box.local.", RecordType::A).with_unicast_response(true),
    ]);

    let (multicast, unicast) =
        answer_buckets(&message, &zone).expect("Query should not be discarded");
    assert_eq!(multicast.len(), 4);
    assert_eq!(unicast.len(), 1);
}

#[tokio::test]
async fn test_response_message_is_discarded() {
    let zone = printer_zone().await;
    let mut message = query(vec![Question::new("_http._tcp.local.", RecordType::PTR)]);
    message.header.qr = PacketType::Answer;
    assert!(answer_buckets(&message, &zone).is_none());
}

#[tokio::test]
async fn test_nonzero_opcode_is_discarded() {
    let zone = printer_zone().await;
    let mut message = query(vec![Question::new("_http._tcp.local.", RecordType::PTR)]);
    message.header.opcode = OpCode::Status;
    assert!(answer_buckets(&message, &zone).is_none());
}

#[tokio::test]
async fn test_nonzero_rcode_is_discarded() {
    let zone = printer_zone().await;
    let mut message = query(vec![Question::new("_http._tcp.local.", RecordType::PTR)]);
    message.header.rcode = Rcode::ServFail;
    assert!(answer_buckets(&message, &zone).is_none());
}

#[tokio::test]
async fn test_unknown_question_yields_empty_buckets() {
    let zone = printer_zone().await;
    let message = query(vec![Question::new("unknown.local.", RecordType::A)]);
    let (multicast, unicast) =
        answer_buckets(&message, &zone).expect("Query should not be discarded");
    assert!(multicast.is_empty());
    assert!(unicast.is_empty());
}

#[tokio::test]
async fn test_response_wire_flags() {
    let zone = printer_zone().await;
    let message = query(vec![Question::new("_http._tcp.local.", RecordType::PTR)]);
    let (multicast, _) = answer_buckets(&message, &zone).expect("Query should not be discarded");

    let response = build_response(0, multicast);
    let bytes = response.as_bytes().expect("Failed to pack response");
    // QR|AA and nothing else
    assert_eq!(&bytes[2..4], [0x84, 0x00]);

    let parsed = Message::from_bytes(&bytes).expect("Failed to parse own response");
    assert_eq!(parsed.header.qr, PacketType::Answer);
    assert!(parsed.header.authoritative);
    assert_eq!(parsed.header.ancount, 4);
}
