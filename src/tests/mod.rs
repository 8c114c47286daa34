mod message;
mod responder;
mod utils;

use std::net::IpAddr;
use std::str::FromStr;

use crate::enums::RecordType;
use crate::zones::ServiceZone;

/// The fixture service most of the suite leans on.
pub(crate) async fn printer_zone() -> ServiceZone {
    ServiceZone::builder("Printer", "_http._tcp.", 80)
        .with_domain("local.")
        .with_host_name("box.local.")
        .with_ips(vec![
            IpAddr::from_str("192.168.1.2").expect("Failed to parse fixture address")
        ])
        .with_txt(vec!["path=/".to_string()])
        .build()
        .await
        .expect("Failed to build fixture zone")
}

#[test]
fn test_record_type_code_round_trip() {
    for rrtype in enum_iterator::all::<RecordType>() {
        if rrtype == RecordType::InvalidType {
            continue;
        }
        let code = rrtype as u16;
        assert_eq!(RecordType::from(&code), rrtype);
        let name: &'static str = rrtype.into();
        assert_eq!(RecordType::from(name), rrtype);
    }
}
