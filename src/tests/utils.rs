use std::collections::BTreeMap;

use crate::utils::{hexdump, make_txt, name_as_bytes, normalize_name, parse_txt, trim_dots};

#[test]
fn test_name_to_bytes() {
    let result = name_as_bytes("cheese.world").expect("Failed to encode name");
    assert_eq!(
        result,
        [6, 99, 104, 101, 101, 115, 101, 5, 119, 111, 114, 108, 100, 0]
    );
}

#[test]
fn test_short_name_to_bytes() {
    let result = name_as_bytes("cheese").expect("Failed to encode name");
    assert_eq!(result, [6, 99, 104, 101, 101, 115, 101, 0]);
}

#[test]
fn test_service_name_to_bytes() {
    let result = name_as_bytes("_http._tcp.local.").expect("Failed to encode name");
    assert_eq!(
        result,
        [
            0x05, 0x5F, 0x68, 0x74, 0x74, 0x70, 0x04, 0x5F, 0x74, 0x63, 0x70, 0x05, 0x6C, 0x6F,
            0x63, 0x61, 0x6C, 0x00
        ]
    );
}

#[test]
fn test_name_to_bytes_rejects_long_label() {
    let name = format!("{}.local.", "a".repeat(64));
    assert!(name_as_bytes(&name).is_err());
}

#[test]
fn test_name_to_bytes_rejects_empty_label() {
    assert!(name_as_bytes("foo..bar.").is_err());
}

#[test]
fn test_root_name_to_bytes() {
    assert_eq!(name_as_bytes(".").expect("Failed to encode root"), [0]);
}

#[test]
fn test_normalize_name() {
    assert_eq!(normalize_name("Box.Local"), "box.local.");
    assert_eq!(normalize_name("box.local."), "box.local.");
    assert_eq!(normalize_name("."), ".");
}

#[test]
fn test_trim_dots() {
    assert_eq!(trim_dots("_http._tcp."), "_http._tcp");
    assert_eq!(trim_dots(".local."), "local");
    assert_eq!(trim_dots("plain"), "plain");
}

#[test]
fn test_make_txt() {
    let mut fields = BTreeMap::new();
    fields.insert("path".to_string(), "/".to_string());
    fields.insert("version".to_string(), "1".to_string());
    assert_eq!(make_txt(&fields), vec!["path=/", "version=1"]);
}

#[test]
fn test_parse_txt_last_wins() {
    let strings = vec![
        "path=/".to_string(),
        "path=/other".to_string(),
        "bare".to_string(),
    ];
    let fields = parse_txt(&strings);
    assert_eq!(fields.get("path"), Some(&"/other".to_string()));
    assert_eq!(fields.get("bare"), Some(&String::new()));
}

#[test]
fn test_parse_txt_keeps_equals_in_value() {
    let strings = vec!["token=a=b=c".to_string()];
    let fields = parse_txt(&strings);
    assert_eq!(fields.get("token"), Some(&"a=b=c".to_string()));
}

#[test]
fn test_hexdump_rows() {
    let dump = hexdump(&[0xC0, 0xA8, 0x01, 0x02]);
    assert_eq!(dump, "0000  c0a80102");
    let dump = hexdump(&[0u8; 17]);
    assert_eq!(dump.lines().count(), 2);
    assert!(dump.lines().nth(1).expect("Missing row").starts_with("0010"));
}
