use std::collections::BTreeMap;

use crate::error::HollerError;

/// Encodes a domain name as length-prefixed labels with a zero terminator.
/// No output-side compression, readers have to accept both forms anyway.
pub fn name_as_bytes(name: &str) -> Result<Vec<u8>, HollerError> {
    let trimmed = name.trim_end_matches('.');
    let mut result: Vec<u8> = Vec::with_capacity(trimmed.len() + 2);
    if trimmed.is_empty() {
        result.push(0);
        return Ok(result);
    }
    for label in trimmed.split('.') {
        if label.is_empty() {
            return Err(HollerError::InvalidArgument(format!(
                "Name {name:?} contains an empty label"
            )));
        }
        if label.len() > 63 {
            return Err(HollerError::InvalidArgument(format!(
                "Label length is {}, needs to be <=63 while encoding {name:?}",
                label.len()
            )));
        }
        result.push(label.len() as u8);
        result.extend(label.as_bytes());
    }
    result.push(0);
    if result.len() > 256 {
        return Err(HollerError::InvalidArgument(format!(
            "Name {name:?} is over 255 octets on the wire"
        )));
    }
    Ok(result)
}

/// Lowercases a name and guarantees the trailing dot. The root name stays `.`.
pub fn normalize_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    match lowered.ends_with('.') {
        true => lowered,
        false => format!("{lowered}."),
    }
}

/// Strips leading and trailing dots, the form used when splicing names together.
pub fn trim_dots(name: &str) -> &str {
    name.trim_matches('.')
}

/// Flattens a key/value map into `k=v` TXT strings.
pub fn make_txt(fields: &BTreeMap<String, String>) -> Vec<String> {
    fields.iter().map(|(k, v)| format!("{k}={v}")).collect()
}

/// Parses TXT strings back into a map. Later keys win, a bare `k` parses
/// to `(k, "")`.
pub fn parse_txt(strings: &[String]) -> BTreeMap<String, String> {
    let mut result = BTreeMap::new();
    for entry in strings {
        match entry.split_once('=') {
            Some((key, value)) => result.insert(key.to_string(), value.to_string()),
            None => result.insert(entry.to_string(), String::new()),
        };
    }
    result
}

/// The OS hostname spliced onto the given domain as a dot-terminated FQDN.
pub fn default_host_name(domain: &str) -> Result<String, HollerError> {
    let hostname = gethostname::gethostname();
    let hostname = hostname.to_str().ok_or_else(|| {
        HollerError::InvalidArgument("OS hostname is not valid UTF-8".to_string())
    })?;
    Ok(format!(
        "{}.{}.",
        trim_dots(hostname),
        trim_dots(domain)
    ))
}

/// Renders a buffer as hex rows for trace-level packet capture.
pub fn hexdump(buf: &[u8]) -> String {
    buf.chunks(16)
        .enumerate()
        .map(|(index, chunk)| format!("{:04x}  {}", index * 16, hex::encode(chunk)))
        .collect::<Vec<String>>()
        .join("\n")
}
