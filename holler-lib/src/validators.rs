use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// A single DNS hostname label, RFC1123 style.
    pub static ref HOST_LABEL: Regex =
        Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?$")
            .expect("Failed to parse an internal regex!");
    /// A DNS-SD service label, which may carry a leading underscore (`_http`, `_tcp`).
    pub static ref SERVICE_LABEL: Regex =
        Regex::new(r"^_?[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?$")
            .expect("Failed to parse an internal regex!");
}

/// Checks a dot-terminated FQDN: every label non-empty, ≤63 octets and
/// matching [HOST_LABEL], total length ≤255.
pub fn valid_fqdn(name: &str) -> bool {
    if name.len() > 255 || !name.ends_with('.') {
        return false;
    }
    let trimmed = name.trim_end_matches('.');
    if trimmed.is_empty() {
        return false;
    }
    trimmed
        .split('.')
        .all(|label| label.len() <= 63 && HOST_LABEL.is_match(label))
}

/// Checks a DNS-SD service type like `_http._tcp` (trailing dot optional).
pub fn valid_service_name(name: &str) -> bool {
    let trimmed = name.trim_matches('.');
    if trimmed.is_empty() {
        return false;
    }
    trimmed
        .split('.')
        .all(|label| label.len() <= 63 && SERVICE_LABEL.is_match(label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_fqdn() {
        assert!(valid_fqdn("box.local."));
        assert!(valid_fqdn("printer-1.example.com."));
        assert!(!valid_fqdn("box.local"));
        assert!(!valid_fqdn("."));
        assert!(!valid_fqdn("-box.local."));
        assert!(!valid_fqdn("box-.local."));
        assert!(!valid_fqdn(
            "a234567890123456789012345678901234567890123456789012345678901234.local."
        ));
    }

    #[test]
    fn test_valid_service_name() {
        assert!(valid_service_name("_http._tcp"));
        assert!(valid_service_name("_http._tcp."));
        assert!(valid_service_name("_scriptum-sync._tcp"));
        assert!(!valid_service_name(""));
        assert!(!valid_service_name("__http._tcp"));
        assert!(!valid_service_name("_http-._tcp"));
    }
}
