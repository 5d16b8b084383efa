//! Input validation for labels, service names and hostnames
//!
//! All checks here run before any external call is made.

use crate::error::{Error, Result};

/// Normalize and validate a subdomain label
///
/// The label is trimmed and lowercased, then must match `[a-z0-9-]{2,63}`.
pub fn label(raw: &str) -> Result<String> {
    let label = raw.trim().to_ascii_lowercase();

    if label.is_empty() {
        return Err(Error::validation("Subdomain label is required"));
    }

    let valid_len = (2..=63).contains(&label.len());
    let valid_chars = label
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');

    if !valid_len || !valid_chars {
        return Err(Error::validation(format!(
            "Subdomain may only contain letters, numbers, and hyphen (2-63 characters). Got: '{}'",
            label
        )));
    }

    Ok(label)
}

/// Validate an SRV service name (`[_a-zA-Z0-9-]+`)
pub fn service_name(service: &str) -> Result<()> {
    if service.is_empty()
        || !service
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(Error::validation(format!(
            "Protocol service may only contain letters, numbers, hyphen and underscore. Got: '{}'",
            service
        )));
    }
    Ok(())
}

/// Validate that a string is a DNS hostname usable as a zone apex
///
/// Basic RFC 1035 checks: total length, label length, character set, and no
/// leading or trailing hyphen. At least two labels are required.
pub fn hostname(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(Error::validation("Domain must be a valid hostname"));
    }

    // RFC 1035: 253 chars max
    if domain.len() > 253 {
        return Err(Error::validation(format!(
            "Domain name too long: {} chars (max 253)",
            domain.len()
        )));
    }

    if !domain.contains('.') {
        return Err(Error::validation(format!(
            "Domain must contain at least two labels. Got: '{}'",
            domain
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(Error::validation(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(Error::validation(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            return Err(Error::validation(format!(
                "Domain label contains invalid characters. Label: '{}'",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::validation(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_normalization() {
        assert_eq!(label("  MyServer ").unwrap(), "myserver");
        assert_eq!(label("mc-01").unwrap(), "mc-01");
    }

    #[test]
    fn test_label_bounds() {
        assert!(label("a").is_err());
        assert!(label("ab").is_ok());
        assert!(label(&"a".repeat(63)).is_ok());
        assert!(label(&"a".repeat(64)).is_err());
        assert!(label("").is_err());
    }

    #[test]
    fn test_label_rejects_dots_and_underscores() {
        assert!(label("a.b").is_err());
        assert!(label("a_b").is_err());
        assert!(label("héllo").is_err());
    }

    #[test]
    fn test_service_name() {
        assert!(service_name("_minecraft").is_ok());
        assert!(service_name("ts3-voice").is_ok());
        assert!(service_name("bad service").is_err());
        assert!(service_name("").is_err());
    }

    #[test]
    fn test_hostname() {
        assert!(hostname("example.com").is_ok());
        assert!(hostname("play.example.co.uk").is_ok());
        assert!(hostname("localhost").is_err());
        assert!(hostname("-bad.example.com").is_err());
        assert!(hostname("bad..example.com").is_err());
        assert!(hostname(&format!("{}.com", "a".repeat(64))).is_err());
    }
}
