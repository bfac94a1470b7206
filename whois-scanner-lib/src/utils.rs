//! Utility functions for hostname handling.
//!
//! Helpers for hostname normalization and validation and for telling remote
//! input sources from local paths.

/// Trim surrounding whitespace and a trailing root dot from a hostname.
///
/// Case is preserved; registries answer case-insensitively, and the report
/// should show the hostname the way it was requested.
pub fn normalize_hostname(hostname: &str) -> String {
    hostname.trim().trim_end_matches('.').to_string()
}

/// Validate that a hostname has basic valid FQDN structure.
///
/// This is a syntactic check only; whether the name is registered is up to
/// the registry.
pub fn is_valid_fqdn(domain: &str) -> bool {
    if domain.len() < 3 || domain.len() > 253 {
        return false;
    }

    if !domain.contains('.') {
        return false;
    }

    if domain.starts_with('.') || domain.ends_with('.') {
        return false;
    }

    domain.split('.').all(is_valid_label)
}

fn is_valid_label(label: &str) -> bool {
    if label.is_empty() || label.len() > 63 {
        return false;
    }

    // Cannot start or end with hyphen
    if label.starts_with('-') || label.ends_with('-') {
        return false;
    }

    // Alphanumeric (including IDN characters) and hyphens only
    label.chars().all(|c| c.is_alphanumeric() || c == '-')
}

/// Whether an input location refers to an HTTP(S) resource.
pub fn is_remote_source(location: &str) -> bool {
    let lower = location.trim().to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_hostname() {
        assert_eq!(normalize_hostname("  example.com \n"), "example.com");
        assert_eq!(normalize_hostname("Example.COM."), "Example.COM");
    }

    #[test]
    fn test_is_valid_fqdn() {
        assert!(is_valid_fqdn("example.com"));
        assert!(is_valid_fqdn("test.co.uk"));
        assert!(is_valid_fqdn("sub.example.com"));
        assert!(is_valid_fqdn("a.io"));

        assert!(!is_valid_fqdn("example"));
        assert!(!is_valid_fqdn(".com"));
        assert!(!is_valid_fqdn("example."));
        assert!(!is_valid_fqdn("-example.com"));
        assert!(!is_valid_fqdn("example.com-"));
        assert!(!is_valid_fqdn("exa mple.com"));
        assert!(!is_valid_fqdn("ex..com"));
    }

    #[test]
    fn test_is_remote_source() {
        assert!(is_remote_source("https://example.com/input.json"));
        assert!(is_remote_source("HTTP://example.com/input.json"));
        assert!(!is_remote_source("input.json"));
        assert!(!is_remote_source("/tmp/https.json"));
    }
}
