//! WHOIS protocol client.
//!
//! Uses the system's `whois` command to query registration data and parses the
//! unstructured text response into a [`RegistrationRecord`]. Responses vary a
//! lot between registries, so every field is matched against several labels and
//! anything not found is left empty.

use crate::error::WhoisError;
use crate::lookup::RegistrationLookup;
use crate::types::RegistrationRecord;
use crate::utils::is_valid_fqdn;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;
use tokio::process::Command;

lazy_static! {
    static ref REGISTRANT_NAME: Vec<Regex> = field_patterns(&["Registrant Name", "Registrant"]);
    static ref REGISTRANT_ORG: Vec<Regex> = field_patterns(&[
        "Registrant Organization",
        "Registrant Organisation",
        "Registrant Org",
        "org-name",
    ]);
    static ref REGISTRANT_COUNTRY: Vec<Regex> = field_patterns(&[
        "Registrant Country",
        "Registrant Country Code",
        "Registrant Country/Economy",
    ]);
    static ref REGISTRAR: Vec<Regex> =
        field_patterns(&["Registrar", "Registrar Name", "Sponsoring Registrar"]);
    static ref CREATION_DATE: Vec<Regex> = field_patterns(&[
        "Creation Date",
        "Created Date",
        "Created On",
        "Created",
        "Registration Date",
        "Registration Time",
    ]);
    static ref EXPIRATION_DATE: Vec<Regex> = field_patterns(&[
        "Registry Expiry Date",
        "Registrar Registration Expiration Date",
        "Expiration Date",
        "Expiry Date",
        "Expires On",
        "Expires",
        "paid-till",
    ]);
    static ref NAMESERVER: Regex =
        Regex::new(r"(?im)^[ \t]*(?:Name Server|Nameserver|Nameservers|nserver)[ \t]*:[ \t]*(\S+)")
            .expect("nameserver pattern is valid");
}

/// Build one anchored `Label: value` pattern per label.
fn field_patterns(labels: &[&str]) -> Vec<Regex> {
    labels
        .iter()
        .map(|label| {
            Regex::new(&format!(
                r"(?im)^[ \t]*{}[ \t]*:[ \t]*(.*?)[ \t\r]*$",
                regex::escape(label)
            ))
            .expect("field pattern is valid")
        })
        .collect()
}

/// Responses meaning the registry has no such registration.
const NO_MATCH_PATTERNS: &[&str] = &[
    "no match for",
    "no match",
    "not found",
    "no data found",
    "no entries found",
    "domain not found",
    "no matching record",
    "status: free",
    "status: available",
    "the queried object does not exist",
    "object does not exist",
    "this domain name has not been registered",
];

/// Responses meaning the registry refused to answer right now.
const RATE_LIMIT_PATTERNS: &[&str] = &[
    "rate limit exceeded",
    "too many requests",
    "try again later",
    "quota exceeded",
    "limit exceeded",
    "rate-limited",
    "too many requests from your ip",
];

/// WHOIS client backed by the system's `whois` command-line tool.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    /// Executable to run (default: `whois`)
    command: String,
    /// Timeout for a single WHOIS query
    timeout: Duration,
}

impl WhoisClient {
    /// Create a new WHOIS client with default settings.
    pub fn new() -> Self {
        Self {
            command: "whois".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Create a new WHOIS client with custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::new()
        }
    }

    /// Use a different executable than `whois` (e.g. a wrapper script).
    pub fn with_command<C: Into<String>>(mut self, command: C) -> Self {
        self.command = command.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Query registration data for a hostname.
    ///
    /// # Errors
    ///
    /// - `WhoisError::NoMatch` when the registry reports no such registration
    /// - `WhoisError::Protocol` for an invalid hostname, a timeout, a rate-limit
    ///   notice or a response that cannot be parsed
    /// - `WhoisError::Unexpected` when the `whois` command cannot be run at all
    pub async fn query(&self, hostname: &str) -> Result<RegistrationRecord, WhoisError> {
        if !is_valid_fqdn(hostname) {
            return Err(WhoisError::protocol(hostname, "Invalid hostname"));
        }

        let mut command = Command::new(&self.command);
        command.arg(hostname).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                WhoisError::protocol(
                    hostname,
                    format!("WHOIS query timed out after {:?}", self.timeout),
                )
            })?
            .map_err(|e| {
                WhoisError::unexpected(
                    hostname,
                    format!(
                        "Failed to execute {} command: {}. Make sure 'whois' is installed.",
                        self.command, e
                    ),
                )
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr.trim();
            return Err(WhoisError::protocol(
                hostname,
                if message.is_empty() {
                    "Empty WHOIS response".to_string()
                } else {
                    message.to_string()
                },
            ));
        }

        parse_whois_response(hostname, &stdout)
    }
}

impl Default for WhoisClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationLookup for WhoisClient {
    async fn lookup(&self, hostname: &str) -> Result<RegistrationRecord, WhoisError> {
        self.query(hostname).await
    }
}

/// Parse a raw WHOIS response into a registration record.
///
/// A response is considered usable when at least one registration field
/// (registrar, registrant, dates or nameservers) can be extracted.
pub fn parse_whois_response(hostname: &str, raw: &str) -> Result<RegistrationRecord, WhoisError> {
    if let Some(line) = find_line(raw, NO_MATCH_PATTERNS) {
        return Err(WhoisError::no_match(hostname, line));
    }

    let record = RegistrationRecord {
        domain: hostname.to_string(),
        registrant_name: extract_field(raw, &REGISTRANT_NAME),
        registrant_org: extract_field(raw, &REGISTRANT_ORG),
        registrant_country: extract_field(raw, &REGISTRANT_COUNTRY),
        registrar: extract_field(raw, &REGISTRAR),
        creation_date: extract_field(raw, &CREATION_DATE).and_then(|d| parse_date(&d)),
        expiration_date: extract_field(raw, &EXPIRATION_DATE).and_then(|d| parse_date(&d)),
        nameservers: extract_nameservers(raw),
    };

    let has_data = record.registrar.is_some()
        || record.candidate_identity().is_some()
        || record.registrant_country.is_some()
        || record.creation_date.is_some()
        || record.expiration_date.is_some()
        || !record.nameservers.is_empty();

    if has_data {
        return Ok(record);
    }

    if let Some(line) = find_line(raw, RATE_LIMIT_PATTERNS) {
        return Err(WhoisError::protocol(hostname, line));
    }

    Err(WhoisError::protocol(
        hostname,
        "Unable to parse WHOIS response",
    ))
}

/// First response line containing one of the patterns (case-insensitive), trimmed.
fn find_line(raw: &str, patterns: &[&str]) -> Option<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('%') && !line.starts_with('#'))
        .find(|line| {
            let lower = line.to_lowercase();
            patterns.iter().any(|p| lower.starts_with(p))
        })
        .map(str::to_string)
}

/// First non-empty value for any of the field patterns, in pattern order.
fn extract_field(raw: &str, patterns: &[Regex]) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures_iter(raw)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .find(|value| !value.is_empty())
            .map(str::to_string)
    })
}

/// All nameserver values in response order (normalization happens at classification).
fn extract_nameservers(raw: &str) -> Vec<String> {
    NAMESERVER
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Parse the date formats commonly found in WHOIS responses.
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let cleaned = date_str
        .trim()
        .replace(" (UTC)", "")
        .replace(" UTC", "Z")
        .replace(" +0000", "Z");

    if let Ok(dt) = DateTime::parse_from_rfc3339(&cleaned) {
        return Some(dt.with_timezone(&Utc));
    }

    let datetime_formats = [
        "%Y-%m-%dT%H:%M:%SZ",
        "%Y-%m-%dT%H:%M:%S%.fZ",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%SZ",
        "%Y-%m-%d %H:%M:%S",
        "%Y.%m.%d %H:%M:%S",
        "%d-%b-%Y %H:%M:%S",
    ];
    for fmt in &datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
            return Some(dt.and_utc());
        }
    }

    let date_formats = [
        "%Y-%m-%d", "%d-%b-%Y", "%d-%B-%Y", "%Y.%m.%d", "%Y/%m/%d", "%d.%m.%Y", "%d/%m/%Y",
        "%b %d %Y",
    ];
    for fmt in &date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(&cleaned, fmt) {
            return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }

    tracing::debug!("Unrecognized WHOIS date format: {}", date_str);
    None
}
