//! Core data types for WHOIS scanning.
//!
//! This module defines the data structures shared across the library: input
//! entries, classification rules, normalized registration records, per-domain
//! outcomes, output formats and run configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// One requested input entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    /// Hostname to look up (e.g., "example.com")
    pub hostname: String,
}

impl DomainRecord {
    pub fn new<H: Into<String>>(hostname: H) -> Self {
        Self {
            hostname: hostname.into(),
        }
    }
}

/// Registrant identities that indicate a privacy-protected registration.
///
/// Deserializes from the `terms` object of the input document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRules {
    /// Identities that are flagged when they match exactly
    #[serde(default)]
    pub exact_match: HashSet<String>,

    /// Identity prefixes, checked in order; the first match wins
    #[serde(default)]
    pub prefix: Vec<String>,
}

impl ClassificationRules {
    pub fn new<E, P>(exact_match: E, prefix: P) -> Self
    where
        E: IntoIterator,
        E::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            exact_match: exact_match.into_iter().map(Into::into).collect(),
            prefix: prefix.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.exact_match.is_empty() && self.prefix.is_empty()
    }
}

/// Normalized registration data for one domain.
///
/// Produced by a [`crate::RegistrationLookup`] implementation. Every field the
/// registry did not report is `None` (or an empty nameserver list).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    /// The domain that was queried
    pub domain: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrant_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrant_org: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrant_country: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,

    /// Nameservers in the order the registry listed them
    #[serde(default)]
    pub nameservers: Vec<String>,
}

impl RegistrationRecord {
    /// Create an empty record for a domain.
    pub fn new<D: Into<String>>(domain: D) -> Self {
        Self {
            domain: domain.into(),
            ..Default::default()
        }
    }

    /// The identity used for privacy matching: the registrant name, or the
    /// registrant organization when no name was reported.
    pub fn candidate_identity(&self) -> Option<&str> {
        self.registrant_name
            .as_deref()
            .or(self.registrant_org.as_deref())
    }
}

/// Kind of an expected per-domain lookup failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The registry has no record for the hostname
    #[serde(rename = "not_found")]
    NotFound,

    /// Any other failure reported by the lookup client
    #[serde(rename = "lookup_error")]
    LookupError,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::NotFound => write!(f, "NotFound"),
            FailureKind::LookupError => write!(f, "LookupError"),
        }
    }
}

/// The classification of one processed domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Looked up and bucketed by registrant country (which may be unknown)
    Succeeded {
        country: Option<String>,
        nameservers: Vec<String>,
    },

    /// Registrant identity matched a privacy term
    Flagged {
        matched_term: String,
        nameservers: Vec<String>,
    },

    /// The lookup failed in an expected way
    Failed {
        reason: String,
        nameservers: Vec<String>,
    },
}

impl Outcome {
    pub fn nameservers(&self) -> &[String] {
        match self {
            Outcome::Succeeded { nameservers, .. }
            | Outcome::Flagged { nameservers, .. }
            | Outcome::Failed { nameservers, .. } => nameservers,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

/// Report format selected for the output encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Full bucket table as pretty-printed JSON
    #[serde(rename = "json")]
    Json,

    /// One row per domain: domain, private, country, nameservers
    #[default]
    #[serde(rename = "csv-summary", alias = "csv")]
    CsvSummary,

    /// One row per full registration record
    #[serde(rename = "csv-full")]
    CsvFull,
}

impl OutputFormat {
    /// Whether this format needs whole registration records collected.
    pub fn needs_full_results(&self) -> bool {
        matches!(self, OutputFormat::CsvFull)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" | "csv-summary" | "csv_summary" | "summary" => Ok(OutputFormat::CsvSummary),
            "csv-full" | "csv_full" | "full" => Ok(OutputFormat::CsvFull),
            other => Err(format!(
                "Unknown output format '{}'. Use json, csv-summary or csv-full",
                other
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::CsvSummary => write!(f, "csv-summary"),
            OutputFormat::CsvFull => write!(f, "csv-full"),
        }
    }
}

/// A contiguous slice of the ordered domain list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub size: usize,
}

impl Page {
    pub fn new(number: usize, size: usize) -> Self {
        Self { number, size }
    }

    /// Half-open index range `[size*number, size*(number+1))` covered by this page.
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = self.size.saturating_mul(self.number);
        let end = self.size.saturating_mul(self.number.saturating_add(1));
        start..end
    }
}

/// Configuration for one scan run.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Input document: a local path or an http(s) URL
    /// Default: "input.json"
    pub input: String,

    /// Separate rules file, used when the input is a CSV domain list
    /// Default: "rules.json"
    pub rules: Option<PathBuf>,

    /// Schema file overriding the embedded input schema
    pub schema: Option<PathBuf>,

    /// Page of the domain list to process (None = whole list)
    pub page: Option<Page>,

    /// Maximum lookups per rate-limit window
    /// Default: 50
    pub rate_limit_calls: u32,

    /// Length of the rate-limit window
    /// Default: 60 seconds
    pub rate_limit_period: Duration,

    /// Per-lookup timeout for the WHOIS client
    /// Default: 10 seconds
    pub lookup_timeout: Duration,

    /// Report format
    pub format: OutputFormat,

    /// Report destination (None = standard output)
    pub output: Option<PathBuf>,

    /// Collect full registration records for whole-result export
    pub record_full_results: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            input: "input.json".to_string(),
            rules: Some(PathBuf::from("rules.json")),
            schema: None,
            page: None,
            rate_limit_calls: 50,
            rate_limit_period: Duration::from_secs(60),
            lookup_timeout: Duration::from_secs(10),
            format: OutputFormat::default(),
            output: None,
            record_full_results: false,
        }
    }
}

impl ScanConfig {
    /// Restrict the run to one page of the domain list.
    pub fn with_page(mut self, number: usize, size: usize) -> Self {
        self.page = Some(Page::new(number, size));
        self
    }

    /// Set the rate limit to `calls` lookups per `period`.
    pub fn with_rate_limit(mut self, calls: u32, period: Duration) -> Self {
        self.rate_limit_calls = calls;
        self.rate_limit_period = period;
        self
    }

    /// Select the report format; whole-result mode follows it (on for CSV_FULL only).
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self.record_full_results = format.needs_full_results();
        self
    }

    pub fn with_input<I: Into<String>>(mut self, input: I) -> Self {
        self.input = input.into();
        self
    }

    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }
}
