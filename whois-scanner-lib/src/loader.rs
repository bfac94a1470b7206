//! Input loading and pagination.
//!
//! The input is either a JSON document (`domains` plus optional `terms`) that
//! must satisfy the published schema, or a CSV domain list with an `input_url`
//! (or `hostname`) column, in which case the rules come from a separate JSON
//! rules file. Both can be read from a local path or an http(s) URL.

use crate::error::ScannerError;
use crate::types::{ClassificationRules, DomainRecord, Page, ScanConfig};
use crate::utils::{is_remote_source, normalize_hostname};
use serde::Deserialize;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

/// Published schema for the JSON input document.
pub const INPUT_SCHEMA: &str = include_str!("../schema/input.schema.json");

/// Schema for the separate rules document used with CSV input.
pub const RULES_SCHEMA: &str = include_str!("../schema/rules.schema.json");

/// CSV columns accepted as the hostname column, in order of preference.
const HOSTNAME_COLUMNS: &[&str] = &["input_url", "hostname"];

/// The domains for the requested page together with the parsed rules.
#[derive(Debug, Clone)]
pub struct LoadedInput {
    pub domains: Vec<DomainRecord>,
    pub rules: ClassificationRules,
    /// Length of the whole domain list before pagination
    pub total: usize,
}

#[derive(Debug, Deserialize)]
struct InputDocument {
    domains: Vec<DomainRecord>,
    #[serde(default)]
    terms: ClassificationRules,
}

#[derive(Debug, Default, Deserialize)]
struct RulesDocument {
    #[serde(default)]
    terms: ClassificationRules,
}

/// Load the configured input, validate it and cut out the requested page.
///
/// # Errors
///
/// - `ScannerError::ConfigError` when the input, rules or schema file cannot be read
/// - `ScannerError::SchemaError` when a document fails validation
pub async fn load_input(config: &ScanConfig) -> Result<LoadedInput, ScannerError> {
    let text = read_source(&config.input, config.lookup_timeout).await?;

    let (domains, rules) = if is_csv_source(&config.input) {
        let domains = parse_domain_csv(&text)?;
        let rules = load_rules(config.rules.as_deref()).await?;
        (domains, rules)
    } else {
        let schema = load_schema(config.schema.as_deref()).await?;
        parse_input_document(&text, &schema)?
    };

    let total = domains.len();
    let domains = paginate(&domains, config.page);
    tracing::info!(
        "Loaded {} of {} domains from {} ({} exact terms, {} prefixes)",
        domains.len(),
        total,
        config.input,
        rules.exact_match.len(),
        rules.prefix.len()
    );

    Ok(LoadedInput {
        domains,
        rules,
        total,
    })
}

/// Return the half-open slice `[size*number, size*(number+1))` of `items`.
///
/// `None` returns the whole list. A page outside the list is empty, not an error.
pub fn paginate<T: Clone>(items: &[T], page: Option<Page>) -> Vec<T> {
    match page {
        None => items.to_vec(),
        Some(page) => {
            let range = page.range();
            let start = range.start.min(items.len());
            let end = range.end.min(items.len());
            items[start..end].to_vec()
        }
    }
}

/// Validate and parse a JSON input document.
pub fn parse_input_document(
    text: &str,
    schema: &Value,
) -> Result<(Vec<DomainRecord>, ClassificationRules), ScannerError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| ScannerError::schema(format!("input is not valid JSON: {}", e)))?;
    validate(&value, schema)?;

    let document: InputDocument =
        serde_json::from_value(value).map_err(|e| ScannerError::schema(e.to_string()))?;
    let domains = document
        .domains
        .into_iter()
        .map(|d| DomainRecord::new(normalize_hostname(&d.hostname)))
        .collect();

    Ok((domains, document.terms))
}

/// Parse a CSV domain list with a header row.
pub fn parse_domain_csv(text: &str) -> Result<Vec<DomainRecord>, ScannerError> {
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| ScannerError::schema(format!("cannot read CSV header: {}", e)))?
        .clone();

    let column = HOSTNAME_COLUMNS
        .iter()
        .find_map(|name| headers.iter().position(|h| h.trim() == *name))
        .ok_or_else(|| {
            ScannerError::schema(format!(
                "CSV input needs one of the columns: {}",
                HOSTNAME_COLUMNS.join(", ")
            ))
        })?;

    let mut domains = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(|e| ScannerError::schema(format!("row {}: {}", index + 1, e)))?;
        let hostname = row.get(column).unwrap_or_default();
        domains.push(DomainRecord::new(normalize_hostname(hostname)));
    }

    Ok(domains)
}

/// Load the rules document used alongside a CSV domain list.
///
/// No path, or a path that does not exist, means empty rules.
pub async fn load_rules(path: Option<&Path>) -> Result<ClassificationRules, ScannerError> {
    let Some(path) = path else {
        return Ok(ClassificationRules::default());
    };

    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!("No rules file at {}, using empty rules", path.display());
            return Ok(ClassificationRules::default());
        }
        Err(e) => return Err(ScannerError::config(path.display().to_string(), e.to_string())),
    };

    let value: Value = serde_json::from_str(&text)
        .map_err(|e| ScannerError::schema(format!("rules file is not valid JSON: {}", e)))?;
    validate(&value, &embedded_schema(RULES_SCHEMA)?)?;

    let document: RulesDocument =
        serde_json::from_value(value).map_err(|e| ScannerError::schema(e.to_string()))?;
    Ok(document.terms)
}

/// Load the input schema: the file at `path` when given, otherwise the embedded one.
pub async fn load_schema(path: Option<&Path>) -> Result<Value, ScannerError> {
    match path {
        None => embedded_schema(INPUT_SCHEMA),
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| ScannerError::config(path.display().to_string(), e.to_string()))?;
            serde_json::from_str(&text).map_err(|e| {
                ScannerError::invalid_settings(format!(
                    "schema file {} is not valid JSON: {}",
                    path.display(),
                    e
                ))
            })
        }
    }
}

fn embedded_schema(text: &str) -> Result<Value, ScannerError> {
    serde_json::from_str(text)
        .map_err(|e| ScannerError::invalid_settings(format!("embedded schema is invalid: {}", e)))
}

/// Validate a document against a JSON schema, reporting every violation.
pub fn validate(document: &Value, schema: &Value) -> Result<(), ScannerError> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| ScannerError::invalid_settings(format!("schema cannot be compiled: {}", e)))?;

    let problems: Vec<String> = validator
        .iter_errors(document)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{}: {}", path, e)
            }
        })
        .collect();

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ScannerError::schema(problems.join("; ")))
    }
}

fn is_csv_source(location: &str) -> bool {
    let path = location.split(['?', '#']).next().unwrap_or(location);
    path.to_lowercase().ends_with(".csv")
}

/// Read an input source into memory.
async fn read_source(location: &str, timeout: Duration) -> Result<String, ScannerError> {
    if is_remote_source(location) {
        fetch_remote(location, timeout).await
    } else {
        tokio::fs::read_to_string(location)
            .await
            .map_err(|e| ScannerError::config(location, e.to_string()))
    }
}

async fn fetch_remote(url: &str, timeout: Duration) -> Result<String, ScannerError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("whois-scanner/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ScannerError::config(url, format!("cannot create HTTP client: {}", e)))?;

    tracing::debug!("Fetching input from {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ScannerError::config(url, e.to_string()))?
        .error_for_status()
        .map_err(|e| ScannerError::config(url, e.to_string()))?;

    response
        .text()
        .await
        .map_err(|e| ScannerError::config(url, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EXIT_INPUT_UNREADABLE, EXIT_SCHEMA_INVALID};
    use std::io::Write;

    fn hostnames(domains: &[DomainRecord]) -> Vec<&str> {
        domains.iter().map(|d| d.hostname.as_str()).collect()
    }

    fn default_schema() -> Value {
        embedded_schema(INPUT_SCHEMA).unwrap()
    }

    #[test]
    fn test_paginate_without_page_returns_all() {
        let items = vec![1, 2, 3];
        assert_eq!(paginate(&items, None), vec![1, 2, 3]);
    }

    #[test]
    fn test_paginate_slices() {
        let items: Vec<u32> = (0..7).collect();
        assert_eq!(paginate(&items, Some(Page::new(0, 3))), vec![0, 1, 2]);
        assert_eq!(paginate(&items, Some(Page::new(2, 3))), vec![6]);
        assert!(paginate(&items, Some(Page::new(3, 3))).is_empty());
        assert!(paginate(&items, Some(Page::new(usize::MAX, 3))).is_empty());
    }

    #[test]
    fn test_pages_partition_the_list() {
        let items: Vec<u32> = (0..23).collect();
        for size in 1..=25 {
            let pages = items.len().div_ceil(size);
            let rebuilt: Vec<u32> = (0..pages)
                .flat_map(|n| paginate(&items, Some(Page::new(n, size))))
                .collect();
            assert_eq!(rebuilt, items, "page size {}", size);
        }
    }

    #[test]
    fn test_parse_input_document() {
        let text = r#"{
            "domains": [{"hostname": " a.test "}, {"hostname": "b.test"}, {"hostname": "a.test"}],
            "terms": {"exact_match": ["Foo"], "prefix": ["Ba"]}
        }"#;
        let (domains, rules) = parse_input_document(text, &default_schema()).unwrap();
        assert_eq!(hostnames(&domains), vec!["a.test", "b.test", "a.test"]);
        assert!(rules.exact_match.contains("Foo"));
        assert_eq!(rules.prefix, vec!["Ba"]);
    }

    #[test]
    fn test_terms_are_optional() {
        let (domains, rules) =
            parse_input_document(r#"{"domains": []}"#, &default_schema()).unwrap();
        assert!(domains.is_empty());
        assert!(rules.is_empty());
    }

    #[test]
    fn test_schema_violations() {
        let schema = default_schema();
        for text in [
            r#"{"terms": {}}"#,
            r#"{"domains": [{"host": "a.test"}]}"#,
            r#"{"domains": [{"hostname": 42}]}"#,
            r#"{"domains": [], "terms": {"exact_match": "Foo"}}"#,
            r#"{"domains": [], "terms": {"suffix": []}}"#,
            "not json",
        ] {
            let err = parse_input_document(text, &schema).unwrap_err();
            assert_eq!(err.exit_code(), EXIT_SCHEMA_INVALID, "{}", text);
        }
    }

    #[test]
    fn test_parse_domain_csv() {
        let text = "rank,input_url\n1,a.test\n2, b.test\n";
        let domains = parse_domain_csv(text).unwrap();
        assert_eq!(hostnames(&domains), vec!["a.test", "b.test"]);

        let domains = parse_domain_csv("hostname\nc.test\n").unwrap();
        assert_eq!(hostnames(&domains), vec!["c.test"]);
    }

    #[test]
    fn test_csv_without_hostname_column() {
        let err = tokio_test::assert_err!(parse_domain_csv("url\na.test\n"));
        assert_eq!(err.exit_code(), EXIT_SCHEMA_INVALID);
    }

    #[tokio::test]
    async fn test_missing_rules_file_means_empty_rules() {
        let dir = tempfile::tempdir().unwrap();
        let rules = load_rules(Some(&dir.path().join("rules.json"))).await;
        let rules = tokio_test::assert_ok!(rules);
        assert!(rules.is_empty());
        assert!(tokio_test::assert_ok!(load_rules(None).await).is_empty());
    }

    #[tokio::test]
    async fn test_load_rules_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"terms": {{"prefix": ["Privacy"]}}}}"#).unwrap();
        let rules = load_rules(Some(file.path())).await.unwrap();
        assert_eq!(rules.prefix, vec!["Privacy"]);
    }

    #[tokio::test]
    async fn test_schema_override_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_schema(Some(&dir.path().join("missing.json")))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT_UNREADABLE);

        let path = dir.path().join("schema.json");
        std::fs::write(&path, r#"{"type": "object", "required": ["hosts"]}"#).unwrap();
        let schema = load_schema(Some(&path)).await.unwrap();
        assert!(parse_input_document(r#"{"domains": []}"#, &schema).is_err());
    }

    #[test]
    fn test_is_csv_source() {
        assert!(is_csv_source("input.csv"));
        assert!(is_csv_source("https://example.test/list.CSV?token=1"));
        assert!(!is_csv_source("input.json"));
    }

    #[tokio::test]
    async fn test_load_input_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ScanConfig::default()
            .with_input(dir.path().join("input.json").display().to_string());
        let err = load_input(&config).await.unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT_UNREADABLE);
    }

    #[tokio::test]
    async fn test_load_input_pages_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"domains": [{{"hostname": "a.test"}}, {{"hostname": "b.test"}}, {{"hostname": "c.test"}}]}}"#
        )
        .unwrap();

        let config = ScanConfig::default()
            .with_input(file.path().display().to_string())
            .with_page(1, 2);
        let loaded = load_input(&config).await.unwrap();
        assert_eq!(hostnames(&loaded.domains), vec!["c.test"]);
        assert_eq!(loaded.total, 3);
    }
}
