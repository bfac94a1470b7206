// whois-scanner-lib/tests/integration.rs

//! End-to-end runs through the public API with a canned lookup client.

use std::collections::HashMap;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use whois_scanner_lib::error::EXIT_UNEXPECTED;
use whois_scanner_lib::{
    OutputFormat, RegistrationLookup, RegistrationRecord, ScanConfig, Scanner, WhoisError,
    MAX_FAILED_EXIT_CODE,
};

/// Lookup client answering from a fixed table; unknown hosts are "No match".
#[derive(Default)]
struct CannedLookup {
    records: HashMap<&'static str, RegistrationRecord>,
    errors: HashMap<&'static str, WhoisError>,
}

impl CannedLookup {
    fn record(mut self, hostname: &'static str, name: Option<&str>, country: Option<&str>) -> Self {
        let mut record = RegistrationRecord::new(hostname);
        record.registrant_name = name.map(str::to_string);
        record.registrant_country = country.map(str::to_string);
        record.nameservers = vec!["ns1.test".to_string(), "ns2.test".to_string()];
        self.records.insert(hostname, record);
        self
    }

    fn error(mut self, hostname: &'static str, error: WhoisError) -> Self {
        self.errors.insert(hostname, error);
        self
    }
}

impl RegistrationLookup for CannedLookup {
    async fn lookup(&self, hostname: &str) -> Result<RegistrationRecord, WhoisError> {
        if let Some(error) = self.errors.get(hostname) {
            return Err(error.clone());
        }
        self.records
            .get(hostname)
            .cloned()
            .ok_or_else(|| WhoisError::no_match(hostname, format!("No match for \"{}\"", hostname)))
    }
}

const INPUT: &str = r#"{
    "domains": [
        {"hostname": "plain.test"},
        {"hostname": "exact.test"},
        {"hostname": "prefixed.test"},
        {"hostname": "nocountry.test"},
        {"hostname": "missing.test"},
        {"hostname": "flaky.test"}
    ],
    "terms": {"exact_match": ["Foo"], "prefix": ["Ba"]}
}"#;

fn canned() -> CannedLookup {
    CannedLookup::default()
        .record("plain.test", Some("Jane Doe"), Some("US"))
        .record("exact.test", Some("Foo"), Some("US"))
        .record("prefixed.test", Some("Bar Privacy Ltd"), Some("IS"))
        .record("nocountry.test", None, None)
        .error("flaky.test", WhoisError::protocol("flaky.test", "Connection reset by peer"))
}

fn setup(input: &str) -> (TempDir, ScanConfig) {
    let dir = TempDir::new().unwrap();
    let input_path = dir.path().join("input.json");
    fs::write(&input_path, input).unwrap();
    let config = ScanConfig::default()
        .with_input(input_path.display().to_string())
        .with_rate_limit(100, Duration::from_secs(1));
    (dir, config)
}

#[tokio::test]
async fn test_full_run_csv_summary() {
    let (dir, config) = setup(INPUT);
    let output = dir.path().join("report.csv");
    let config = config.with_output(Some(output.clone()));

    let run = Scanner::with_lookup(config, canned()).run().await.unwrap();
    assert!(run.is_complete());
    assert_eq!(run.store.outcome_count(), 6);
    assert_eq!(run.exit_code(), 2);

    let report = fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(
        lines,
        vec![
            "domain,private,country,nameservers",
            "nocountry.test,false,N/A,ns1.test|ns2.test",
            "plain.test,false,US,ns1.test|ns2.test",
            "exact.test,true,Privacy Protected,ns1.test|ns2.test",
            "prefixed.test,true,Privacy Protected,ns1.test|ns2.test",
            "flaky.test,false,Failed,",
            "missing.test,false,Failed,",
        ]
    );
}

#[tokio::test]
async fn test_full_run_json_buckets() {
    let (dir, config) = setup(INPUT);
    let output = dir.path().join("report.json");
    let config = config
        .with_format(OutputFormat::Json)
        .with_output(Some(output.clone()));

    Scanner::with_lookup(config, canned()).run().await.unwrap();

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(report["succeeded"]["US"][0]["domain"], "plain.test");
    assert_eq!(report["succeeded"]["N/A"][0]["domain"], "nocountry.test");
    assert_eq!(report["flagged"][0]["matched_term"], "Foo");
    assert_eq!(report["flagged"][1]["matched_term"], "prefix:Ba");
    assert_eq!(
        report["failed"]["Hostname does not exist"][0]["domain"],
        "missing.test"
    );
    assert_eq!(
        report["failed"]["Connection reset by peer"][0]["domain"],
        "flaky.test"
    );
}

#[tokio::test]
async fn test_csv_full_exports_whole_records() {
    let (dir, config) = setup(INPUT);
    let output = dir.path().join("full.csv");
    let config = config
        .with_format(OutputFormat::CsvFull)
        .with_output(Some(output.clone()));

    Scanner::with_lookup(config, canned()).run().await.unwrap();

    let report = fs::read_to_string(&output).unwrap();
    // Header plus one row per successful lookup
    assert_eq!(report.lines().count(), 5);
    assert!(report.contains("prefixed.test,,Bar Privacy Ltd,,IS,,,ns1.test|ns2.test"));
}

#[tokio::test]
async fn test_pages_cover_every_domain_once() {
    let (_dir, config) = setup(INPUT);
    let mut seen = Vec::new();

    for page in 0..3 {
        let config = config.clone().with_page(page, 2);
        let scanner = Scanner::with_lookup(config, canned());
        let loaded = whois_scanner_lib::loader::load_input(scanner.config())
            .await
            .unwrap();
        seen.extend(loaded.domains.into_iter().map(|d| d.hostname));
    }

    assert_eq!(
        seen,
        vec![
            "plain.test",
            "exact.test",
            "prefixed.test",
            "nocountry.test",
            "missing.test",
            "flaky.test"
        ]
    );
}

#[tokio::test]
async fn test_fatal_error_stops_run_without_report() {
    let input = r#"{"domains": [
        {"hostname": "a.test"}, {"hostname": "b.test"},
        {"hostname": "c.test"}, {"hostname": "d.test"}
    ]}"#;
    let (dir, config) = setup(input);
    let output = dir.path().join("report.csv");
    let config = config.with_output(Some(output.clone()));

    let lookup = CannedLookup::default()
        .record("a.test", None, Some("US"))
        .record("b.test", None, Some("DE"))
        .record("d.test", None, Some("FR"))
        .error("c.test", WhoisError::unexpected("c.test", "whois: command not found"));

    let run = Scanner::with_lookup(config, lookup).run().await.unwrap();
    assert_eq!(run.exit_code(), EXIT_UNEXPECTED);
    assert_eq!(run.store.domains(), vec!["b.test", "a.test"]);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_many_failures_keep_a_nonzero_exit_code() {
    let hostnames: Vec<String> = (0..256)
        .map(|i| format!("{{\"hostname\": \"gone{}.test\"}}", i))
        .collect();
    let input = format!("{{\"domains\": [{}]}}", hostnames.join(", "));
    let (dir, config) = setup(&input);
    let output = dir.path().join("report.csv");
    let config = config
        .with_rate_limit(1000, Duration::from_secs(1))
        .with_output(Some(output.clone()));

    let run = Scanner::with_lookup(config, CannedLookup::default())
        .run()
        .await
        .unwrap();
    assert_eq!(run.store.failed_count(), 256);
    assert_eq!(run.exit_code(), MAX_FAILED_EXIT_CODE);

    let report = fs::read_to_string(&output).unwrap();
    assert_eq!(report.lines().count(), 257);
}

#[tokio::test]
async fn test_schema_failure_is_reported_before_lookups() {
    let (_dir, config) = setup(r#"{"domains": "a.test"}"#);
    let err = Scanner::with_lookup(config, canned()).run().await.unwrap_err();
    assert_eq!(err.exit_code(), -2);
}
