//! Report rendering.
//!
//! The result store is rendered once, after the lookup loop, in one of three
//! formats: the full bucket table as JSON, a one-row-per-domain CSV summary, or
//! a one-row-per-record CSV of whole registration records.

use crate::error::ScannerError;
use crate::store::{FailedEntry, FlaggedEntry, ResultStore, SucceededEntry};
use crate::types::OutputFormat;
use chrono::SecondsFormat;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Country cell for a succeeded domain without a registrant country.
pub const NO_COUNTRY: &str = "N/A";
/// Country cell for a privacy-flagged domain.
pub const PRIVACY_PROTECTED: &str = "Privacy Protected";
/// Country cell for a failed domain.
pub const FAILED: &str = "Failed";
/// Separator used when a nameserver list is rendered into one cell.
pub const NAMESERVER_SEPARATOR: &str = "|";

pub const CSV_SUMMARY_HEADER: [&str; 4] = ["domain", "private", "country", "nameservers"];

pub const CSV_FULL_HEADER: [&str; 8] = [
    "domain",
    "registrar",
    "registrant_name",
    "registrant_organization",
    "registrant_country",
    "creation_date",
    "expiration_date",
    "nameservers",
];

/// JSON shape of the report; field order is the top-level key order.
#[derive(Serialize)]
struct JsonReport<'a> {
    succeeded: BTreeMap<&'a str, Vec<&'a SucceededEntry>>,
    flagged: &'a [FlaggedEntry],
    failed: &'a BTreeMap<String, Vec<FailedEntry>>,
}

impl<'a> JsonReport<'a> {
    fn from_store(store: &'a ResultStore) -> Self {
        let mut succeeded: BTreeMap<&str, Vec<&SucceededEntry>> = BTreeMap::new();
        for (country, entries) in store.succeeded() {
            succeeded
                .entry(country.as_deref().unwrap_or(NO_COUNTRY))
                .or_default()
                .extend(entries.iter());
        }

        Self {
            succeeded,
            flagged: store.flagged(),
            failed: store.failed(),
        }
    }
}

/// Render the store in the given format into `writer`.
pub fn encode<W: Write>(
    store: &ResultStore,
    format: OutputFormat,
    writer: &mut W,
) -> Result<(), ScannerError> {
    match format {
        OutputFormat::Json => write_json(store, writer),
        OutputFormat::CsvSummary => write_csv_summary(store, writer),
        OutputFormat::CsvFull => write_csv_full(store, writer),
    }
}

/// Render the store to a file, or to standard output when no path is given.
///
/// The destination is opened only here, written in full, flushed and closed.
pub fn write_report(
    store: &ResultStore,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<(), ScannerError> {
    match output {
        Some(path) => {
            let target = path.display().to_string();
            let file = File::create(path)
                .map_err(|e| ScannerError::output(&target, format!("cannot create file: {}", e)))?;
            let mut writer = BufWriter::new(file);
            encode(store, format, &mut writer)?;
            writer
                .flush()
                .map_err(|e| ScannerError::output(&target, e.to_string()))
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            encode(store, format, &mut writer)?;
            writer
                .flush()
                .map_err(|e| ScannerError::output("stdout", e.to_string()))
        }
    }
}

/// Full bucket table, pretty-printed with 4-space indentation.
pub fn write_json<W: Write>(store: &ResultStore, writer: &mut W) -> Result<(), ScannerError> {
    let report = JsonReport::from_store(store);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut *writer, formatter);
    report
        .serialize(&mut serializer)
        .map_err(|e| ScannerError::output("json encoder", e.to_string()))?;
    writer
        .write_all(b"\n")
        .map_err(|e| ScannerError::output("json encoder", e.to_string()))
}

/// One row per recorded domain: `domain, private, country, nameservers`.
pub fn write_csv_summary<W: Write>(
    store: &ResultStore,
    writer: &mut W,
) -> Result<(), ScannerError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(CSV_SUMMARY_HEADER)?;

    for (country, entries) in store.succeeded() {
        let country = country.as_deref().unwrap_or(NO_COUNTRY);
        for entry in entries {
            csv_writer.write_record([
                entry.domain.as_str(),
                "false",
                country,
                join_nameservers(&entry.nameservers).as_str(),
            ])?;
        }
    }

    for entry in store.flagged() {
        csv_writer.write_record([
            entry.domain.as_str(),
            "true",
            PRIVACY_PROTECTED,
            join_nameservers(&entry.nameservers).as_str(),
        ])?;
    }

    for entries in store.failed().values() {
        for entry in entries {
            csv_writer.write_record([
                entry.domain.as_str(),
                "false",
                FAILED,
                join_nameservers(&entry.nameservers).as_str(),
            ])?;
        }
    }

    csv_writer
        .flush()
        .map_err(|e| ScannerError::output("csv writer", e.to_string()))
}

/// One row per full registration record (whole-result mode).
pub fn write_csv_full<W: Write>(store: &ResultStore, writer: &mut W) -> Result<(), ScannerError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(CSV_FULL_HEADER)?;

    for record in store.full_results() {
        let creation_date = record
            .creation_date
            .map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default();
        let expiration_date = record
            .expiration_date
            .map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default();

        csv_writer.write_record([
            record.domain.as_str(),
            record.registrar.as_deref().unwrap_or(""),
            record.registrant_name.as_deref().unwrap_or(""),
            record.registrant_org.as_deref().unwrap_or(""),
            record.registrant_country.as_deref().unwrap_or(""),
            creation_date.as_str(),
            expiration_date.as_str(),
            join_nameservers(&record.nameservers).as_str(),
        ])?;
    }

    csv_writer
        .flush()
        .map_err(|e| ScannerError::output("csv writer", e.to_string()))
}

/// Join nameservers into one cell; empty string when there are none.
pub fn join_nameservers(nameservers: &[String]) -> String {
    nameservers.join(NAMESERVER_SEPARATOR)
}
