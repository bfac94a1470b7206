//! Append-only result aggregation for a single run.
//!
//! A [`ResultStore`] is created empty by the scanner at the start of a run,
//! written by the lookup loop and read once by the output encoder. It exposes
//! no way to change or remove an entry after it has been recorded.

use crate::types::{Outcome, RegistrationRecord};
use serde::Serialize;
use std::collections::BTreeMap;

/// A domain bucketed by registrant country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SucceededEntry {
    pub domain: String,
    pub nameservers: Vec<String>,
}

/// A domain whose registrant matched a privacy term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlaggedEntry {
    pub domain: String,
    pub matched_term: String,
    pub nameservers: Vec<String>,
}

/// A domain whose lookup failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedEntry {
    pub domain: String,
    pub nameservers: Vec<String>,
}

/// Aggregation table for one scan run.
#[derive(Debug, Default)]
pub struct ResultStore {
    succeeded: BTreeMap<Option<String>, Vec<SucceededEntry>>,
    flagged: Vec<FlaggedEntry>,
    failed: BTreeMap<String, Vec<FailedEntry>>,
    full_results: Vec<RegistrationRecord>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a domain under its registrant country (`None` = unknown country).
    pub fn record_succeeded(
        &mut self,
        domain: &str,
        country: Option<&str>,
        nameservers: Vec<String>,
    ) {
        self.succeeded
            .entry(country.map(str::to_string))
            .or_default()
            .push(SucceededEntry {
                domain: domain.to_string(),
                nameservers,
            });
    }

    /// Record a privacy-flagged domain with the term that matched.
    pub fn record_flagged(&mut self, domain: &str, matched_term: &str, nameservers: Vec<String>) {
        self.flagged.push(FlaggedEntry {
            domain: domain.to_string(),
            matched_term: matched_term.to_string(),
            nameservers,
        });
    }

    /// Record a failed domain under its failure reason.
    pub fn record_failed(&mut self, domain: &str, reason: &str, nameservers: Vec<String>) {
        self.failed
            .entry(reason.to_string())
            .or_default()
            .push(FailedEntry {
                domain: domain.to_string(),
                nameservers,
            });
    }

    /// Record a full registration record for whole-result export.
    ///
    /// Independent of the three buckets above.
    pub fn record_full_result(&mut self, record: RegistrationRecord) {
        self.full_results.push(record);
    }

    /// Record a classified outcome in the matching bucket.
    pub fn record(&mut self, domain: &str, outcome: Outcome) {
        match outcome {
            Outcome::Succeeded {
                country,
                nameservers,
            } => self.record_succeeded(domain, country.as_deref(), nameservers),
            Outcome::Flagged {
                matched_term,
                nameservers,
            } => self.record_flagged(domain, &matched_term, nameservers),
            Outcome::Failed {
                reason,
                nameservers,
            } => self.record_failed(domain, &reason, nameservers),
        }
    }

    /// Number of failed domains across every failure reason.
    pub fn failed_count(&self) -> usize {
        self.failed.values().map(Vec::len).sum()
    }

    /// Number of succeeded domains across every country.
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.values().map(Vec::len).sum()
    }

    pub fn flagged_count(&self) -> usize {
        self.flagged.len()
    }

    /// Total outcomes recorded in the three buckets.
    pub fn outcome_count(&self) -> usize {
        self.succeeded_count() + self.flagged_count() + self.failed_count()
    }

    pub fn is_empty(&self) -> bool {
        self.outcome_count() == 0 && self.full_results.is_empty()
    }

    pub fn succeeded(&self) -> &BTreeMap<Option<String>, Vec<SucceededEntry>> {
        &self.succeeded
    }

    pub fn flagged(&self) -> &[FlaggedEntry] {
        &self.flagged
    }

    pub fn failed(&self) -> &BTreeMap<String, Vec<FailedEntry>> {
        &self.failed
    }

    pub fn full_results(&self) -> &[RegistrationRecord] {
        &self.full_results
    }

    /// Every domain with a recorded outcome, in bucket order
    /// (succeeded by country, then flagged, then failed by reason).
    pub fn domains(&self) -> Vec<&str> {
        let succeeded = self
            .succeeded
            .values()
            .flatten()
            .map(|entry| entry.domain.as_str());
        let flagged = self.flagged.iter().map(|entry| entry.domain.as_str());
        let failed = self
            .failed
            .values()
            .flatten()
            .map(|entry| entry.domain.as_str());
        succeeded.chain(flagged).chain(failed).collect()
    }
}
