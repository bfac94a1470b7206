//! Scan run orchestration.
//!
//! A [`Scanner`] drives one run: load the input, then for each domain wait on
//! the rate limiter, look the domain up, classify it and record the outcome.
//! The report is rendered once after the loop.

use crate::classifier::{classify, normalize_nameservers};
use crate::error::ScannerError;
use crate::loader::{load_input, LoadedInput};
use crate::lookup::{lookup_domain, LookupOutcome, RegistrationLookup};
use crate::output::write_report;
use crate::rate_limit::RateLimiter;
use crate::store::ResultStore;
use crate::types::{ClassificationRules, DomainRecord, Outcome, ScanConfig};

#[cfg(feature = "whois")]
use crate::protocols::WhoisClient;

/// Progress is logged every this many hosts.
const PROGRESS_INTERVAL: usize = 10;

/// Highest exit code reported for failed domains. Process exit statuses keep
/// only the low byte, so larger counts must not wrap to 0 or into the negative
/// codes (156, 251..=255).
pub const MAX_FAILED_EXIT_CODE: i32 = 127;

/// What the lookup loop produced.
///
/// `fatal` is set when an unexpected failure stopped the loop; `store` then
/// holds exactly the domains processed before it.
#[derive(Debug)]
pub struct ScanRun {
    pub store: ResultStore,
    pub fatal: Option<ScannerError>,
    /// Domains in the page being processed
    pub requested: usize,
}

impl ScanRun {
    /// Process exit code for this run: the failed-domain count (capped at
    /// [`MAX_FAILED_EXIT_CODE`]), or the fatal error's reserved negative code.
    pub fn exit_code(&self) -> i32 {
        match &self.fatal {
            Some(err) => err.exit_code(),
            None => i32::try_from(self.store.failed_count())
                .unwrap_or(i32::MAX)
                .min(MAX_FAILED_EXIT_CODE),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.fatal.is_none()
    }
}

/// Drives scan runs against a registration lookup client.
///
/// # Example
///
/// ```rust,no_run
/// use whois_scanner_lib::{ScanConfig, Scanner};
///
/// #[tokio::main]
/// async fn main() {
///     let scanner = Scanner::with_config(ScanConfig::default().with_page(0, 100));
///     match scanner.run().await {
///         Ok(run) => std::process::exit(run.exit_code()),
///         Err(e) => std::process::exit(e.exit_code()),
///     }
/// }
/// ```
pub struct Scanner<L> {
    config: ScanConfig,
    client: L,
}

#[cfg(feature = "whois")]
impl Scanner<WhoisClient> {
    /// Create a scanner with default configuration using the system `whois`.
    pub fn new() -> Self {
        Self::with_config(ScanConfig::default())
    }

    /// Create a scanner using the system `whois` with the configured timeout.
    pub fn with_config(config: ScanConfig) -> Self {
        let client = WhoisClient::with_timeout(config.lookup_timeout);
        Self { config, client }
    }
}

#[cfg(feature = "whois")]
impl Default for Scanner<WhoisClient> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: RegistrationLookup> Scanner<L> {
    /// Create a scanner with a custom lookup client.
    pub fn with_lookup(config: ScanConfig, client: L) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Run a complete scan: load, look up every domain, write the report.
    ///
    /// # Errors
    ///
    /// Pre-loop failures (unreadable input, schema violations, unusable rate
    /// limit) and a failed report write are returned as errors. An unexpected
    /// failure inside the loop is returned in [`ScanRun::fatal`] instead, and
    /// no report is written for that run.
    pub async fn run(&self) -> Result<ScanRun, ScannerError> {
        let mut limiter =
            RateLimiter::new(self.config.rate_limit_calls, self.config.rate_limit_period)?;
        let LoadedInput { domains, rules, .. } = load_input(&self.config).await?;

        let run = self.scan(&domains, &rules, &mut limiter).await;
        if let Some(err) = &run.fatal {
            tracing::error!("{}", err);
            return Ok(run);
        }

        write_report(&run.store, self.config.format, self.config.output.as_deref())?;
        Ok(run)
    }

    /// Look up and classify each domain in order, recording into a fresh store.
    pub async fn scan(
        &self,
        domains: &[DomainRecord],
        rules: &ClassificationRules,
        limiter: &mut RateLimiter,
    ) -> ScanRun {
        let mut store = ResultStore::new();
        let total = domains.len();
        tracing::info!("Begin whois lookup for {} hostnames", total);

        for (index, domain) in domains.iter().enumerate() {
            if index % PROGRESS_INTERVAL == 0 {
                tracing::info!(
                    "Processing host [{} of {}] (will output every {})",
                    index,
                    total,
                    PROGRESS_INTERVAL
                );
            }

            let hostname = domain.hostname.as_str();
            let waited = limiter.acquire().await;
            if !waited.is_zero() {
                tracing::debug!("Waited {:?} for rate limit before {}", waited, hostname);
            }

            tracing::debug!("Looking up hostname {}", hostname);
            match lookup_domain(&self.client, hostname).await {
                LookupOutcome::Success(mut record) => {
                    record.nameservers = normalize_nameservers(&record.nameservers);
                    let outcome = classify(&record, rules);
                    if self.config.record_full_results {
                        store.record_full_result(record);
                    }
                    store.record(hostname, outcome);
                }
                LookupOutcome::ExpectedFailure(kind, message) => {
                    tracing::warn!("Hostname {} was marked failed ({}): {}", hostname, kind, message);
                    store.record(
                        hostname,
                        Outcome::Failed {
                            reason: message,
                            nameservers: Vec::new(),
                        },
                    );
                }
                LookupOutcome::Fatal(err) => {
                    return ScanRun {
                        store,
                        fatal: Some(err),
                        requested: total,
                    };
                }
            }
        }

        tracing::info!(
            "Finished {} hostnames: {} succeeded, {} flagged, {} failed",
            total,
            store.succeeded_count(),
            store.flagged_count(),
            store.failed_count()
        );

        ScanRun {
            store,
            fatal: None,
            requested: total,
        }
    }
}
