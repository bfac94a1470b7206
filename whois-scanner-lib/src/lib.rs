//! # WHOIS Scanner Library
//!
//! Batch WHOIS scanning: load a domain list, look each domain up under a
//! global rate limit, flag privacy-protected registrants, bucket the rest by
//! registrant country and render the aggregate as JSON or CSV.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use whois_scanner_lib::{OutputFormat, ScanConfig, Scanner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScanConfig::default()
//!         .with_input("input.json")
//!         .with_format(OutputFormat::Json);
//!     let run = Scanner::with_config(config).run().await?;
//!
//!     println!("{} domains failed", run.store.failed_count());
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! - **Input loading**: JSON document validated against the published schema,
//!   or a CSV domain list plus rules file, from disk or http(s); optional paging
//! - **Rate limiting**: at most N lookups in any window of T seconds
//! - **Lookup**: system `whois`, failures sorted into expected and fatal
//! - **Classification**: exact and prefix privacy terms, then registrant country
//! - **Output**: JSON, CSV summary or full-record CSV

// Re-export main public API types and functions
pub use config::{
    load_env_config, parse_duration_string, ConfigManager, EnvConfig, FileConfig,
};
pub use error::{ScannerError, WhoisError};
pub use lookup::{LookupOutcome, RegistrationLookup};
pub use rate_limit::RateLimiter;
pub use scanner::{ScanRun, Scanner, MAX_FAILED_EXIT_CODE};
pub use store::ResultStore;
pub use types::{
    ClassificationRules, DomainRecord, FailureKind, Outcome, OutputFormat, Page,
    RegistrationRecord, ScanConfig,
};

#[cfg(feature = "whois")]
pub use protocols::WhoisClient;

// Public modules
pub mod classifier;
pub mod error;
pub mod loader;
pub mod lookup;
pub mod output;
#[cfg(feature = "whois")]
pub mod protocols;
pub mod store;

// Internal modules - these are not part of the public API
mod config;
mod rate_limit;
mod scanner;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ScannerError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
