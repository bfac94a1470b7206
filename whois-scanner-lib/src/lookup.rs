//! Lookup adapter.
//!
//! Wraps a [`RegistrationLookup`] client and folds whatever it returns into a
//! [`LookupOutcome`]: a record, an expected per-domain failure the loop absorbs,
//! or a fatal error that ends the run.

use crate::error::{ScannerError, WhoisError};
use crate::types::{FailureKind, RegistrationRecord};
use std::future::Future;

/// Failure reason recorded when the registry has no such registration.
pub const HOSTNAME_DOES_NOT_EXIST: &str = "Hostname does not exist";

/// A source of registration data for single hostnames.
///
/// [`crate::protocols::WhoisClient`] is the production implementation; tests
/// substitute canned responses.
pub trait RegistrationLookup {
    fn lookup(
        &self,
        hostname: &str,
    ) -> impl Future<Output = Result<RegistrationRecord, WhoisError>>;
}

/// Result of one adapted lookup.
#[derive(Debug)]
pub enum LookupOutcome {
    Success(RegistrationRecord),

    /// Absorbed into the Failed bucket; the loop continues
    ExpectedFailure(FailureKind, String),

    /// Aborts the run
    Fatal(ScannerError),
}

/// Sort a client result into success, expected failure or fatal error.
pub fn normalize(hostname: &str, result: Result<RegistrationRecord, WhoisError>) -> LookupOutcome {
    match result {
        Ok(record) => LookupOutcome::Success(record),
        Err(WhoisError::NoMatch { .. }) => LookupOutcome::ExpectedFailure(
            FailureKind::NotFound,
            HOSTNAME_DOES_NOT_EXIST.to_string(),
        ),
        Err(WhoisError::Protocol { message, .. }) => {
            LookupOutcome::ExpectedFailure(FailureKind::LookupError, message)
        }
        Err(WhoisError::Unexpected { message, .. }) => {
            LookupOutcome::Fatal(ScannerError::unexpected(hostname, message))
        }
    }
}

/// Look up one hostname and normalize the result.
pub async fn lookup_domain<L: RegistrationLookup>(client: &L, hostname: &str) -> LookupOutcome {
    let result = client.lookup(hostname).await;
    normalize(hostname, result)
}
