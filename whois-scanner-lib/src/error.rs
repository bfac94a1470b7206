//! Error handling for scan runs.
//!
//! Two error types live here. [`ScannerError`] is what a run can fail with and
//! carries the process exit code each failure maps to. [`WhoisError`] is what the
//! WHOIS client reports for a single lookup; the lookup adapter sorts it into an
//! expected per-domain failure or a fatal error.

use std::fmt;

/// Exit code for an input source that cannot be read.
pub const EXIT_INPUT_UNREADABLE: i32 = -1;
/// Exit code for an input document that fails schema validation.
pub const EXIT_SCHEMA_INVALID: i32 = -2;
/// Exit code for a report that could not be written.
pub const EXIT_OUTPUT_FAILED: i32 = -4;
/// Exit code for configuration values that cannot be honored.
pub const EXIT_INVALID_SETTINGS: i32 = -5;
/// Exit code for an unexpected failure in the middle of the lookup loop.
pub const EXIT_UNEXPECTED: i32 = -100;

/// Main error type for scan runs.
///
/// Per-domain lookup failures never show up here: they are absorbed into the
/// result store. Every variant of this enum terminates a run.
#[derive(Debug, Clone)]
pub enum ScannerError {
    /// The input source (or rules file) could not be read
    ConfigError {
        source_name: String,
        message: String,
    },

    /// The input document does not satisfy the published schema
    SchemaError {
        message: String,
    },

    /// Settings from the config file, environment or CLI cannot be used
    InvalidSettings {
        message: String,
    },

    /// Anything not recognized as an expected per-domain failure
    Unexpected {
        hostname: Option<String>,
        message: String,
    },

    /// The report could not be rendered or written
    OutputError {
        target: String,
        message: String,
    },
}

impl ScannerError {
    /// Create a new input-unreadable error.
    pub fn config<S: Into<String>, M: Into<String>>(source_name: S, message: M) -> Self {
        Self::ConfigError {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a new schema validation error.
    pub fn schema<M: Into<String>>(message: M) -> Self {
        Self::SchemaError {
            message: message.into(),
        }
    }

    /// Create a new invalid settings error.
    pub fn invalid_settings<M: Into<String>>(message: M) -> Self {
        Self::InvalidSettings {
            message: message.into(),
        }
    }

    /// Create a new unexpected error tied to the hostname being processed.
    pub fn unexpected<H: Into<String>, M: Into<String>>(hostname: H, message: M) -> Self {
        Self::Unexpected {
            hostname: Some(hostname.into()),
            message: message.into(),
        }
    }

    /// Create a new output error.
    pub fn output<T: Into<String>, M: Into<String>>(target: T, message: M) -> Self {
        Self::OutputError {
            target: target.into(),
            message: message.into(),
        }
    }

    /// The reserved process exit code for this failure.
    ///
    /// All codes are negative so they can never collide with a failed-domain count.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigError { .. } => EXIT_INPUT_UNREADABLE,
            Self::SchemaError { .. } => EXIT_SCHEMA_INVALID,
            Self::OutputError { .. } => EXIT_OUTPUT_FAILED,
            Self::InvalidSettings { .. } => EXIT_INVALID_SETTINGS,
            Self::Unexpected { .. } => EXIT_UNEXPECTED,
        }
    }

    /// Whether the run failed before any lookup was attempted.
    pub fn is_pre_loop(&self) -> bool {
        matches!(
            self,
            Self::ConfigError { .. } | Self::SchemaError { .. } | Self::InvalidSettings { .. }
        )
    }
}

impl fmt::Display for ScannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError {
                source_name,
                message,
            } => {
                write!(f, "Failed to read input '{}': {}", source_name, message)
            }
            Self::SchemaError { message } => {
                write!(f, "Bad input file: {}", message)
            }
            Self::InvalidSettings { message } => {
                write!(f, "Invalid settings: {}", message)
            }
            Self::Unexpected { hostname, message } => {
                if let Some(hostname) = hostname {
                    write!(f, "Unexpected error while processing '{}': {}", hostname, message)
                } else {
                    write!(f, "Unexpected error: {}", message)
                }
            }
            Self::OutputError { target, message } => {
                write!(f, "Failed to write output to {}: {}", target, message)
            }
        }
    }
}

impl std::error::Error for ScannerError {}

impl From<csv::Error> for ScannerError {
    fn from(err: csv::Error) -> Self {
        Self::output("csv writer", err.to_string())
    }
}

/// Failure reported by a WHOIS client for a single hostname.
#[derive(Debug, Clone, PartialEq)]
pub enum WhoisError {
    /// The registry answered that no such registration exists
    NoMatch {
        hostname: String,
        message: String,
    },

    /// The registry answered, but not with something usable
    /// (timeout, throttling notice, unparseable text, invalid name)
    Protocol {
        hostname: String,
        message: String,
    },

    /// The lookup machinery itself broke (e.g. no whois executable)
    Unexpected {
        hostname: String,
        message: String,
    },
}

impl WhoisError {
    /// Create a new no-match error.
    pub fn no_match<H: Into<String>, M: Into<String>>(hostname: H, message: M) -> Self {
        Self::NoMatch {
            hostname: hostname.into(),
            message: message.into(),
        }
    }

    /// Create a new protocol error.
    pub fn protocol<H: Into<String>, M: Into<String>>(hostname: H, message: M) -> Self {
        Self::Protocol {
            hostname: hostname.into(),
            message: message.into(),
        }
    }

    /// Create a new unexpected error.
    pub fn unexpected<H: Into<String>, M: Into<String>>(hostname: H, message: M) -> Self {
        Self::Unexpected {
            hostname: hostname.into(),
            message: message.into(),
        }
    }

    /// The message as reported by the downstream client, without decoration.
    pub fn message(&self) -> &str {
        match self {
            Self::NoMatch { message, .. }
            | Self::Protocol { message, .. }
            | Self::Unexpected { message, .. } => message,
        }
    }
}

impl fmt::Display for WhoisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatch { hostname, message } => {
                write!(f, "No registration for '{}': {}", hostname, message)
            }
            Self::Protocol { hostname, message } => {
                write!(f, "WHOIS error for '{}': {}", hostname, message)
            }
            Self::Unexpected { hostname, message } => {
                write!(f, "WHOIS client failure for '{}': {}", hostname, message)
            }
        }
    }
}

impl std::error::Error for WhoisError {}
