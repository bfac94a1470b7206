//! Registration data clients.
//!
//! Only WHOIS is implemented, through the system's `whois` command.

/// WHOIS protocol implementation
pub mod whois;

pub use whois::{parse_whois_response, WhoisClient};
