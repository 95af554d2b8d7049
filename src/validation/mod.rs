use std::net::IpAddr;

use thiserror::Error;

/// Validation failures for a raw address input value.
///
/// These are local and synchronous. A value that fails validation is never
/// submitted to the lookup collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("IP address is required")]
    Required,

    #[error("Invalid IP address format")]
    InvalidFormat,
}

impl ValidationError {
    /// Stable label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::InvalidFormat => "invalid_format",
        }
    }
}

/// Parse a raw input value as an IPv4 or IPv6 literal.
///
/// Emptiness is checked first, format second; exactly one error is surfaced
/// at a time. Whitespace-only input counts as empty.
pub fn parse_ip(raw: &str) -> Result<IpAddr, ValidationError> {
    if raw.trim().is_empty() {
        return Err(ValidationError::Required);
    }
    raw.parse::<IpAddr>()
        .map_err(|_| ValidationError::InvalidFormat)
}
