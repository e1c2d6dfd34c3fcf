//! Connection failure and suspension reasons.

use std::fmt;
use thiserror::Error;

/// Reason code reported when a connection attempt fails or a suspended
/// connection is given up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCode {
    /// The peer or the transport service could not be reached.
    Unreachable,
    /// The attempt did not complete in time.
    Timeout,
    /// The transport API is not available on this device.
    ApiUnavailable,
    /// Unexpected transport-internal error.
    Internal,
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unreachable => "unreachable",
            Self::Timeout => "timeout",
            Self::ApiUnavailable => "api unavailable",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// A failed connection, with its reason code and a human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ConnectionFailure {
    /// Reason code
    pub code: FailureCode,
    /// Detail for logs
    pub message: String,
}

impl ConnectionFailure {
    /// Create a failure with the given code and detail.
    pub fn new(code: FailureCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Failure for an attempt that exceeded its deadline.
    pub fn timeout() -> Self {
        Self::new(FailureCode::Timeout, "connection attempt timed out")
    }
}

/// Why a connected transport was interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuspendCause {
    /// The transport service process went away.
    ServiceDisconnected,
    /// The link to the peer was lost.
    NetworkLost,
}

impl fmt::Display for SuspendCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServiceDisconnected => f.write_str("service disconnected"),
            Self::NetworkLost => f.write_str("network lost"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_display_includes_code() {
        let failure = ConnectionFailure::new(FailureCode::Unreachable, "no companion paired");
        assert_eq!(failure.to_string(), "unreachable: no companion paired");
    }

    #[test]
    fn timeout_helper() {
        assert_eq!(ConnectionFailure::timeout().code, FailureCode::Timeout);
    }
}
