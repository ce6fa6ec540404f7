//! Unified error handling.
//!
//! A `thiserror`-based model with:
//!   * Typed variants for the failure domains the engine actually meets
//!   * A categorization layer (`ErrorCategory`) for analytics & reporting
//!   * Helper constructors
//!   * Rate-limit classification used by the failover manager
//!
//! Design goals:
//!   * Keep caller-facing messages clear & actionable
//!   * Enable deterministic classification of probe/fetch failures
//!
//! Categories are intentionally coarse:
//!   - Input: configuration / unknown-identifier issues the caller can fix
//!   - Network: transient or remote-service problems
//!   - RateLimit: provider quota exhaustion (never fatal; triggers rotation)
//!   - Internal: logic bugs or unexpected states

use thiserror::Error;

/// High-level classification for metrics / structured reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Network,
    RateLimit,
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCategory::Input => "input",
            ErrorCategory::Network => "network",
            ErrorCategory::RateLimit => "rate_limit",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Primary library error type.
#[derive(Error, Debug)]
pub enum OriginScoutError {
    // ------------------------ Input / Configuration -------------------------
    #[error("unknown source: {source_id}")]
    UnknownSource { source_id: String },

    #[error("no credential configured for source: {source_id}")]
    NoCredentials { source_id: String },

    #[error("invalid credential for {source_id}: {reason}")]
    InvalidCredential { source_id: String, reason: String },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    // ----------------------------- Rate limit -------------------------------
    #[error("rate limit exceeded for source: {source_id}")]
    RateLimitExceeded { source_id: String },

    // ----------------------------- Network ----------------------------------
    #[error("validation probe for {source_id} failed: {reason}")]
    ProbeFailed { source_id: String, reason: String },

    #[error("validation probe for {source_id} timed out after {seconds}s")]
    ProbeTimeout { source_id: String, seconds: u64 },

    #[error("{source_id} service unavailable: {reason}")]
    ServiceUnavailable { source_id: String, reason: String },

    #[error("network error during {operation} for '{target}': {source}")]
    Network {
        operation: String,
        target: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ---------------------------- Internal ----------------------------------
    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl OriginScoutError {
    /// Categorize the error for structured output / metrics.
    pub fn category(&self) -> ErrorCategory {
        use OriginScoutError::*;
        match self {
            UnknownSource { .. }
            | NoCredentials { .. }
            | InvalidCredential { .. }
            | Configuration { .. } => ErrorCategory::Input,

            RateLimitExceeded { .. } => ErrorCategory::RateLimit,

            ProbeFailed { .. }
            | ProbeTimeout { .. }
            | ServiceUnavailable { .. }
            | Network { .. } => ErrorCategory::Network,

            Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Whether this error should be treated as a rate-limit condition.
    ///
    /// The typed variant always qualifies; any other error qualifies when its
    /// rendered message carries a rate-limit-shaped phrase, so errors produced
    /// by caller-supplied probes are classified the same way as built-in ones.
    pub fn is_rate_limit(&self) -> bool {
        if matches!(self, OriginScoutError::RateLimitExceeded { .. }) {
            return true;
        }
        let text = self.to_string().to_ascii_lowercase();
        RATE_LIMIT_PHRASES.iter().any(|p| text.contains(p))
    }

    // ---------------------------- Constructors -----------------------------

    pub fn unknown_source(source: impl Into<String>) -> Self {
        Self::UnknownSource {
            source_id: source.into(),
        }
    }

    pub fn no_credentials(source: impl Into<String>) -> Self {
        Self::NoCredentials {
            source_id: source.into(),
        }
    }

    pub fn invalid_credential(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCredential {
            source_id: source.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn rate_limited(source: impl Into<String>) -> Self {
        Self::RateLimitExceeded {
            source_id: source.into(),
        }
    }

    pub fn probe_failed(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            source_id: source.into(),
            reason: reason.into(),
        }
    }

    pub fn probe_timeout(source: impl Into<String>, seconds: u64) -> Self {
        Self::ProbeTimeout {
            source_id: source.into(),
            seconds,
        }
    }

    pub fn service_unavailable(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            source_id: source.into(),
            reason: reason.into(),
        }
    }

    pub fn network(
        operation: impl Into<String>,
        target: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Network {
            operation: operation.into(),
            target: target.into(),
            source: source.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }
}

/// Phrases (lowercase) that mark an error as rate-limit shaped.
const RATE_LIMIT_PHRASES: &[&str] = &["rate limit", "429", "too many requests", "quota exceeded"];

/// Free-function form of the rate-limit classifier, matching arbitrary
/// error values by their rendered text.
pub fn is_rate_limit_error(err: &(dyn std::error::Error + 'static)) -> bool {
    if let Some(e) = err.downcast_ref::<OriginScoutError>() {
        return e.is_rate_limit();
    }
    let text = err.to_string().to_ascii_lowercase();
    RATE_LIMIT_PHRASES.iter().any(|p| text.contains(p))
}

/// Public result alias.
pub type Result<T> = std::result::Result<T, OriginScoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_mapping() {
        assert_eq!(
            OriginScoutError::unknown_source("shodan").category(),
            ErrorCategory::Input
        );
        assert_eq!(
            OriginScoutError::no_credentials("censys").category(),
            ErrorCategory::Input
        );
        assert_eq!(
            OriginScoutError::rate_limited("shodan").category(),
            ErrorCategory::RateLimit
        );
        assert_eq!(
            OriginScoutError::probe_timeout("ct", 10).category(),
            ErrorCategory::Network
        );
        assert_eq!(
            OriginScoutError::internal("boom").category(),
            ErrorCategory::Internal
        );
    }

    #[test]
    fn display_snippets() {
        let e = OriginScoutError::probe_failed("securitytrails", "unexpected status 500");
        let s = e.to_string();
        assert!(s.contains("securitytrails"));
        assert!(s.contains("500"));

        let u = OriginScoutError::unknown_source("nosuch");
        assert!(u.to_string().contains("unknown source"));
    }

    #[test]
    fn rate_limit_detection() {
        assert!(OriginScoutError::rate_limited("shodan").is_rate_limit());
        assert!(OriginScoutError::probe_failed("shodan", "HTTP 429").is_rate_limit());
        assert!(OriginScoutError::probe_failed("ct", "Too Many Requests").is_rate_limit());
        assert!(OriginScoutError::configuration("quota exceeded for key").is_rate_limit());
        assert!(!OriginScoutError::probe_failed("ct", "connection refused").is_rate_limit());
        assert!(!OriginScoutError::unknown_source("x").is_rate_limit());
    }

    #[test]
    fn rate_limit_detection_foreign_errors() {
        let io_err = std::io::Error::other("rate limit exceeded");
        assert!(is_rate_limit_error(&io_err));

        let other = std::io::Error::other("network unreachable");
        assert!(!is_rate_limit_error(&other));
    }

    #[test]
    fn category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "rate_limit");
        assert_eq!(ErrorCategory::Input.to_string(), "input");
    }
}
