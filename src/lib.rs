//! OriginScout Library
//!
//! Passive intelligence aggregation for locating origin servers hiding
//! behind CDN/WAF fronting. This library provides functionality to:
//!
//! - Govern credential rotation and rate-limit failover across passive
//!   intelligence sources (Shodan, Censys, SecurityTrails, CT logs, ...)
//! - Validate source availability with pluggable async probes
//! - Merge raw per-source IP observations into a per-IP multi-source view
//! - Assign each candidate IP a multi-factor confidence score in [0, 1]
//!   and filter by a minimum-confidence threshold
//!
//! Fetching from the providers themselves, active scanning, and output
//! rendering are the caller's concern; this crate only gates credential
//! access and turns raw observations into a ranked candidate set.
//!
//! # Example
//!
//! ```rust,no_run
//! use originscout::aggregate::dedupe_by_ip;
//! use originscout::scoring::ConfidenceScorer;
//! use originscout::sources::PassiveIP;
//! use originscout::failover::FailoverManager;
//!
//! let manager = FailoverManager::new(true);
//! manager.register_source(originscout::sources::CT);
//!
//! // Observations gathered by per-source fetch tasks:
//! let observations = vec![
//!     PassiveIP::new("203.0.113.10", "ct"),
//!     PassiveIP::new("203.0.113.10", "shodan"),
//! ];
//!
//! let scorer = ConfidenceScorer::new("example.com", None);
//! let candidates = dedupe_by_ip(scorer.score_all(observations));
//! for candidate in candidates {
//!     println!("{} {:.2}", candidate.ip, candidate.confidence);
//! }
//! ```

// Re-export all modules for library use
pub mod aggregate;
pub mod config;
pub mod credentials;
pub mod domain_utils;
pub mod errors;
pub mod failover;
pub mod scoring;
pub mod sources;
pub mod validators;

// Re-export commonly used types and functions for convenience
pub use aggregate::{dedupe_by_ip, distinct_sources, group_by_ip};
pub use config::Config;
pub use credentials::Credential;
pub use errors::{ErrorCategory, OriginScoutError, Result};
pub use failover::{FailoverManager, SourceState, SourceStatus};
pub use scoring::{ConfidenceScorer, ScoringConfig};
pub use sources::PassiveIP;
pub use validators::{SourceValidator, ValidatorRegistry};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
