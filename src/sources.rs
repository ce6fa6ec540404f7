//! Passive source identifiers and the per-source observation record.
//!
//! Source identifiers are stable lowercase strings shared by the credential
//! store, the status registry, the scorer's weight table and
//! [`PassiveIP::source`]. New providers only need a new constant here plus a
//! weight entry in the scoring defaults.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shodan internet-wide scan index (API key).
pub const SHODAN: &str = "shodan";
/// Censys host search (API ID + secret pair).
pub const CENSYS: &str = "censys";
/// SecurityTrails passive DNS (API key).
pub const SECURITYTRAILS: &str = "securitytrails";
/// VirusTotal domain resolutions (API key).
pub const VIRUSTOTAL: &str = "virustotal";
/// ZoomEye scan index (API key).
pub const ZOOMEYE: &str = "zoomeye";
/// Certificate-transparency logs via crt.sh (no credential).
pub const CT: &str = "ct";
/// Direct DNS record collection (no credential).
pub const DNS: &str = "dns";
/// ViewDNS reverse-IP lookups (free service).
pub const VIEWDNS: &str = "viewdns";
/// DNSDumpster domain mapping (free service).
pub const DNSDUMPSTER: &str = "dnsdumpster";
/// Wayback Machine historical snapshots (free service).
pub const WAYBACK: &str = "wayback";

/// Every source this crate knows how to validate and score.
pub const KNOWN_SOURCES: &[&str] = &[
    SHODAN,
    CENSYS,
    SECURITYTRAILS,
    VIRUSTOTAL,
    ZOOMEYE,
    CT,
    DNS,
    VIEWDNS,
    DNSDUMPSTER,
    WAYBACK,
];

/// Sources that cannot run without a configured credential.
pub const KEYED_SOURCES: &[&str] = &[SHODAN, CENSYS, SECURITYTRAILS, VIRUSTOTAL, ZOOMEYE];

pub fn is_known(source: &str) -> bool {
    KNOWN_SOURCES.contains(&source)
}

pub fn requires_credential(source: &str) -> bool {
    KEYED_SOURCES.contains(&source)
}

// Metadata keys the scorer inspects. Fetchers populate whichever they can.
pub const META_REVERSE_DNS: &str = "reverse_dns";
pub const META_PTR_RECORD: &str = "ptr_record";
pub const META_ASN: &str = "asn";
pub const META_WHOIS_ORG: &str = "whois_org";
pub const META_COUNTRY_CODE: &str = "country_code";
pub const META_HOSTING_PROVIDER: &str = "hosting_provider";
pub const META_ORGANIZATION: &str = "organization";

/// One observation of a candidate origin IP from one source.
///
/// Multiple observations may share the same `ip` (one per source); they are
/// never merged in place. `confidence` starts at zero and is overwritten by
/// the scorer. `first_seen`/`last_seen` are `None` when the provider gave no
/// timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PassiveIP {
    /// Candidate IP in dotted-quad form.
    pub ip: String,

    /// Identifier of the source that reported it.
    pub source: String,

    /// Confidence in [0,1]; zero until scored.
    pub confidence: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,

    /// Optional corroboration signals keyed by the `META_*` constants.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl PassiveIP {
    pub fn new(ip: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            source: source.into(),
            confidence: 0.0,
            first_seen: None,
            last_seen: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_seen(mut self, first: DateTime<Utc>, last: DateTime<Utc>) -> Self {
        self.first_seen = Some(first);
        self.last_seen = Some(last);
        self
    }

    pub fn with_last_seen(mut self, last: DateTime<Utc>) -> Self {
        self.last_seen = Some(last);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Metadata lookup returning `None` for absent or empty values.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}
