//! Multi-factor confidence scoring for candidate origin IPs.
//!
//! Each observation is scored in the context of *all* observations gathered
//! for the target domain: base score, source reputation weight, multi-source
//! corroboration, recency, metadata corroboration signals, and a penalty for
//! commodity hosting. The result is clamped to [0,1] and filtered against a
//! minimum-confidence cutoff.
//!
//! The numeric defaults below are a documented policy, not a protocol: any
//! internally consistent set of weights preserving the monotonicity
//! properties (more sources > fewer, recent >= stale) is acceptable.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::aggregate::distinct_sources;
use crate::domain_utils;
use crate::sources::{self, PassiveIP};

/// Fixed scale applied to the per-source reputation weight so a
/// perfectly-weighted single source contributes a bounded amount.
pub const SOURCE_WEIGHT_SCALE: f64 = 0.2;

/// Every scoring tunable. Loaded once; never silently reloaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScoringConfig {
    /// Starting score before any contribution.
    pub base_score: f64,

    /// Per-source reputation weights; unknown sources fall back to
    /// `default_source_weight`.
    pub source_weights: HashMap<String, f64>,
    pub default_source_weight: f64,

    /// Added per additional corroborating source, capped so the bonus alone
    /// cannot push the score past 1.0 before clamping.
    pub multi_source_bonus: f64,
    pub multi_source_bonus_cap: f64,

    /// Applied (negative) when exactly one source reports the IP.
    pub single_source_penalty: f64,

    /// Recency tiers in days.
    pub recent_threshold_days: i64,
    pub moderate_threshold_days: i64,
    pub recent_bonus: f64,
    pub moderate_bonus: f64,
    pub stale_penalty: f64,

    /// Corroboration bonuses, each independently evaluated.
    pub reverse_dns_bonus: f64,
    pub asn_bonus: f64,
    pub whois_bonus: f64,
    pub geo_bonus: f64,

    /// Applied (negative) when metadata points at commodity hosting.
    pub generic_hosting_penalty: f64,

    /// Records scoring below this are dropped by `score_all`.
    pub min_confidence: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let source_weights = HashMap::from(
            [
                (sources::SECURITYTRAILS, 1.0),
                (sources::SHODAN, 0.9),
                (sources::CENSYS, 0.9),
                (sources::VIRUSTOTAL, 0.8),
                (sources::ZOOMEYE, 0.8),
                (sources::CT, 0.7),
                (sources::DNS, 0.6),
                (sources::DNSDUMPSTER, 0.5),
                (sources::VIEWDNS, 0.5),
                (sources::WAYBACK, 0.4),
            ]
            .map(|(name, weight)| (name.to_string(), weight)),
        );

        Self {
            base_score: 0.3,
            source_weights,
            default_source_weight: 0.5,
            multi_source_bonus: 0.25,
            multi_source_bonus_cap: 0.5,
            single_source_penalty: -0.10,
            recent_threshold_days: 30,
            moderate_threshold_days: 180,
            recent_bonus: 0.10,
            moderate_bonus: 0.05,
            stale_penalty: -0.10,
            reverse_dns_bonus: 0.15,
            asn_bonus: 0.05,
            whois_bonus: 0.10,
            geo_bonus: 0.05,
            generic_hosting_penalty: -0.15,
            min_confidence: 0.2,
        }
    }
}

/// ASNs operated by CDN/WAF vendors. A candidate announced from one of
/// these is still fronting infrastructure, not an origin, so its ASN signal
/// contributes nothing. General-purpose clouds are intentionally absent;
/// commodity hosting is handled by the keyword penalty instead.
static CDN_ASNS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        // Cloudflare
        "13335", "209242", // Akamai
        "12222", "16625", "20940", "21342", // Fastly
        "54113", // Imperva / Incapsula
        "19551", // Sucuri
        "30148", // StackPath
        "33438", // CDN77
        "60068", // Edgio / Limelight
        "22822", // Microsoft Front Door
        "8075",
    ])
});

/// Keywords marking commodity cloud/hosting providers.
const GENERIC_HOSTING_KEYWORDS: &[&str] = &[
    "hosting",
    "digitalocean",
    "linode",
    "vultr",
    "ovh",
    "hetzner",
    "contabo",
    "scaleway",
    "dreamhost",
    "godaddy",
    "namecheap",
    "bluehost",
    "hostgator",
    "colocation",
    "datacenter",
    "data center",
    "vps",
];

/// Scores observations for one target domain.
pub struct ConfidenceScorer {
    domain: String,
    registrable: String,
    org_token: String,
    config: ScoringConfig,
}

impl ConfidenceScorer {
    /// `config: None` selects the documented default policy.
    pub fn new(domain: &str, config: Option<ScoringConfig>) -> Self {
        let normalized = domain_utils::normalize_domain(domain);
        if !domain_utils::is_valid_domain(&normalized) {
            // Scoring itself has no failure mode; corroboration checks
            // simply never fire against a malformed target.
            warn!(domain = %normalized, "target domain looks malformed");
        }
        let registrable =
            domain_utils::registrable_domain(&normalized).unwrap_or_else(|| normalized.clone());
        let org_token = domain_utils::organization_token(&normalized);

        Self {
            domain: normalized,
            registrable,
            org_token,
            config: config.unwrap_or_default(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score one observation in the context of every observation gathered
    /// for the domain. Always in [0,1]; never errors.
    pub fn score_ip(&self, record: &PassiveIP, all: &[PassiveIP]) -> f64 {
        let mut score = self.config.base_score;

        score += self.source_weight(&record.source) * SOURCE_WEIGHT_SCALE;

        let reporting = distinct_sources(&record.ip, all);
        if reporting > 1 {
            let bonus = self.config.multi_source_bonus * (reporting - 1) as f64;
            score += bonus.min(self.config.multi_source_bonus_cap);
        } else {
            score += self.config.single_source_penalty;
        }

        score += self.calculate_recency(record.last_seen);

        if self.has_reverse_dns_match(record) {
            score += self.config.reverse_dns_bonus;
        }
        if self.has_asn_match(record) {
            score += self.config.asn_bonus;
        }
        if self.has_whois_match(record) {
            score += self.config.whois_bonus;
        }
        if self.has_geo_match(record) {
            score += self.config.geo_bonus;
        }
        if self.is_generic_hosting(record) {
            score += self.config.generic_hosting_penalty;
        }

        clamp(score, 0.0, 1.0)
    }

    /// Score every record against the entire input set, overwrite
    /// `confidence` in place, and drop records below the minimum cutoff.
    /// Insertion order of the input is preserved.
    pub fn score_all(&self, records: Vec<PassiveIP>) -> Vec<PassiveIP> {
        let scores: Vec<f64> = records
            .iter()
            .map(|record| self.score_ip(record, &records))
            .collect();

        records
            .into_iter()
            .zip(scores)
            .filter_map(|(mut record, score)| {
                record.confidence = score;
                (score >= self.config.min_confidence).then_some(record)
            })
            .collect()
    }

    /// Recency contribution. A missing timestamp contributes nothing rather
    /// than counting as infinitely stale.
    pub fn calculate_recency(&self, last_seen: Option<DateTime<Utc>>) -> f64 {
        let Some(seen) = last_seen else {
            return 0.0;
        };
        let age_days = (Utc::now() - seen).num_days();
        if age_days <= self.config.recent_threshold_days {
            self.config.recent_bonus
        } else if age_days <= self.config.moderate_threshold_days {
            self.config.moderate_bonus
        } else {
            self.config.stale_penalty
        }
    }

    /// Reputation weight for a source; unknown sources get the default.
    pub fn source_weight(&self, source: &str) -> f64 {
        self.config
            .source_weights
            .get(source)
            .copied()
            .unwrap_or(self.config.default_source_weight)
    }

    fn has_reverse_dns_match(&self, record: &PassiveIP) -> bool {
        if self.registrable.is_empty() {
            return false;
        }
        [sources::META_REVERSE_DNS, sources::META_PTR_RECORD]
            .iter()
            .filter_map(|key| record.meta(key))
            .any(|value| value.to_ascii_lowercase().contains(&self.registrable))
    }

    fn has_asn_match(&self, record: &PassiveIP) -> bool {
        let Some(raw) = record.meta(sources::META_ASN) else {
            return false;
        };
        let number: String = raw
            .trim()
            .trim_start_matches("AS")
            .trim_start_matches("as")
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        !number.is_empty() && !CDN_ASNS.contains(number.as_str())
    }

    fn has_whois_match(&self, record: &PassiveIP) -> bool {
        if self.org_token.is_empty() {
            return false;
        }
        record
            .meta(sources::META_WHOIS_ORG)
            .map(|org| org.to_ascii_lowercase().contains(&self.org_token))
            .unwrap_or(false)
    }

    fn has_geo_match(&self, record: &PassiveIP) -> bool {
        record
            .meta(sources::META_COUNTRY_CODE)
            .map(|code| {
                let code = code.trim();
                code.len() == 2
                    && code.chars().all(|c| c.is_ascii_alphabetic())
                    && !code.eq_ignore_ascii_case("UNKNOWN")
            })
            .unwrap_or(false)
    }

    fn is_generic_hosting(&self, record: &PassiveIP) -> bool {
        [sources::META_HOSTING_PROVIDER, sources::META_ORGANIZATION]
            .iter()
            .filter_map(|key| record.meta(key))
            .any(|value| {
                let value = value.to_ascii_lowercase();
                GENERIC_HOSTING_KEYWORDS.iter().any(|kw| value.contains(kw))
            })
    }
}

fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}
