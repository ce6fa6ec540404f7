//! Domain helpers with Public Suffix List integration.
//!
//! The scorer compares observation metadata against the *registrable* form
//! of the target domain so that `cdn.www.example.co.uk` and
//! `example.co.uk` corroborate the same target. PSL lookups handle
//! multi-label suffixes; a plain label-based fallback covers inputs the PSL
//! does not know.

use once_cell::sync::Lazy;
use psl::domain_str;
use regex::Regex;

/// Lowercase, strip scheme/path artifacts and the trailing dot.
pub fn normalize_domain(input: &str) -> String {
    let cleaned = input
        .trim()
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .split('/')
        .next()
        .unwrap_or("");
    cleaned.trim_end_matches('.').to_ascii_lowercase()
}

/// Syntactic plausibility check for a normalized domain.
pub fn is_valid_domain(domain: &str) -> bool {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9-]*[a-z0-9])?)+$").unwrap()
    });
    domain.len() <= 253 && RE.is_match(domain)
}

/// Registrable domain (what you can actually register) for a hostname or
/// domain string, e.g. `www.example.co.uk -> example.co.uk`.
pub fn registrable_domain(domain: &str) -> Option<String> {
    let normalized = normalize_domain(domain);
    if normalized.is_empty() {
        return None;
    }
    if let Some(reg) = domain_str(&normalized) {
        return Some(reg.to_string());
    }
    // Fallback for names the PSL rejects: last two labels.
    let labels: Vec<&str> = normalized.split('.').collect();
    if labels.len() >= 2 {
        Some(labels[labels.len() - 2..].join("."))
    } else {
        None
    }
}

/// Organization token used for WHOIS corroboration: the first label of the
/// registrable domain (`example.co.uk -> example`).
pub fn organization_token(domain: &str) -> String {
    registrable_domain(domain)
        .unwrap_or_else(|| normalize_domain(domain))
        .split('.')
        .next()
        .unwrap_or("")
        .to_string()
}
