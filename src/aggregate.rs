//! Aggregation glue between raw per-source observations and the scorer.
//!
//! Pure, single-threaded transforms over owned or borrowed slices. No
//! observation is mutated or discarded here: grouping produces the per-IP
//! multi-source view the scorer consumes, and deduplication runs only
//! *after* scoring, collapsing same-IP survivors to the best-scored record.

use std::collections::{HashMap, HashSet};

use crate::sources::PassiveIP;

/// Group observations by candidate IP (exact, case-sensitive match).
pub fn group_by_ip(records: &[PassiveIP]) -> HashMap<String, Vec<PassiveIP>> {
    let mut grouped: HashMap<String, Vec<PassiveIP>> = HashMap::new();
    for record in records {
        grouped
            .entry(record.ip.clone())
            .or_default()
            .push(record.clone());
    }
    grouped
}

/// Number of distinct sources reporting `ip`, deduplicated by source
/// identifier.
pub fn distinct_sources(ip: &str, records: &[PassiveIP]) -> usize {
    records
        .iter()
        .filter(|record| record.ip == ip)
        .map(|record| record.source.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Stable dedup by IP: first-occurrence order is preserved and the
/// highest-confidence record wins when several survive scoring under
/// different source tags.
pub fn dedupe_by_ip(records: Vec<PassiveIP>) -> Vec<PassiveIP> {
    let mut kept: Vec<PassiveIP> = Vec::with_capacity(records.len());
    let mut position: HashMap<String, usize> = HashMap::new();

    for record in records {
        match position.get(&record.ip).copied() {
            Some(idx) => {
                if record.confidence > kept[idx].confidence {
                    kept[idx] = record;
                }
            }
            None => {
                position.insert(record.ip.clone(), kept.len());
                kept.push(record);
            }
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources;

    fn rec(ip: &str, source: &str, confidence: f64) -> PassiveIP {
        let mut r = PassiveIP::new(ip, source);
        r.confidence = confidence;
        r
    }

    #[test]
    fn groups_by_ip_without_loss() {
        let records = vec![
            rec("192.0.2.1", sources::SHODAN, 0.0),
            rec("192.0.2.1", sources::CENSYS, 0.0),
            rec("192.0.2.2", sources::CT, 0.0),
        ];

        let grouped = group_by_ip(&records);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["192.0.2.1"].len(), 2);
        assert_eq!(grouped["192.0.2.2"].len(), 1);
    }

    #[test]
    fn counts_distinct_sources_only() {
        let records = vec![
            rec("192.0.2.1", sources::SHODAN, 0.0),
            rec("192.0.2.1", sources::CENSYS, 0.0),
            rec("192.0.2.1", sources::SHODAN, 0.0),
            rec("192.0.2.2", sources::VIRUSTOTAL, 0.0),
        ];

        assert_eq!(distinct_sources("192.0.2.1", &records), 2);
        assert_eq!(distinct_sources("192.0.2.2", &records), 1);
        assert_eq!(distinct_sources("192.0.2.3", &records), 0);
    }

    #[test]
    fn dedup_keeps_highest_scored_in_first_seen_position() {
        let records = vec![
            rec("192.0.2.1", sources::CT, 0.4),
            rec("192.0.2.2", sources::DNS, 0.5),
            rec("192.0.2.1", sources::SHODAN, 0.9),
            rec("192.0.2.2", sources::CT, 0.3),
        ];

        let deduped = dedupe_by_ip(records);
        assert_eq!(deduped.len(), 2);
        // First-occurrence order preserved.
        assert_eq!(deduped[0].ip, "192.0.2.1");
        assert_eq!(deduped[1].ip, "192.0.2.2");
        // Best-scored survivor per IP.
        assert_eq!(deduped[0].source, "shodan");
        assert_eq!(deduped[0].confidence, 0.9);
        assert_eq!(deduped[1].source, "dns");
        assert_eq!(deduped[1].confidence, 0.5);
    }

    #[test]
    fn dedup_of_empty_input() {
        assert!(dedupe_by_ip(Vec::new()).is_empty());
    }
}
