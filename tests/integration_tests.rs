//! Integration tests for originscout.
//!
//! These tests verify end-to-end functionality without relying on external
//! network services: validation probes are supplied as closures, and
//! observations mimic what per-source fetch tasks would collect.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use originscout::aggregate::dedupe_by_ip;
use originscout::config::Config;
use originscout::credentials::Credential;
use originscout::errors::OriginScoutError;
use originscout::failover::{FailoverManager, SourceState};
use originscout::scoring::ConfidenceScorer;
use originscout::sources::{self, PassiveIP};

fn configured(sources_with_keys: &[(&str, usize)]) -> Config {
    let mut config = Config::new();
    config.passive.enabled_sources = sources_with_keys
        .iter()
        .map(|(name, _)| name.to_string())
        .collect();
    for (name, key_count) in sources_with_keys {
        let keys: Vec<Credential> = (0..*key_count)
            .map(|i| Credential::key(format!("{name}-key{i}")))
            .collect();
        config.credentials.set(*name, keys);
    }
    config
}

/// A full scan pass: validate sources concurrently, gather observations,
/// score them, and dedupe the survivors.
#[tokio::test]
async fn passive_pipeline_end_to_end() {
    let config = configured(&[
        (sources::SHODAN, 1),
        (sources::CENSYS, 0),
        (sources::SECURITYTRAILS, 1),
        (sources::CT, 0),
    ]);
    assert!(config.validate().is_ok());

    let manager = Arc::new(config.build_manager());

    // Censys has no credential configured: disabled before any task runs.
    assert_eq!(
        manager.status(sources::CENSYS).unwrap().status,
        SourceState::Disabled
    );

    // One concurrent validation task per usable source.
    let mut handles = Vec::new();
    for source in manager.available_sources() {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            manager
                .validate_source(&source, Duration::from_secs(1), || async { Ok(()) })
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let mut usable = manager.available_sources();
    usable.sort();
    assert_eq!(usable, vec!["ct", "securitytrails", "shodan"]);

    // Simulated fetch results flowing into the aggregator.
    let now = Utc::now();
    let observations = vec![
        PassiveIP::new("203.0.113.10", sources::SHODAN)
            .with_last_seen(now)
            .with_metadata(sources::META_REVERSE_DNS, "origin.example.com"),
        PassiveIP::new("203.0.113.10", sources::SECURITYTRAILS).with_last_seen(now),
        PassiveIP::new("203.0.113.10", sources::CT).with_last_seen(now),
        PassiveIP::new("198.51.100.7", sources::CT)
            .with_last_seen(now - chrono::Duration::days(400))
            .with_metadata(sources::META_HOSTING_PROVIDER, "CheapVps Hosting"),
    ];
    for record in &observations {
        manager.increment_requests(&record.source);
    }

    let scorer = ConfidenceScorer::new("example.com", None);
    let candidates = dedupe_by_ip(scorer.score_all(observations));

    // The corroborated IP survives as a single high-confidence candidate;
    // the stale generic-hosting one falls below the cutoff.
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].ip, "203.0.113.10");
    assert!(candidates[0].confidence > 0.7);

    let shodan_status = manager.status(sources::SHODAN).unwrap();
    assert_eq!(shodan_status.status, SourceState::Available);
    assert_eq!(shodan_status.requests_made, 1);
}

/// A rate-limited source rotates to its backup credential; once rotation is
/// exhausted the caller fails over to another source.
#[tokio::test]
async fn rate_limit_rotation_and_source_failover() {
    let config = configured(&[
        (sources::SHODAN, 2),
        (sources::SECURITYTRAILS, 1),
        (sources::CT, 0),
    ]);
    let manager = config.build_manager();

    // Provider starts refusing: first report rotates to the backup key.
    assert!(manager.mark_rate_limited(sources::SHODAN, Duration::from_secs(3600)));
    assert_eq!(
        manager.current_credential(sources::SHODAN).unwrap(),
        Credential::key("shodan-key1")
    );

    // Second report exhausts the rotation; the source stays rate-limited
    // and drops out of the usable set.
    assert!(!manager.mark_rate_limited(sources::SHODAN, Duration::from_secs(3600)));
    assert!(
        !manager
            .available_sources()
            .contains(&sources::SHODAN.to_string())
    );

    // Mid-run substitution picks a different, still-usable source.
    let next = manager.next_available_source(sources::SHODAN).unwrap();
    assert_ne!(next, sources::SHODAN);

    // A fresh scan starts again from the primary credential.
    manager.reset_rotation(sources::SHODAN);
    assert_eq!(
        manager.current_credential(sources::SHODAN).unwrap(),
        Credential::key("shodan-key0")
    );
}

/// Probe failures are classified from their error text, so rate-limit-shaped
/// provider errors park the source instead of erroring it.
#[tokio::test]
async fn validation_classifies_probe_errors() {
    let manager = FailoverManager::new(true);
    manager.register_source(sources::SHODAN);
    manager.register_source(sources::SECURITYTRAILS);

    let err = manager
        .validate_source(sources::SHODAN, Duration::from_secs(1), || async {
            Err(OriginScoutError::probe_failed(
                sources::SHODAN,
                "HTTP 429 too many requests",
            ))
        })
        .await
        .unwrap_err();
    assert!(err.is_rate_limit());
    assert_eq!(
        manager.status(sources::SHODAN).unwrap().status,
        SourceState::RateLimited
    );

    let err = manager
        .validate_source(sources::SECURITYTRAILS, Duration::from_secs(1), || async {
            Err(OriginScoutError::invalid_credential(
                sources::SECURITYTRAILS,
                "credential rejected by provider",
            ))
        })
        .await
        .unwrap_err();
    assert!(!err.is_rate_limit());

    let status = manager.status(sources::SECURITYTRAILS).unwrap();
    assert_eq!(status.status, SourceState::Error);
    assert!(status.last_error.unwrap().contains("rejected"));
}

/// Concurrent fetch tasks sharing one manager never deadlock, and a failed
/// source never disturbs the others.
#[tokio::test]
async fn partial_failure_is_isolated() {
    let config = configured(&[
        (sources::SHODAN, 1),
        (sources::SECURITYTRAILS, 1),
        (sources::CT, 0),
        (sources::DNS, 0),
    ]);
    let manager = Arc::new(config.build_manager());

    let mut handles = Vec::new();
    for source in manager.available_sources() {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            let fails = source == sources::SHODAN;
            let result = manager
                .validate_source(&source, Duration::from_secs(1), || async move {
                    if fails {
                        Err(OriginScoutError::probe_failed(
                            "shodan",
                            "connection refused",
                        ))
                    } else {
                        Ok(())
                    }
                })
                .await;
            for _ in 0..5 {
                manager.increment_requests(&source);
            }
            result
        }));
    }

    let mut failures = 0;
    for handle in handles {
        if handle.await.unwrap().is_err() {
            failures += 1;
        }
    }
    assert_eq!(failures, 1);

    // The failed source is excluded; everything else kept working.
    let mut usable = manager.available_sources();
    usable.sort();
    assert_eq!(usable, vec!["ct", "dns", "securitytrails"]);
    for (source, status) in manager.all_status() {
        if source != sources::SHODAN {
            assert_eq!(status.requests_made, 5);
        }
    }
}

/// Scoring output is stable across repeated runs over the same input and
/// always honors the configured cutoff.
#[test]
fn scoring_is_deterministic_and_thresholded() {
    let now = Utc::now();
    let observations: Vec<PassiveIP> = (0..50)
        .flat_map(|i| {
            let ip = format!("203.0.113.{i}");
            vec![
                PassiveIP::new(&ip, sources::CT).with_last_seen(now),
                PassiveIP::new(&ip, sources::DNS).with_last_seen(now),
            ]
        })
        .collect();

    let scorer = ConfidenceScorer::new("example.com", None);
    let first = scorer.score_all(observations.clone());
    let second = scorer.score_all(observations);

    assert_eq!(first, second);
    assert!(!first.is_empty());
    for record in &first {
        assert!(record.confidence >= scorer.config().min_confidence);
        assert!(record.confidence <= 1.0);
    }
}
