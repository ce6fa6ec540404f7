//! Credential rotation and rate-limit failover across passive sources.
//!
//! The [`FailoverManager`] is the single authority over "can source X run
//! right now, and with which credential". Concurrently running fetch tasks
//! share one manager instance: each asks for its current credential before
//! calling the provider and reports rate-limit or error outcomes back.
//!
//! Per-source state machine, states `unchecked / available / rate_limited /
//! error / disabled`:
//!   * `unchecked -> available` on a successful validation probe
//!   * `unchecked|available -> error` on a non-rate-limit validation failure
//!   * `unchecked|available|error -> rate_limited` on a reported rate limit
//!   * `rate_limited` is never left automatically; callers observing an
//!     elapsed `rate_limit_end` may attempt the source again, and only a
//!     fresh validation or report updates the authoritative field
//!   * `disabled` is terminal and set only by configuration
//!
//! Every operation is individually atomic. A registration-only lock guards
//! the maps; per-source entry mutexes make same-source operations
//! linearizable while different sources proceed independently. No lock is
//! held across an await; the only suspension point is the caller-supplied
//! validation probe.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::credentials::{Credential, CredentialRotation};
use crate::errors::{OriginScoutError, Result};

/// Default cooldown applied when a validation probe reports a rate limit
/// without a provider-supplied retry hint.
pub const DEFAULT_RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(3600);

/// Authoritative per-source availability state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    Unchecked,
    Available,
    RateLimited,
    Error,
    Disabled,
}

impl SourceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceState::Unchecked => "unchecked",
            SourceState::Available => "available",
            SourceState::RateLimited => "rate_limited",
            SourceState::Error => "error",
            SourceState::Disabled => "disabled",
        }
    }
}

impl std::fmt::Display for SourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one source's registry entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SourceStatus {
    pub source: String,
    pub status: SourceState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_end: Option<DateTime<Utc>>,
    pub requests_made: u64,
}

impl SourceStatus {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            status: SourceState::Unchecked,
            last_error: None,
            rate_limit_end: None,
            requests_made: 0,
        }
    }

    /// "Safe to attempt now": unchecked, available, or rate-limited with an
    /// already-elapsed cooldown.
    pub fn usable_at(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            SourceState::Unchecked | SourceState::Available => true,
            SourceState::RateLimited => self.rate_limit_end.map(|end| end <= now).unwrap_or(true),
            SourceState::Error | SourceState::Disabled => false,
        }
    }
}

/// Shared credential/rate-limit authority for all fetch tasks.
pub struct FailoverManager {
    failover: bool,
    rate_limit_cooldown: Duration,
    sources: RwLock<HashMap<String, Mutex<SourceStatus>>>,
    credentials: RwLock<HashMap<String, Mutex<CredentialRotation>>>,
}

impl FailoverManager {
    /// Create a manager; `failover` controls whether
    /// [`next_available_source`](Self::next_available_source) may substitute
    /// one source for another mid-run.
    pub fn new(failover: bool) -> Self {
        Self::with_cooldown(failover, DEFAULT_RATE_LIMIT_COOLDOWN)
    }

    pub fn with_cooldown(failover: bool, rate_limit_cooldown: Duration) -> Self {
        Self {
            failover,
            rate_limit_cooldown,
            sources: RwLock::new(HashMap::new()),
            credentials: RwLock::new(HashMap::new()),
        }
    }

    pub fn failover_enabled(&self) -> bool {
        self.failover
    }

    /// Idempotently create a registry entry in `unchecked`. An existing
    /// entry keeps its current status.
    pub fn register_source(&self, source: &str) {
        let mut map = self
            .sources
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        map.entry(source.to_string())
            .or_insert_with(|| Mutex::new(SourceStatus::new(source)));
    }

    /// Put a source into the terminal `disabled` state (registering it
    /// first if needed). Used by configuration for unconfigured sources.
    pub fn disable_source(&self, source: &str) {
        let mut map = self
            .sources
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = map
            .entry(source.to_string())
            .or_insert_with(|| Mutex::new(SourceStatus::new(source)));
        let mut status = entry.lock().unwrap_or_else(PoisonError::into_inner);
        status.status = SourceState::Disabled;
    }

    /// Replace the credential list for a source and reset its rotation
    /// cursor. An empty list is legal; the source then has no usable
    /// credential.
    pub fn set_credentials(&self, source: &str, credentials: Vec<Credential>) {
        let mut map = self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // A fresh rotation starts at cursor 0, which is exactly the reset
        // this operation promises.
        map.insert(
            source.to_string(),
            Mutex::new(CredentialRotation::new(credentials)),
        );
    }

    /// Credential at the current rotation cursor.
    pub fn current_credential(&self, source: &str) -> Result<Credential> {
        if !self.is_registered(source) {
            return Err(OriginScoutError::unknown_source(source));
        }
        let map = self
            .credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        map.get(source)
            .and_then(|entry| {
                entry
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .current()
                    .cloned()
            })
            .ok_or_else(|| OriginScoutError::no_credentials(source))
    }

    /// Advance to the next credential. Returns `false` when the list is
    /// already exhausted (cursor unchanged); callers must check before
    /// asking for the current credential again.
    pub fn rotate_credential(&self, source: &str) -> bool {
        let map = self
            .credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let rotated = map
            .get(source)
            .map(|entry| {
                entry
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .rotate()
            })
            .unwrap_or(false);
        if rotated {
            debug!(source, "rotated to next credential");
        }
        rotated
    }

    /// Cursor back to the primary credential (used between independent
    /// domain scans).
    pub fn reset_rotation(&self, source: &str) {
        let map = self
            .credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = map.get(source) {
            entry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .reset();
        }
    }

    /// Number of credentials configured for a source.
    pub fn credential_count(&self, source: &str) -> usize {
        let map = self
            .credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        map.get(source)
            .map(|entry| entry.lock().unwrap_or_else(PoisonError::into_inner).len())
            .unwrap_or(0)
    }

    /// Run a caller-supplied validation probe under `timeout` and record the
    /// outcome.
    ///
    /// Success marks the source `available` and clears the last error. A
    /// rate-limit-shaped failure marks it `rate_limited` with the manager's
    /// configured cooldown; any other failure, including timeout expiry,
    /// marks it `error` so "checked and failed" is distinguishable from
    /// "never checked". The probe's error is returned unchanged.
    pub async fn validate_source<F, Fut>(
        &self,
        source: &str,
        timeout: Duration,
        probe: F,
    ) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if !self.is_registered(source) {
            return Err(OriginScoutError::unknown_source(source));
        }

        let outcome = match tokio::time::timeout(timeout, probe()).await {
            Ok(res) => res,
            Err(_) => Err(OriginScoutError::probe_timeout(source, timeout.as_secs())),
        };

        match outcome {
            Ok(()) => {
                self.with_status(source, |status| {
                    status.status = SourceState::Available;
                    status.last_error = None;
                })?;
                debug!(source, "validation succeeded");
                Ok(())
            }
            Err(err) => {
                if err.is_rate_limit() {
                    warn!(source, error = %err, "validation hit a rate limit");
                    self.apply_rate_limit(source, self.rate_limit_cooldown)?;
                } else {
                    warn!(source, error = %err, "validation failed");
                    self.with_status(source, |status| {
                        status.status = SourceState::Error;
                        status.last_error = Some(err.to_string());
                    })?;
                }
                Err(err)
            }
        }
    }

    /// Record a rate-limit event and attempt credential rotation. Returns
    /// whether a fresh credential is now available to retry against; when
    /// `false` the source should be treated as exhausted for this run.
    pub fn mark_rate_limited(&self, source: &str, cooldown: Duration) -> bool {
        if self.apply_rate_limit(source, cooldown).is_err() {
            warn!(source, "rate limit reported for unregistered source");
        }
        let rotated = self.rotate_credential(source);
        if !rotated {
            warn!(source, "credential rotation exhausted");
        }
        rotated
    }

    /// Observability counter; never gates behavior.
    pub fn increment_requests(&self, source: &str) {
        let _ = self.with_status(source, |status| {
            status.requests_made += 1;
        });
    }

    /// Snapshot of one source's status. Errors only for sources that were
    /// never registered.
    pub fn status(&self, source: &str) -> Result<SourceStatus> {
        let map = self
            .sources
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        map.get(source)
            .map(|entry| {
                entry
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone()
            })
            .ok_or_else(|| OriginScoutError::unknown_source(source))
    }

    /// Snapshot of every registered source.
    pub fn all_status(&self) -> HashMap<String, SourceStatus> {
        let map = self
            .sources
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        map.iter()
            .map(|(name, entry)| {
                (
                    name.clone(),
                    entry
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .clone(),
                )
            })
            .collect()
    }

    /// Every registered source that is safe to attempt now: `available`,
    /// `unchecked`, or `rate_limited` with an elapsed cooldown. Order is
    /// unspecified.
    pub fn available_sources(&self) -> Vec<String> {
        let now = Utc::now();
        let map = self
            .sources
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        map.iter()
            .filter(|(_, entry)| {
                entry
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .usable_at(now)
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// With failover enabled, one other available source to substitute for
    /// `excluding`; `None` when failover is disabled or no alternative
    /// exists.
    pub fn next_available_source(&self, excluding: &str) -> Option<String> {
        if !self.failover {
            return None;
        }
        self.available_sources()
            .into_iter()
            .find(|source| source != excluding)
    }

    fn is_registered(&self, source: &str) -> bool {
        self.sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(source)
    }

    fn apply_rate_limit(&self, source: &str, cooldown: Duration) -> Result<()> {
        let delta =
            chrono::Duration::from_std(cooldown).unwrap_or_else(|_| chrono::Duration::days(365));
        self.with_status(source, |status| {
            status.status = SourceState::RateLimited;
            status.rate_limit_end = Some(Utc::now() + delta);
        })
    }

    fn with_status<F>(&self, source: &str, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut SourceStatus),
    {
        let map = self
            .sources
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = map
            .get(source)
            .ok_or_else(|| OriginScoutError::unknown_source(source))?;
        let mut status = entry.lock().unwrap_or_else(PoisonError::into_inner);
        mutate(&mut status);
        Ok(())
    }
}
