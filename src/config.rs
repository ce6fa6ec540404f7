//! Configuration for the passive aggregation engine.
//!
//! Structured options with sane defaults, environment-variable loading, and
//! validation. Configuration is assembled by the caller (the CLI and file
//! layers live outside this crate) and applied to a [`FailoverManager`] in
//! one step. Loaded values are never silently reloaded mid-run.

use std::collections::HashMap;
use std::time::Duration;

use crate::credentials::Credential;
use crate::failover::{DEFAULT_RATE_LIMIT_COOLDOWN, FailoverManager};
use crate::scoring::ScoringConfig;
use crate::sources;
use crate::validators::PROBE_TIMEOUT;

/// Main configuration structure.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Source enablement and failover behavior.
    pub passive: PassiveConfig,

    /// Per-source credential lists.
    pub credentials: CredentialsConfig,

    /// Scoring tunables.
    pub scoring: ScoringConfig,
}

/// Source enablement and failover options.
#[derive(Debug, Clone)]
pub struct PassiveConfig {
    /// Sources to register; defaults to every known source.
    pub enabled_sources: Vec<String>,

    /// Whether one source may substitute for another mid-run.
    pub failover: bool,

    /// Timeout applied to validation probes.
    pub validation_timeout: Duration,

    /// Cooldown recorded when a validation probe reports a rate limit.
    pub rate_limit_cooldown: Duration,
}

impl Default for PassiveConfig {
    fn default() -> Self {
        Self {
            enabled_sources: sources::KNOWN_SOURCES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            failover: true,
            validation_timeout: PROBE_TIMEOUT,
            rate_limit_cooldown: DEFAULT_RATE_LIMIT_COOLDOWN,
        }
    }
}

/// Ordered credential lists keyed by source identifier.
#[derive(Debug, Clone, Default)]
pub struct CredentialsConfig {
    lists: HashMap<String, Vec<Credential>>,
}

impl CredentialsConfig {
    /// Replace the list for a source.
    pub fn set(&mut self, source: impl Into<String>, credentials: Vec<Credential>) {
        self.lists.insert(source.into(), credentials);
    }

    /// Append one credential to a source's list.
    pub fn add(&mut self, source: impl Into<String>, credential: Credential) {
        self.lists.entry(source.into()).or_default().push(credential);
    }

    pub fn get(&self, source: &str) -> &[Credential] {
        self.lists.get(source).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_configured(&self, source: &str) -> bool {
        !self.get(source).is_empty()
    }
}

impl Config {
    /// Configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from `ORIGINSCOUT_*` environment variables.
    ///
    /// Key lists are comma-separated; Censys credentials use `id:secret`
    /// entries. Unset or unparsable variables leave the default in place.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("ORIGINSCOUT_SOURCES") {
            let enabled: Vec<String> = value
                .split(',')
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
            if !enabled.is_empty() {
                config.passive.enabled_sources = enabled;
            }
        }

        if let Ok(value) = std::env::var("ORIGINSCOUT_FAILOVER") {
            config.passive.failover = value.eq_ignore_ascii_case("true")
                || value.eq_ignore_ascii_case("1")
                || value.eq_ignore_ascii_case("yes");
        }

        if let Ok(value) = std::env::var("ORIGINSCOUT_VALIDATION_TIMEOUT_SECS")
            && let Ok(secs) = value.parse::<u64>()
        {
            config.passive.validation_timeout = Duration::from_secs(secs);
        }

        if let Ok(value) = std::env::var("ORIGINSCOUT_RATE_LIMIT_COOLDOWN_SECS")
            && let Ok(secs) = value.parse::<u64>()
        {
            config.passive.rate_limit_cooldown = Duration::from_secs(secs);
        }

        if let Ok(value) = std::env::var("ORIGINSCOUT_MIN_CONFIDENCE")
            && let Ok(min) = value.parse::<f64>()
        {
            config.scoring.min_confidence = min;
        }

        for (var, source) in [
            ("ORIGINSCOUT_SHODAN_KEYS", sources::SHODAN),
            ("ORIGINSCOUT_SECURITYTRAILS_KEYS", sources::SECURITYTRAILS),
            ("ORIGINSCOUT_VIRUSTOTAL_KEYS", sources::VIRUSTOTAL),
            ("ORIGINSCOUT_ZOOMEYE_KEYS", sources::ZOOMEYE),
        ] {
            if let Ok(value) = std::env::var(var) {
                let keys: Vec<Credential> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(Credential::key)
                    .collect();
                if !keys.is_empty() {
                    config.credentials.set(source, keys);
                }
            }
        }

        if let Ok(value) = std::env::var("ORIGINSCOUT_CENSYS_CREDS") {
            let pairs: Vec<Credential> = value
                .split(',')
                .filter_map(|entry| entry.trim().split_once(':'))
                .filter(|(id, secret)| !id.is_empty() && !secret.is_empty())
                .map(|(id, secret)| Credential::pair(id, secret))
                .collect();
            if !pairs.is_empty() {
                config.credentials.set(sources::CENSYS, pairs);
            }
        }

        config
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.passive.enabled_sources.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "passive.enabled_sources".to_string(),
            });
        }

        for source in &self.passive.enabled_sources {
            let well_formed = !source.is_empty()
                && *source == source.to_ascii_lowercase()
                && !source.contains(char::is_whitespace);
            if !well_formed {
                return Err(ConfigError::InvalidValue {
                    field: "passive.enabled_sources".to_string(),
                    value: source.clone(),
                    reason: "source identifiers must be non-empty lowercase strings".to_string(),
                });
            }
        }

        if self.passive.validation_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "passive.validation_timeout".to_string(),
                value: "0".to_string(),
                reason: "timeout must be greater than 0".to_string(),
            });
        }

        if self.passive.rate_limit_cooldown.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "passive.rate_limit_cooldown".to_string(),
                value: "0".to_string(),
                reason: "cooldown must be greater than 0".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.scoring.min_confidence) {
            return Err(ConfigError::InvalidValue {
                field: "scoring.min_confidence".to_string(),
                value: self.scoring.min_confidence.to_string(),
                reason: "minimum confidence must be within [0, 1]".to_string(),
            });
        }

        Ok(())
    }

    /// Register enabled sources on a manager and install their credential
    /// lists. Blank and unfilled-placeholder credentials are dropped; keyed
    /// sources left without any usable credential enter the terminal
    /// `disabled` state and never surface as available.
    pub fn apply_to_manager(&self, manager: &FailoverManager) {
        for source in &self.passive.enabled_sources {
            let credentials: Vec<Credential> = self
                .credentials
                .get(source)
                .iter()
                .filter(|c| !c.is_empty() && !c.is_placeholder())
                .cloned()
                .collect();
            if sources::requires_credential(source) && credentials.is_empty() {
                manager.disable_source(source);
                continue;
            }
            manager.register_source(source);
            manager.set_credentials(source, credentials);
        }
    }

    /// Build a manager wired from this configuration.
    pub fn build_manager(&self) -> FailoverManager {
        let manager =
            FailoverManager::with_cooldown(self.passive.failover, self.passive.rate_limit_cooldown);
        self.apply_to_manager(&manager);
        manager
    }
}

/// Configuration-related errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Invalid configuration value.
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Missing required configuration.
    MissingRequired { field: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue {
                field,
                value,
                reason,
            } => {
                write!(f, "Invalid value '{}' for '{}': {}", value, field, reason)
            }
            ConfigError::MissingRequired { field } => {
                write!(f, "Missing required configuration field: {}", field)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failover::SourceState;
    use std::env;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.passive.enabled_sources.len(), 10);
        assert!(config.passive.failover);
        assert_eq!(config.passive.validation_timeout, Duration::from_secs(10));
        assert_eq!(config.scoring.base_score, 0.3);
        assert!(!config.credentials.is_configured(sources::SHODAN));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.passive.validation_timeout = Duration::from_secs(0);
        assert!(config.validate().is_err());

        config.passive.validation_timeout = Duration::from_secs(10);
        config.scoring.min_confidence = 1.5;
        assert!(config.validate().is_err());

        config.scoring.min_confidence = 0.7;
        config.passive.enabled_sources = vec!["Shodan".to_string()];
        assert!(config.validate().is_err());

        config.passive.enabled_sources.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_loading() {
        unsafe {
            env::set_var("ORIGINSCOUT_SHODAN_KEYS", "key1, key2");
            env::set_var("ORIGINSCOUT_CENSYS_CREDS", "id1:secret1,id2:secret2");
            env::set_var("ORIGINSCOUT_VALIDATION_TIMEOUT_SECS", "15");
            env::set_var("ORIGINSCOUT_MIN_CONFIDENCE", "0.6");
        }

        let config = Config::from_env();
        assert_eq!(
            config.credentials.get(sources::SHODAN),
            &[Credential::key("key1"), Credential::key("key2")]
        );
        assert_eq!(
            config.credentials.get(sources::CENSYS),
            &[
                Credential::pair("id1", "secret1"),
                Credential::pair("id2", "secret2"),
            ]
        );
        assert_eq!(config.passive.validation_timeout, Duration::from_secs(15));
        assert_eq!(config.scoring.min_confidence, 0.6);

        // Clean up
        unsafe {
            env::remove_var("ORIGINSCOUT_SHODAN_KEYS");
            env::remove_var("ORIGINSCOUT_CENSYS_CREDS");
            env::remove_var("ORIGINSCOUT_VALIDATION_TIMEOUT_SECS");
            env::remove_var("ORIGINSCOUT_MIN_CONFIDENCE");
        }
    }

    #[test]
    fn apply_to_manager_wires_sources() {
        let mut config = Config::default();
        config.passive.enabled_sources = vec![
            sources::SHODAN.to_string(),
            sources::CENSYS.to_string(),
            sources::CT.to_string(),
            sources::VIRUSTOTAL.to_string(),
        ];
        config
            .credentials
            .set(sources::SHODAN, vec![Credential::key("key1")]);
        // Placeholder-only lists count as unconfigured.
        config
            .credentials
            .set(sources::VIRUSTOTAL, vec![Credential::key("YOUR_VT_KEY")]);

        let manager = config.build_manager();

        // Keyed + configured: registered with credentials.
        assert_eq!(
            manager.current_credential(sources::SHODAN).unwrap(),
            Credential::key("key1")
        );

        // Keyed + unconfigured: terminal disabled.
        let censys = manager.status(sources::CENSYS).unwrap();
        assert_eq!(censys.status, SourceState::Disabled);
        let virustotal = manager.status(sources::VIRUSTOTAL).unwrap();
        assert_eq!(virustotal.status, SourceState::Disabled);

        // Keyless: registered and attemptable without credentials.
        let available = manager.available_sources();
        assert!(available.contains(&"ct".to_string()));
        assert!(!available.contains(&"censys".to_string()));
    }

    #[test]
    fn credentials_config_helpers() {
        let mut creds = CredentialsConfig::default();
        creds.add(sources::SHODAN, Credential::key("a"));
        creds.add(sources::SHODAN, Credential::key("b"));

        assert_eq!(creds.get(sources::SHODAN).len(), 2);
        assert!(creds.is_configured(sources::SHODAN));
        assert!(!creds.is_configured(sources::CENSYS));
        assert!(creds.get("nosuch").is_empty());
    }
}
