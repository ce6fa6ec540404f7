//! Per-source validation probes and their registry.
//!
//! Each probe implements a uniform async trait so the failover manager can
//! health-check a source before fetch tasks spend a credential on it. Keyed
//! providers reject blank or template credentials before any I/O; free
//! services reduce to a reachability check; DNS-style sources always pass
//! and fail only during actual use.
//!
//! The registry is built once at startup and maps each known source
//! identifier to a factory, so call sites never hard-code provider wiring.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::credentials::Credential;
use crate::errors::{OriginScoutError, Result};
use crate::sources;

/// Per-request timeout applied by the shared probe client.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Health check for one passive source.
#[async_trait]
pub trait SourceValidator: Send + Sync {
    fn source(&self) -> &'static str;

    /// Cheap provider probe: `Ok` means the source may be queried with the
    /// credential it was built with.
    async fn probe(&self) -> Result<()>;
}

/// Map an HTTP status to the probe outcome shared by all keyed providers.
fn check_status(source: &'static str, status: StatusCode) -> Result<()> {
    match status.as_u16() {
        200 => Ok(()),
        401 | 403 => Err(OriginScoutError::invalid_credential(
            source,
            "credential rejected by provider",
        )),
        429 => Err(OriginScoutError::rate_limited(source)),
        code => Err(OriginScoutError::probe_failed(
            source,
            format!("unexpected status {code}"),
        )),
    }
}

fn request_error(source: &'static str, err: reqwest::Error) -> OriginScoutError {
    OriginScoutError::network("validation probe", source, err)
}

/// Reject blank or sample-config credentials before any I/O.
fn check_key_shape(source: &'static str, key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(OriginScoutError::invalid_credential(
            source,
            "API key not configured",
        ));
    }
    if key.contains("YOUR_") {
        return Err(OriginScoutError::invalid_credential(
            source,
            "API key is an unfilled placeholder",
        ));
    }
    Ok(())
}

/* -------------------------------------------------------------------------- */
/*                              Keyed providers                               */
/* -------------------------------------------------------------------------- */

pub struct ShodanValidator {
    key: String,
    client: Client,
}

#[async_trait]
impl SourceValidator for ShodanValidator {
    fn source(&self) -> &'static str {
        sources::SHODAN
    }

    async fn probe(&self) -> Result<()> {
        check_key_shape(self.source(), &self.key)?;
        let url = format!("https://api.shodan.io/account/profile?key={}", self.key);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(self.source(), e))?;
        check_status(self.source(), resp.status())
    }
}

pub struct CensysValidator {
    id: String,
    secret: String,
    client: Client,
}

#[async_trait]
impl SourceValidator for CensysValidator {
    fn source(&self) -> &'static str {
        sources::CENSYS
    }

    async fn probe(&self) -> Result<()> {
        if self.id.trim().is_empty() || self.secret.trim().is_empty() {
            return Err(OriginScoutError::invalid_credential(
                self.source(),
                "API credentials not configured",
            ));
        }
        let resp = self
            .client
            .get("https://search.censys.io/api/v2/account")
            .basic_auth(&self.id, Some(&self.secret))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| request_error(self.source(), e))?;
        check_status(self.source(), resp.status())
    }
}

pub struct SecurityTrailsValidator {
    key: String,
    client: Client,
}

#[async_trait]
impl SourceValidator for SecurityTrailsValidator {
    fn source(&self) -> &'static str {
        sources::SECURITYTRAILS
    }

    async fn probe(&self) -> Result<()> {
        check_key_shape(self.source(), &self.key)?;
        let resp = self
            .client
            .get("https://api.securitytrails.com/v1/account/usage")
            .header("APIKEY", &self.key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| request_error(self.source(), e))?;
        check_status(self.source(), resp.status())
    }
}

pub struct VirusTotalValidator {
    key: String,
    client: Client,
}

#[async_trait]
impl SourceValidator for VirusTotalValidator {
    fn source(&self) -> &'static str {
        sources::VIRUSTOTAL
    }

    async fn probe(&self) -> Result<()> {
        check_key_shape(self.source(), &self.key)?;
        // VirusTotal keys are 64 hex chars; anything else fails during use.
        if self.key.len() != 64 {
            return Err(OriginScoutError::invalid_credential(
                self.source(),
                "API key has invalid length",
            ));
        }
        let resp = self
            .client
            .get("https://www.virustotal.com/api/v3/domains/google.com")
            .header("x-apikey", &self.key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| request_error(self.source(), e))?;
        check_status(self.source(), resp.status())
    }
}

pub struct ZoomEyeValidator {
    key: String,
    client: Client,
}

#[async_trait]
impl SourceValidator for ZoomEyeValidator {
    fn source(&self) -> &'static str {
        sources::ZOOMEYE
    }

    async fn probe(&self) -> Result<()> {
        check_key_shape(self.source(), &self.key)?;
        let resp = self
            .client
            .get("https://api.zoomeye.org/resources-info")
            .header("API-KEY", &self.key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| request_error(self.source(), e))?;
        check_status(self.source(), resp.status())
    }
}

/* -------------------------------------------------------------------------- */
/*                              Free services                                 */
/* -------------------------------------------------------------------------- */

pub struct CtValidator {
    client: Client,
}

#[async_trait]
impl SourceValidator for CtValidator {
    fn source(&self) -> &'static str {
        sources::CT
    }

    async fn probe(&self) -> Result<()> {
        let resp = self
            .client
            .get("https://crt.sh/?output=json&q=example.com")
            .send()
            .await
            .map_err(|e| request_error(self.source(), e))?;
        check_status(self.source(), resp.status())?;

        // crt.sh signals trouble with HTML error pages; require a JSON array.
        let body = resp
            .text()
            .await
            .map_err(|e| request_error(self.source(), e))?;
        serde_json::from_str::<Vec<serde_json::Value>>(&body).map_err(|e| {
            OriginScoutError::probe_failed(self.source(), format!("invalid JSON response: {e}"))
        })?;
        Ok(())
    }
}

pub struct ViewDnsValidator {
    client: Client,
}

#[async_trait]
impl SourceValidator for ViewDnsValidator {
    fn source(&self) -> &'static str {
        sources::VIEWDNS
    }

    async fn probe(&self) -> Result<()> {
        let resp = self
            .client
            .get("https://viewdns.info/reverseip/?host=8.8.8.8&t=1")
            .send()
            .await
            .map_err(|e| request_error(self.source(), e))?;
        if resp.status().as_u16() == 200 {
            Ok(())
        } else {
            Err(OriginScoutError::service_unavailable(
                self.source(),
                format!("status {}", resp.status().as_u16()),
            ))
        }
    }
}

pub struct WaybackValidator {
    client: Client,
}

#[async_trait]
impl SourceValidator for WaybackValidator {
    fn source(&self) -> &'static str {
        sources::WAYBACK
    }

    async fn probe(&self) -> Result<()> {
        let resp = self
            .client
            .get("https://web.archive.org/cdx/search/cdx?url=example.com&output=json&limit=1")
            .send()
            .await
            .map_err(|e| request_error(self.source(), e))?;
        check_status(self.source(), resp.status())
    }
}

/// DNSDumpster has no cheap health endpoint; availability shows up during
/// actual use.
pub struct DnsDumpsterValidator;

#[async_trait]
impl SourceValidator for DnsDumpsterValidator {
    fn source(&self) -> &'static str {
        sources::DNSDUMPSTER
    }

    async fn probe(&self) -> Result<()> {
        Ok(())
    }
}

/// Plain DNS collection is available unless the network itself is down.
pub struct DnsValidator;

#[async_trait]
impl SourceValidator for DnsValidator {
    fn source(&self) -> &'static str {
        sources::DNS
    }

    async fn probe(&self) -> Result<()> {
        Ok(())
    }
}

/* -------------------------------------------------------------------------- */
/*                                 Registry                                   */
/* -------------------------------------------------------------------------- */

type ValidatorFactory = fn(&Client, Option<&Credential>) -> Result<Box<dyn SourceValidator>>;

fn require_key(source: &'static str, credential: Option<&Credential>) -> Result<String> {
    match credential {
        Some(Credential::Key(key)) => Ok(key.clone()),
        Some(Credential::Pair { .. }) => Err(OriginScoutError::configuration(format!(
            "{source} expects a single API key, not an ID/secret pair"
        ))),
        None => Err(OriginScoutError::no_credentials(source)),
    }
}

fn require_pair(source: &'static str, credential: Option<&Credential>) -> Result<(String, String)> {
    match credential {
        Some(Credential::Pair { id, secret }) => Ok((id.clone(), secret.clone())),
        Some(Credential::Key(_)) => Err(OriginScoutError::configuration(format!(
            "{source} expects an ID/secret pair, not a single API key"
        ))),
        None => Err(OriginScoutError::no_credentials(source)),
    }
}

/// Builds validators for every known source. Construct once at startup; the
/// underlying HTTP client is shared across probes.
pub struct ValidatorRegistry {
    client: Client,
    factories: HashMap<&'static str, ValidatorFactory>,
}

impl ValidatorRegistry {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(PROBE_TIMEOUT)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| OriginScoutError::network("client setup", "reqwest", e))?;

        let mut factories: HashMap<&'static str, ValidatorFactory> = HashMap::new();
        factories.insert(sources::SHODAN, |client, cred| {
            Ok(Box::new(ShodanValidator {
                key: require_key(sources::SHODAN, cred)?,
                client: client.clone(),
            }))
        });
        factories.insert(sources::CENSYS, |client, cred| {
            let (id, secret) = require_pair(sources::CENSYS, cred)?;
            Ok(Box::new(CensysValidator {
                id,
                secret,
                client: client.clone(),
            }))
        });
        factories.insert(sources::SECURITYTRAILS, |client, cred| {
            Ok(Box::new(SecurityTrailsValidator {
                key: require_key(sources::SECURITYTRAILS, cred)?,
                client: client.clone(),
            }))
        });
        factories.insert(sources::VIRUSTOTAL, |client, cred| {
            Ok(Box::new(VirusTotalValidator {
                key: require_key(sources::VIRUSTOTAL, cred)?,
                client: client.clone(),
            }))
        });
        factories.insert(sources::ZOOMEYE, |client, cred| {
            Ok(Box::new(ZoomEyeValidator {
                key: require_key(sources::ZOOMEYE, cred)?,
                client: client.clone(),
            }))
        });
        factories.insert(sources::CT, |client, _| {
            Ok(Box::new(CtValidator {
                client: client.clone(),
            }))
        });
        factories.insert(sources::VIEWDNS, |client, _| {
            Ok(Box::new(ViewDnsValidator {
                client: client.clone(),
            }))
        });
        factories.insert(sources::WAYBACK, |client, _| {
            Ok(Box::new(WaybackValidator {
                client: client.clone(),
            }))
        });
        factories.insert(sources::DNSDUMPSTER, |_, _| Ok(Box::new(DnsDumpsterValidator)));
        factories.insert(sources::DNS, |_, _| Ok(Box::new(DnsValidator)));

        Ok(Self { client, factories })
    }

    /// Build the validator for `source`, wiring in its credential where one
    /// is required. Unknown sources are a distinct error.
    pub fn for_source(
        &self,
        source: &str,
        credential: Option<&Credential>,
    ) -> Result<Box<dyn SourceValidator>> {
        let factory = self
            .factories
            .get(source)
            .ok_or_else(|| OriginScoutError::unknown_source(source))?;
        debug!(source, "building validation probe");
        factory(&self.client, credential)
    }
}
