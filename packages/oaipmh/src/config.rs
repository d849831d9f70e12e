//! Configuration constants and validation functions for the client.

use std::time::Duration;

use url::Url;

use crate::datestamp::Granularity;
use crate::error::{OaiError, Result};

/// XML namespace of the OAI-PMH 2.0 response envelope.
pub const OAI_NAMESPACE: &str = "http://www.openarchives.org/OAI/2.0/";

/// XML namespace of the `oai_dc` container element.
pub const OAI_DC_NAMESPACE: &str = "http://www.openarchives.org/OAI/2.0/oai_dc/";

/// XML namespace of the Dublin Core elements.
pub const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";

/// HTTP timeout in seconds.
///
/// Repositories often build large ListRecords pages on the fly, so this is
/// generous.
pub const HTTP_TIMEOUT_SECS: u64 = 60;

/// Maximum number of attempts for transient failures.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Base delay for exponential backoff (milliseconds).
pub const RETRY_BASE_DELAY_MS: u64 = 500;

/// Upper bound honoured for a server-sent `Retry-After` (seconds).
pub const MAX_RETRY_AFTER_SECS: u64 = 120;

/// Default maximum HTTP response size in bytes (100 MB).
pub const DEFAULT_MAX_RESPONSE_SIZE: u64 = 100 * 1024 * 1024;

/// User agent string identifying this harvester.
pub const USER_AGENT: &str = concat!("oaipmh-harvester/", env!("CARGO_PKG_VERSION"));

/// Validate a repository base URL.
///
/// # Arguments
/// * `base_url` - The base URL to validate
///
/// # Returns
/// * `Ok(Url)` if it parses and uses http or https
/// * `Err(OaiError::InvalidBaseUrl)` otherwise
///
/// # Examples
/// ```
/// use oaipmh_harvester::config::validate_base_url;
///
/// assert!(validate_base_url("http://dspace.ubib.eur.nl/oai/").is_ok());
/// assert!(validate_base_url("ftp://example.org/oai").is_err());
/// assert!(validate_base_url("not a url").is_err());
/// ```
pub fn validate_base_url(base_url: &str) -> Result<Url> {
    let url = Url::parse(base_url).map_err(|e| OaiError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(OaiError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme '{other}'"),
            })
        }
    }

    if url.query().is_some() {
        return Err(OaiError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: "base URL must not carry a query string".to_string(),
        });
    }

    Ok(url)
}

/// Username and password for HTTP basic authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Settings for one client session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Repository base URL.
    pub base_url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Attempts for transient failures (at least one).
    pub max_retries: u32,
    /// Base delay of the exponential backoff.
    pub retry_base_delay: Duration,
    /// Maximum accepted response body size in bytes.
    pub max_response_size: u64,
    /// Send requests as GET with a query string instead of a POST form.
    pub force_http_get: bool,
    /// Optional basic authentication.
    pub credentials: Option<Credentials>,
    /// Preset granularity; skips the Identify round-trip when set.
    pub granularity: Option<Granularity>,
}

impl ClientConfig {
    /// Create a configuration with defaults for the given base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: validate_base_url(base_url)?,
            timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            force_http_get: false,
            credentials: None,
            granularity: None,
        })
    }

    /// Read the configuration from `OAIPMH_*` environment variables.
    ///
    /// `OAIPMH_BASE_URL` is required; `OAIPMH_TIMEOUT_SECS`,
    /// `OAIPMH_MAX_RETRIES` and `OAIPMH_FORCE_HTTP_GET` are optional.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("OAIPMH_BASE_URL").map_err(|_| OaiError::InvalidBaseUrl {
            url: String::new(),
            reason: "OAIPMH_BASE_URL not set".to_string(),
        })?;

        let mut config = Self::new(&base_url)?;

        if let Some(secs) = std::env::var("OAIPMH_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(retries) = std::env::var("OAIPMH_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.max_retries = retries;
        }

        config.force_http_get = std::env::var("OAIPMH_FORCE_HTTP_GET")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn with_max_response_size(mut self, bytes: u64) -> Self {
        self.max_response_size = bytes;
        self
    }

    pub fn with_force_http_get(mut self, force: bool) -> Self {
        self.force_http_get = force;
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = Some(granularity);
        self
    }
}
