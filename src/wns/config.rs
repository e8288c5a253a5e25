//! # WNS credentials and endpoints.
//!
//! [`WnsConfig`] carries the package security identifier (SID) and client secret used
//! for the client-credentials grant, plus the identity endpoint and an optional
//! per-request timeout.
//!
//! ## Environment
//! | Variable                    | Required | Meaning                                  |
//! |-----------------------------|----------|------------------------------------------|
//! | `WNS_PACKAGE_SID`           | yes      | package security identifier (client id)  |
//! | `WNS_CLIENT_SECRET`         | yes      | client secret                            |
//! | `WNS_TOKEN_URL`             | no       | identity endpoint override               |
//! | `WNS_REQUEST_TIMEOUT_SECS`  | no       | per-request timeout in seconds           |

use std::time::Duration;

use crate::error::ConfigError;

/// Identity endpoint issuing WNS access tokens.
pub const DEFAULT_TOKEN_URL: &str = "https://login.live.com/accesstoken.srf";

/// OAuth scope requested for WNS.
pub(crate) const WNS_SCOPE: &str = "notify.windows.com";

/// Settings for the WNS transport.
#[derive(Clone, Debug)]
pub struct WnsConfig {
    /// Package security identifier, sent as `client_id`.
    pub package_sid: String,
    /// Client secret.
    pub client_secret: String,
    /// Identity endpoint for the client-credentials grant.
    pub token_url: String,
    /// Timeout applied to every HTTP request (`None` = client default).
    pub request_timeout: Option<Duration>,
}

impl WnsConfig {
    /// Creates a config for the default identity endpoint.
    pub fn new(package_sid: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            package_sid: package_sid.into(),
            client_secret: client_secret.into(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            request_timeout: None,
        }
    }

    /// Overrides the identity endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Sets a per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Checks that credentials and endpoint are present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.package_sid.trim().is_empty() {
            return Err(ConfigError::Missing("WNS_PACKAGE_SID"));
        }
        if self.client_secret.trim().is_empty() {
            return Err(ConfigError::Missing("WNS_CLIENT_SECRET"));
        }
        if self.token_url.trim().is_empty() {
            return Err(ConfigError::Missing("WNS_TOKEN_URL"));
        }
        Ok(())
    }

    /// Loads configuration from the environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let package_sid = get("WNS_PACKAGE_SID").ok_or(ConfigError::Missing("WNS_PACKAGE_SID"))?;
        let client_secret =
            get("WNS_CLIENT_SECRET").ok_or(ConfigError::Missing("WNS_CLIENT_SECRET"))?;

        let mut cfg = Self::new(package_sid, client_secret);
        if let Some(url) = get("WNS_TOKEN_URL") {
            cfg.token_url = url;
        }
        if let Some(raw) = get("WNS_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "WNS_REQUEST_TIMEOUT_SECS",
                value: raw.clone(),
            })?;
            cfg.request_timeout = Some(Duration::from_secs(secs));
        }

        cfg.validate()?;
        Ok(cfg)
    }
}
