//! # WNS connection and its factory.
//!
//! [`WnsConnectionFactory`] validates the [`WnsConfig`] once and owns what every
//! connection shares: one `reqwest::Client` (connection pool) and one
//! [`AccessTokenManager`]. Each broker worker gets its own [`WnsConnection`].
//!
//! ## Send flow
//! ```text
//! send(n)
//!   ├─► token = tokens.get_access_token()       (Err ─► SendError::Auth)
//!   ├─► POST n.channel_uri with WNS headers + body (Err ─► SendError::Transport)
//!   ├─► status = WnsNotificationStatus::parse(..)
//!   ├─► 401? ─► tokens.invalidate_access_token(token)
//!   └─► classify(status, now)
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{RequestBuilder, StatusCode, header::CONTENT_TYPE};
use tracing::debug;

use crate::{
    connection::{Connection, ConnectionFactory},
    error::{ConfigError, SendError},
    wns::{
        config::WnsConfig,
        notification::{WnsBody, WnsKind, WnsNotification},
        status::{WnsNotificationStatus, classify},
        token::AccessTokenManager,
    },
};

const XML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";
const RAW_CONTENT_TYPE: &str = "application/octet-stream";

/// Sends notifications to WNS channel URIs.
pub struct WnsConnection {
    client: reqwest::Client,
    tokens: Arc<AccessTokenManager>,
}

impl WnsConnection {
    /// Creates a connection over a shared client and token manager.
    pub fn new(client: reqwest::Client, tokens: Arc<AccessTokenManager>) -> Self {
        Self { client, tokens }
    }

    fn request(&self, n: &WnsNotification, token: &str) -> RequestBuilder {
        let mut req = self
            .client
            .post(&n.channel_uri)
            .header("X-WNS-Type", n.kind.wns_type())
            .bearer_auth(token);

        if let Some(enabled) = n.request_for_status {
            req = req.header("X-WNS-RequestForStatus", if enabled { "true" } else { "false" });
        }
        if let Some(ttl) = n.time_to_live {
            req = req.header("X-WNS-TTL", ttl.to_string());
        }

        match &n.kind {
            WnsKind::Tile { cache_policy, tag } => {
                if let Some(policy) = cache_policy {
                    req = req.header("X-WNS-Cache-Policy", policy.as_header());
                }
                if let Some(tag) = tag.as_deref().filter(|t| !t.is_empty()) {
                    req = req.header("X-WNS-Tag", tag);
                }
            }
            WnsKind::Badge { cache_policy } => {
                if let Some(policy) = cache_policy {
                    req = req.header("X-WNS-Cache-Policy", policy.as_header());
                }
            }
            WnsKind::Toast => {
                req = req.header("X-WindowsPhone-Target", "toast");
            }
            WnsKind::Raw => {}
        }

        match &n.body {
            WnsBody::Xml(xml) => req.header(CONTENT_TYPE, XML_CONTENT_TYPE).body(xml.clone()),
            WnsBody::Raw(bytes) => req.header(CONTENT_TYPE, RAW_CONTENT_TYPE).body(bytes.clone()),
        }
    }
}

#[async_trait]
impl Connection<WnsNotification> for WnsConnection {
    async fn send(&self, n: &WnsNotification) -> Result<(), SendError> {
        debug!(dest = %n.channel_uri, kind = n.kind.wns_type(), "sending notification");

        let token = self.tokens.get_access_token().await?;
        let resp = self.request(n, &token).send().await?;

        let status = WnsNotificationStatus::parse(&n.channel_uri, resp.status(), resp.headers());
        debug!(dest = %n.channel_uri, status = %status, "wns response");

        if status.http_status == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate_access_token(&token);
        }
        classify(status, Utc::now())
    }
}

/// Builds [`WnsConnection`]s sharing one HTTP client and one token manager.
pub struct WnsConnectionFactory {
    client: reqwest::Client,
    tokens: Arc<AccessTokenManager>,
}

impl WnsConnectionFactory {
    /// Validates `config` and prepares the shared client and token manager.
    pub fn new(config: WnsConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        let tokens = Arc::new(AccessTokenManager::new(client.clone(), Arc::new(config)));
        Ok(Self { client, tokens })
    }

    /// Token manager shared by every connection of this factory.
    pub fn access_tokens(&self) -> &Arc<AccessTokenManager> {
        &self.tokens
    }
}

impl ConnectionFactory<WnsNotification> for WnsConnectionFactory {
    fn create(&self) -> Box<dyn Connection<WnsNotification>> {
        Box::new(WnsConnection::new(
            self.client.clone(),
            Arc::clone(&self.tokens),
        ))
    }
}
