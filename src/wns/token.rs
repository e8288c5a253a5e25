//! # AccessTokenManager: cached WNS access token with single-flight renewal.
//!
//! ## Architecture
//! ```text
//! get_access_token()
//!   ├─► cached token? ─► return it
//!   └─► lock renewal slot
//!         ├─► cached token (set meanwhile)? ─► return it
//!         ├─► pending renewal in slot?      ─► join it
//!         └─► otherwise start renewal, park it in the slot, join it
//!
//! renewal: POST token_url (form: client credentials grant)
//!   ├─► access_token + token_type present ─► cache and resolve Ok
//!   └─► anything else                     ─► clear cache and resolve AuthError
//!
//! invalidate_access_token(used) ─► clears cache only if it still holds `used`
//! ```
//!
//! ## Rules
//! - At most one renewal is in flight; every concurrent caller observes its result.
//! - A failed renewal is not cached: the next caller starts a fresh one.
//! - Invalidation compares token text, so a stale token never evicts a newer one.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    error::AuthError,
    wns::config::{WNS_SCOPE, WnsConfig},
};

type Renewal = Shared<BoxFuture<'static, Result<Arc<String>, AuthError>>>;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    token_type: Option<String>,
}

/// Shared by every WNS connection created from one factory.
pub struct AccessTokenManager {
    client: reqwest::Client,
    config: Arc<WnsConfig>,
    cached: Arc<ArcSwapOption<String>>,
    renewal: Mutex<Option<Renewal>>,
}

impl AccessTokenManager {
    /// Creates a manager with an empty cache.
    pub fn new(client: reqwest::Client, config: Arc<WnsConfig>) -> Self {
        Self {
            client,
            config,
            cached: Arc::new(ArcSwapOption::empty()),
            renewal: Mutex::new(None),
        }
    }

    /// Returns the cached token, renewing it first if needed.
    pub async fn get_access_token(&self) -> Result<Arc<String>, AuthError> {
        if let Some(token) = self.cached.load_full() {
            return Ok(token);
        }

        let renewal = {
            let mut slot = self.renewal.lock();
            if let Some(token) = self.cached.load_full() {
                return Ok(token);
            }
            match slot.as_ref() {
                Some(pending) if pending.peek().is_none() => {
                    debug!("waiting for access token renewal");
                    pending.clone()
                }
                _ => {
                    info!(url = %self.config.token_url, "renewing access token");
                    let fresh = self.renew().shared();
                    *slot = Some(fresh.clone());
                    fresh
                }
            }
        };

        renewal.await
    }

    /// Clears the cache if it still holds a token equal to `used`; returns whether it did.
    pub fn invalidate_access_token(&self, used: &str) -> bool {
        let prev = self.cached.rcu(|cur| match cur {
            Some(tok) if tok.as_str() == used => None,
            other => other.clone(),
        });
        let cleared = prev.is_some_and(|tok| tok.as_str() == used);
        if cleared {
            info!("access token invalidated");
        }
        cleared
    }

    fn renew(&self) -> BoxFuture<'static, Result<Arc<String>, AuthError>> {
        let client = self.client.clone();
        let config = Arc::clone(&self.config);
        let cached = Arc::clone(&self.cached);

        async move {
            match request_token(&client, &config).await {
                Ok(token) => {
                    let token = Arc::new(token);
                    cached.store(Some(Arc::clone(&token)));
                    Ok(token)
                }
                Err(err) => {
                    cached.store(None);
                    warn!(err = %err, "access token renewal failed");
                    Err(err)
                }
            }
        }
        .boxed()
    }
}

async fn request_token(client: &reqwest::Client, config: &WnsConfig) -> Result<String, AuthError> {
    let params = [
        ("grant_type", "client_credentials"),
        ("client_id", config.package_sid.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("scope", WNS_SCOPE),
    ];

    let resp = client
        .post(&config.token_url)
        .form(&params)
        .send()
        .await
        .map_err(|e| AuthError::new(format!("token request failed: {e}")))?;

    let status = resp.status();
    debug!(status = status.as_u16(), "access token response");

    let body: TokenResponse = resp
        .json()
        .await
        .map_err(|e| AuthError::new(format!("undecodable token response ({status}): {e}")))?;

    match (body.access_token, body.token_type) {
        (Some(token), Some(kind)) if !token.is_empty() && !kind.is_empty() => {
            debug!(token_type = %kind, "access token received");
            Ok(token)
        }
        _ => Err(AuthError::new(
            "no access token for the supplied package SID and client secret",
        )),
    }
}
