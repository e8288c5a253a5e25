//! # Windows Push Notification Services transport.
//!
//! - [`WnsNotification`] - toast/tile/badge/raw notification for one channel URI
//! - [`WnsConnection`] / [`WnsConnectionFactory`] - HTTP delivery over a shared `reqwest::Client`
//! - [`AccessTokenManager`] - cached OAuth token with single-flight renewal
//! - [`WnsNotificationStatus`] - parsed response status, carried by `SendError::Protocol`
//! - [`WnsConfig`] - credentials and endpoints
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use pushvisor::{BrokerConfig, LogObserver};
//! use pushvisor::wns::{WnsConfig, WnsNotification, wns_broker};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker = wns_broker(
//!         WnsConfig::new("ms-app://s-1-15-2-0000", "client-secret"),
//!         BrokerConfig::default().with_scale_size(2),
//!     )?;
//!     broker.subscribe(Arc::new(LogObserver));
//!
//!     broker.start().await?;
//!     broker.queue_notification(WnsNotification::toast(
//!         "https://db5.notify.windows.com/?token=AwYAAAB",
//!         "<toast><visual><binding template=\"ToastGeneric\"><text>hi</text></binding></visual></toast>",
//!     ))?;
//!     broker.stop(false).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod connection;
mod notification;
mod status;
mod token;

pub use config::{DEFAULT_TOKEN_URL, WnsConfig};
pub use connection::{WnsConnection, WnsConnectionFactory};
pub use notification::{WnsBody, WnsCachePolicy, WnsKind, WnsNotification};
pub use status::{
    AUTH_RETRY_DELAY_SECS, WnsDeviceConnectionStatus, WnsNotificationStatus, WnsSendStatus,
    classify,
};
pub use token::AccessTokenManager;

use crate::{
    core::{BrokerConfig, ServiceBroker},
    error::ConfigError,
};

/// Broker carrying WNS notifications.
pub type WnsServiceBroker = ServiceBroker<WnsNotification>;

/// Builds an idle WNS broker.
///
/// Invalid credentials or a zero scale size fail here, before anything is sent.
pub fn wns_broker(
    config: WnsConfig,
    broker_config: BrokerConfig,
) -> Result<WnsServiceBroker, ConfigError> {
    let scale = broker_config.scale_size;
    let factory = WnsConnectionFactory::new(config)?;
    ServiceBroker::new(factory, broker_config).map_err(|_| ConfigError::Invalid {
        key: "scale_size",
        value: scale.to_string(),
    })
}
