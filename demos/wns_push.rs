//! # Example: wns_push
//!
//! Sends a toast and a badge update to one WNS channel and prints the outcomes.
//!
//! Shows how to:
//! - Load credentials with [`WnsConfig::from_env`] (`.env` supported)
//! - Build a broker with [`wns_broker`] and scale it at runtime
//! - Pull outcomes from a [`ChannelObserver`] and react to each [`SendError`] class
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► WnsConfig::from_env()
//!   ├─► wns_broker(config, scale 2) + LogObserver + ChannelObserver
//!   ├─► start() ─► queue toast, badge
//!   ├─► stop(false)   (drains both, waits for workers)
//!   └─► print one line per outcome
//! ```
//!
//! ## Run
//! ```bash
//! WNS_PACKAGE_SID=ms-app://... WNS_CLIENT_SECRET=... WNS_CHANNEL_URI=https://... \
//!   RUST_LOG=pushvisor=debug cargo run --example wns_push
//! ```

use std::sync::Arc;

use anyhow::Context;
use pushvisor::{
    BrokerConfig, ChannelObserver, Outcome, SendError,
    wns::{WnsCachePolicy, WnsConfig, WnsNotification, WnsNotificationStatus, wns_broker},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 1. Credentials and target channel
    let config = WnsConfig::from_env().context("loading WNS configuration")?;
    let channel = std::env::var("WNS_CHANNEL_URI").context("WNS_CHANNEL_URI is not set")?;

    // 2. Broker with two workers
    let broker = wns_broker(config, BrokerConfig::default().with_scale_size(2))?;
    #[cfg(feature = "logging")]
    broker.subscribe(Arc::new(pushvisor::LogObserver));
    let (observer, mut outcomes) = ChannelObserver::new();
    broker.subscribe(Arc::new(observer));

    broker.start().await?;

    // 3. Enqueue
    broker.queue_notification(
        WnsNotification::toast(
            channel.as_str(),
            "<toast><visual><binding template=\"ToastGeneric\">\
             <text>pushvisor</text><text>Hello from Rust</text>\
             </binding></visual></toast>",
        )
        .with_time_to_live(3600),
    )?;
    broker.queue_notification(
        WnsNotification::badge(channel.as_str(), "<badge value=\"7\"/>")
            .with_cache_policy(WnsCachePolicy::Cache)
            .with_request_for_status(true),
    )?;

    // 4. Drain and wait
    broker.stop(false).await?;

    // 5. Report
    while let Ok(outcome) = outcomes.try_recv() {
        let kind = outcome.notification().kind.wns_type();
        match outcome {
            Outcome::Succeeded(_) => println!("[{kind}] delivered"),
            Outcome::Failed(_, SendError::RetryAfter { retry_not_before, .. }) => {
                println!("[{kind}] retry after {retry_not_before}")
            }
            Outcome::Failed(_, SendError::TargetExpired { old_target, .. }) => {
                println!("[{kind}] channel expired, drop {old_target}")
            }
            Outcome::Failed(_, err) => match err.protocol_status::<WnsNotificationStatus>() {
                Some(status) => println!("[{kind}] rejected: {status}"),
                None => println!("[{kind}] failed: {err}"),
            },
        }
    }

    Ok(())
}
