//! # pushvisor
//!
//! **Pushvisor** is an async push-notification dispatch engine for Rust.
//!
//! Callers enqueue notifications into a [`ServiceBroker`]; a resizable pool of workers,
//! each bound to its own [`Connection`], drains the queue in batches and sends every
//! item of a batch concurrently. Outcomes leave the broker through registered
//! [`Observe`] implementations. The crate ships a transport for Windows Push
//! Notification Services in [`wns`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   queue_notification(n) ──► ┌──────────────────────────────────────────┐
//!                             │  NotificationQueue (unbounded, MPMC)     │
//!                             └──────┬──────────────┬──────────────┬─────┘
//!                                    ▼              ▼              ▼
//!                             ┌────────────┐ ┌────────────┐ ┌────────────┐
//!                             │  Worker #1 │ │  Worker #2 │ │  Worker #n │  ◄── change_scale(n)
//!                             │ Connection │ │ Connection │ │ Connection │
//!                             └─────┬──────┘ └─────┬──────┘ └─────┬──────┘
//!                                   │ send(item) per item of a batch, concurrently
//!                                   ▼              ▼              ▼
//!                             ┌──────────────────────────────────────────┐
//!                             │  ObserverSet                             │
//!                             │  on_succeeded(n) / on_failed(n, err)     │
//!                             └──────┬───────────────────┬───────────────┘
//!                                    ▼                   ▼
//!                               LogObserver        ChannelObserver, custom
//! ```
//!
//! ### Worker loop
//! ```text
//! loop {
//!   ├─► cancelled or queue completed ─► exit
//!   ├─► batch = drain everything currently buffered (waits while empty)
//!   ├─► send all items of the batch concurrently
//!   │       ├─ Ok  ──► observers.on_succeeded(n)
//!   │       └─ Err ──► observers.on_failed(n, SendError)
//!   │                  ├─ RetryAfter    ─► caller may resend after retry_not_before
//!   │                  ├─ TargetExpired ─► caller should deregister the target
//!   │                  ├─ Protocol      ─► transport status attached
//!   │                  ├─ Auth          ─► credentials could not be obtained
//!   │                  └─ Transport     ─► network/decoding fault
//!   └─► next batch only after the whole batch settled
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Broker**        | Queue, worker pool, scaling, graceful or immediate stop.      | [`ServiceBroker`], [`BrokerState`]          |
//! | **Connections**   | Pluggable transports, one connection per worker.              | [`Connection`], [`ConnectionFactory`]       |
//! | **Observers**     | Success/failure outcomes for every dispatched notification.   | [`Observe`], [`ChannelObserver`]            |
//! | **Errors**        | Typed, labeled errors; per-item failures are classified.      | [`SendError`], [`BrokerError`]              |
//! | **Configuration** | Broker settings and WNS credentials.                          | [`BrokerConfig`], [`wns::WnsConfig`]        |
//! | **WNS**           | Toast/tile/badge/raw delivery with cached OAuth token.        | [`wns::WnsConnectionFactory`]               |
//!
//! ## Optional features
//! - `logging` _(default)_: exports [`LogObserver`], which logs every outcome through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use pushvisor::{
//!     BrokerConfig, ChannelObserver, Connection, FactoryFn, Notification, Outcome, SendError,
//!     ServiceBroker,
//! };
//!
//! #[derive(Clone, Debug)]
//! struct Sms { phone: String, text: String }
//!
//! impl Notification for Sms {
//!     fn target(&self) -> &str { &self.phone }
//! }
//!
//! struct Gateway;
//!
//! #[async_trait]
//! impl Connection<Sms> for Gateway {
//!     async fn send(&self, sms: &Sms) -> Result<(), SendError> {
//!         if sms.text.is_empty() {
//!             return Err(SendError::TargetExpired {
//!                 old_target: sms.phone.clone(),
//!                 expired_at: chrono::Utc::now(),
//!             });
//!         }
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker = ServiceBroker::new(
//!         FactoryFn::new(|| Gateway),
//!         BrokerConfig::default().with_scale_size(2),
//!     )?;
//!
//!     let (observer, mut outcomes) = ChannelObserver::new();
//!     broker.subscribe(Arc::new(observer));
//!
//!     broker.start().await?;
//!     broker.queue_notification(Sms { phone: "+100".into(), text: "hi".into() })?;
//!     broker.queue_notification(Sms { phone: "+200".into(), text: String::new() })?;
//!     broker.stop(false).await?;
//!
//!     let mut failed = 0;
//!     while let Ok(outcome) = outcomes.try_recv() {
//!         if let Outcome::Failed(_, err) = outcome {
//!             assert!(!err.is_retryable());
//!             failed += 1;
//!         }
//!     }
//!     assert_eq!(failed, 1);
//!     Ok(())
//! }
//! ```
mod connection;
mod core;
mod error;
mod observers;
pub mod wns;

// ---- Public re-exports ----

pub use connection::{Connection, ConnectionFactory, FactoryFn, Notification};
pub use core::{BrokerConfig, BrokerState, NotificationQueue, ServiceBroker};
pub use error::{AuthError, BrokerError, ConfigError, SendError};
pub use observers::{ChannelObserver, Observe, ObserverSet, Outcome};

// Optional: log every outcome through `tracing`.
// Enabled by default; disable with `default-features = false`.
#[cfg(feature = "logging")]
pub use observers::LogObserver;
