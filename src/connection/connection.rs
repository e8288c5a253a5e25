//! # Transport capability traits.
//!
//! A [`Connection`] sends exactly one notification per call and reports a classified
//! [`SendError`] on failure. The broker never retries; it only forwards the outcome to
//! its observers.
//!
//! Every worker owns its own connection, obtained from the broker's
//! [`ConnectionFactory`] when the worker is created. A connection may still be driven
//! concurrently by its worker (all items of one batch are in flight at once), hence
//! `send` takes `&self`.
//!
//! # Example
//! ```
//! use async_trait::async_trait;
//! use pushvisor::{Connection, Notification, SendError};
//!
//! struct Ping(String);
//!
//! impl Notification for Ping {
//!     fn target(&self) -> &str { &self.0 }
//! }
//!
//! struct Loopback;
//!
//! #[async_trait]
//! impl Connection<Ping> for Loopback {
//!     async fn send(&self, _n: &Ping) -> Result<(), SendError> {
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::SendError;

/// Item carried by a broker.
///
/// Notifications are immutable once enqueued; they are shared by reference with the
/// connection and with observers.
pub trait Notification: Send + Sync + 'static {
    /// Destination address (device channel, URI, ...) used in logs.
    fn target(&self) -> &str;
}

/// Sends single notifications through one transport.
#[async_trait]
pub trait Connection<N: Notification>: Send + Sync + 'static {
    /// Sends one notification.
    ///
    /// Returns `Ok(())` on delivery acceptance, otherwise a classified [`SendError`].
    async fn send(&self, notification: &N) -> Result<(), SendError>;
}

/// Produces connections, one per worker.
pub trait ConnectionFactory<N: Notification>: Send + Sync + 'static {
    /// Creates a fresh connection. Called once per worker at scale-up.
    fn create(&self) -> Box<dyn Connection<N>>;
}
