//! # Outcome observer trait.
//!
//! Provides [`Observe`], an extension point for reacting to per-notification outcomes
//! (deregistering expired targets, re-enqueueing transient failures, metrics, ...).
//!
//! ## Rules
//! - Exactly one of `on_succeeded` / `on_failed` per handled item.
//! - Calls run on the worker task that handled the item; keep them short and async.
//! - Panics are caught and logged; they never kill the worker.
//! - Retrying is the observer's decision: re-enqueue through the broker and bound the
//!   number of attempts yourself.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use pushvisor::{Notification, Observe, SendError};
//!
//! struct Ping(String);
//! impl Notification for Ping {
//!     fn target(&self) -> &str { &self.0 }
//! }
//!
//! struct Expiry;
//!
//! #[async_trait]
//! impl Observe<Ping> for Expiry {
//!     async fn on_succeeded(&self, _n: &Ping) {}
//!
//!     async fn on_failed(&self, n: &Ping, err: &SendError) {
//!         if let SendError::TargetExpired { .. } = err {
//!             // remove n.target() from the device registry
//!             let _ = n.target();
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "expiry" }
//! }
//! ```

use async_trait::async_trait;

use crate::{connection::Notification, error::SendError};

/// Receives the outcome of every notification a worker handled.
#[async_trait]
pub trait Observe<N: Notification>: Send + Sync + 'static {
    /// The notification was accepted by the transport.
    async fn on_succeeded(&self, notification: &N);

    /// The notification failed; `error` carries the full classification.
    async fn on_failed(&self, notification: &N, error: &SendError);

    /// Returns the observer name used in logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
