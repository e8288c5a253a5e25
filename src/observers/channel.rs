//! # ChannelObserver: outcomes as a stream
//!
//! Forwards every outcome into an unbounded `tokio::sync::mpsc` channel, for callers who
//! prefer pulling results over implementing [`Observe`].
//!
//! The channel is unbounded on purpose: a bounded one would let a slow consumer stall
//! the worker that raised the outcome. Outcomes are dropped silently once the receiver
//! is gone.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use pushvisor::{ChannelObserver, Notification};
//!
//! #[derive(Clone)]
//! struct Ping(String);
//! impl Notification for Ping {
//!     fn target(&self) -> &str { &self.0 }
//! }
//!
//! let (observer, _outcomes) = ChannelObserver::<Ping>::new();
//! let observer = Arc::new(observer);
//! // broker.subscribe(observer);
//! // while let Some(outcome) = _outcomes.recv().await { ... }
//! ```

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{connection::Notification, error::SendError, observers::Observe};

/// Outcome of one handled notification.
#[derive(Debug, Clone)]
pub enum Outcome<N> {
    /// Accepted by the transport.
    Succeeded(N),
    /// Failed with the given classification.
    Failed(N, SendError),
}

impl<N> Outcome<N> {
    /// The notification this outcome is about.
    pub fn notification(&self) -> &N {
        match self {
            Outcome::Succeeded(n) | Outcome::Failed(n, _) => n,
        }
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&SendError> {
        match self {
            Outcome::Succeeded(_) => None,
            Outcome::Failed(_, err) => Some(err),
        }
    }

    /// True for [`Outcome::Succeeded`].
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded(_))
    }
}

/// Observer that clones each outcome into a channel.
pub struct ChannelObserver<N> {
    tx: mpsc::UnboundedSender<Outcome<N>>,
}

impl<N: Notification + Clone> ChannelObserver<N> {
    /// Creates the observer and the receiving end of its channel.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outcome<N>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl<N: Notification + Clone> Observe<N> for ChannelObserver<N> {
    async fn on_succeeded(&self, n: &N) {
        let _ = self.tx.send(Outcome::Succeeded(n.clone()));
    }

    async fn on_failed(&self, n: &N, err: &SendError) {
        let _ = self.tx.send(Outcome::Failed(n.clone(), err.clone()));
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}
