//! # Broker configuration.
//!
//! Provides [`BrokerConfig`], the settings a [`ServiceBroker`](crate::ServiceBroker) is created with.
//!
//! ## Sentinel values
//! - `stop_grace = None` → `stop()` waits for every worker without a deadline

use std::time::Duration;

/// Settings for the broker runtime.
///
/// ## Field semantics
/// - `scale_size`: Initial target worker count (must be `> 0`; validated by the broker)
/// - `stop_grace`: Optional deadline for `stop()` to join workers
///
/// ## Notes
/// `scale_size` is only the starting value; it can be changed at any time with
/// [`ServiceBroker::change_scale`](crate::ServiceBroker::change_scale).
#[derive(Clone, Debug)]
pub struct BrokerConfig {
    /// Number of workers materialized by `start()`.
    pub scale_size: usize,

    /// Maximum time `stop()` waits for workers to finish.
    ///
    /// - `None` = wait as long as it takes (a connection whose send never returns
    ///   blocks `stop()` forever)
    /// - `Some(d)` = workers still running after `d` are aborted and `stop()` returns
    ///   `BrokerError::GraceExceeded`
    pub stop_grace: Option<Duration>,
}

impl BrokerConfig {
    /// Sets the initial scale size.
    #[must_use]
    pub fn with_scale_size(mut self, scale_size: usize) -> Self {
        self.scale_size = scale_size;
        self
    }

    /// Enables a bounded join for `stop()`.
    #[must_use]
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = Some(grace);
        self
    }
}

impl Default for BrokerConfig {
    /// Default configuration:
    ///
    /// - `scale_size = 1`
    /// - `stop_grace = None` (unbounded join)
    fn default() -> Self {
        Self {
            scale_size: 1,
            stop_grace: None,
        }
    }
}
