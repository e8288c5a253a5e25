//! # LogObserver: outcome logger
//!
//! A minimal observer that reports every outcome through `tracing`.
//! Successes go to `debug`, transient failures to `warn`, everything else to `error`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! DEBUG pushvisor::observers::log: notification delivered dest="https://db5.notify.windows.com/?token=.."
//! WARN  pushvisor::observers::log: notification failed, retryable dest=".." label="send_retry_after" err=".."
//! ERROR pushvisor::observers::log: notification failed dest=".." label="send_target_expired" err=".."
//! ```

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::{connection::Notification, error::SendError, observers::Observe};

/// Outcome logger.
#[derive(Default, Debug, Clone, Copy)]
pub struct LogObserver;

impl LogObserver {
    /// Construct a new [`LogObserver`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl<N: Notification> Observe<N> for LogObserver {
    async fn on_succeeded(&self, n: &N) {
        debug!(dest = n.target(), "notification delivered");
    }

    async fn on_failed(&self, n: &N, err: &SendError) {
        if err.is_retryable() {
            warn!(
                dest = n.target(),
                label = err.as_label(),
                err = %err,
                "notification failed, retryable"
            );
        } else {
            error!(
                dest = n.target(),
                label = err.as_label(),
                err = %err,
                "notification failed"
            );
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
