//! Error types used by the broker, its workers and the transports.
//!
//! This module defines the error enums of the crate:
//!
//! - [`BrokerError`] - lifecycle and argument errors raised by [`ServiceBroker`](crate::ServiceBroker).
//! - [`SendError`] - classified outcome of one failed send attempt.
//! - [`AuthError`] - access-token renewal failures (shared by every waiter of one renewal).
//! - [`ConfigError`] - invalid or missing configuration, raised at construction.
//!
//! All of them provide `as_label` (stable snake_case for logs/metrics).
//! [`SendError::is_retryable`] tells callers whether a resend may succeed.

use std::{error::Error as StdError, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// # Errors produced by the broker itself.
///
/// These are returned synchronously to the caller of a broker method; they never
/// describe the fate of an individual notification.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// Requested scale size was zero.
    #[error("invalid scale size {requested}: must be greater than zero")]
    InvalidScale {
        /// The rejected value.
        requested: usize,
    },

    /// Operation is not valid in the broker's current lifecycle state.
    #[error("lifecycle error: {reason}")]
    Lifecycle {
        /// What was attempted and why it was refused.
        reason: &'static str,
    },

    /// Notification was offered after the queue stopped accepting input.
    #[error("queue is completed; no further notifications are accepted")]
    QueueCompleted,

    /// Opt-in bounded stop ran out of time; remaining workers were aborted.
    #[error("stop grace {grace:?} exceeded; {stuck} worker(s) aborted")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Number of workers that had not finished in time.
        stuck: usize,
    },
}

impl BrokerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use pushvisor::BrokerError;
    ///
    /// let err = BrokerError::InvalidScale { requested: 0 };
    /// assert_eq!(err.as_label(), "broker_invalid_scale");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BrokerError::InvalidScale { .. } => "broker_invalid_scale",
            BrokerError::Lifecycle { .. } => "broker_lifecycle",
            BrokerError::QueueCompleted => "broker_queue_completed",
            BrokerError::GraceExceeded { .. } => "broker_grace_exceeded",
        }
    }
}

/// # Access-token renewal failure.
///
/// Clonable so that every caller awaiting the same in-flight renewal observes
/// the same error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not retrieve access token: {reason}")]
pub struct AuthError {
    /// Human-readable cause (HTTP failure, missing fields, ...).
    pub reason: String,
}

impl AuthError {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// # Classified failure of one send attempt.
///
/// Raised through [`Observe::on_failed`](crate::Observe::on_failed); never returned to
/// the caller that enqueued the notification.
///
/// Cheap to clone: opaque sources are held behind `Arc`.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum SendError {
    /// Transient failure; the caller should not resend before `retry_not_before`.
    ///
    /// The engine never resends on its own.
    #[error("retry after {retry_not_before}: {reason}")]
    RetryAfter {
        /// Why the attempt failed.
        reason: String,
        /// Earliest time a resend makes sense.
        retry_not_before: DateTime<Utc>,
    },

    /// Destination is permanently invalid; the caller should deregister it.
    #[error("target {old_target} expired at {expired_at}")]
    TargetExpired {
        /// The target identifier that is no longer valid.
        old_target: String,
        /// When the expiry was observed.
        expired_at: DateTime<Utc>,
    },

    /// Protocol-level failure carrying the transport's full structured status.
    ///
    /// Use [`SendError::protocol_status`] to get the typed status back.
    #[error("protocol error: {0}")]
    Protocol(Arc<dyn StdError + Send + Sync>),

    /// Credentials for the transport could not be obtained.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Any other network or serialization fault.
    #[error("transport error: {0}")]
    Transport(Arc<dyn StdError + Send + Sync>),
}

impl SendError {
    /// Wraps a transport-specific status as a protocol error.
    pub fn protocol<E>(status: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        SendError::Protocol(Arc::new(status))
    }

    /// Wraps an opaque network/serialization fault.
    pub fn transport<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        SendError::Transport(Arc::new(err))
    }

    /// Returns the typed status carried by a [`SendError::Protocol`], if it is a `T`.
    pub fn protocol_status<T>(&self) -> Option<&T>
    where
        T: StdError + 'static,
    {
        match self {
            SendError::Protocol(inner) => inner.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SendError::RetryAfter { .. } => "send_retry_after",
            SendError::TargetExpired { .. } => "send_target_expired",
            SendError::Protocol(_) => "send_protocol",
            SendError::Auth(_) => "send_auth",
            SendError::Transport(_) => "send_transport",
        }
    }

    /// Indicates whether a resend may succeed.
    ///
    /// Only [`SendError::RetryAfter`] is retryable; resubmission is always the caller's job.
    ///
    /// # Example
    /// ```
    /// use chrono::Utc;
    /// use pushvisor::SendError;
    ///
    /// let transient = SendError::RetryAfter { reason: "token".into(), retry_not_before: Utc::now() };
    /// assert!(transient.is_retryable());
    ///
    /// let expired = SendError::TargetExpired { old_target: "uri".into(), expired_at: Utc::now() };
    /// assert!(!expired.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, SendError::RetryAfter { .. })
    }
}

impl From<reqwest::Error> for SendError {
    fn from(err: reqwest::Error) -> Self {
        SendError::transport(err)
    }
}

/// # Invalid configuration detected at construction time.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting is absent or empty.
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    /// A setting is present but could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    Invalid {
        /// Setting name.
        key: &'static str,
        /// Offending raw value.
        value: String,
    },

    /// The HTTP client could not be built.
    #[error("http client: {0}")]
    Client(String),
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Missing(_) => "config_missing",
            ConfigError::Invalid { .. } => "config_invalid",
            ConfigError::Client(_) => "config_client",
        }
    }
}
