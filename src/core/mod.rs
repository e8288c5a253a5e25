//! Runtime core: queue, workers and the broker.
//!
//! The public API from this module is [`ServiceBroker`] (with [`BrokerState`]),
//! [`BrokerConfig`] and [`NotificationQueue`].
//!
//! Internal modules:
//! - [`queue`]: unbounded MPMC buffer with a completion signal;
//! - [`worker`]: one dispatch loop bound to one connection;
//! - [`broker`]: owns queue and workers, handles scaling and shutdown;
//! - [`config`]: broker settings.

mod broker;
mod config;
mod queue;
mod worker;

pub use broker::{BrokerState, ServiceBroker};
pub use config::BrokerConfig;
pub use queue::NotificationQueue;
