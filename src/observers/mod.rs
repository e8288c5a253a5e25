//! # Outcome observers.
//!
//! Success/failure events leave the broker through an explicit registration list
//! rather than through callbacks baked into the broker.
//!
//! ## Architecture
//! ```text
//! worker task ── send(item) ──► Ok / Err(SendError)
//!                                  │
//!                                  ▼
//!                            ObserverSet::succeeded / failed     (on the worker's own task)
//!                                  │
//!                  ┌───────────────┼────────────────┐
//!                  ▼               ▼                ▼
//!             LogObserver   ChannelObserver    custom Observe
//! ```
//!
//! ## Concurrency contract
//! - Observers are invoked by whichever worker handled the item, concurrently with other
//!   workers and with other items of the same batch.
//! - No ordering across items or workers.
//! - A worker does not start its next batch until every observer call of the current
//!   batch returned; a slow observer slows its worker.
//! - Items dropped by an immediate stop or by a cancelled worker produce no call at all.

mod channel;
#[cfg(feature = "logging")]
mod log;
mod observer;
mod set;

pub use channel::{ChannelObserver, Outcome};
#[cfg(feature = "logging")]
pub use log::LogObserver;
pub use observer::Observe;
pub use set::ObserverSet;
