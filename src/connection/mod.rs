//! # Connection abstractions.
//!
//! This module provides the capability types a broker is built from:
//! - [`Notification`] - anything the broker can carry to a target
//! - [`Connection`] - sends one notification through a specific transport
//! - [`ConnectionFactory`] - produces one connection per worker
//! - [`FactoryFn`] - closure-backed factory

mod connection;
mod factory_fn;

pub use connection::{Connection, ConnectionFactory, Notification};
pub use factory_fn::FactoryFn;
