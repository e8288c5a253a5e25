//! # Function-backed connection factory (`FactoryFn`)
//!
//! [`FactoryFn`] wraps a closure `F: Fn() -> C`, producing a fresh connection per call.
//! Handy for tests and for transports that need no shared state beyond what the
//! closure captures.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use pushvisor::{Connection, ConnectionFactory, FactoryFn, Notification, SendError};
//!
//! struct Ping(String);
//! impl Notification for Ping {
//!     fn target(&self) -> &str { &self.0 }
//! }
//!
//! struct Loopback;
//! #[async_trait]
//! impl Connection<Ping> for Loopback {
//!     async fn send(&self, _n: &Ping) -> Result<(), SendError> { Ok(()) }
//! }
//!
//! let factory = FactoryFn::new(|| Loopback);
//! let _conn: Box<dyn Connection<Ping>> = factory.create();
//! ```

use std::marker::PhantomData;

use crate::connection::connection::{Connection, ConnectionFactory, Notification};

/// Closure-backed [`ConnectionFactory`].
pub struct FactoryFn<F, N> {
    f: F,
    _marker: PhantomData<fn() -> N>,
}

impl<F, N> FactoryFn<F, N> {
    /// Wraps a closure that builds one connection per call.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<F, C, N> ConnectionFactory<N> for FactoryFn<F, N>
where
    F: Fn() -> C + Send + Sync + 'static, // Fn, not FnMut
    C: Connection<N>,
    N: Notification,
{
    fn create(&self) -> Box<dyn Connection<N>> {
        Box::new((self.f)())
    }
}
