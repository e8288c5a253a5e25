//! # ObserverSet: registration list with panic isolation
//!
//! [`ObserverSet`] holds the observers registered on a broker and delivers each outcome
//! to all of them, in registration order, on the calling (worker) task.
//!
//! ## What it guarantees
//! - Every registered observer sees every outcome raised after its registration.
//! - Panics inside observers are caught and logged (isolation).
//!
//! ## What it does **not** guarantee
//! - No ordering across concurrent calls (different items, different workers).
//! - Observers registered while an outcome is being delivered may miss that outcome.
//!
//! ## Diagram
//! ```text
//!    succeeded(&N) / failed(&N, &SendError)
//!        │        (snapshot of the list)
//!        ├──► O1.on_*()  ── panic? ─► error!(..)
//!        ├──► O2.on_*()
//!        └──► ON.on_*()
//! ```

use std::{future::Future, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use parking_lot::RwLock;
use tracing::error;

use crate::{connection::Notification, error::SendError, observers::Observe};

/// Ordered list of observers, shared by the broker and its workers.
pub struct ObserverSet<N: Notification> {
    observers: RwLock<Vec<Arc<dyn Observe<N>>>>,
}

impl<N: Notification> ObserverSet<N> {
    /// Creates a set from an initial list.
    #[must_use]
    pub fn new(observers: Vec<Arc<dyn Observe<N>>>) -> Self {
        Self {
            observers: RwLock::new(observers),
        }
    }

    /// Registers one more observer.
    pub fn add(&self, observer: Arc<dyn Observe<N>>) {
        self.observers.write().push(observer);
    }

    /// True if there are no observers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    /// Number of observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    /// Delivers a success outcome to every observer.
    pub async fn succeeded(&self, notification: &N) {
        for obs in self.snapshot() {
            guarded(obs.name(), obs.on_succeeded(notification)).await;
        }
    }

    /// Delivers a failure outcome to every observer.
    pub async fn failed(&self, notification: &N, err: &SendError) {
        for obs in self.snapshot() {
            guarded(obs.name(), obs.on_failed(notification, err)).await;
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn Observe<N>>> {
        self.observers.read().clone()
    }
}

impl<N: Notification> Default for ObserverSet<N> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

async fn guarded<F>(name: &'static str, fut: F)
where
    F: Future<Output = ()>,
{
    if let Err(panic_err) = AssertUnwindSafe(fut).catch_unwind().await {
        error!(observer = name, panic = ?panic_err, "observer panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Item;
    impl Notification for Item {
        fn target(&self) -> &str {
            "item"
        }
    }

    #[derive(Default)]
    struct Counter {
        ok: AtomicUsize,
        failed: AtomicUsize,
    }

    #[async_trait]
    impl Observe<Item> for Counter {
        async fn on_succeeded(&self, _n: &Item) {
            self.ok.fetch_add(1, Ordering::SeqCst);
        }
        async fn on_failed(&self, _n: &Item, _err: &SendError) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Panicky;

    #[async_trait]
    impl Observe<Item> for Panicky {
        async fn on_succeeded(&self, _n: &Item) {
            panic!("boom");
        }
        async fn on_failed(&self, _n: &Item, _err: &SendError) {}
        fn name(&self) -> &'static str {
            "panicky"
        }
    }

    #[tokio::test]
    async fn test_panicking_observer_does_not_block_others() {
        let counter = Arc::new(Counter::default());
        let observers: Vec<Arc<dyn Observe<Item>>> = vec![Arc::new(Panicky), counter.clone()];
        let set = ObserverSet::new(observers);

        set.succeeded(&Item).await;
        set.succeeded(&Item).await;

        assert_eq!(counter.ok.load(Ordering::SeqCst), 2);
        assert_eq!(set.len(), 2);
    }

    #[tokio::test]
    async fn test_added_observer_sees_later_outcomes() {
        let set = ObserverSet::default();
        assert!(set.is_empty());

        let counter = Arc::new(Counter::default());
        set.add(counter.clone());
        set.failed(&Item, &crate::error::AuthError::new("nope").into())
            .await;

        assert_eq!(counter.failed.load(Ordering::SeqCst), 1);
        assert_eq!(counter.ok.load(Ordering::SeqCst), 0);
    }
}
