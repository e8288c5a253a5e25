//! # ServiceWorker: one dispatch loop bound to one connection.
//!
//! ## Architecture
//! ```text
//! ServiceBroker::change_scale ──► factory.create() ──► ServiceWorker::new(id, conn, ..)
//!                                                          └──► tokio::spawn(worker.run(token))
//!
//! loop {
//!   ├─► token cancelled or queue complete? ─► exit
//!   ├─► batch = queue.drain_available(token)   (suspends while empty, honors token)
//!   ├─► batch empty? ─► continue
//!   ├─► join_all(batch.map(|n| send(n) ─► observers.succeeded / failed))
//!   └─► next iteration only after every item of the batch is settled
//! }
//! ```
//!
//! ## Rules
//! - Cancellation is observed at the loop top and while waiting for a batch, never
//!   in the middle of a batch.
//! - All items of a batch are in flight at once; there is no per-batch cap.
//! - A failed send is an outcome, not an error of the worker: the loop keeps running.
//! - A panicking send is caught and reported as a transport failure of that item.
//! - Exit is only by cancellation or queue completion.

use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use futures::{FutureExt, future::join_all};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    connection::{Connection, Notification},
    core::queue::NotificationQueue,
    error::SendError,
    observers::ObserverSet,
};

/// A connection panicked while sending; reported to observers as a transport failure.
#[derive(Debug, Error)]
#[error("send panicked: {0}")]
struct SendPanicked(String);

impl SendPanicked {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self(msg)
    }
}

/// Dispatch loop state, moved into the spawned task.
pub(crate) struct ServiceWorker<N: Notification> {
    id: u64,
    connection: Box<dyn Connection<N>>,
    queue: Arc<NotificationQueue<N>>,
    observers: Arc<ObserverSet<N>>,
}

/// Broker-side handle to a running worker.
pub(crate) struct WorkerHandle {
    pub(crate) id: u64,
    pub(crate) cancel: CancellationToken,
    pub(crate) join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Requests cooperative cancellation; the in-flight batch still completes.
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl<N: Notification> ServiceWorker<N> {
    pub(crate) fn new(
        id: u64,
        connection: Box<dyn Connection<N>>,
        queue: Arc<NotificationQueue<N>>,
        observers: Arc<ObserverSet<N>>,
    ) -> Self {
        Self {
            id,
            connection,
            queue,
            observers,
        }
    }

    /// Spawns the loop on the runtime and returns its handle.
    pub(crate) fn start(self) -> WorkerHandle {
        let id = self.id;
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let join = tokio::spawn(async move { self.run(token).await });
        WorkerHandle { id, cancel, join }
    }

    async fn run(self, token: CancellationToken) {
        debug!(worker = self.id, "worker started");

        while !token.is_cancelled() && !self.queue.is_complete() {
            let batch = self.queue.drain_available(&token).await;
            if batch.is_empty() {
                continue;
            }

            let size = batch.len();
            debug!(worker = self.id, batch = size, "dispatching batch");
            join_all(batch.iter().map(|n| self.dispatch(n))).await;
            debug!(worker = self.id, batch = size, "batch settled");
        }

        if token.is_cancelled() {
            info!(worker = self.id, "worker cancelled");
        } else {
            info!(worker = self.id, "queue completed, worker exiting");
        }
    }

    /// Sends one item and raises its outcome.
    async fn dispatch(&self, n: &N) {
        let res = match AssertUnwindSafe(self.connection.send(n)).catch_unwind().await {
            Ok(res) => res,
            Err(payload) => {
                let panicked = SendPanicked::from_payload(payload);
                error!(worker = self.id, dest = n.target(), err = %panicked, "connection panicked");
                Err(SendError::transport(panicked))
            }
        };

        match res {
            Ok(()) => self.observers.succeeded(n).await,
            Err(err) => {
                debug!(
                    worker = self.id,
                    dest = n.target(),
                    label = err.as_label(),
                    "send failed"
                );
                self.observers.failed(n, &err).await;
            }
        }
    }
}
