//! # ServiceBroker: queue, worker pool, scaling and shutdown.
//!
//! The [`ServiceBroker`] owns the notification queue, the set of workers and the
//! observer list. Callers enqueue notifications and control the pool; outcomes come
//! back through [`Observe`] implementations registered with [`ServiceBroker::subscribe`].
//!
//! ## Lifecycle
//! ```text
//!            start()                 stop(immediate)                 (all workers joined)
//!   Idle ───────────────► Running ─────────────────────► Draining ─────────────────────► Stopped
//!    │  ▲                   │  ▲
//!    │  └─ change_scale(n)  │  └─ change_scale(n): cancel from the front / create at the back
//!    └─ queue_notification  └─ queue_notification
//! ```
//!
//! ## Rules
//! - `change_scale` and `stop` run under one exclusive section (an async mutex over the pool);
//!   after `change_scale(n)` returns on a running broker exactly `n` workers are active.
//! - `stop(false)` lets workers drain everything buffered; `stop(true)` cancels them first,
//!   so buffered items are abandoned **without** any outcome.
//! - Scaled-down workers finish their current batch and exit; `stop` also waits for them.
//! - The broker never retries. `SendError::RetryAfter` is reported and nothing else happens.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use pushvisor::{
//!     BrokerConfig, ChannelObserver, Connection, FactoryFn, Notification, SendError, ServiceBroker,
//! };
//!
//! #[derive(Clone)]
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
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker = ServiceBroker::new(FactoryFn::new(|| Loopback), BrokerConfig::default())?;
//!     let (observer, mut outcomes) = ChannelObserver::new();
//!     broker.subscribe(Arc::new(observer));
//!
//!     broker.queue_notification(Ping("device-1".into()))?;
//!     broker.start().await?;
//!     broker.stop(false).await?;
//!
//!     assert!(outcomes.recv().await.unwrap().is_success());
//!     Ok(())
//! }
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicU64, AtomicUsize, Ordering},
};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::{sync::Mutex as AsyncMutex, task::JoinError, time::Instant};
use tracing::{debug, error, info, warn};

use crate::{
    connection::{ConnectionFactory, Notification},
    core::{
        config::BrokerConfig,
        queue::NotificationQueue,
        worker::{ServiceWorker, WorkerHandle},
    },
    error::BrokerError,
    observers::{Observe, ObserverSet},
};

/// Lifecycle state of a [`ServiceBroker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerState {
    /// Created, not started; notifications accumulate.
    Idle,
    /// Workers are consuming the queue.
    Running,
    /// `stop` is waiting for workers to finish.
    Draining,
    /// Terminal; the queue no longer accepts input.
    Stopped,
}

/// Workers owned by the broker, guarded by the exclusive section.
#[derive(Default)]
struct Pool {
    /// Workers counted towards `scale_size`, oldest first.
    active: Vec<WorkerHandle>,
    /// Cancelled by a scale-down; still finishing their last batch.
    retired: Vec<WorkerHandle>,
}

/// Dispatches notifications through a scalable pool of workers.
pub struct ServiceBroker<N: Notification> {
    factory: Arc<dyn ConnectionFactory<N>>,
    queue: Arc<NotificationQueue<N>>,
    observers: Arc<ObserverSet<N>>,
    pool: AsyncMutex<Pool>,
    state: Mutex<BrokerState>,
    scale_size: AtomicUsize,
    next_worker_id: AtomicU64,
    stop_grace: Option<Duration>,
}

impl<N: Notification> ServiceBroker<N> {
    /// Creates an idle broker.
    ///
    /// Fails with [`BrokerError::InvalidScale`] if `cfg.scale_size` is zero.
    pub fn new<F>(factory: F, cfg: BrokerConfig) -> Result<Self, BrokerError>
    where
        F: ConnectionFactory<N>,
    {
        Self::with_factory(Arc::new(factory), cfg)
    }

    /// Creates an idle broker around an already shared factory.
    pub fn with_factory(
        factory: Arc<dyn ConnectionFactory<N>>,
        cfg: BrokerConfig,
    ) -> Result<Self, BrokerError> {
        if cfg.scale_size == 0 {
            return Err(BrokerError::InvalidScale { requested: 0 });
        }
        Ok(Self {
            factory,
            queue: Arc::new(NotificationQueue::new()),
            observers: Arc::new(ObserverSet::default()),
            pool: AsyncMutex::new(Pool::default()),
            state: Mutex::new(BrokerState::Idle),
            scale_size: AtomicUsize::new(cfg.scale_size),
            next_worker_id: AtomicU64::new(1),
            stop_grace: cfg.stop_grace,
        })
    }

    /// Registers an observer for success/failure outcomes.
    ///
    /// Observers are called concurrently from worker tasks, see [`Observe`].
    pub fn subscribe(&self, observer: Arc<dyn Observe<N>>) {
        self.observers.add(observer);
    }

    /// Buffers a notification. Valid before `start`; fails once `stop` was called.
    pub fn queue_notification(&self, notification: N) -> Result<(), BrokerError> {
        self.queue.push(notification)
    }

    /// Current target worker count.
    pub fn scale_size(&self) -> usize {
        self.scale_size.load(Ordering::SeqCst)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BrokerState {
        *self.state.lock()
    }

    /// True while in [`BrokerState::Running`].
    pub fn is_running(&self) -> bool {
        self.state() == BrokerState::Running
    }

    /// Number of buffered, not yet drained notifications.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Number of active workers (waits for any in-progress `change_scale`/`stop`).
    pub async fn worker_count(&self) -> usize {
        self.pool.lock().await.active.len()
    }

    /// Starts the broker and materializes `scale_size` workers.
    ///
    /// No-op if already running. A stopped broker cannot be restarted.
    pub async fn start(&self) -> Result<(), BrokerError> {
        {
            let mut state = self.state.lock();
            match *state {
                BrokerState::Running => return Ok(()),
                BrokerState::Idle => *state = BrokerState::Running,
                BrokerState::Draining | BrokerState::Stopped => {
                    return Err(BrokerError::Lifecycle {
                        reason: "broker has been stopped and cannot be restarted",
                    });
                }
            }
        }
        info!(scale = self.scale_size(), "broker starting");
        self.change_scale(self.scale_size()).await
    }

    /// Records a new target worker count and, when running, converges the pool to it.
    ///
    /// Scale-down cancels the oldest workers first; their current batch still completes,
    /// but they take nothing new. Scale-up creates workers with fresh connections.
    pub async fn change_scale(&self, n: usize) -> Result<(), BrokerError> {
        if n == 0 {
            return Err(BrokerError::InvalidScale { requested: n });
        }
        self.scale_size.store(n, Ordering::SeqCst);

        if !self.is_running() {
            return Ok(());
        }

        let mut guard = self.pool.lock().await;
        if !self.is_running() {
            // `stop` got the section first.
            return Ok(());
        }
        let pool = &mut *guard;
        pool.retired.retain(|w| !w.join.is_finished());

        // Last recorded value wins when several calls race for the section.
        let target = self.scale_size();

        while pool.active.len() > target {
            let worker = pool.active.remove(0);
            worker.cancel();
            debug!(worker = worker.id, "worker retired");
            pool.retired.push(worker);
        }

        while pool.active.len() < target {
            let id = self.next_worker_id.fetch_add(1, Ordering::Relaxed);
            let worker = ServiceWorker::new(
                id,
                self.factory.create(),
                Arc::clone(&self.queue),
                Arc::clone(&self.observers),
            );
            pool.active.push(worker.start());
        }

        debug!(scale = pool.active.len(), "scale changed");
        Ok(())
    }

    /// Stops the broker.
    ///
    /// Completes the queue, optionally cancels every worker (`immediate`), then waits
    /// for all workers to end. Without `BrokerConfig::stop_grace` the wait is unbounded.
    ///
    /// Fails with [`BrokerError::Lifecycle`] unless the broker is running.
    pub async fn stop(&self, immediate: bool) -> Result<(), BrokerError> {
        {
            let mut state = self.state.lock();
            if *state != BrokerState::Running {
                return Err(BrokerError::Lifecycle {
                    reason: "broker has already been signaled to stop",
                });
            }
            *state = BrokerState::Draining;
        }
        self.queue.complete();

        let mut guard = self.pool.lock().await;
        let pool = &mut *guard;
        if immediate {
            pool.active.iter().for_each(WorkerHandle::cancel);
        }
        let workers: Vec<WorkerHandle> = pool
            .active
            .drain(..)
            .chain(pool.retired.drain(..))
            .collect();

        info!(workers = workers.len(), immediate, "stopping: waiting on workers");
        let res = self.join_workers(workers).await;
        info!("stopping: done waiting on workers");

        *self.state.lock() = BrokerState::Stopped;
        res
    }

    /// Joins every worker, bounded by `stop_grace` when configured.
    async fn join_workers(&self, workers: Vec<WorkerHandle>) -> Result<(), BrokerError> {
        let Some(grace) = self.stop_grace else {
            for w in workers {
                report_exit(w.id, w.join.await);
            }
            return Ok(());
        };

        let deadline = Instant::now() + grace;
        let mut stuck = 0usize;
        for mut w in workers {
            match tokio::time::timeout_at(deadline, &mut w.join).await {
                Ok(res) => report_exit(w.id, res),
                Err(_elapsed) => {
                    warn!(worker = w.id, "worker exceeded stop grace, aborting");
                    w.join.abort();
                    stuck += 1;
                }
            }
        }

        if stuck == 0 {
            Ok(())
        } else {
            Err(BrokerError::GraceExceeded { grace, stuck })
        }
    }
}

impl<N: Notification> Drop for ServiceBroker<N> {
    /// Dropping a broker is an implicit immediate stop that does not wait.
    fn drop(&mut self) {
        self.queue.complete();
        let pool = self.pool.get_mut();
        pool.active
            .iter()
            .chain(pool.retired.iter())
            .for_each(WorkerHandle::cancel);
    }
}

fn report_exit(id: u64, res: Result<(), JoinError>) {
    match res {
        Ok(()) => {}
        Err(e) if e.is_panic() => error!(worker = id, "worker panicked"),
        Err(_) => debug!(worker = id, "worker aborted"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        connection::{Connection, FactoryFn},
        error::SendError,
    };
    use async_trait::async_trait;

    struct Item;
    impl Notification for Item {
        fn target(&self) -> &str {
            "item"
        }
    }

    struct Noop;
    #[async_trait]
    impl Connection<Item> for Noop {
        async fn send(&self, _n: &Item) -> Result<(), SendError> {
            Ok(())
        }
    }

    fn broker(scale: usize) -> ServiceBroker<Item> {
        ServiceBroker::new(
            FactoryFn::new(|| Noop),
            BrokerConfig::default().with_scale_size(scale),
        )
        .unwrap()
    }

    #[test]
    fn test_zero_scale_rejected_at_construction() {
        let res = ServiceBroker::<Item>::new(
            FactoryFn::new(|| Noop),
            BrokerConfig::default().with_scale_size(0),
        );
        assert!(matches!(res, Err(BrokerError::InvalidScale { requested: 0 })));
    }

    #[tokio::test]
    async fn test_change_scale_while_idle_only_records() {
        let b = broker(1);
        b.change_scale(4).await.unwrap();
        assert_eq!(b.scale_size(), 4);
        assert_eq!(b.worker_count().await, 0);
        assert_eq!(b.state(), BrokerState::Idle);
    }

    #[tokio::test]
    async fn test_change_scale_zero_leaves_state_unchanged() {
        let b = broker(2);
        b.start().await.unwrap();
        assert_eq!(
            b.change_scale(0).await,
            Err(BrokerError::InvalidScale { requested: 0 })
        );
        assert_eq!(b.scale_size(), 2);
        assert_eq!(b.worker_count().await, 2);
        b.stop(false).await.unwrap();
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let b = broker(3);
        b.start().await.unwrap();
        b.start().await.unwrap();
        assert_eq!(b.worker_count().await, 3);
        b.stop(true).await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_transitions_to_stopped() {
        let b = broker(1);
        assert!(matches!(
            b.stop(false).await,
            Err(BrokerError::Lifecycle { .. })
        ));

        b.start().await.unwrap();
        b.stop(false).await.unwrap();
        assert_eq!(b.state(), BrokerState::Stopped);
        assert_eq!(b.worker_count().await, 0);
        assert_eq!(b.queue_notification(Item).err(), Some(BrokerError::QueueCompleted));
        assert!(matches!(b.start().await, Err(BrokerError::Lifecycle { .. })));
    }
}
