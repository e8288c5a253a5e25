//! # Notification queue: unbounded MPMC buffer with a completion signal.
//!
//! Producers call [`NotificationQueue::push`] from any thread; worker tasks call
//! [`NotificationQueue::drain_available`] and take everything buffered at once.
//!
//! ## Rules
//! - `complete()` is one-way: pushes after it fail with [`BrokerError::QueueCompleted`].
//! - Items already buffered at completion still drain.
//! - `is_complete()` holds only once completed **and** empty.
//! - No capacity bound; backpressure is the caller's concern.
//!
//! ## Wake-ups
//! ```text
//! push / complete ──► state change under lock ──► Notify::notify_waiters()
//!                                                  │
//! drain_available: enable(notified) ─► check state ┘─► take batch | wait | empty on completion
//! ```
//! The `Notified` future is enabled before the state is inspected, so a change that
//! lands between the check and the wait is never missed.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::BrokerError;

struct State<N> {
    items: VecDeque<N>,
    completed: bool,
}

/// Unbounded multi-producer/multi-consumer buffer shared by the broker and its workers.
pub struct NotificationQueue<N> {
    state: Mutex<State<N>>,
    notify: Notify,
}

impl<N> NotificationQueue<N> {
    /// Creates an empty, open queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                completed: false,
            }),
            notify: Notify::new(),
        }
    }

    /// Appends an item.
    ///
    /// Fails with [`BrokerError::QueueCompleted`] once [`complete`](Self::complete) was called.
    pub fn push(&self, item: N) -> Result<(), BrokerError> {
        {
            let mut state = self.state.lock();
            if state.completed {
                return Err(BrokerError::QueueCompleted);
            }
            state.items.push_back(item);
        }
        self.notify.notify_waiters();
        Ok(())
    }

    /// Stops accepting input. Buffered items are kept. Idempotent.
    pub fn complete(&self) {
        self.state.lock().completed = true;
        self.notify.notify_waiters();
    }

    /// True once completed and fully drained.
    pub fn is_complete(&self) -> bool {
        let state = self.state.lock();
        state.completed && state.items.is_empty()
    }

    /// Number of buffered items.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// True if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Takes every currently buffered item as one batch.
    ///
    /// Suspends while the queue is empty. Returns an empty batch when the queue is
    /// complete with nothing left, or when `token` is cancelled while waiting (nothing
    /// is taken in that case).
    pub async fn drain_available(&self, token: &CancellationToken) -> Vec<N> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if !state.items.is_empty() {
                    return state.items.drain(..).collect();
                }
                if state.completed {
                    return Vec::new();
                }
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = token.cancelled() => return Vec::new(),
            }
        }
    }
}

impl<N> Default for NotificationQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}
