//! Bounded single-producer/single-consumer frame queue.
//!
//! Bridges a capture task to the producer loop when the caller runs them on
//! separate tasks. Capacity is small (one or two frames) and the overflow
//! policy is drop-oldest: live video tolerates bounded staleness, but a slow
//! network must never block capture indefinitely.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError},
};

use bytes::Bytes;
use tokio::sync::Notify;

/// Default queue capacity in frames.
pub const DEFAULT_QUEUE_DEPTH: usize = 2;

struct State {
    frames: VecDeque<Bytes>,
    closed: bool,
    dropped: u64,
}

struct Shared {
    state: Mutex<State>,
    notify: Notify,
    capacity: usize,
}

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock only means a peer task panicked mid-push/pop;
        // the deque itself is still structurally valid.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Capture-side handle. Dropping it closes the queue.
pub struct FrameQueueSender {
    shared: Arc<Shared>,
}

/// Network-side handle.
pub struct FrameQueueReceiver {
    shared: Arc<Shared>,
}

/// Create a queue with the given capacity (clamped to at least 1).
#[must_use]
pub fn frame_queue(capacity: usize) -> (FrameQueueSender, FrameQueueReceiver) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State { frames: VecDeque::new(), closed: false, dropped: 0 }),
        notify: Notify::new(),
        capacity: capacity.max(1),
    });

    (FrameQueueSender { shared: Arc::clone(&shared) }, FrameQueueReceiver { shared })
}

impl FrameQueueSender {
    /// Enqueue a frame, displacing the oldest queued frame when full.
    ///
    /// Returns the displaced frame, if any. Never blocks.
    pub fn send(&self, frame: Bytes) -> Option<Bytes> {
        let displaced = {
            let mut state = self.shared.lock();
            let displaced = if state.frames.len() >= self.shared.capacity {
                state.dropped += 1;
                state.frames.pop_front()
            } else {
                None
            };
            state.frames.push_back(frame);
            displaced
        };

        self.shared.notify.notify_one();
        displaced
    }

    /// Number of frames displaced so far.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.shared.lock().dropped
    }
}

impl Drop for FrameQueueSender {
    fn drop(&mut self) {
        self.shared.lock().closed = true;
        self.shared.notify.notify_one();
    }
}

impl FrameQueueReceiver {
    /// Dequeue the next frame, waiting if the queue is empty.
    ///
    /// Returns `None` once the sender is dropped and the queue is drained.
    pub async fn recv(&mut self) -> Option<Bytes> {
        loop {
            {
                let mut state = self.shared.lock();
                if let Some(frame) = state.frames.pop_front() {
                    return Some(frame);
                }
                if state.closed {
                    return None;
                }
            }
            // notify_one stores a permit if no task is waiting, so a send
            // between the check above and this await is never lost.
            self.shared.notify.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_pass_in_order() {
        let (tx, mut rx) = frame_queue(2);

        tx.send(Bytes::from_static(b"one"));
        tx.send(Bytes::from_static(b"two"));

        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"one"));
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"two"));
    }

    #[tokio::test]
    async fn overflow_drops_the_oldest_frame() {
        let (tx, mut rx) = frame_queue(2);

        tx.send(Bytes::from_static(b"stale"));
        tx.send(Bytes::from_static(b"old"));
        let displaced = tx.send(Bytes::from_static(b"fresh"));

        assert_eq!(displaced, Some(Bytes::from_static(b"stale")));
        assert_eq!(tx.dropped(), 1);
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"old"));
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"fresh"));
    }

    #[tokio::test]
    async fn closed_queue_drains_then_ends() {
        let (tx, mut rx) = frame_queue(2);

        tx.send(Bytes::from_static(b"last"));
        drop(tx);

        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"last"));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn receiver_wakes_on_late_send() {
        let (tx, mut rx) = frame_queue(1);

        let waiter = tokio::spawn(async move { rx.recv().await });
        tokio::task::yield_now().await;

        tx.send(Bytes::from_static(b"late"));
        let got = waiter.await.unwrap();
        assert_eq!(got.unwrap(), Bytes::from_static(b"late"));
    }

    #[tokio::test]
    async fn capacity_is_clamped_to_one() {
        let (tx, mut rx) = frame_queue(0);

        tx.send(Bytes::from_static(b"a"));
        let displaced = tx.send(Bytes::from_static(b"b"));

        assert_eq!(displaced, Some(Bytes::from_static(b"a")));
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"b"));
    }
}
