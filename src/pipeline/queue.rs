//! Bounded chunk queue between the producer thread and the device callback.

use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::QueueItem;

/// First sleep when waiting on a full queue.
const MIN_BACKOFF: Duration = Duration::from_micros(500);

/// Longest single sleep when waiting on a full queue.
const MAX_BACKOFF: Duration = Duration::from_millis(10);

/// A bounded FIFO of [`QueueItem`]s.
///
/// Built on a lock-free SPSC ring buffer. Each end sits behind its own
/// `parking_lot::Mutex`, so the producer and the device callback never wait
/// on each other: only [`clear()`](ChunkQueue::clear) takes the consumer
/// lock from outside the callback, and the callback only ever `try_lock`s.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use stream_playback::{ChunkQueue, QueueItem};
///
/// let queue = ChunkQueue::new(1);
/// assert!(queue.push(QueueItem::EndOfPass, Duration::from_millis(10)).is_ok());
///
/// // Full: the item comes back after the timeout
/// let rejected = queue.push(QueueItem::EndOfPass, Duration::from_millis(10));
/// assert!(rejected.is_err());
///
/// assert_eq!(queue.try_pop(), Some(QueueItem::EndOfPass));
/// assert_eq!(queue.try_pop(), None);
/// ```
pub struct ChunkQueue {
    producer: Mutex<HeapProd<QueueItem>>,
    consumer: Mutex<HeapCons<QueueItem>>,
    capacity: usize,
}

impl ChunkQueue {
    /// Creates a queue holding at most `capacity` items (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (producer, consumer) = HeapRb::<QueueItem>::new(capacity).split();

        Self {
            producer: Mutex::new(producer),
            consumer: Mutex::new(consumer),
            capacity,
        }
    }

    /// Enqueues `item`, waiting up to `timeout` for space.
    ///
    /// Waiting is a sleep with exponential backoff, capped so the caller
    /// regains control shortly after the timeout. A timeout too large to
    /// express as a deadline waits until space frees up.
    ///
    /// # Errors
    ///
    /// Returns the item back if the queue is still full after `timeout`;
    /// the caller decides whether to retry.
    pub fn push(&self, item: QueueItem, timeout: Duration) -> Result<(), QueueItem> {
        let deadline = Instant::now().checked_add(timeout);
        let mut backoff = MIN_BACKOFF;
        let mut item = item;

        loop {
            match self.try_push(item) {
                Ok(()) => return Ok(()),
                Err(rejected) => item = rejected,
            }

            let mut sleep = backoff;
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    return Err(item);
                }
                sleep = sleep.min(deadline - now);
            }
            thread::sleep(sleep);
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    /// Enqueues `item` if there is space, without waiting.
    ///
    /// # Errors
    ///
    /// Returns the item back if the queue is full.
    pub fn try_push(&self, item: QueueItem) -> Result<(), QueueItem> {
        self.producer.lock().try_push(item)
    }

    /// Dequeues the oldest item without blocking.
    ///
    /// Returns `None` when the queue is empty, or when a concurrent
    /// [`clear()`](ChunkQueue::clear) holds the consumer side.
    pub fn try_pop(&self) -> Option<QueueItem> {
        self.consumer.try_lock()?.try_pop()
    }

    /// Discards every queued item and returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut consumer = self.consumer.lock();
        let mut discarded = 0;
        while consumer.try_pop().is_some() {
            discarded += 1;
        }
        discarded
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.producer.lock().occupied_len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of items the queue holds.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[cfg(test)]
    pub(crate) fn consumer_guard_for_test(&self) -> parking_lot::MutexGuard<'_, HeapCons<QueueItem>> {
        self.consumer.lock()
    }
}

impl std::fmt::Debug for ChunkQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
