//! # Video Frame Queue
//!
//! Bounded FIFO of owned decoded-image handles between the decode thread and
//! the presentation pump.
//!
//! ## Design
//!
//! - **Storage**: `capacity` slots addressed by `start`, `end` and `count`,
//!   with `end == (start + count) % capacity`
//! - **Blocking**: `push` waits while full, `pop` waits while empty; both
//!   return their failure value once the controller stops running
//! - **Ownership**: a successful push moves the handle into the queue, a
//!   successful pop moves it out. A push rejected by shutdown hands it back
//! - **Backpressure**: nothing is ever dropped. A full queue stalls the
//!   producer, which is the intended admission control
//!
//! The queue is a cheap `Clone` handle; every clone refers to the same slots.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use core_playback::{PlaybackController, VideoFrameQueue};
//!
//! let controller = Arc::new(PlaybackController::default());
//! let queue: VideoFrameQueue<u32> = VideoFrameQueue::new(20, Arc::clone(&controller));
//!
//! queue.push(1).unwrap();
//! assert_eq!(queue.pop(), Some(1));
//!
//! controller.request_shutdown();
//! assert!(queue.push(2).is_err());
//! assert_eq!(queue.pop(), None);
//! ```

use crate::controller::{PlaybackController, WakeAll};
use crate::error::{Shutdown, TryPopError, TryPushError};
use crate::stats::BufferStats;
use bridge_traits::FrameHandle;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Bounded, blocking FIFO of frames.
pub struct VideoFrameQueue<T = FrameHandle>
where
    T: Send + 'static,
{
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    state: Mutex<QueueState<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
    controller: Arc<PlaybackController>,
}

struct QueueState<T> {
    slots: Vec<Option<T>>,
    start: usize,
    end: usize,
    count: usize,
    total_pushed: u64,
    total_popped: u64,
}

impl<T> QueueState<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            start: 0,
            end: 0,
            count: 0,
            total_pushed: 0,
            total_popped: 0,
        }
    }

    fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    fn push_back(&mut self, item: T) {
        debug_assert!(!self.is_full());
        debug_assert!(self.slots[self.end].is_none());

        self.slots[self.end] = Some(item);
        self.end = (self.end + 1) % self.slots.len();
        self.count += 1;
        self.total_pushed += 1;
    }

    fn pop_front(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }

        let item = self.slots[self.start].take();
        debug_assert!(item.is_some());

        self.start = (self.start + 1) % self.slots.len();
        self.count -= 1;
        self.total_popped += 1;
        item
    }

    fn stats(&self) -> BufferStats {
        BufferStats {
            capacity: self.slots.len(),
            occupied: self.count,
            total_pushed: self.total_pushed,
            total_popped: self.total_popped,
        }
    }
}

impl<T: Send + 'static> WakeAll for Shared<T> {
    fn wake_all(&self) {
        // Taking the lock orders this notify after any in-flight predicate check.
        drop(self.state.lock());
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }
}

impl<T: Send + 'static> VideoFrameQueue<T> {
    /// Create a queue with `capacity` slots and register it with `controller`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Capacities are validated by
    /// `BufferSettings::validate` before a session creates its buffers.
    pub fn new(capacity: usize, controller: Arc<PlaybackController>) -> Self {
        assert!(capacity > 0, "frame queue capacity must be > 0");

        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState::with_capacity(capacity)),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
            controller,
        });

        let weak: Weak<dyn WakeAll> = Arc::downgrade(&shared) as Weak<dyn WakeAll>;
        shared.controller.register(weak);

        debug!(capacity, "Frame queue created");
        Self { shared }
    }

    /// Append `item`, blocking while the queue is full.
    ///
    /// Returns the item inside [`Shutdown`] if the controller stopped running
    /// before a slot became free. The producer must dispose of it.
    pub fn push(&self, item: T) -> Result<(), Shutdown<T>> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();

        while state.is_full() && shared.controller.is_running() {
            trace!("Frame queue full, producer waiting");
            shared.not_full.wait(&mut state);
        }

        if !shared.controller.is_running() {
            return Err(Shutdown(item));
        }

        state.push_back(item);
        shared.not_empty.notify_one();
        Ok(())
    }

    /// Remove the oldest item, blocking while the queue is empty.
    ///
    /// While paused, an empty queue parks the caller in the controller's
    /// pause wait with the queue lock released. Items already queued are
    /// served even after shutdown; `None` means the queue is empty and the
    /// controller has stopped running.
    pub fn pop(&self) -> Option<T> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();

        loop {
            if let Some(item) = state.pop_front() {
                shared.not_full.notify_one();
                return Some(item);
            }

            if !shared.controller.is_running() {
                return None;
            }

            if shared.controller.is_paused() {
                MutexGuard::unlocked(&mut state, || {
                    shared.controller.wait_while_paused();
                });
            } else {
                trace!("Frame queue empty, consumer waiting");
                shared.not_empty.wait(&mut state);
            }
        }
    }

    /// Append `item` only if a slot is free right now.
    pub fn try_push(&self, item: T) -> Result<(), TryPushError<T>> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();

        if !shared.controller.is_running() {
            return Err(TryPushError::Shutdown(item));
        }

        if state.is_full() {
            return Err(TryPushError::Full(item));
        }

        state.push_back(item);
        shared.not_empty.notify_one();
        Ok(())
    }

    /// Remove the oldest item without blocking.
    ///
    /// This is the variant a timer-driven presentation loop uses.
    pub fn try_pop(&self) -> Result<T, TryPopError> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();

        match state.pop_front() {
            Some(item) => {
                shared.not_full.notify_one();
                Ok(item)
            }
            None if shared.controller.is_running() => Err(TryPopError::Empty),
            None => Err(TryPopError::Shutdown),
        }
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.shared.state.lock().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.shared.state.lock().is_full()
    }

    /// Occupied fraction in `0.0..=1.0`.
    pub fn fill_level(&self) -> f32 {
        self.stats().fill_level()
    }

    pub fn stats(&self) -> BufferStats {
        self.shared.state.lock().stats()
    }

    pub fn controller(&self) -> &Arc<PlaybackController> {
        &self.shared.controller
    }

    /// Release every still-queued item. Returns how many were released.
    ///
    /// Only call this after shutdown was requested and every producer and
    /// consumer thread using the queue has been joined.
    pub fn destroy(self) -> usize {
        let mut state = self.shared.state.lock();
        let mut released = 0;
        while state.pop_front().is_some() {
            released += 1;
        }
        debug!(released, "Frame queue destroyed");
        released
    }
}

impl<T: Send + 'static> Clone for VideoFrameQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> std::fmt::Debug for VideoFrameQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFrameQueue")
            .field("stats", &self.stats())
            .finish()
    }
}
