//! # Audio Byte Ring
//!
//! Fixed-capacity circular byte buffer for passing PCM bytes from the audio
//! decode thread to the audio sink.
//!
//! ## Design
//!
//! - **Storage**: one flat `Vec<u8>` with `write_pos`, `read_pos` and `count`
//! - **Wrap-around**: a read or write that crosses the end of the backing
//!   array is split into two copies, the tail first and then the head
//! - **Chunked push**: a push larger than the free space writes what fits,
//!   waits for the sink to drain, and continues. A single logical push may
//!   block and resume several times
//! - **Exact pop**: a pop waits until the full requested length is buffered
//!   and then copies it in one go
//! - **Shutdown**: waiters return `false` once the controller stops running
//!
//! Pop waiters can ask for different lengths, so every notification is a
//! broadcast and every waiter re-checks its own predicate.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use core_playback::{AudioByteRing, PlaybackController};
//!
//! let controller = Arc::new(PlaybackController::default());
//! let ring = AudioByteRing::new(8192, controller);
//!
//! // Producer: push decoded PCM bytes
//! assert!(ring.push(&[1, 2, 3, 4]));
//!
//! // Consumer: pop a fixed-size chunk
//! let mut chunk = [0u8; 4];
//! assert!(ring.pop(&mut chunk));
//! assert_eq!(chunk, [1, 2, 3, 4]);
//! ```

use crate::controller::{PlaybackController, WakeAll};
use crate::error::TryPopError;
use crate::stats::BufferStats;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};

/// Bounded, blocking FIFO of bytes.
#[derive(Clone)]
pub struct AudioByteRing {
    inner: Arc<RingInner>,
}

struct RingInner {
    state: Mutex<RingState>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
    controller: Arc<PlaybackController>,
}

struct RingState {
    buffer: Vec<u8>,
    write_pos: usize,
    read_pos: usize,
    count: usize,
    total_pushed: u64,
    total_popped: u64,
}

impl RingState {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity],
            write_pos: 0,
            read_pos: 0,
            count: 0,
            total_pushed: 0,
            total_popped: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.buffer.len()
    }

    fn free_space(&self) -> usize {
        self.capacity() - self.count
    }

    /// Copy as much of `data` as fits. Returns the number of bytes written.
    fn write(&mut self, data: &[u8]) -> usize {
        let capacity = self.capacity();
        let len = data.len().min(self.free_space());
        let first = len.min(capacity - self.write_pos);

        self.buffer[self.write_pos..self.write_pos + first].copy_from_slice(&data[..first]);
        self.buffer[..len - first].copy_from_slice(&data[first..len]);

        self.write_pos = (self.write_pos + len) % capacity;
        self.count += len;
        self.total_pushed += len as u64;
        len
    }

    /// Fill `out` completely. Caller guarantees `out.len() <= count`.
    fn read(&mut self, out: &mut [u8]) {
        let capacity = self.capacity();
        let len = out.len();
        debug_assert!(len <= self.count);
        let first = len.min(capacity - self.read_pos);

        out[..first].copy_from_slice(&self.buffer[self.read_pos..self.read_pos + first]);
        out[first..].copy_from_slice(&self.buffer[..len - first]);

        self.read_pos = (self.read_pos + len) % capacity;
        self.count -= len;
        self.total_popped += len as u64;
    }

    fn stats(&self) -> BufferStats {
        BufferStats {
            capacity: self.capacity(),
            occupied: self.count,
            total_pushed: self.total_pushed,
            total_popped: self.total_popped,
        }
    }
}

impl WakeAll for RingInner {
    fn wake_all(&self) {
        drop(self.state.lock());
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }
}

impl AudioByteRing {
    /// Create a ring of `capacity` bytes and register it with `controller`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize, controller: Arc<PlaybackController>) -> Self {
        assert!(capacity > 0, "audio ring capacity must be > 0");

        let inner = Arc::new(RingInner {
            state: Mutex::new(RingState::with_capacity(capacity)),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
            controller,
        });

        let weak: Weak<dyn WakeAll> = Arc::downgrade(&inner) as Weak<dyn WakeAll>;
        inner.controller.register(weak);

        debug!(capacity, "Audio ring created");
        Self { inner }
    }

    /// Write all of `data`, blocking whenever the ring is full.
    ///
    /// Returns `false` if shutdown was requested before every byte was
    /// written. Bytes written before the interruption stay in the ring.
    pub fn push(&self, data: &[u8]) -> bool {
        let inner = &*self.inner;

        if !inner.controller.is_running() {
            return false;
        }

        let mut state = inner.state.lock();
        let mut remaining = data;

        while !remaining.is_empty() {
            while state.free_space() == 0 && inner.controller.is_running() {
                trace!(pending = remaining.len(), "Audio ring full, producer waiting");
                inner.not_full.wait(&mut state);
            }

            if !inner.controller.is_running() {
                debug!(
                    written = data.len() - remaining.len(),
                    dropped = remaining.len(),
                    "Audio push interrupted by shutdown"
                );
                return false;
            }

            let written = state.write(remaining);
            remaining = &remaining[written..];
            inner.not_empty.notify_all();
        }

        true
    }

    /// Fill `out` with exactly `out.len()` bytes, blocking until that many are
    /// buffered.
    ///
    /// Returns `false` if the ring is shut down before the request can be met,
    /// or if the request is larger than the ring and could never be met.
    /// Buffered bytes are still served after shutdown when enough are there.
    pub fn pop(&self, out: &mut [u8]) -> bool {
        let inner = &*self.inner;
        let len = out.len();

        if len == 0 {
            return true;
        }

        if len > inner.capacity {
            warn!(
                requested = len,
                capacity = inner.capacity,
                "Audio pop larger than ring capacity"
            );
            return false;
        }

        let mut state = inner.state.lock();

        loop {
            if state.count >= len {
                state.read(out);
                inner.not_full.notify_all();
                return true;
            }

            if !inner.controller.is_running() {
                return false;
            }

            if inner.controller.is_paused() {
                MutexGuard::unlocked(&mut state, || {
                    inner.controller.wait_while_paused();
                });
            } else {
                trace!(requested = len, buffered = state.count, "Audio ring short, consumer waiting");
                inner.not_empty.wait(&mut state);
            }
        }
    }

    /// Write as many bytes of `data` as fit right now. Returns the count.
    ///
    /// Writes nothing once shutdown was requested.
    pub fn try_push(&self, data: &[u8]) -> usize {
        let inner = &*self.inner;
        let mut state = inner.state.lock();

        if !inner.controller.is_running() {
            return 0;
        }

        let written = state.write(data);
        if written > 0 {
            inner.not_empty.notify_all();
        }
        written
    }

    /// Fill `out` only if `out.len()` bytes are buffered right now.
    ///
    /// All or nothing: on error no bytes are consumed.
    pub fn try_pop(&self, out: &mut [u8]) -> Result<(), TryPopError> {
        let inner = &*self.inner;
        let mut state = inner.state.lock();

        if state.count >= out.len() {
            state.read(out);
            if !out.is_empty() {
                inner.not_full.notify_all();
            }
            return Ok(());
        }

        if inner.controller.is_running() {
            Err(TryPopError::Empty)
        } else {
            Err(TryPopError::Shutdown)
        }
    }

    /// Remove and return every buffered byte without blocking.
    ///
    /// The audio sink uses this after shutdown to flush the partial tail that
    /// is shorter than its chunk length.
    pub fn take_remaining(&self) -> Vec<u8> {
        let inner = &*self.inner;
        let mut state = inner.state.lock();

        let mut tail = vec![0; state.count];
        state.read(&mut tail);
        if !tail.is_empty() {
            inner.not_full.notify_all();
        }
        tail
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.inner.state.lock().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.inner.state.lock().free_space() == 0
    }

    /// Get the buffer fill level (0.0 to 1.0).
    pub fn fill_level(&self) -> f32 {
        self.stats().fill_level()
    }

    pub fn stats(&self) -> BufferStats {
        self.inner.state.lock().stats()
    }

    pub fn controller(&self) -> &Arc<PlaybackController> {
        &self.inner.controller
    }

    /// Discard the ring. Returns the number of bytes that were never popped.
    ///
    /// Only call this after shutdown was requested and every thread using the
    /// ring has been joined.
    pub fn destroy(self) -> usize {
        let mut state = self.inner.state.lock();
        let discarded = state.count;
        state.count = 0;
        state.read_pos = state.write_pos;
        debug!(discarded, "Audio ring destroyed");
        discarded
    }
}

impl std::fmt::Debug for AudioByteRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioByteRing")
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn ring(capacity: usize) -> (AudioByteRing, Arc<PlaybackController>) {
        let controller = Arc::new(PlaybackController::default());
        (AudioByteRing::new(capacity, Arc::clone(&controller)), controller)
    }

    #[test]
    fn test_basic_push_pop() {
        let (ring, _controller) = ring(16);

        assert!(ring.push(&[1, 2, 3, 4]));
        assert_eq!(ring.len(), 4);

        let mut out = [0u8; 4];
        assert!(ring.pop(&mut out));
        assert_eq!(out, [1, 2, 3, 4]);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_wrap_around_split_copy() {
        let (ring, _controller) = ring(10);

        assert!(ring.push(&[0, 1, 2, 3, 4, 5]));
        assert_eq!(ring.len(), 6);

        let mut out = [0u8; 4];
        assert!(ring.pop(&mut out));
        assert_eq!(out, [0, 1, 2, 3]);
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.inner.state.lock().read_pos, 4);

        // Lands at offsets 6..10, then wraps to 0..2
        assert!(ring.push(&[6, 7, 8, 9, 10, 11]));
        {
            let state = ring.inner.state.lock();
            assert_eq!(state.write_pos, 2);
            assert_eq!(state.count, 8);
        }

        let mut out = [0u8; 8];
        assert!(ring.pop(&mut out));
        assert_eq!(out, [4, 5, 6, 7, 8, 9, 10, 11]);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_fill_exactly_to_capacity() {
        let (ring, _controller) = ring(8);
        assert!(ring.push(&[9; 8]));
        assert!(ring.is_full());
        assert_eq!(ring.try_push(&[1]), 0);
        assert!((ring.fill_level() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_zero_length_operations() {
        let (ring, _controller) = ring(8);
        assert!(ring.push(&[]));
        let mut empty: [u8; 0] = [];
        assert!(ring.pop(&mut empty));
        assert_eq!(ring.try_pop(&mut empty), Ok(()));
    }

    #[test]
    fn test_pop_larger_than_capacity_fails_fast() {
        let (ring, _controller) = ring(8);
        let mut out = [0u8; 9];
        assert!(!ring.pop(&mut out));
    }

    #[test]
    fn test_try_push_is_partial() {
        let (ring, _controller) = ring(8);
        assert_eq!(ring.try_push(&[1, 2, 3, 4, 5]), 5);
        assert_eq!(ring.try_push(&[6, 7, 8, 9, 10]), 3);
        assert_eq!(ring.take_remaining(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_try_pop_is_all_or_nothing() {
        let (ring, controller) = ring(8);
        ring.push(&[1, 2, 3]);

        let mut out = [0u8; 4];
        assert_eq!(ring.try_pop(&mut out), Err(TryPopError::Empty));
        assert_eq!(ring.len(), 3);

        controller.request_shutdown();
        assert_eq!(ring.try_pop(&mut out), Err(TryPopError::Shutdown));

        let mut out = [0u8; 3];
        assert_eq!(ring.try_pop(&mut out), Ok(()));
        assert_eq!(out, [1, 2, 3]);
    }

    #[test]
    fn test_chunked_push_resumes_as_space_frees() {
        let (ring, _controller) = ring(4);
        let data: Vec<u8> = (0..12).collect();

        let producer = {
            let ring = ring.clone();
            let data = data.clone();
            thread::spawn(move || ring.push(&data))
        };

        let mut received = Vec::new();
        let mut chunk = [0u8; 2];
        while received.len() < data.len() {
            assert!(ring.pop(&mut chunk));
            received.extend_from_slice(&chunk);
        }

        assert!(producer.join().unwrap());
        assert_eq!(received, data);
    }

    #[test]
    fn test_interrupted_push_keeps_prefix() {
        let (ring, controller) = ring(4);

        let producer = {
            let ring = ring.clone();
            thread::spawn(move || ring.push(&[1, 2, 3, 4, 5, 6]))
        };

        thread::sleep(Duration::from_millis(30));
        controller.request_shutdown();

        assert!(!producer.join().unwrap());
        assert_eq!(ring.take_remaining(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_push_after_shutdown_is_rejected() {
        let (ring, controller) = ring(4);
        controller.request_shutdown();
        assert!(!ring.push(&[1]));
        assert!(ring.is_empty());
    }

    #[test]
    fn test_pop_serves_buffered_bytes_after_shutdown() {
        let (ring, controller) = ring(8);
        ring.push(&[1, 2, 3, 4, 5]);
        controller.request_shutdown();

        let mut out = [0u8; 4];
        assert!(ring.pop(&mut out));
        assert_eq!(out, [1, 2, 3, 4]);
        assert!(!ring.pop(&mut out));
        assert_eq!(ring.take_remaining(), vec![5]);
    }

    #[test]
    fn test_destroy_reports_unplayed_bytes() {
        let (ring, _controller) = ring(8);
        ring.push(&[0; 6]);
        let mut out = [0u8; 2];
        ring.pop(&mut out);

        let stats = ring.stats();
        assert_eq!(stats.total_pushed, 6);
        assert_eq!(stats.total_popped, 2);
        assert!(stats.is_conserved());

        assert_eq!(ring.destroy(), 4);
    }
}
