//! # Playback Controller
//!
//! Shared `{running, paused}` state machine obeyed by every buffer.
//!
//! ## Overview
//!
//! One controller is created per session and handed (as an `Arc`) to every
//! buffer and worker. It owns no buffer state. Its two jobs are:
//!
//! - publishing the `running` and `paused` flags with acquire/release
//!   ordering, so every thread observes a transition promptly
//! - waking threads that are parked inside a buffer's `push`/`pop` when a
//!   transition happens, so they re-evaluate their predicate instead of
//!   sleeping on a condition that will never fire
//!
//! ## Wake protocol
//!
//! Buffers register themselves with the controller when they are created.
//! [`request_shutdown`](PlaybackController::request_shutdown) flips `running`
//! and broadcasts on both condition variables of every registered buffer.
//! [`wait_while_paused`](PlaybackController::wait_while_paused) re-broadcasts
//! every poll interval while paused, and also parks on a resume condition
//! variable so that unpausing takes effect immediately.
//!
//! `running` only ever goes from `true` to `false`.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Weak;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Default polling period of [`PlaybackController::wait_while_paused`].
pub const DEFAULT_PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A buffer whose waiters can be woken by the controller.
pub(crate) trait WakeAll: Send + Sync {
    /// Broadcast on every condition variable the buffer owns.
    ///
    /// Implementations must take the buffer lock before notifying, so a
    /// waiter that checked its predicate but has not parked yet cannot miss
    /// the wakeup.
    fn wake_all(&self);
}

/// Process-wide playback state shared by producers, consumers and UI handlers.
pub struct PlaybackController {
    running: AtomicBool,
    paused: AtomicBool,
    poll_interval: Duration,
    resume_gate: Mutex<()>,
    resumed: Condvar,
    waiters: Mutex<Vec<Weak<dyn WakeAll>>>,
}

impl PlaybackController {
    /// Create a running, unpaused controller.
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            running: AtomicBool::new(true),
            paused: AtomicBool::new(false),
            poll_interval,
            resume_gate: Mutex::new(()),
            resumed: Condvar::new(),
            waiters: Mutex::new(Vec::new()),
        }
    }

    /// `false` once shutdown has been requested. Never becomes `true` again.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Flip the paused flag. Returns the new value.
    pub fn toggle_pause(&self) -> bool {
        let paused = !self.paused.fetch_xor(true, Ordering::AcqRel);

        if paused {
            info!("Playback paused");
        } else {
            info!("Playback resumed");
            self.notify_resumed();
            self.broadcast();
        }

        paused
    }

    /// Pause if currently playing. Returns `true` if the state changed.
    pub fn pause(&self) -> bool {
        let changed = self
            .paused
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if changed {
            info!("Playback paused");
        }
        changed
    }

    /// Resume if currently paused. Returns `true` if the state changed.
    pub fn resume(&self) -> bool {
        let changed = self
            .paused
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if changed {
            info!("Playback resumed");
            self.notify_resumed();
            self.broadcast();
        }
        changed
    }

    /// Block the calling thread while playback is paused and still running.
    ///
    /// Every poll interval the controller re-broadcasts on all registered
    /// buffers, so threads parked inside a buffer re-check their predicate.
    /// Unpausing or shutting down wakes this wait immediately.
    ///
    /// Must not be called while holding a buffer lock.
    ///
    /// Returns the current `running` value: `true` means playback resumed,
    /// `false` means the session is shutting down.
    pub fn wait_while_paused(&self) -> bool {
        while self.is_paused() && self.is_running() {
            self.broadcast();

            let mut gate = self.resume_gate.lock();
            // Flags are rechecked under the gate; transitions notify under it too.
            if self.is_paused() && self.is_running() {
                self.resumed.wait_for(&mut gate, self.poll_interval);
            }
        }

        self.is_running()
    }

    /// Stop the session: `running` becomes `false` and every waiter is woken.
    ///
    /// Blocked `push`/`pop` calls return their failure value. Calling this
    /// more than once is harmless.
    pub fn request_shutdown(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            info!("Shutdown requested");
        }

        self.notify_resumed();
        self.broadcast();
    }

    /// Add a buffer to the wake registry.
    pub(crate) fn register(&self, buffer: Weak<dyn WakeAll>) {
        let mut waiters = self.waiters.lock();
        waiters.retain(|w| w.strong_count() > 0);
        waiters.push(buffer);
        debug!(buffers = waiters.len(), "Buffer registered with controller");
    }

    /// Wake every waiter of every live buffer.
    fn broadcast(&self) {
        let live: Vec<_> = {
            let mut waiters = self.waiters.lock();
            waiters.retain(|w| w.strong_count() > 0);
            waiters.iter().filter_map(Weak::upgrade).collect()
        };

        trace!(buffers = live.len(), "Broadcasting wakeup");
        for buffer in live {
            buffer.wake_all();
        }
    }

    fn notify_resumed(&self) {
        let _gate = self.resume_gate.lock();
        self.resumed.notify_all();
    }
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new(DEFAULT_PAUSE_POLL_INTERVAL)
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("running", &self.is_running())
            .field("paused", &self.is_paused())
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[derive(Default)]
    struct CountingBuffer {
        wakes: AtomicUsize,
    }

    impl WakeAll for CountingBuffer {
        fn wake_all(&self) {
            self.wakes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_initial_state() {
        let controller = PlaybackController::default();
        assert!(controller.is_running());
        assert!(!controller.is_paused());
        assert_eq!(controller.poll_interval(), DEFAULT_PAUSE_POLL_INTERVAL);
    }

    #[test]
    fn test_toggle_pause() {
        let controller = PlaybackController::default();
        assert!(controller.toggle_pause());
        assert!(controller.is_paused());
        assert!(!controller.toggle_pause());
        assert!(!controller.is_paused());
    }

    #[test]
    fn test_pause_resume_report_changes() {
        let controller = PlaybackController::default();
        assert!(controller.pause());
        assert!(!controller.pause());
        assert!(controller.resume());
        assert!(!controller.resume());
    }

    #[test]
    fn test_shutdown_is_permanent() {
        let controller = PlaybackController::default();
        controller.request_shutdown();
        controller.request_shutdown();
        assert!(!controller.is_running());

        controller.toggle_pause();
        assert!(!controller.is_running());
    }

    #[test]
    fn test_wait_while_paused_returns_immediately_when_playing() {
        let controller = PlaybackController::default();
        assert!(controller.wait_while_paused());
    }

    #[test]
    fn test_wait_while_paused_wakes_on_resume() {
        let controller = Arc::new(PlaybackController::new(Duration::from_secs(5)));
        controller.toggle_pause();

        let waiter = {
            let controller = Arc::clone(&controller);
            thread::spawn(move || {
                let started = Instant::now();
                let running = controller.wait_while_paused();
                (running, started.elapsed())
            })
        };

        thread::sleep(Duration::from_millis(50));
        controller.toggle_pause();

        let (running, waited) = waiter.join().unwrap();
        assert!(running);
        // The resume condvar fires long before the 5 s poll interval elapses.
        assert!(waited < Duration::from_secs(4));
    }

    #[test]
    fn test_wait_while_paused_reports_shutdown() {
        let controller = Arc::new(PlaybackController::default());
        controller.toggle_pause();

        let waiter = {
            let controller = Arc::clone(&controller);
            thread::spawn(move || controller.wait_while_paused())
        };

        thread::sleep(Duration::from_millis(30));
        controller.request_shutdown();

        assert!(!waiter.join().unwrap());
    }

    #[test]
    fn test_paused_wait_broadcasts_every_poll() {
        let controller = Arc::new(PlaybackController::new(Duration::from_millis(5)));
        let buffer = Arc::new(CountingBuffer::default());
        let weak: Weak<dyn WakeAll> = Arc::downgrade(&buffer) as Weak<dyn WakeAll>;
        controller.register(weak);
        controller.toggle_pause();

        let waiter = {
            let controller = Arc::clone(&controller);
            thread::spawn(move || controller.wait_while_paused())
        };

        thread::sleep(Duration::from_millis(60));
        controller.toggle_pause();
        assert!(waiter.join().unwrap());

        assert!(buffer.wakes.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn test_dropped_buffers_are_pruned() {
        let controller = PlaybackController::default();
        let buffer = Arc::new(CountingBuffer::default());
        controller.register(Arc::downgrade(&buffer) as Weak<dyn WakeAll>);
        drop(buffer);

        // Broadcasting after the buffer is gone must not panic.
        controller.request_shutdown();
        assert!(controller.waiters.lock().is_empty());
    }
}
