//! Presentation pump: the timer-driven consumer of the frame queue.
//!
//! The pump never blocks on the queue. Each tick takes at most one frame
//! with `try_pop` and hands it to the surface, so it can be driven from a UI
//! event loop via [`PresentationPump::tick`] or from its own thread via
//! [`PresentationPump::run`].

use super::{WorkerReport, PRESENTER};
use crate::error::TryPopError;
use crate::frame_queue::VideoFrameQueue;
use bridge_traits::{PlaybackSessionId, PresentationSurface};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, trace, warn};

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was handed to the surface.
    Presented,
    /// Playback is paused; the queue was not touched.
    Paused,
    /// The queue was empty.
    Underrun,
    /// Shutdown was requested; stop ticking.
    Finished,
}

/// Pops one frame per tick and presents it.
pub struct PresentationPump {
    session: PlaybackSessionId,
    queue: VideoFrameQueue,
    surface: Box<dyn PresentationSurface>,
    frame_interval: Duration,
    report: WorkerReport,
}

impl PresentationPump {
    pub fn new(
        session: PlaybackSessionId,
        queue: VideoFrameQueue,
        surface: Box<dyn PresentationSurface>,
        frame_interval: Duration,
    ) -> Self {
        Self {
            session,
            queue,
            surface,
            frame_interval,
            report: WorkerReport::new(PRESENTER),
        }
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Counters accumulated so far.
    pub fn report(&self) -> &WorkerReport {
        &self.report
    }

    /// Run one presentation step without blocking.
    pub fn tick(&mut self) -> TickOutcome {
        let controller = self.queue.controller();

        if !controller.is_running() {
            return TickOutcome::Finished;
        }

        if controller.is_paused() {
            return TickOutcome::Paused;
        }

        match self.queue.try_pop() {
            Ok(frame) => {
                let bytes = frame.byte_len();
                match self.surface.present(frame) {
                    Ok(()) => self.report.record(bytes),
                    Err(e) => {
                        self.report.errors += 1;
                        warn!(error = %e, "Surface failed to present frame");
                    }
                }
                TickOutcome::Presented
            }
            Err(TryPopError::Empty) => {
                self.report.underruns += 1;
                trace!("Presentation underrun");
                TickOutcome::Underrun
            }
            Err(TryPopError::Shutdown) => TickOutcome::Finished,
        }
    }

    /// Tick at the configured frame rate until shutdown.
    ///
    /// Deadlines advance by a fixed interval so a slow surface does not drift
    /// the cadence; if the pump falls behind it resynchronises to now rather
    /// than bursting.
    #[instrument(skip_all, fields(session = %self.session, worker = PRESENTER))]
    pub fn run(mut self) -> WorkerReport {
        debug!(interval_ms = self.frame_interval.as_millis() as u64, "Presentation pump started");

        let mut deadline = Instant::now();
        while self.tick() != TickOutcome::Finished {
            deadline += self.frame_interval;

            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            } else {
                deadline = now;
            }
        }

        debug!(report = ?self.report, "Presentation pump exiting");
        self.report
    }
}
