//! # Media Session
//!
//! Wires the buffers, the controller and the pipeline workers into one
//! running playback session.
//!
//! ## Lifecycle
//!
//! 1. [`MediaSession::start`] creates a single [`PlaybackController`], builds
//!    the buffers from the configured capacities and spawns one named thread
//!    per worker.
//! 2. While running, UI handlers call [`MediaSession::toggle_pause`] and may
//!    observe buffer occupancy.
//! 3. [`MediaSession::shutdown`] requests shutdown, joins every worker and
//!    only then destroys the buffers. Destroying a buffer while a thread is
//!    still inside it is never possible through this type.
//!
//! Dropping a session without calling `shutdown` still requests shutdown, so
//! worker threads exit on their own, but they are detached rather than
//! joined.

use crate::byte_ring::AudioByteRing;
use crate::controller::PlaybackController;
use crate::error::{PlaybackError, Result};
use crate::frame_queue::VideoFrameQueue;
use crate::pipeline::audio_sink::effective_chunk_len;
use crate::pipeline::{
    run_audio_producer, run_audio_sink, run_video_producer, PresentationPump, WorkerReport,
    AUDIO_DECODE, AUDIO_SINK, PRESENTER, VIDEO_DECODE,
};
use crate::stats::BufferStats;
use bridge_traits::PlaybackSessionId;
use core_runtime::config::CoreConfig;
use std::any::Any;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Outcome of a session that was shut down cleanly.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub id: PlaybackSessionId,
    /// One report per worker, in spawn order
    pub workers: Vec<WorkerReport>,
    /// Frame queue counters at shutdown, if video was wired
    pub video: Option<BufferStats>,
    /// Byte ring counters at shutdown, if audio was wired
    pub audio: Option<BufferStats>,
    /// Frames still queued at shutdown and released by `destroy`
    pub frames_released: usize,
    /// Audio bytes still buffered at shutdown and discarded by `destroy`
    pub bytes_discarded: usize,
}

impl SessionReport {
    /// Report of the worker with the given thread name.
    pub fn worker(&self, name: &str) -> Option<&WorkerReport> {
        self.workers.iter().find(|w| w.worker == name)
    }
}

struct Worker {
    name: &'static str,
    handle: JoinHandle<WorkerReport>,
}

/// A running playback session.
pub struct MediaSession {
    id: PlaybackSessionId,
    controller: Arc<PlaybackController>,
    video_queue: Option<VideoFrameQueue>,
    audio_ring: Option<AudioByteRing>,
    audio_chunk_len: usize,
    workers: Vec<Worker>,
}

impl MediaSession {
    /// Build the buffers and spawn the worker threads.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::Runtime`] if the configuration does not validate
    /// - [`PlaybackError::ThreadSpawn`] if a worker thread cannot be created;
    ///   workers already spawned are told to shut down
    pub fn start(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let settings = config.settings;
        let id = PlaybackSessionId::new();
        let controller = Arc::new(PlaybackController::new(settings.pause_poll_interval()));

        let mut session = Self {
            id,
            controller: Arc::clone(&controller),
            video_queue: None,
            audio_ring: None,
            audio_chunk_len: 0,
            workers: Vec::new(),
        };

        let CoreConfig {
            video_source,
            presentation_surface,
            audio_source,
            audio_device,
            ..
        } = config;

        if let (Some(mut source), Some(surface)) = (video_source, presentation_surface) {
            let queue = VideoFrameQueue::new(settings.video_queue_capacity, Arc::clone(&controller));
            session.video_queue = Some(queue.clone());

            let producer_queue = queue.clone();
            session.spawn(VIDEO_DECODE, move || {
                run_video_producer(id, source.as_mut(), &producer_queue)
            })?;

            let pump = PresentationPump::new(id, queue, surface, settings.frame_interval());
            session.spawn(PRESENTER, move || pump.run())?;
        }

        if let (Some(mut source), Some(mut device)) = (audio_source, audio_device) {
            let ring = AudioByteRing::new(settings.audio_ring_capacity, Arc::clone(&controller));
            session.audio_ring = Some(ring.clone());

            let producer_ring = ring.clone();
            session.spawn(AUDIO_DECODE, move || {
                run_audio_producer(id, source.as_mut(), &producer_ring)
            })?;

            let chunk_len =
                effective_chunk_len(device.as_ref(), ring.capacity(), settings.audio_chunk_bytes);
            session.audio_chunk_len = chunk_len;
            session.spawn(AUDIO_SINK, move || {
                run_audio_sink(id, device.as_mut(), &ring, chunk_len)
            })?;
        }

        info!(
            session = %id,
            video = session.video_queue.is_some(),
            audio = session.audio_ring.is_some(),
            frame_rate = settings.frame_rate,
            "Media session started"
        );

        Ok(session)
    }

    fn spawn<F>(&mut self, name: &'static str, work: F) -> Result<()>
    where
        F: FnOnce() -> WorkerReport + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(work)
            .map_err(|source| PlaybackError::ThreadSpawn { name, source })?;

        debug!(session = %self.id, worker = name, "Worker spawned");
        self.workers.push(Worker { name, handle });
        Ok(())
    }

    pub fn id(&self) -> PlaybackSessionId {
        self.id
    }

    /// The controller shared by every buffer and worker of this session.
    pub fn controller(&self) -> &Arc<PlaybackController> {
        &self.controller
    }

    /// Flip pause. Returns `true` if playback is now paused.
    pub fn toggle_pause(&self) -> bool {
        self.controller.toggle_pause()
    }

    pub fn is_paused(&self) -> bool {
        self.controller.is_paused()
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    pub fn video_stats(&self) -> Option<BufferStats> {
        self.video_queue.as_ref().map(VideoFrameQueue::stats)
    }

    pub fn audio_stats(&self) -> Option<BufferStats> {
        self.audio_ring.as_ref().map(AudioByteRing::stats)
    }

    /// `true` once every decode producer has returned.
    pub fn producers_finished(&self) -> bool {
        self.workers
            .iter()
            .filter(|w| w.name == VIDEO_DECODE || w.name == AUDIO_DECODE)
            .all(|w| w.handle.is_finished())
    }

    /// Block until the producers are done and the buffers hold less than one
    /// consumer step, or until `timeout` elapses. Returns `true` on success.
    ///
    /// Useful for playing a finite stream to the end before shutting down.
    pub fn wait_until_drained(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        loop {
            let video_done = self.video_stats().map_or(true, |s| s.occupied == 0);
            // The sink only pops whole chunks; a shorter tail is flushed at shutdown.
            let audio_done = self
                .audio_stats()
                .map_or(true, |s| s.occupied < self.audio_chunk_len);

            if self.producers_finished() && video_done && audio_done {
                return true;
            }

            if Instant::now() >= deadline {
                return false;
            }

            thread::sleep(self.controller.poll_interval());
        }
    }

    /// Stop the session in the required order: request shutdown, join every
    /// worker, destroy the buffers.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::WorkerPanicked`] if any worker panicked. The buffers
    /// are destroyed regardless.
    pub fn shutdown(mut self) -> Result<SessionReport> {
        info!(session = %self.id, "Shutting down media session");
        self.controller.request_shutdown();

        let mut workers = Vec::with_capacity(self.workers.len());
        let mut panicked = None;

        for worker in self.workers.drain(..) {
            match worker.handle.join() {
                Ok(report) => workers.push(report),
                Err(payload) => {
                    let message = panic_message(worker.name, payload.as_ref());
                    error!(session = %self.id, worker = worker.name, "{}", message);
                    if panicked.is_none() {
                        panicked = Some(message);
                    }
                }
            }
        }

        let mut report = SessionReport {
            id: self.id,
            workers,
            video: None,
            audio: None,
            frames_released: 0,
            bytes_discarded: 0,
        };

        if let Some(queue) = self.video_queue.take() {
            report.video = Some(queue.stats());
            report.frames_released = queue.destroy();
        }

        if let Some(ring) = self.audio_ring.take() {
            report.audio = Some(ring.stats());
            report.bytes_discarded = ring.destroy();
        }

        match panicked {
            Some(message) => Err(PlaybackError::WorkerPanicked(message)),
            None => {
                info!(session = %self.id, "Media session stopped");
                Ok(report)
            }
        }
    }
}

impl Drop for MediaSession {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            debug!(session = %self.id, "Session dropped without shutdown, detaching workers");
        }
        self.controller.request_shutdown();
    }
}

impl std::fmt::Debug for MediaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaSession")
            .field("id", &self.id)
            .field("controller", &self.controller)
            .field("video", &self.video_stats())
            .field("audio", &self.audio_stats())
            .field(
                "workers",
                &self.workers.iter().map(|w| w.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn panic_message(worker: &str, payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("{} worker panicked: {}", worker, detail)
}
