//! # Playback Buffering Core
//!
//! Bounded, blocking buffers that decouple decode throughput from the
//! presentation rate, plus the pause/resume/shutdown protocol they obey.
//!
//! ## Overview
//!
//! This crate handles:
//! - [`VideoFrameQueue`] - bounded FIFO of decoded-image handles (default 20)
//! - [`AudioByteRing`] - bounded circular byte buffer with chunked,
//!   wrap-around push and pop (default 8192 bytes)
//! - [`PlaybackController`] - shared `running`/`paused` flags and the wake
//!   protocol that reaches threads parked inside either buffer
//! - [`pipeline`] - decode producers, the audio sink and the presentation pump
//! - [`MediaSession`] - spawns the workers and shuts them down in order
//!
//! Video and audio buffers are fully independent. Nothing here synchronises
//! audio with video; that belongs to the consumers.
//!
//! ## Shutdown order
//!
//! `request_shutdown()`, then join every thread that touches a buffer, then
//! `destroy()` the buffers. [`MediaSession::shutdown`] does exactly this.

pub mod byte_ring;
pub mod controller;
pub mod error;
pub mod frame_queue;
pub mod pipeline;
pub mod session;
pub mod stats;

pub use byte_ring::AudioByteRing;
pub use controller::{PlaybackController, DEFAULT_PAUSE_POLL_INTERVAL};
pub use error::{PlaybackError, Result, Shutdown, TryPopError, TryPushError};
pub use frame_queue::VideoFrameQueue;
pub use pipeline::{PresentationPump, TickOutcome, WorkerReport};
pub use session::{MediaSession, SessionReport};
pub use stats::BufferStats;
