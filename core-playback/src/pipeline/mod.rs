//! # Pipeline Workers
//!
//! The thread bodies that sit on either side of the two buffers:
//!
//! - [`producer`] - decode loops pushing into the frame queue and byte ring
//! - [`audio_sink`] - pops fixed-size chunks and writes them to the device
//! - [`presenter`] - timer-driven, non-blocking consumer of the frame queue
//!
//! Producers and consumers never talk to each other directly. Every worker
//! takes its buffer (and through it the shared controller) by handle, and
//! returns a [`WorkerReport`] when its loop ends.

pub mod audio_sink;
pub mod presenter;
pub mod producer;

pub use audio_sink::run_audio_sink;
pub use presenter::{PresentationPump, TickOutcome};
pub use producer::{run_audio_producer, run_video_producer};

/// Thread name of the video decode producer.
pub const VIDEO_DECODE: &str = "video-decode";
/// Thread name of the audio decode producer.
pub const AUDIO_DECODE: &str = "audio-decode";
/// Thread name of the audio sink.
pub const AUDIO_SINK: &str = "audio-sink";
/// Thread name of the presentation pump.
pub const PRESENTER: &str = "presenter";

/// Summary of one worker loop.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkerReport {
    /// Thread name of the worker
    pub worker: &'static str,
    /// Frames or chunks moved through the buffer
    pub items: u64,
    /// Payload bytes moved through the buffer
    pub bytes: u64,
    /// Collaborator errors observed (decode, device, surface)
    pub errors: u64,
    /// Presentation ticks that found the queue empty
    pub underruns: u64,
    /// The source reported end of stream
    pub end_of_stream: bool,
}

impl WorkerReport {
    pub fn new(worker: &'static str) -> Self {
        Self {
            worker,
            ..Default::default()
        }
    }

    pub(crate) fn record(&mut self, bytes: usize) {
        self.items += 1;
        self.bytes += bytes as u64;
    }
}
