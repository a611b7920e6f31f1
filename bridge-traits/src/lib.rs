//! # Host Bridge Traits
//!
//! Contracts between the core buffering layer and the collaborators around it.
//!
//! ## Overview
//!
//! The core only moves data: it never demultiplexes, decodes, resamples,
//! renders or talks to a sound server. Each of those jobs is a trait in this
//! crate that the host implements with whatever library it prefers.
//!
//! ## Traits
//!
//! ### Producers
//! - [`VideoFrameSource`](playback::VideoFrameSource) - Decoded, color-converted images
//! - [`AudioSampleSource`](playback::AudioSampleSource) - Decoded, resampled PCM bytes
//!
//! ### Consumers
//! - [`PresentationSurface`](playback::PresentationSurface) - Shows one image per tick
//! - [`AudioDevice`](playback::AudioDevice) - Plays fixed-size byte chunks
//!
//! ### Utilities
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Implementations should map per-frame decode failures to
//! `BridgeError::Decode` so the producer can skip the frame instead of
//! stopping the stream.
//!
//! ## Thread Safety
//!
//! Sources, devices and surfaces are moved into a single worker thread and
//! only need `Send`. Logger sinks are shared and need `Send + Sync`.
//!
//! ## Examples
//!
//! ### Implementing AudioDevice
//!
//! ```ignore
//! use bridge_traits::playback::AudioDevice;
//! use bridge_traits::error::{BridgeError, Result};
//!
//! pub struct PulseDevice {
//!     stream: libpulse_simple_binding::Simple,
//! }
//!
//! impl AudioDevice for PulseDevice {
//!     fn write(&mut self, bytes: &[u8]) -> Result<()> {
//!         self.stream
//!             .write(bytes)
//!             .map_err(|e| BridgeError::Device(e.to_string()))
//!     }
//!
//!     fn drain(&mut self) -> Result<()> {
//!         self.stream
//!             .drain()
//!             .map_err(|e| BridgeError::Device(e.to_string()))
//!     }
//! }
//! ```

pub mod error;
pub mod platform;
pub mod playback;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use playback::{
    AudioDevice, AudioSampleSource, DecodedImage, FrameHandle, PcmFormat, PlaybackSessionId,
    PresentationSurface, VideoFrameSource,
};
pub use time::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
