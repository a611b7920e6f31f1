//! # Core Configuration Module
//!
//! Provides configuration for a playback session.
//!
//! ## Overview
//!
//! Two layers:
//!
//! - [`BufferSettings`] - plain, serialisable numbers: buffer capacities, the
//!   presentation frame rate, the audio sink's chunk length and the pause
//!   polling interval. Every field has a default so partial JSON documents
//!   are accepted.
//! - [`CoreConfig`] - the settings plus the injected collaborators (decode
//!   sources, audio device, presentation surface). Built with
//!   [`CoreConfig::builder`], which fails fast when a pipeline is only half
//!   wired.
//!
//! Capacities are construction-time parameters. Nothing in a running session
//! re-reads them.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{BufferSettings, CoreConfig};
//!
//! let config = CoreConfig::builder()
//!     .settings(BufferSettings::default().with_frame_rate(25))
//!     .video_source(Box::new(MyDecoder::open("clip.mp4")?))
//!     .presentation_surface(Box::new(MyWidgetSurface::new()))
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Neither pipeline is wired, so this fails with an actionable message
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - no pipeline configured");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{AudioDevice, AudioSampleSource, PresentationSurface, VideoFrameSource};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of decoded images the frame queue holds.
pub const DEFAULT_VIDEO_QUEUE_CAPACITY: usize = 20;

/// Default size of the audio byte ring (about 46 ms of 44.1 kHz S16 stereo).
pub const DEFAULT_AUDIO_RING_CAPACITY: usize = 8192;

/// Buffer and pacing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferSettings {
    /// Number of decoded images the frame queue can hold.
    ///
    /// Default: 20.
    #[serde(default = "default_video_queue_capacity")]
    pub video_queue_capacity: usize,

    /// Capacity of the audio ring in bytes.
    ///
    /// Default: 8192.
    #[serde(default = "default_audio_ring_capacity")]
    pub audio_ring_capacity: usize,

    /// Bytes the audio sink pops per device write.
    ///
    /// Must not exceed `audio_ring_capacity`, or the pop could never be
    /// satisfied.
    ///
    /// Default: 4096.
    #[serde(default = "default_audio_chunk_bytes")]
    pub audio_chunk_bytes: usize,

    /// Presentation ticks per second.
    ///
    /// Default: 30.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// How often a paused waiter re-broadcasts wakeups to the buffers.
    ///
    /// Default: 10 ms.
    #[serde(default = "default_pause_poll_interval_ms")]
    pub pause_poll_interval_ms: u64,
}

fn default_video_queue_capacity() -> usize {
    DEFAULT_VIDEO_QUEUE_CAPACITY
}

fn default_audio_ring_capacity() -> usize {
    DEFAULT_AUDIO_RING_CAPACITY
}

fn default_audio_chunk_bytes() -> usize {
    4096
}

fn default_frame_rate() -> u32 {
    30
}

fn default_pause_poll_interval_ms() -> u64 {
    10
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            video_queue_capacity: default_video_queue_capacity(),
            audio_ring_capacity: default_audio_ring_capacity(),
            audio_chunk_bytes: default_audio_chunk_bytes(),
            frame_rate: default_frame_rate(),
            pause_poll_interval_ms: default_pause_poll_interval_ms(),
        }
    }
}

impl BufferSettings {
    /// Settings tuned for minimal latency.
    ///
    /// - Fewer queued images (8)
    /// - Smaller audio ring (4 KB) and chunks (1 KB)
    /// - Faster pause polling (5 ms)
    pub fn low_latency() -> Self {
        Self {
            video_queue_capacity: 8,
            audio_ring_capacity: 4096,
            audio_chunk_bytes: 1024,
            pause_poll_interval_ms: 5,
            ..Default::default()
        }
    }

    /// Settings tuned for bursty decoders.
    ///
    /// - More queued images (48)
    /// - Larger audio ring (64 KB, ~370 ms at CD quality)
    pub fn smooth() -> Self {
        Self {
            video_queue_capacity: 48,
            audio_ring_capacity: 64 * 1024,
            audio_chunk_bytes: 8192,
            ..Default::default()
        }
    }

    /// Parse settings from a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Set the presentation frame rate.
    pub fn with_frame_rate(mut self, frame_rate: u32) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    /// Set both buffer capacities.
    pub fn with_capacities(mut self, video_frames: usize, audio_bytes: usize) -> Self {
        self.video_queue_capacity = video_frames;
        self.audio_ring_capacity = audio_bytes;
        self
    }

    /// Set the audio sink chunk length.
    pub fn with_audio_chunk_bytes(mut self, bytes: usize) -> Self {
        self.audio_chunk_bytes = bytes;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.video_queue_capacity == 0 {
            return Err(Error::Config("video_queue_capacity must be > 0".to_string()));
        }

        if self.audio_ring_capacity == 0 {
            return Err(Error::Config("audio_ring_capacity must be > 0".to_string()));
        }

        if self.audio_chunk_bytes == 0 {
            return Err(Error::Config("audio_chunk_bytes must be > 0".to_string()));
        }

        if self.audio_chunk_bytes > self.audio_ring_capacity {
            return Err(Error::Config(format!(
                "audio_chunk_bytes ({}) cannot exceed audio_ring_capacity ({})",
                self.audio_chunk_bytes, self.audio_ring_capacity
            )));
        }

        if self.frame_rate == 0 {
            return Err(Error::Config("frame_rate must be > 0".to_string()));
        }

        if self.pause_poll_interval_ms == 0 {
            return Err(Error::Config("pause_poll_interval_ms must be > 0".to_string()));
        }

        Ok(())
    }

    /// Time between two presentation ticks.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate.max(1) as f64)
    }

    /// Polling period of the pause wait.
    pub fn pause_poll_interval(&self) -> Duration {
        Duration::from_millis(self.pause_poll_interval_ms)
    }
}

/// Session configuration: settings plus injected collaborators.
///
/// Use [`CoreConfigBuilder`] to construct instances. The collaborators are
/// moved into their worker threads when the session starts, so the config is
/// consumed by value.
pub struct CoreConfig {
    /// Buffer and pacing settings
    pub settings: BufferSettings,

    /// Decoder feeding the frame queue
    pub video_source: Option<Box<dyn VideoFrameSource>>,

    /// Surface the presentation pump renders to
    pub presentation_surface: Option<Box<dyn PresentationSurface>>,

    /// Decoder feeding the audio ring
    pub audio_source: Option<Box<dyn AudioSampleSource>>,

    /// Device the audio sink writes to
    pub audio_device: Option<Box<dyn AudioDevice>>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("settings", &self.settings)
            .field(
                "video_source",
                &self.video_source.as_ref().map(|_| "VideoFrameSource { ... }"),
            )
            .field(
                "presentation_surface",
                &self
                    .presentation_surface
                    .as_ref()
                    .map(|_| "PresentationSurface { ... }"),
            )
            .field(
                "audio_source",
                &self.audio_source.as_ref().map(|_| "AudioSampleSource { ... }"),
            )
            .field(
                "audio_device",
                &self.audio_device.as_ref().map(|_| "AudioDevice { ... }"),
            )
            .finish()
    }
}

impl CoreConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Returns `true` if the video pipeline is fully wired.
    pub fn has_video(&self) -> bool {
        self.video_source.is_some() && self.presentation_surface.is_some()
    }

    /// Returns `true` if the audio pipeline is fully wired.
    pub fn has_audio(&self) -> bool {
        self.audio_source.is_some() && self.audio_device.is_some()
    }

    /// Validate settings and collaborator wiring.
    pub fn validate(&self) -> Result<()> {
        self.settings.validate()?;

        match (self.video_source.is_some(), self.presentation_surface.is_some()) {
            (true, false) => return Err(capability_missing("PresentationSurface", "video")),
            (false, true) => return Err(capability_missing("VideoFrameSource", "video")),
            _ => {}
        }

        match (self.audio_source.is_some(), self.audio_device.is_some()) {
            (true, false) => return Err(capability_missing("AudioDevice", "audio")),
            (false, true) => return Err(capability_missing("AudioSampleSource", "audio")),
            _ => {}
        }

        if !self.has_video() && !self.has_audio() {
            return Err(Error::CapabilityMissing {
                capability: "pipeline".to_string(),
                message: "No pipeline configured. Provide a VideoFrameSource with a \
                          PresentationSurface, an AudioSampleSource with an AudioDevice, \
                          or both."
                    .to_string(),
            });
        }

        Ok(())
    }
}

fn capability_missing(capability: &str, pipeline: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "The {} pipeline needs both a producer and a consumer. \
             Provide a {} implementation or remove the other half.",
            pipeline, capability
        ),
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    settings: Option<BufferSettings>,
    video_source: Option<Box<dyn VideoFrameSource>>,
    presentation_surface: Option<Box<dyn PresentationSurface>>,
    audio_source: Option<Box<dyn AudioSampleSource>>,
    audio_device: Option<Box<dyn AudioDevice>>,
}

impl CoreConfigBuilder {
    /// Set the buffer and pacing settings (defaults otherwise).
    pub fn settings(mut self, settings: BufferSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Set the decoder that feeds the frame queue.
    pub fn video_source(mut self, source: Box<dyn VideoFrameSource>) -> Self {
        self.video_source = Some(source);
        self
    }

    /// Set the surface the presentation pump renders to.
    pub fn presentation_surface(mut self, surface: Box<dyn PresentationSurface>) -> Self {
        self.presentation_surface = Some(surface);
        self
    }

    /// Set the decoder that feeds the audio ring.
    pub fn audio_source(mut self, source: Box<dyn AudioSampleSource>) -> Self {
        self.audio_source = Some(source);
        self
    }

    /// Set the device the audio sink writes to.
    pub fn audio_device(mut self, device: Box<dyn AudioDevice>) -> Self {
        self.audio_device = Some(device);
        self
    }

    /// Build the configuration, validating settings and wiring.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when a setting is out of range
    /// - [`Error::CapabilityMissing`] when a pipeline is half wired or no
    ///   pipeline is wired at all
    pub fn build(self) -> Result<CoreConfig> {
        let config = CoreConfig {
            settings: self.settings.unwrap_or_default(),
            video_source: self.video_source,
            presentation_surface: self.presentation_surface,
            audio_source: self.audio_source,
            audio_device: self.audio_device,
        };

        config.validate()?;
        Ok(config)
    }
}
