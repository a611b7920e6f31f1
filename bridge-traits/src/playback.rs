//! Playback bridge traits and supporting media types.
//!
//! These abstractions describe the collaborators that sit on either side of
//! the core buffering layer: decode engines that produce decoded images and
//! PCM bytes, the audio output device that consumes byte chunks, and the
//! presentation surface that shows images. Host applications provide concrete
//! implementations (FFmpeg, GStreamer, PulseAudio, a GTK or egui widget...).
//!
//! Every trait here is used from exactly one worker thread, so implementations
//! only need to be `Send`.

use crate::{error::Result, platform::PlatformSend};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// A decoded RGB24 image as produced by the decode collaborator.
///
/// The decode engine performs color-space conversion before handing the image
/// over; the core never inspects the pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes per row, including any padding.
    pub stride: usize,
    /// Packed pixel data, `stride * height` bytes.
    pub pixels: Bytes,
    /// Presentation timestamp, when the container provides one.
    pub pts: Option<Duration>,
}

impl DecodedImage {
    /// Create an image with a tightly packed RGB24 stride.
    pub fn rgb24(width: u32, height: u32, pixels: Bytes) -> Self {
        Self {
            width,
            height,
            stride: width as usize * 3,
            pixels,
            pts: None,
        }
    }

    /// Attach a presentation timestamp.
    pub fn with_pts(mut self, pts: Duration) -> Self {
        self.pts = Some(pts);
        self
    }

    /// Size of the pixel buffer in bytes.
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

/// Owned handle to a decoded image.
///
/// While queued, the frame queue holds the only reference; a successful pop
/// moves it to the consumer, which releases it by dropping the handle.
pub type FrameHandle = Arc<DecodedImage>;

/// Layout of the interleaved PCM bytes pushed into the audio ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    /// Sample rate in hertz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Bytes per single-channel sample (2 for signed 16-bit).
    pub bytes_per_sample: u16,
}

impl PcmFormat {
    /// Signed 16-bit little-endian stereo at 44.1 kHz, the resampler's fixed output.
    pub const CD_STEREO_S16: PcmFormat = PcmFormat {
        sample_rate: 44_100,
        channels: 2,
        bytes_per_sample: 2,
    };

    /// Bytes occupied by one sample on every channel.
    pub fn bytes_per_frame(&self) -> usize {
        self.channels as usize * self.bytes_per_sample as usize
    }

    /// Bytes consumed per second of playback.
    pub fn bytes_per_second(&self) -> usize {
        self.bytes_per_frame() * self.sample_rate as usize
    }

    /// Playback duration represented by `bytes` of PCM data.
    pub fn duration_of(&self, bytes: usize) -> Duration {
        let per_second = self.bytes_per_second();
        if per_second == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(bytes as f64 / per_second as f64)
    }
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self::CD_STEREO_S16
    }
}

/// Unique identifier for a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackSessionId(Uuid);

impl PlaybackSessionId {
    /// Generate a new session identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Construct an identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PlaybackSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlaybackSessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Decode engine producing images for the video pipeline.
pub trait VideoFrameSource: PlatformSend {
    /// Decode the next image. Returns `Ok(None)` at end of stream.
    ///
    /// A [`BridgeError::Decode`](crate::BridgeError::Decode) error means only
    /// this frame was lost; any other error ends the stream.
    fn next_frame(&mut self) -> Result<Option<DecodedImage>>;
}

/// Decode engine producing resampled PCM bytes for the audio pipeline.
pub trait AudioSampleSource: PlatformSend {
    /// Layout of the bytes returned by [`next_chunk`](Self::next_chunk).
    fn format(&self) -> PcmFormat;

    /// Decode and resample the next chunk of audio. Returns `Ok(None)` at end
    /// of stream.
    fn next_chunk(&mut self) -> Result<Option<Bytes>>;
}

/// Audio output device fed by the audio sink thread.
pub trait AudioDevice: PlatformSend {
    /// Write size the device prefers, if it has one.
    fn preferred_chunk_len(&self) -> Option<usize> {
        None
    }

    /// Blocking write of one chunk of PCM bytes.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Block until everything written so far has been played.
    fn drain(&mut self) -> Result<()>;
}

/// Surface that renders decoded images, driven by the presentation pump.
pub trait PresentationSurface: PlatformSend {
    /// Show `frame`. The surface owns the handle from here on.
    fn present(&mut self, frame: FrameHandle) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm_format_cd_quality_rates() {
        let format = PcmFormat::default();
        assert_eq!(format.bytes_per_frame(), 4);
        assert_eq!(format.bytes_per_second(), 176_400);
        assert_eq!(format.duration_of(176_400), Duration::from_secs(1));
    }

    #[test]
    fn pcm_format_zero_rate_has_no_duration() {
        let format = PcmFormat {
            sample_rate: 0,
            channels: 2,
            bytes_per_sample: 2,
        };
        assert_eq!(format.duration_of(1024), Duration::ZERO);
    }

    #[test]
    fn decoded_image_rgb24_stride() {
        let image = DecodedImage::rgb24(4, 2, Bytes::from(vec![0u8; 24]))
            .with_pts(Duration::from_millis(40));
        assert_eq!(image.stride, 12);
        assert_eq!(image.byte_len(), 24);
        assert_eq!(image.pts, Some(Duration::from_millis(40)));
    }

    #[test]
    fn session_id_is_unique() {
        let a = PlaybackSessionId::new();
        let b = PlaybackSessionId::new();
        assert_ne!(a, b);
        assert_eq!(a, PlaybackSessionId::from_uuid(*a.as_uuid()));
        assert_eq!(a.to_string(), a.as_uuid().to_string());
    }
}
