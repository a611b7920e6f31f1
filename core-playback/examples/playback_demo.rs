//! # Playback Session Example
//!
//! Runs a full session against synthetic collaborators: a gradient video
//! generator, a sine-wave audio generator, a console "surface" and an audio
//! device that sleeps for as long as each chunk would take to play.
//!
//! Run with: `cargo run --example playback_demo --package core-playback`

use anyhow::Context;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    AudioDevice, AudioSampleSource, DecodedImage, FrameHandle, LogLevel, PcmFormat,
    PresentationSurface, VideoFrameSource,
};
use bytes::{BufMut, Bytes, BytesMut};
use core_playback::MediaSession;
use core_runtime::config::{BufferSettings, CoreConfig};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::time::Duration;

// ============================================================================
// Synthetic Video Source
// ============================================================================

struct GradientVideo {
    width: u32,
    height: u32,
    frame: u32,
    total: u32,
    frame_rate: u32,
}

impl VideoFrameSource for GradientVideo {
    fn next_frame(&mut self) -> BridgeResult<Option<DecodedImage>> {
        if self.frame == self.total {
            return Ok(None);
        }

        let shift = (self.frame * 4) as u8;
        let mut pixels = BytesMut::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                pixels.put_u8((x as u8).wrapping_add(shift));
                pixels.put_u8((y as u8).wrapping_add(shift));
                pixels.put_u8(shift);
            }
        }

        let pts = Duration::from_secs_f64(self.frame as f64 / self.frame_rate as f64);
        self.frame += 1;

        Ok(Some(
            DecodedImage::rgb24(self.width, self.height, pixels.freeze()).with_pts(pts),
        ))
    }
}

// ============================================================================
// Synthetic Audio Source
// ============================================================================

struct SineAudio {
    format: PcmFormat,
    frequency: f64,
    sample: u64,
    total_samples: u64,
}

impl AudioSampleSource for SineAudio {
    fn format(&self) -> PcmFormat {
        self.format
    }

    fn next_chunk(&mut self) -> BridgeResult<Option<Bytes>> {
        if self.sample >= self.total_samples {
            return Ok(None);
        }

        let frames = 1024.min(self.total_samples - self.sample);
        let mut chunk = BytesMut::with_capacity(frames as usize * self.format.bytes_per_frame());

        for _ in 0..frames {
            let t = self.sample as f64 / self.format.sample_rate as f64;
            let value = (t * self.frequency * std::f64::consts::TAU).sin() * 0.25;
            let sample = (value * i16::MAX as f64) as i16;
            for _ in 0..self.format.channels {
                chunk.put_i16_le(sample);
            }
            self.sample += 1;
        }

        Ok(Some(chunk.freeze()))
    }
}

// ============================================================================
// Console Collaborators
// ============================================================================

struct ConsoleSurface {
    shown: u64,
}

impl PresentationSurface for ConsoleSurface {
    fn present(&mut self, frame: FrameHandle) -> BridgeResult<()> {
        self.shown += 1;
        if self.shown % 15 == 1 {
            println!(
                "   frame {:>3} {}x{} pts={:?}",
                self.shown,
                frame.width,
                frame.height,
                frame.pts.unwrap_or_default()
            );
        }
        Ok(())
    }
}

struct PacedDevice {
    format: PcmFormat,
    played: usize,
}

impl AudioDevice for PacedDevice {
    fn preferred_chunk_len(&self) -> Option<usize> {
        Some(2048)
    }

    fn write(&mut self, bytes: &[u8]) -> BridgeResult<()> {
        self.played += bytes.len();
        std::thread::sleep(self.format.duration_of(bytes.len()));
        Ok(())
    }

    fn drain(&mut self) -> BridgeResult<()> {
        println!(
            "   audio drained after {:?} of sound",
            self.format.duration_of(self.played)
        );
        Ok(())
    }
}

// ============================================================================
// Main Demo
// ============================================================================

fn main() -> anyhow::Result<()> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Info),
    )
    .context("failed to initialise logging")?;

    println!("Playback core demo\n");

    let settings = BufferSettings::default();
    let format = PcmFormat::CD_STEREO_S16;

    let config = CoreConfig::builder()
        .settings(settings)
        .video_source(Box::new(GradientVideo {
            width: 64,
            height: 36,
            frame: 0,
            total: settings.frame_rate * 2,
            frame_rate: settings.frame_rate,
        }))
        .presentation_surface(Box::new(ConsoleSurface { shown: 0 }))
        .audio_source(Box::new(SineAudio {
            format,
            frequency: 440.0,
            sample: 0,
            total_samples: format.sample_rate as u64 * 2,
        }))
        .audio_device(Box::new(PacedDevice { format, played: 0 }))
        .build()
        .context("invalid session configuration")?;

    let session = MediaSession::start(config)?;
    println!("Session {} started", session.id());

    std::thread::sleep(Duration::from_millis(700));
    session.toggle_pause();
    println!("Paused: video={:?}", session.video_stats());
    std::thread::sleep(Duration::from_millis(300));
    session.toggle_pause();
    println!("Resumed");

    if !session.wait_until_drained(Duration::from_secs(10)) {
        println!("Timed out waiting for the streams to finish");
    }

    let report = session.shutdown()?;

    println!("\nWorker summary:");
    for worker in &report.workers {
        println!(
            "   {:<13} items={:<5} bytes={:<8} errors={} underruns={} eos={}",
            worker.worker,
            worker.items,
            worker.bytes,
            worker.errors,
            worker.underruns,
            worker.end_of_stream
        );
    }
    println!(
        "Released {} queued frames, discarded {} audio bytes",
        report.frames_released, report.bytes_discarded
    );

    Ok(())
}
