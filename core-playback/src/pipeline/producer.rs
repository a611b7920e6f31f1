//! Decode producers.
//!
//! Each loop pulls from its source and performs the blocking push, so a full
//! buffer throttles decoding. A recoverable decode error skips that item; any
//! other error ends the loop. End of stream ends the loop without requesting
//! shutdown: the consumers keep draining what is buffered.

use super::{WorkerReport, AUDIO_DECODE, VIDEO_DECODE};
use crate::byte_ring::AudioByteRing;
use crate::error::Shutdown;
use crate::frame_queue::VideoFrameQueue;
use bridge_traits::{AudioSampleSource, FrameHandle, PlaybackSessionId, VideoFrameSource};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Decode images from `source` into `queue` until end of stream or shutdown.
#[instrument(skip_all, fields(session = %session, worker = VIDEO_DECODE))]
pub fn run_video_producer(
    session: PlaybackSessionId,
    source: &mut dyn VideoFrameSource,
    queue: &VideoFrameQueue,
) -> WorkerReport {
    let controller = Arc::clone(queue.controller());
    let mut report = WorkerReport::new(VIDEO_DECODE);

    while controller.is_running() {
        if controller.is_paused() {
            controller.wait_while_paused();
            continue;
        }

        match source.next_frame() {
            Ok(Some(image)) => {
                let bytes = image.byte_len();
                let frame: FrameHandle = Arc::new(image);

                match queue.push(frame) {
                    Ok(()) => report.record(bytes),
                    Err(Shutdown(frame)) => {
                        drop(frame);
                        debug!("Frame rejected by shutdown");
                        break;
                    }
                }
            }
            Ok(None) => {
                report.end_of_stream = true;
                info!(frames = report.items, "Video stream finished");
                break;
            }
            Err(e) if e.is_recoverable() => {
                report.errors += 1;
                warn!(error = %e, "Skipping undecodable frame");
            }
            Err(e) => {
                report.errors += 1;
                error!(error = %e, "Video decode failed, stopping producer");
                break;
            }
        }
    }

    debug!(?report, "Video producer exiting");
    report
}

/// Decode PCM from `source` into `ring` until end of stream or shutdown.
#[instrument(skip_all, fields(session = %session, worker = AUDIO_DECODE))]
pub fn run_audio_producer(
    session: PlaybackSessionId,
    source: &mut dyn AudioSampleSource,
    ring: &AudioByteRing,
) -> WorkerReport {
    let controller = Arc::clone(ring.controller());
    let mut report = WorkerReport::new(AUDIO_DECODE);

    let format = source.format();
    debug!(
        sample_rate = format.sample_rate,
        channels = format.channels,
        ring_ms = format.duration_of(ring.capacity()).as_millis() as u64,
        "Audio producer started"
    );

    while controller.is_running() {
        if controller.is_paused() {
            controller.wait_while_paused();
            continue;
        }

        match source.next_chunk() {
            Ok(Some(chunk)) => {
                if chunk.is_empty() {
                    continue;
                }

                if !ring.push(&chunk) {
                    debug!(len = chunk.len(), "Audio chunk cut short by shutdown");
                    break;
                }
                report.record(chunk.len());
            }
            Ok(None) => {
                report.end_of_stream = true;
                info!(
                    bytes = report.bytes,
                    duration_ms = format.duration_of(report.bytes as usize).as_millis() as u64,
                    "Audio stream finished"
                );
                break;
            }
            Err(e) if e.is_recoverable() => {
                report.errors += 1;
                warn!(error = %e, "Skipping undecodable audio packet");
            }
            Err(e) => {
                report.errors += 1;
                error!(error = %e, "Audio decode failed, stopping producer");
                break;
            }
        }
    }

    debug!(?report, "Audio producer exiting");
    report
}
