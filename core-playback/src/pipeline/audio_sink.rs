//! Audio sink: the consumer side of the byte ring.
//!
//! Pops fixed-size chunks and writes them to the device. Once the ring
//! reports shutdown, the partial tail that is shorter than a chunk is written
//! too and the device is drained before the thread exits.

use super::{WorkerReport, AUDIO_SINK};
use crate::byte_ring::AudioByteRing;
use bridge_traits::{AudioDevice, PlaybackSessionId};
use tracing::{debug, error, instrument, warn};

/// Chunk length actually used: the device's preference when it fits the ring.
pub fn effective_chunk_len(device: &dyn AudioDevice, ring_capacity: usize, configured: usize) -> usize {
    match device.preferred_chunk_len() {
        Some(len) if len > 0 && len <= ring_capacity => len,
        Some(len) => {
            warn!(
                preferred = len,
                ring_capacity, "Device chunk length does not fit the ring, using configured length"
            );
            configured.clamp(1, ring_capacity)
        }
        None => configured.clamp(1, ring_capacity),
    }
}

/// Feed `device` from `ring` until shutdown, then flush and drain.
#[instrument(skip_all, fields(session = %session, worker = AUDIO_SINK))]
pub fn run_audio_sink(
    session: PlaybackSessionId,
    device: &mut dyn AudioDevice,
    ring: &AudioByteRing,
    chunk_bytes: usize,
) -> WorkerReport {
    let controller = ring.controller().clone();
    let mut report = WorkerReport::new(AUDIO_SINK);
    let mut chunk = vec![0u8; effective_chunk_len(device, ring.capacity(), chunk_bytes)];

    debug!(chunk_len = chunk.len(), "Audio sink started");

    loop {
        if controller.is_paused() && !controller.wait_while_paused() {
            break;
        }

        if !ring.pop(&mut chunk) {
            break;
        }

        write_chunk(device, &chunk, &mut report);
    }

    let tail = ring.take_remaining();
    if !tail.is_empty() {
        debug!(len = tail.len(), "Flushing audio tail");
        write_chunk(device, &tail, &mut report);
    }

    if let Err(e) = device.drain() {
        report.errors += 1;
        warn!(error = %e, "Audio device drain failed");
    }

    debug!(?report, "Audio sink exiting");
    report
}

fn write_chunk(device: &mut dyn AudioDevice, bytes: &[u8], report: &mut WorkerReport) {
    match device.write(bytes) {
        Ok(()) => report.record(bytes.len()),
        Err(e) if e.is_recoverable() => {
            report.errors += 1;
            warn!(error = %e, len = bytes.len(), "Audio device write failed");
        }
        Err(e) => {
            report.errors += 1;
            error!(error = %e, len = bytes.len(), "Audio device write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::PlaybackController;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::BridgeError;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingDevice {
        preferred: Option<usize>,
        writes: Vec<Vec<u8>>,
        drained: bool,
        fail_next: bool,
    }

    impl AudioDevice for RecordingDevice {
        fn preferred_chunk_len(&self) -> Option<usize> {
            self.preferred
        }

        fn write(&mut self, bytes: &[u8]) -> BridgeResult<()> {
            if std::mem::take(&mut self.fail_next) {
                return Err(BridgeError::Device("underrun".into()));
            }
            self.writes.push(bytes.to_vec());
            Ok(())
        }

        fn drain(&mut self) -> BridgeResult<()> {
            self.drained = true;
            Ok(())
        }
    }

    #[test]
    fn test_effective_chunk_len() {
        let mut device = RecordingDevice::default();
        assert_eq!(effective_chunk_len(&device, 8192, 4096), 4096);

        device.preferred = Some(1024);
        assert_eq!(effective_chunk_len(&device, 8192, 4096), 1024);

        device.preferred = Some(16384);
        assert_eq!(effective_chunk_len(&device, 8192, 4096), 4096);
    }

    #[test]
    fn test_sink_writes_chunks_then_tail_and_drains() {
        let controller = Arc::new(PlaybackController::default());
        let ring = AudioByteRing::new(16, Arc::clone(&controller));
        ring.push(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);

        let sink = {
            let ring = ring.clone();
            thread::spawn(move || {
                let mut device = RecordingDevice::default();
                let report = run_audio_sink(PlaybackSessionId::new(), &mut device, &ring, 4);
                (device, report)
            })
        };

        // Two full chunks go out, the remaining two bytes wait for shutdown.
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while ring.len() > 2 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        controller.request_shutdown();

        let (device, report) = sink.join().unwrap();
        assert_eq!(
            device.writes,
            vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8], vec![9, 10]]
        );
        assert!(device.drained);
        assert_eq!(report.items, 3);
        assert_eq!(report.bytes, 10);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_sink_counts_device_errors_and_keeps_going() {
        let controller = Arc::new(PlaybackController::default());
        let ring = AudioByteRing::new(8, Arc::clone(&controller));
        ring.push(&[1, 2, 3, 4]);
        controller.request_shutdown();

        let mut device = RecordingDevice {
            fail_next: true,
            ..Default::default()
        };
        let report = run_audio_sink(PlaybackSessionId::new(), &mut device, &ring, 2);

        // The first chunk is lost to the device error, the second still plays.
        assert_eq!(report.errors, 1);
        assert_eq!(device.writes, vec![vec![3, 4]]);
        assert!(device.drained);
    }
}
