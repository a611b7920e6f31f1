//! Concurrency tests for the frame queue and byte ring
//!
//! This test suite verifies:
//! - Conservation with several producers and consumers
//! - Backpressure and the blocked-push hand-off
//! - FIFO order under pause toggling
//! - Shutdown liveness for every kind of blocked waiter

use core_playback::{AudioByteRing, PlaybackController, TryPopError, VideoFrameQueue};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const LIVENESS_TIMEOUT: Duration = Duration::from_secs(2);

fn controller() -> Arc<PlaybackController> {
    Arc::new(PlaybackController::new(Duration::from_millis(2)))
}

fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(1));
    }
}

// ============================================================================
// Conservation
// ============================================================================

#[test]
fn test_frame_queue_conserves_items_across_threads() {
    let controller = controller();
    let queue: VideoFrameQueue<u64> = VideoFrameQueue::new(5, Arc::clone(&controller));

    let producers: Vec<_> = (0..3u64)
        .map(|p| {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..500 {
                    queue.push(p * 1_000 + i).unwrap();
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..2)
        .map(|_| {
            let queue = queue.clone();
            thread::spawn(move || {
                let mut popped = Vec::new();
                while let Some(item) = queue.pop() {
                    popped.push(item);
                }
                popped
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    controller.request_shutdown();

    let mut all: Vec<u64> = consumers
        .into_iter()
        .flat_map(|c| c.join().unwrap())
        .collect();

    assert_eq!(all.len() + queue.len(), 1_500);
    all.sort_unstable();
    all.dedup();
    assert_eq!(all.len(), 1_500, "no item may be duplicated");

    let stats = queue.stats();
    assert!(stats.is_conserved());
    assert_eq!(stats.total_pushed, 1_500);
}

#[test]
fn test_byte_ring_conserves_bytes_across_threads() {
    let controller = controller();
    let ring = AudioByteRing::new(64, Arc::clone(&controller));

    let producers: Vec<_> = (0..3)
        .map(|_| {
            let ring = ring.clone();
            thread::spawn(move || {
                let chunk = [7u8; 37];
                let mut pushed = 0;
                while pushed < 1_000 {
                    let len = chunk.len().min(1_000 - pushed);
                    assert!(ring.push(&chunk[..len]));
                    pushed += len;
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..2)
        .map(|_| {
            let ring = ring.clone();
            thread::spawn(move || {
                let mut out = [0u8; 16];
                let mut popped = 0usize;
                while ring.pop(&mut out) {
                    popped += out.len();
                }
                popped
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    wait_for(|| ring.len() < 16);
    controller.request_shutdown();

    let popped: usize = consumers.into_iter().map(|c| c.join().unwrap()).sum();
    assert_eq!(popped + ring.len(), 3_000);
    assert!(ring.stats().is_conserved());
}

#[test]
fn test_occupancy_never_exceeds_capacity() {
    let controller = controller();
    let ring = AudioByteRing::new(32, Arc::clone(&controller));
    let done = Arc::new(AtomicBool::new(false));

    let producer = {
        let ring = ring.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                ring.push(&[1u8; 13]);
            }
        })
    };

    let consumer = {
        let ring = ring.clone();
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut out = [0u8; 5];
            while !done.load(Ordering::Acquire) {
                let _ = ring.try_pop(&mut out);
            }
        })
    };

    while !producer.is_finished() {
        let stats = ring.stats();
        assert!(stats.occupied <= stats.capacity);
    }

    done.store(true, Ordering::Release);
    consumer.join().unwrap();
    producer.join().unwrap();
    controller.request_shutdown();
}

// ============================================================================
// Backpressure
// ============================================================================

#[test]
fn test_blocked_push_is_released_by_pop() {
    let controller = controller();
    let queue: VideoFrameQueue<char> = VideoFrameQueue::new(4, Arc::clone(&controller));

    for item in ['A', 'B', 'C', 'D'] {
        queue.push(item).unwrap();
    }

    let pusher = {
        let queue = queue.clone();
        thread::spawn(move || queue.push('E'))
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!pusher.is_finished(), "fifth push must block on a full queue");
    assert_eq!(queue.len(), 4);

    let popper = {
        let queue = queue.clone();
        thread::spawn(move || queue.pop())
    };

    assert_eq!(popper.join().unwrap(), Some('A'));
    assert!(pusher.join().unwrap().is_ok());

    let mut rest = Vec::new();
    while let Ok(item) = queue.try_pop() {
        rest.push(item);
    }
    assert_eq!(rest, vec!['B', 'C', 'D', 'E']);
    assert_eq!(queue.try_pop(), Err(TryPopError::Empty));
}

// ============================================================================
// Pause / Resume
// ============================================================================

#[test]
fn test_pause_toggling_preserves_frame_order() {
    let controller = controller();
    let queue: VideoFrameQueue<u32> = VideoFrameQueue::new(8, Arc::clone(&controller));

    let producer = {
        let queue = queue.clone();
        thread::spawn(move || {
            for i in 0..2_000 {
                queue.push(i).unwrap();
            }
        })
    };

    let consumer = {
        let queue = queue.clone();
        thread::spawn(move || {
            let mut seen = Vec::new();
            while let Some(item) = queue.pop() {
                seen.push(item);
            }
            seen
        })
    };

    let toggler = {
        let controller = Arc::clone(&controller);
        thread::spawn(move || {
            for _ in 0..50 {
                controller.toggle_pause();
                thread::sleep(Duration::from_millis(1));
            }
        })
    };

    toggler.join().unwrap();
    assert!(!controller.is_paused());
    producer.join().unwrap();
    controller.request_shutdown();

    let seen = consumer.join().unwrap();
    assert_eq!(seen, (0..2_000).collect::<Vec<_>>());
}

#[test]
fn test_pause_toggling_preserves_byte_order() {
    let controller = controller();
    let ring = AudioByteRing::new(128, Arc::clone(&controller));
    let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();

    let producer = {
        let ring = ring.clone();
        let data = data.clone();
        thread::spawn(move || {
            for chunk in data.chunks(100) {
                assert!(ring.push(chunk));
            }
        })
    };

    let consumer = {
        let ring = ring.clone();
        thread::spawn(move || {
            let mut seen = Vec::new();
            let mut out = [0u8; 50];
            while ring.pop(&mut out) {
                seen.extend_from_slice(&out);
            }
            seen.extend(ring.take_remaining());
            seen
        })
    };

    for _ in 0..40 {
        controller.toggle_pause();
        thread::sleep(Duration::from_millis(1));
    }
    assert!(!controller.is_paused());

    producer.join().unwrap();
    wait_for(|| ring.len() < 50);
    controller.request_shutdown();

    assert_eq!(consumer.join().unwrap(), data);
}

// ============================================================================
// Shutdown liveness
// ============================================================================

#[test]
fn test_shutdown_releases_every_blocked_waiter() {
    let controller = controller();
    let queue: VideoFrameQueue<u8> = VideoFrameQueue::new(1, Arc::clone(&controller));
    let ring = AudioByteRing::new(4, Arc::clone(&controller));
    queue.push(0).unwrap();
    assert!(ring.push(&[1, 2, 3, 4]));

    let (tx, rx) = mpsc::channel();

    {
        let queue = queue.clone();
        let tx = tx.clone();
        thread::spawn(move || {
            tx.send(("queue push", queue.push(1).is_err())).unwrap();
        });
    }
    {
        let ring = ring.clone();
        let tx = tx.clone();
        thread::spawn(move || {
            tx.send(("ring push", !ring.push(&[5]))).unwrap();
        });
    }

    // Separate empty buffers on the same controller for the blocked pops.
    thread::sleep(Duration::from_millis(20));
    let empty_queue: VideoFrameQueue<u8> = VideoFrameQueue::new(1, Arc::clone(&controller));
    let empty_ring = AudioByteRing::new(4, Arc::clone(&controller));
    {
        let queue = empty_queue.clone();
        let tx = tx.clone();
        thread::spawn(move || {
            tx.send(("queue pop", queue.pop().is_none())).unwrap();
        });
    }
    {
        let ring = empty_ring.clone();
        let tx = tx.clone();
        thread::spawn(move || {
            let mut out = [0u8; 2];
            tx.send(("ring pop", !ring.pop(&mut out))).unwrap();
        });
    }
    drop(tx);

    thread::sleep(Duration::from_millis(50));
    let started = Instant::now();
    controller.request_shutdown();

    for _ in 0..4 {
        let (waiter, failed) = rx
            .recv_timeout(LIVENESS_TIMEOUT)
            .expect("a blocked waiter did not return after shutdown");
        assert!(failed, "{waiter} should report failure");
    }
    assert!(started.elapsed() < LIVENESS_TIMEOUT);
}

#[test]
fn test_shutdown_while_paused_releases_consumers() {
    let controller = controller();
    let queue: VideoFrameQueue<u8> = VideoFrameQueue::new(2, Arc::clone(&controller));
    let ring = AudioByteRing::new(8, Arc::clone(&controller));
    controller.toggle_pause();

    let (tx, rx) = mpsc::channel();
    {
        let queue = queue.clone();
        let tx = tx.clone();
        thread::spawn(move || tx.send(queue.pop().is_none()).unwrap());
    }
    {
        let ring = ring.clone();
        thread::spawn(move || {
            let mut out = [0u8; 4];
            tx.send(!ring.pop(&mut out)).unwrap();
        });
    }

    thread::sleep(Duration::from_millis(30));
    controller.request_shutdown();

    for _ in 0..2 {
        assert!(rx
            .recv_timeout(LIVENESS_TIMEOUT)
            .expect("paused consumer did not return after shutdown"));
    }
}

#[test]
fn test_blocked_pop_resumes_when_unpaused_and_fed() {
    let controller = controller();
    let ring = AudioByteRing::new(8, Arc::clone(&controller));
    controller.toggle_pause();

    let consumer = {
        let ring = ring.clone();
        thread::spawn(move || {
            let mut out = [0u8; 4];
            let ok = ring.pop(&mut out);
            (ok, out)
        })
    };

    thread::sleep(Duration::from_millis(20));
    assert!(ring.push(&[9, 8, 7, 6]));
    controller.toggle_pause();

    let (ok, out) = consumer.join().unwrap();
    assert!(ok);
    assert_eq!(out, [9, 8, 7, 6]);
}
