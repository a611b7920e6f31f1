//! Buffer occupancy snapshots.

/// Point-in-time view of a buffer, read under the buffer's own lock.
///
/// Units are items for the frame queue and bytes for the audio ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferStats {
    pub capacity: usize,
    pub occupied: usize,
    pub total_pushed: u64,
    pub total_popped: u64,
}

impl BufferStats {
    /// Occupied fraction in `0.0..=1.0`.
    pub fn fill_level(&self) -> f32 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.occupied as f32 / self.capacity as f32
    }

    pub fn free_space(&self) -> usize {
        self.capacity - self.occupied
    }

    /// `true` when every pushed unit is either popped or still buffered.
    pub fn is_conserved(&self) -> bool {
        self.total_pushed == self.total_popped + self.occupied as u64
    }
}
