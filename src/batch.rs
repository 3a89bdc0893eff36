//! Splits a result set's record count into fixed-size, sequential windows.

use serde::{Deserialize, Serialize};

/// One window `[start, start+size)` of a result set's ID list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchInfo {
    pub batch_num: usize,
    pub start: u64,
    pub size: u64,
}

/// The full partition of a result set into batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub batches: usize,
    pub batch_infos: Vec<BatchInfo>,
}

impl Batch {
    /// Partitions `total_count` records into batches of `batch_size`, the
    /// last one truncated to whatever remains. `batch_size` must be
    /// positive; callers validate this via the configuration validator.
    #[must_use]
    pub fn new(total_count: u64, batch_size: u64) -> Self {
        if total_count == 0 {
            return Self { batches: 0, batch_infos: Vec::new() };
        }

        let batches = total_count.div_ceil(batch_size) as usize;
        let mut batch_infos = Vec::with_capacity(batches);

        for i in 0..batches {
            let start = i as u64 * batch_size;
            let mut size = batch_size;
            if start + size > total_count {
                size = total_count - start;
            }
            batch_infos.push(BatchInfo { batch_num: i + 1, start, size });
        }

        Self { batches, batch_infos }
    }
}
