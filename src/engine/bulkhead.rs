//! Bulkhead batching: at most `limit` items are worked on at once, and every
//! batch fully settles before the next one starts.
//!
//! Batches run in order; members of a batch run on scoped threads and finish
//! in any order.

#![allow(missing_docs)]

use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Sequential,
    Batched { limit: usize },
}

impl ExecutionMode {
    /// Batched only when parallelism is enabled and there is more than one
    /// item to process.
    #[must_use]
    pub fn select(enable_parallel: bool, limit: usize, item_count: usize) -> Self {
        if enable_parallel && item_count > 1 {
            Self::Batched {
                limit: limit.max(1),
            }
        } else {
            Self::Sequential
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Batched { .. } => "parallel",
        }
    }
}

/// Apply `op` to every item under `mode`. Returns how many operations were
/// issued concurrently (zero in sequential mode).
///
/// A panic in any worker is re-raised here once its batch has joined.
pub fn run<T, F>(items: &mut [T], mode: ExecutionMode, op: F) -> u64
where
    T: Send,
    F: Fn(&mut T) + Sync,
{
    match mode {
        ExecutionMode::Sequential => {
            items.iter_mut().for_each(&op);
            0
        }
        ExecutionMode::Batched { limit } => {
            let mut issued = 0u64;
            for (index, batch) in items.chunks_mut(limit.max(1)).enumerate() {
                tracing::debug!(batch = index, size = batch.len(), "bulkhead batch");
                issued += batch.len() as u64;
                let op = &op;
                thread::scope(|s| {
                    for item in batch.iter_mut() {
                        s.spawn(move || op(item));
                    }
                });
            }
            issued
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn mode_selection() {
        assert_eq!(ExecutionMode::select(true, 4, 10), ExecutionMode::Batched { limit: 4 });
        assert_eq!(ExecutionMode::select(true, 0, 10), ExecutionMode::Batched { limit: 1 });
        assert_eq!(ExecutionMode::select(true, 4, 1), ExecutionMode::Sequential);
        assert_eq!(ExecutionMode::select(false, 4, 10), ExecutionMode::Sequential);
    }

    #[test]
    fn sequential_preserves_order() {
        let order = Mutex::new(Vec::new());
        let mut items: Vec<usize> = (0..6).collect();
        let issued = run(&mut items, ExecutionMode::Sequential, |i| order.lock().push(*i));
        assert_eq!(issued, 0);
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn batches_never_exceed_limit() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let mut items = vec![0u32; 23];

        let issued = run(&mut items, ExecutionMode::Batched { limit: 3 }, |item| {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
            *item += 1;
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });

        assert_eq!(issued, 23);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(items.iter().all(|i| *i == 1));
    }

    #[test]
    fn batches_settle_in_order() {
        let finished = Mutex::new(Vec::new());
        let mut items: Vec<usize> = (0..9).collect();
        run(&mut items, ExecutionMode::Batched { limit: 3 }, |i| {
            // Later members of a batch finish first.
            std::thread::sleep(Duration::from_millis(((3 - *i % 3) * 3) as u64));
            finished.lock().push(*i);
        });
        let finished = finished.into_inner();
        for (batch, chunk) in finished.chunks(3).enumerate() {
            let mut chunk = chunk.to_vec();
            chunk.sort_unstable();
            assert_eq!(chunk, vec![batch * 3, batch * 3 + 1, batch * 3 + 2]);
        }
    }
}
