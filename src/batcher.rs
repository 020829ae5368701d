/*
 * Copyright 2025 Flamewire
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use crate::error::IndexerError;
use crate::types::BlockNumber;
use std::future::Future;
use std::ops::RangeInclusive;
use std::time::Instant;
use tracing::{info, warn};

/// An iterator that tiles an inclusive block interval into sub-ranges of at
/// most `batch_size` blocks: contiguous, non-overlapping, in ascending order.
///
/// An inverted interval (`first > last`) yields nothing.
#[derive(Debug, Clone)]
pub struct BatchRanges {
    current: BlockNumber,
    last: BlockNumber,
    batch_size: u64,
    done: bool,
}

impl BatchRanges {
    /// # Panics
    ///
    /// Panics if `batch_size` is 0; config validation rejects that earlier.
    #[must_use]
    pub fn new(first: BlockNumber, last: BlockNumber, batch_size: u64) -> Self {
        assert!(batch_size >= 1, "batch_size must be at least 1");
        Self {
            current: first,
            last,
            batch_size,
            done: first > last,
        }
    }
}

impl Iterator for BatchRanges {
    type Item = RangeInclusive<BlockNumber>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let from = self.current;
        let to = from.saturating_add(self.batch_size - 1).min(self.last);
        if to == self.last {
            self.done = true;
        } else {
            self.current = to + 1;
        }
        Some(from..=to)
    }
}

/// Blocks-processed accounting for one backfill run. Observability only.
#[derive(Debug)]
pub struct Progress {
    total: u64,
    processed: u64,
    started: Instant,
}

impl Progress {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            processed: 0,
            started: Instant::now(),
        }
    }

    pub fn record(&mut self, blocks: u64) {
        self.processed = (self.processed + blocks).min(self.total);
    }

    /// Blocks per second since the run started.
    pub fn rate(&self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.processed as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Estimated seconds remaining, once a rate is observable.
    pub fn eta_secs(&self) -> Option<u64> {
        let rate = self.rate();
        if rate > 0.0 && self.processed > 0 {
            Some(((self.total - self.processed) as f64 / rate) as u64)
        } else {
            None
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

/// Drive `on_batch` once per sub-range of `[first, last]`, strictly
/// sequentially. A failing batch is logged and the loop moves on; range-level
/// retry belongs to the backfill driver, not here. Returns `last`.
pub async fn run_batches<F, Fut>(
    first: BlockNumber,
    last: BlockNumber,
    batch_size: u64,
    mut on_batch: F,
) -> BlockNumber
where
    F: FnMut(BlockNumber, BlockNumber) -> Fut,
    Fut: Future<Output = Result<(), IndexerError>>,
{
    if first > last {
        return last;
    }
    let mut progress = Progress::new(last - first + 1);
    for range in BatchRanges::new(first, last, batch_size) {
        let (from, to) = (*range.start(), *range.end());
        if let Err(e) = on_batch(from, to).await {
            warn!(target: "indexer", "batch [{from}, {to}] failed: {e}");
        }
        progress.record(to - from + 1);
        match progress.eta_secs() {
            Some(eta) => info!(
                target: "indexer",
                "processed blocks {from}-{to} ({}/{} blocks, {:.1} blocks/s, ETA {eta}s)",
                progress.processed(),
                progress.total(),
                progress.rate(),
            ),
            None => info!(
                target: "indexer",
                "processed blocks {from}-{to} ({}/{} blocks)",
                progress.processed(),
                progress.total(),
            ),
        }
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiles_exactly() {
        let mut iter = BatchRanges::new(100, 250, 50);
        assert_eq!(iter.next(), Some(100..=149));
        assert_eq!(iter.next(), Some(150..=199));
        assert_eq!(iter.next(), Some(200..=249));
        assert_eq!(iter.next(), Some(250..=250));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn exact_boundary() {
        let mut iter = BatchRanges::new(100, 199, 50);
        assert_eq!(iter.next(), Some(100..=149));
        assert_eq!(iter.next(), Some(150..=199));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn single_block() {
        let mut iter = BatchRanges::new(100, 100, 50);
        assert_eq!(iter.next(), Some(100..=100));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn inverted_interval_is_empty() {
        let mut iter = BatchRanges::new(200, 100, 50);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn batch_size_one() {
        let mut iter = BatchRanges::new(5, 7, 1);
        assert_eq!(iter.next(), Some(5..=5));
        assert_eq!(iter.next(), Some(6..=6));
        assert_eq!(iter.next(), Some(7..=7));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn large_interval_tiles_into_three() {
        let batches: Vec<_> = BatchRanges::new(1, 10_000, 4999).collect();
        assert_eq!(batches, vec![1..=4999, 5000..=9998, 9999..=10_000]);
    }

    #[test]
    fn upper_end_of_block_space() {
        let mut iter = BatchRanges::new(u64::MAX - 1, u64::MAX, 10);
        assert_eq!(iter.next(), Some(u64::MAX - 1..=u64::MAX));
        assert_eq!(iter.next(), None);
    }

    #[test]
    #[should_panic(expected = "batch_size must be at least 1")]
    fn zero_batch_size_panics() {
        let _ = BatchRanges::new(1, 10, 0);
    }

    #[tokio::test]
    async fn failing_batch_does_not_stop_the_loop() {
        let mut seen = Vec::new();
        let last = run_batches(1, 30, 10, |from, to| {
            seen.push((from, to));
            async move {
                if from == 11 {
                    Err(IndexerError::invalid_config("test", "boom"))
                } else {
                    Ok(())
                }
            }
        })
        .await;
        assert_eq!(last, 30);
        assert_eq!(seen, vec![(1, 10), (11, 20), (21, 30)]);
    }

    #[tokio::test]
    async fn empty_interval_never_invokes_callback() {
        let mut calls = 0u32;
        run_batches(10, 5, 3, |_, _| {
            calls += 1;
            async { Ok(()) }
        })
        .await;
        assert_eq!(calls, 0);
    }
}
