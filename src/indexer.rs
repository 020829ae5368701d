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

//! The backfill driver: per (contract, event, range) units of work with
//! bounded retry and adaptive range splitting.
//!
//! A unit never propagates an error past its own boundary. Transient
//! failures retry with backoff; oversized responses split the range at its
//! midpoint via an explicit worklist (no recursion, bounded stack); a single
//! unsplittable block is skipped permanently. The batch loop above always
//! observes completion.

use crate::batcher::run_batches;
use crate::chain::ChainClient;
use crate::config::{ContractConfig, IndexerConfig};
use crate::error::IndexerError;
use crate::storage::{EventStore, InsertOutcome};
use crate::types::{BackfillReport, BlockNumber, EventDescriptor, LogRecord, RunStats};
use crate::watcher::{spawn_subscriptions, WatchHandle};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, warn};

/// One pending fetch range with its retry budget consumed so far.
#[derive(Debug, Clone, Copy)]
struct RangeTask {
    from: BlockNumber,
    to: BlockNumber,
    attempt: u32,
}

pub struct Indexer {
    client: Arc<dyn ChainClient>,
    store: Arc<dyn EventStore>,
    config: IndexerConfig,
    descriptors: Vec<EventDescriptor>,
    stats: Arc<RunStats>,
}

impl Indexer {
    /// Validate the configuration and derive event descriptors.
    pub fn new(
        client: Arc<dyn ChainClient>,
        store: Arc<dyn EventStore>,
        config: IndexerConfig,
    ) -> Result<Self, IndexerError> {
        config.validate()?;
        let descriptors = config.descriptors()?;
        Ok(Self {
            client,
            store,
            config,
            descriptors,
            stats: Arc::new(RunStats::new()),
        })
    }

    /// The storage handle, for the read API surface.
    pub fn store(&self) -> Arc<dyn EventStore> {
        self.store.clone()
    }

    pub fn report(&self) -> BackfillReport {
        self.stats.snapshot()
    }

    /// Backfill from the configured start block up to the latest confirmed
    /// height, strictly sequentially.
    ///
    /// Only structural errors cross this boundary: an unreachable chain
    /// client, or a start block beyond the current height. Everything below
    /// batch level degrades to logged skips.
    pub async fn run_backfill(&self) -> Result<BackfillReport, IndexerError> {
        let latest = self.client.current_height().await?;
        let first = self.start_block();
        if first > latest {
            return Err(IndexerError::invalid_config(
                "start_block",
                format!("{first} is beyond the current height {latest}"),
            ));
        }

        self.ensure_schemas().await;
        run_batches(first, latest, self.config.batch_size, |from, to| {
            self.process_batch(from, to)
        })
        .await;
        Ok(self.stats.snapshot())
    }

    /// Subscribe to new logs for every (contract, event) pair, writing
    /// through the same normalization path as backfill.
    pub async fn watch(&self) -> Result<Vec<WatchHandle>, IndexerError> {
        self.ensure_schemas().await;
        Ok(spawn_subscriptions(
            self.client.clone(),
            self.store.clone(),
            &self.config.contracts,
            &self.descriptors,
            self.stats.clone(),
        )
        .await)
    }

    fn start_block(&self) -> BlockNumber {
        self.config
            .start_block
            .or_else(|| {
                self.config
                    .contracts
                    .iter()
                    .filter_map(|c| c.start_block)
                    .min()
            })
            .unwrap_or(0)
    }

    /// Synthesize every event table up front. A failed table is logged and
    /// skipped; inserts for that event no-op afterwards.
    async fn ensure_schemas(&self) {
        for descriptor in &self.descriptors {
            if let Err(e) = self.store.ensure_schema(descriptor).await {
                warn!(
                    target: "indexer",
                    "schema synthesis for `{}` failed, its events will be skipped: {e}",
                    descriptor.name
                );
            }
        }
    }

    async fn process_batch(&self, from: BlockNumber, to: BlockNumber) -> Result<(), IndexerError> {
        for contract in &self.config.contracts {
            // Per-contract start block clips the effective sub-range.
            let from = match contract.start_block {
                Some(start) if start > to => continue,
                Some(start) => from.max(start),
                None => from,
            };
            for descriptor in &self.descriptors {
                self.process_unit(contract, descriptor, from, to).await;
            }
        }
        Ok(())
    }

    /// The retry & split state machine for one (contract, event, range)
    /// unit. Infallible by contract; failures end as counted skips.
    async fn process_unit(
        &self,
        contract: &ContractConfig,
        descriptor: &EventDescriptor,
        from: BlockNumber,
        to: BlockNumber,
    ) {
        let max_retries = self.config.retry.max_retries;
        let mut pending = vec![RangeTask {
            from,
            to,
            attempt: 0,
        }];

        while let Some(task) = pending.pop() {
            match self
                .client
                .get_logs(contract.address, descriptor, task.from, task.to)
                .await
            {
                Ok(logs) => {
                    debug!(
                        target: "indexer",
                        "{} `{}` logs in [{}, {}] for {}",
                        logs.len(),
                        descriptor.name,
                        task.from,
                        task.to,
                        contract.label(),
                    );
                    for log in &logs {
                        self.store_log(descriptor, log).await;
                    }
                }
                Err(e) if e.is_response_too_large() => {
                    if task.from == task.to {
                        // Unsplittable base case: accept the loss rather
                        // than loop forever.
                        warn!(
                            target: "indexer",
                            "block {} holds too many `{}` logs for {} to fetch; skipping it",
                            task.from,
                            descriptor.name,
                            contract.label(),
                        );
                        self.stats.record_skipped_range();
                    } else {
                        let mid = task.from + (task.to - task.from) / 2;
                        debug!(
                            target: "indexer",
                            "log response too large, splitting [{}, {}] at {mid}",
                            task.from,
                            task.to,
                        );
                        // Right half first so the left half pops next; each
                        // half starts with a fresh retry budget.
                        pending.push(RangeTask {
                            from: mid + 1,
                            to: task.to,
                            attempt: 0,
                        });
                        pending.push(RangeTask {
                            from: task.from,
                            to: mid,
                            attempt: 0,
                        });
                    }
                }
                Err(e) => {
                    if task.attempt < max_retries {
                        let attempt = task.attempt + 1;
                        let delay = self.config.retry.delay_for(&e, attempt);
                        warn!(
                            target: "indexer",
                            "fetch [{}, {}] for `{}` failed ({e}); retry {attempt}/{max_retries} in {delay:?}",
                            task.from,
                            task.to,
                            descriptor.name,
                        );
                        sleep(delay).await;
                        pending.push(RangeTask { attempt, ..task });
                    } else {
                        warn!(
                            target: "indexer",
                            "fetch [{}, {}] for `{}` failed after {max_retries} retries; skipping range: {e}",
                            task.from,
                            task.to,
                            descriptor.name,
                        );
                        self.stats.record_skipped_range();
                    }
                }
            }
        }
    }

    async fn store_log(&self, descriptor: &EventDescriptor, log: &LogRecord) {
        match self.store.insert(&descriptor.name, log).await {
            Ok(InsertOutcome::Inserted) => self.stats.record_inserted(),
            Ok(InsertOutcome::Duplicate) => self.stats.record_duplicate(),
            // Schema synthesis failed earlier and was already logged.
            Ok(InsertOutcome::NoTable) => {}
            Err(e) => {
                self.stats.record_error();
                self.stats.warn_throttled(&format!(
                    "insert failed for `{}` tx {} log {}: {e}",
                    descriptor.name, log.transaction_hash, log.log_index
                ));
            }
        }
    }
}
