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

use crate::chain::ChainClient;
use crate::config::ContractConfig;
use crate::storage::{EventStore, InsertOutcome};
use crate::types::{EventDescriptor, RunStats};
use alloy::primitives::Address;
use futures::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Cancellation handle for one live (contract, event) subscription.
///
/// `stop` aborts the subscription task: no inserts happen afterwards, though
/// a delivery already being written may still complete. Dropping the handle
/// detaches the task instead of cancelling it.
#[derive(Debug)]
pub struct WatchHandle {
    contract: Address,
    event: String,
    task: JoinHandle<()>,
}

impl WatchHandle {
    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Start one independent subscription per (contract, event) pair.
///
/// A pair whose subscription cannot be established is logged and skipped;
/// the remaining pairs still run. There is no per-event retry: a dropped
/// real-time event is only recovered by a later backfill.
pub(crate) async fn spawn_subscriptions(
    client: Arc<dyn ChainClient>,
    store: Arc<dyn EventStore>,
    contracts: &[ContractConfig],
    descriptors: &[EventDescriptor],
    stats: Arc<RunStats>,
) -> Vec<WatchHandle> {
    let mut handles = Vec::new();
    for contract in contracts {
        for descriptor in descriptors {
            let stream = match client.subscribe(contract.address, descriptor).await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(
                        target: "indexer",
                        "subscription for `{}` on {} failed: {e}",
                        descriptor.name,
                        contract.label(),
                    );
                    continue;
                }
            };
            handles.push(spawn_one(
                stream,
                store.clone(),
                contract.address,
                descriptor.name.clone(),
                stats.clone(),
            ));
        }
    }
    handles
}

fn spawn_one(
    mut stream: crate::chain::LogStream,
    store: Arc<dyn EventStore>,
    contract: Address,
    event: String,
    stats: Arc<RunStats>,
) -> WatchHandle {
    let name = event.clone();
    let task = tokio::spawn(async move {
        while let Some(delivery) = stream.next().await {
            match delivery {
                Ok(logs) => {
                    let mut inserted = 0u64;
                    let mut duplicates = 0u64;
                    let mut errors = 0u64;
                    for log in &logs {
                        match store.insert(&name, log).await {
                            Ok(InsertOutcome::Inserted) => {
                                inserted += 1;
                                stats.record_inserted();
                            }
                            Ok(InsertOutcome::Duplicate) => {
                                duplicates += 1;
                                stats.record_duplicate();
                            }
                            Ok(InsertOutcome::NoTable) => {}
                            Err(e) => {
                                errors += 1;
                                stats.record_error();
                                stats.warn_throttled(&format!(
                                    "live insert failed for `{name}` tx {} log {}: {e}",
                                    log.transaction_hash, log.log_index
                                ));
                            }
                        }
                    }
                    debug!(
                        target: "indexer",
                        "`{name}` delivery on {contract}: {inserted} inserted, \
                         {duplicates} duplicate, {errors} errors",
                    );
                }
                Err(e) => {
                    warn!(
                        target: "indexer",
                        "subscription for `{name}` on {contract} errored: {e}",
                    );
                }
            }
        }
        debug!(target: "indexer", "subscription for `{name}` on {contract} ended");
    });
    WatchHandle {
        contract,
        event,
        task,
    }
}
