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

//! Indexes EVM smart-contract events into per-event SQLite tables.
//!
//! The [`Indexer`] backfills historical logs in sequential block-range
//! batches, tolerating unreliable RPC endpoints through bounded retry and
//! adaptive range splitting, and can also watch for new logs live. Rows are
//! deduplicated by `(transaction_hash, log_index)`, so re-running a backfill
//! over the same range is safe.
//!
//! The chain itself is reached through the [`ChainClient`] capability; this
//! crate never speaks JSON-RPC.

pub mod batcher;
pub mod builder;
pub mod chain;
pub mod config;
pub mod error;
pub mod indexer;
pub mod prelude;
pub mod retry;
pub mod schema;
pub mod storage;
pub mod types;
pub mod watcher;

pub use crate::batcher::{run_batches, BatchRanges, Progress};
pub use crate::builder::IndexerBuilder;
pub use crate::chain::{ChainClient, LogStream};
pub use crate::config::{ContractConfig, EventConfig, IndexerConfig, DEFAULT_BATCH_SIZE};
pub use crate::error::{ChainClientError, IndexerError};
pub use crate::indexer::Indexer;
pub use crate::retry::{BackoffStrategy, RetryConfig};
pub use crate::schema::TableSchema;
pub use crate::storage::{
    init::init_store, EventStore, InsertOutcome, OrderDirection, QueryOptions, StoredRow,
};
pub use crate::types::{
    BackfillReport, BlockNumber, EventDescriptor, EventInput, LogRecord, RunStats,
};
pub use crate::watcher::WatchHandle;
