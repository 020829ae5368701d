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

pub use crate::builder::IndexerBuilder;
pub use crate::chain::{ChainClient, LogStream};
pub use crate::config::{ContractConfig, EventConfig, IndexerConfig};
pub use crate::error::{ChainClientError, IndexerError};
pub use crate::indexer::Indexer;
pub use crate::retry::{BackoffStrategy, RetryConfig};
pub use crate::storage::{EventStore, InsertOutcome, OrderDirection, QueryOptions};
pub use crate::types::{BackfillReport, BlockNumber, EventDescriptor, LogRecord};
pub use crate::watcher::WatchHandle;

pub use async_trait::async_trait;

pub use alloy::dyn_abi::{DynSolType, DynSolValue};
pub use alloy::primitives::{Address, B256, U256};
