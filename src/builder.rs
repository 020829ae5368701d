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
use crate::config::{ContractConfig, IndexerConfig};
use crate::error::IndexerError;
use crate::indexer::Indexer;
use crate::retry::RetryConfig;
use crate::storage::init::init_store;
use crate::types::BlockNumber;
use std::sync::Arc;

/// Convenient builder for creating an [`Indexer`].
pub struct IndexerBuilder {
    client: Option<Arc<dyn ChainClient>>,
    config: IndexerConfig,
}

impl Default for IndexerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexerBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self {
            client: None,
            config: IndexerConfig::default(),
        }
    }

    /// The chain client capability to fetch and subscribe through.
    pub fn client(mut self, client: Arc<dyn ChainClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Use a SQLite store at the given URL.
    pub fn with_sqlite(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = Some(url.into());
        self
    }

    /// Add a contract to monitor.
    pub fn add_contract(mut self, contract: ContractConfig) -> Self {
        self.config.contracts.push(contract);
        self
    }

    /// Add an event type to monitor.
    pub fn add_event(mut self, name: impl Into<String>, signature: impl Into<String>) -> Self {
        self.config.events.push(crate::config::EventConfig {
            name: name.into(),
            signature: signature.into(),
        });
        self
    }

    /// Start backfill from the specified block.
    pub fn start_from_block(mut self, block: BlockNumber) -> Self {
        self.config.start_block = Some(block);
        self
    }

    /// Maximum blocks per backfill batch.
    pub fn batch_size(mut self, batch_size: u64) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    /// Retry policy for transient fetch failures.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Replace the whole configuration with an externally resolved one.
    pub fn config(mut self, config: IndexerConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the indexer: validate the configuration, open the store and
    /// synthesize nothing yet (tables are created lazily at run time).
    pub async fn build(self) -> Result<Indexer, IndexerError> {
        let client = self
            .client
            .ok_or_else(|| IndexerError::invalid_config("client", "missing"))?;
        self.config.validate()?;
        let store = init_store(self.config.database_url.clone()).await?;
        Indexer::new(client, store, self.config)
    }
}
