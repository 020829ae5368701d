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
use crate::retry::RetryConfig;
use crate::schema::is_safe_identifier;
use crate::types::{BlockNumber, EventDescriptor};
use alloy::primitives::Address;
use serde::Deserialize;
use std::collections::HashSet;

pub const DEFAULT_BATCH_SIZE: u64 = 4999;

/// One monitored contract.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractConfig {
    pub address: Address,
    #[serde(default)]
    pub name: Option<String>,
    /// Blocks before this are never fetched for this contract.
    #[serde(default)]
    pub start_block: Option<BlockNumber>,
}

impl ContractConfig {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            name: None,
            start_block: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn start_from_block(mut self, block: BlockNumber) -> Self {
        self.start_block = Some(block);
        self
    }

    /// Display label for logs.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.address.to_string(),
        }
    }
}

/// One monitored event type.
#[derive(Debug, Clone, Deserialize)]
pub struct EventConfig {
    /// Human-readable signature, e.g. `Transfer(address,address,uint256)`.
    pub signature: String,
    /// Storage key; case-folded before naming the table.
    pub name: String,
}

/// Fully resolved configuration consumed by the indexer.
///
/// Discovery, file merging and CLI parsing happen elsewhere; this is the
/// normalized object they produce.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub database_url: Option<String>,
    pub contracts: Vec<ContractConfig>,
    pub events: Vec<EventConfig>,
    pub start_block: Option<BlockNumber>,
    pub batch_size: u64,
    pub retry: RetryConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            contracts: Vec::new(),
            events: Vec::new(),
            start_block: None,
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryConfig::default(),
        }
    }
}

impl IndexerConfig {
    /// Create a new [`IndexerConfigBuilder`].
    pub fn builder() -> IndexerConfigBuilder {
        IndexerConfigBuilder::new()
    }

    /// Validate this configuration. Structural errors fail fast, before any
    /// chain or storage work begins.
    pub fn validate(&self) -> Result<(), IndexerError> {
        if self.contracts.is_empty() {
            return Err(IndexerError::invalid_config("contracts", "cannot be empty"));
        }
        if self.events.is_empty() {
            return Err(IndexerError::invalid_config("events", "cannot be empty"));
        }
        if self.batch_size < 1 {
            return Err(IndexerError::invalid_config(
                "batch_size",
                "must be at least 1",
            ));
        }
        let mut seen = HashSet::new();
        for event in &self.events {
            let key = event.name.to_lowercase();
            if !is_safe_identifier(&key) {
                return Err(IndexerError::invalid_config(
                    "events",
                    format!("event name `{}` is not a safe identifier", event.name),
                ));
            }
            if !seen.insert(key) {
                return Err(IndexerError::invalid_config(
                    "events",
                    format!("duplicate event name `{}`", event.name),
                ));
            }
        }
        if let Some(url) = &self.database_url {
            if url.trim().is_empty() {
                return Err(IndexerError::invalid_config(
                    "database_url",
                    "cannot be empty",
                ));
            }
        }
        Ok(())
    }

    /// Derive one [`EventDescriptor`] per configured event.
    pub fn descriptors(&self) -> Result<Vec<EventDescriptor>, IndexerError> {
        self.events
            .iter()
            .map(|e| EventDescriptor::from_signature(&e.name, &e.signature))
            .collect()
    }
}

/// Builder pattern for [`IndexerConfig`].
#[derive(Debug, Default)]
pub struct IndexerConfigBuilder {
    config: IndexerConfig,
}

impl IndexerConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            config: IndexerConfig::default(),
        }
    }

    /// Configure a SQLite backend.
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
        self.config.events.push(EventConfig {
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

    /// Build the configuration and validate it.
    pub fn build(self) -> Result<IndexerConfig, IndexerError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
