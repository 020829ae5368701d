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

pub mod init;
pub mod sqlite;

use crate::error::IndexerError;
use crate::types::{EventDescriptor, LogRecord};
use async_trait::async_trait;

/// Result of one idempotent insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A row with the same `(transaction_hash, log_index)` already exists.
    Duplicate,
    /// No table for this event name; schema synthesis failed or never ran.
    NoTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Read-surface query parameters; equality filters are AND-combined.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub filters: Vec<(String, serde_json::Value)>,
    pub limit: u32,
    pub offset: u32,
    pub order_by: String,
    pub direction: OrderDirection,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            limit: 100,
            offset: 0,
            order_by: "timestamp".to_string(),
            direction: OrderDirection::Desc,
        }
    }
}

/// A stored row rendered for API consumers.
pub type StoredRow = serde_json::Map<String, serde_json::Value>;

/// Persistence for normalized event rows, one table per event name.
///
/// Both the backfill driver and the live watcher write through this trait;
/// the read API queries through it. Implementations must tolerate concurrent
/// inserts for different keys; for the same key at most one write persists.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Create the event's table and indexes if absent and register it for
    /// inserts. Idempotent.
    async fn ensure_schema(&self, descriptor: &EventDescriptor) -> Result<(), IndexerError>;

    /// Insert one normalized record, suppressing duplicates by
    /// `(transaction_hash, log_index)`.
    async fn insert(
        &self,
        event_name: &str,
        record: &LogRecord,
    ) -> Result<InsertOutcome, IndexerError>;

    /// Filtered read over one event table; unknown tables yield an empty
    /// result, not an error.
    async fn query(
        &self,
        event_name: &str,
        options: &QueryOptions,
    ) -> Result<Vec<StoredRow>, IndexerError>;

    /// Event names with a persisted table, across runs.
    async fn list_event_names(&self) -> Result<Vec<String>, IndexerError>;
}
