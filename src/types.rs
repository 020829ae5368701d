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
use alloy::dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy::json_abi::Event;
use alloy::primitives::{Address, B256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

pub type BlockNumber = u64;

/// One decoded argument slot of a monitored event.
#[derive(Debug, Clone)]
pub struct EventInput {
    pub name: String,
    pub ty: DynSolType,
    pub indexed: bool,
}

/// One monitored event type, derived once from configuration.
///
/// `name` is the storage key chosen in the configuration, not necessarily the
/// solidity event name; it is case-folded before naming tables.
#[derive(Debug, Clone)]
pub struct EventDescriptor {
    pub name: String,
    pub signature: String,
    pub inputs: Vec<EventInput>,
}

impl EventDescriptor {
    /// Parse a human-readable event signature such as
    /// `Transfer(address,address,uint256)` or
    /// `Transfer(address indexed from, address indexed to, uint256 value)`.
    pub fn from_signature(name: &str, signature: &str) -> Result<Self, IndexerError> {
        let parsed = Event::parse(signature).map_err(|e| IndexerError::InvalidSignature {
            signature: signature.to_string(),
            message: e.to_string(),
        })?;
        let inputs = parsed
            .inputs
            .iter()
            .map(|param| {
                let ty = param
                    .resolve()
                    .map_err(|e| IndexerError::InvalidSignature {
                        signature: signature.to_string(),
                        message: e.to_string(),
                    })?;
                Ok(EventInput {
                    name: param.name.clone(),
                    ty,
                    indexed: param.indexed,
                })
            })
            .collect::<Result<Vec<_>, IndexerError>>()?;
        Ok(Self {
            name: name.to_string(),
            signature: signature.to_string(),
            inputs,
        })
    }

    /// Case-folded name used as the storage table key.
    pub fn table_key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// One observed event occurrence as delivered by the chain client.
///
/// `args` is positionally aligned with the descriptor's inputs. Ephemeral;
/// consumed once by normalization and never stored as-is.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub address: Address,
    pub transaction_hash: B256,
    pub block_number: BlockNumber,
    /// Defaults to 0 when the source omits it.
    pub log_index: u64,
    pub args: Vec<DynSolValue>,
}

/// Insert/duplicate/error counters shared by a run.
///
/// An explicit context object instead of module-level state, so concurrent
/// subscriptions and parallel test runs never interfere.
#[derive(Debug, Default)]
pub struct RunStats {
    inserted: AtomicU64,
    duplicates: AtomicU64,
    errors: AtomicU64,
    skipped_ranges: AtomicU64,
    last_warn: Mutex<Option<Instant>>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_inserted(&self) {
        self.inserted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped_range(&self) {
        self.skipped_ranges.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit a row-level diagnostic, at most once per second.
    pub fn warn_throttled(&self, message: &str) {
        let mut last = self.last_warn.lock().unwrap();
        let now = Instant::now();
        let due = last
            .map(|t| now.duration_since(t) >= Duration::from_secs(1))
            .unwrap_or(true);
        if due {
            warn!(target: "indexer", "{message}");
            *last = Some(now);
        }
    }

    pub fn snapshot(&self) -> BackfillReport {
        BackfillReport {
            inserted: self.inserted.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            skipped_ranges: self.skipped_ranges.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of a finished backfill run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillReport {
    pub inserted: u64,
    pub duplicates: u64,
    pub errors: u64,
    /// Ranges dropped after retry exhaustion or unsplittable overflow.
    pub skipped_ranges: u64,
}
