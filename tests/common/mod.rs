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

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use evm_event_indexer::chain::{ChainClient, LogStream};
use evm_event_indexer::error::ChainClientError;
use evm_event_indexer::types::{EventDescriptor, LogRecord};
use futures::channel::mpsc;
use futures::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub type LogSender = mpsc::UnboundedSender<Result<Vec<LogRecord>, ChainClientError>>;

// ----------------------- MockChainClient --------------------------------
pub struct MockChainClient {
    height: u64,
    fail_height: Mutex<Option<ChainClientError>>,
    logs: Vec<LogRecord>,
    /// Failures consumed, in order, before a range fetch succeeds.
    failures: Mutex<HashMap<(u64, u64), VecDeque<ChainClientError>>>,
    pub calls: Mutex<Vec<(u64, u64)>>,
    pub subscriptions: Mutex<Vec<LogSender>>,
}

impl MockChainClient {
    pub fn new(height: u64) -> Self {
        Self {
            height,
            fail_height: Mutex::new(None),
            logs: Vec::new(),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_logs(mut self, logs: Vec<LogRecord>) -> Self {
        self.logs = logs;
        self
    }

    pub fn fail_height(self, error: ChainClientError) -> Self {
        *self.fail_height.lock().unwrap() = Some(error);
        self
    }

    pub fn fail_once(&self, from: u64, to: u64, error: ChainClientError) {
        self.fail_times(from, to, 1, error);
    }

    pub fn fail_times(&self, from: u64, to: u64, times: usize, error: ChainClientError) {
        let mut failures = self.failures.lock().unwrap();
        let queue = failures.entry((from, to)).or_default();
        for _ in 0..times {
            queue.push_back(error.clone());
        }
    }

    pub fn calls_for(&self, from: u64, to: u64) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == (from, to))
            .count()
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn current_height(&self) -> Result<u64, ChainClientError> {
        if let Some(error) = self.fail_height.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.height)
    }

    async fn get_logs(
        &self,
        address: Address,
        _event: &EventDescriptor,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LogRecord>, ChainClientError> {
        self.calls.lock().unwrap().push((from_block, to_block));
        if let Some(queue) = self.failures.lock().unwrap().get_mut(&(from_block, to_block)) {
            if let Some(error) = queue.pop_front() {
                return Err(error);
            }
        }
        Ok(self
            .logs
            .iter()
            .filter(|l| {
                l.address == address
                    && l.block_number >= from_block
                    && l.block_number <= to_block
            })
            .cloned()
            .collect())
    }

    async fn subscribe(
        &self,
        _address: Address,
        _event: &EventDescriptor,
    ) -> Result<LogStream, ChainClientError> {
        let (sender, receiver) = mpsc::unbounded();
        self.subscriptions.lock().unwrap().push(sender);
        Ok(receiver.boxed())
    }
}

// ----------------------- Fixtures ---------------------------------------
pub fn rate_limited() -> ChainClientError {
    ChainClientError::from_message("429 rate limit exceeded")
}

pub fn too_many_logs() -> ChainClientError {
    ChainClientError::from_message("log response size exceeded")
}

pub fn connection_reset() -> ChainClientError {
    ChainClientError::from_message("connection reset by peer")
}

pub fn contract_address() -> Address {
    Address::repeat_byte(0x42)
}

pub fn transfer_descriptor() -> EventDescriptor {
    EventDescriptor::from_signature("Transfer", "Transfer(address,address,uint256)").unwrap()
}

/// A Transfer log uniquely keyed by `(block, log_index)`.
pub fn transfer_log(block: u64, log_index: u64, value: u64) -> LogRecord {
    let mut tx = [0u8; 32];
    tx[..8].copy_from_slice(&block.to_be_bytes());
    tx[8..16].copy_from_slice(&log_index.to_be_bytes());
    LogRecord {
        address: contract_address(),
        transaction_hash: B256::from(tx),
        block_number: block,
        log_index,
        args: vec![
            DynSolValue::Address(Address::repeat_byte(0x01)),
            DynSolValue::Address(Address::repeat_byte(0x02)),
            DynSolValue::Uint(U256::from(value), 256),
        ],
    }
}
