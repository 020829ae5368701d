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

//! Watches a simulated chain live for a few seconds, then stops the
//! subscriptions and prints what arrived.

use evm_event_indexer::prelude::{
    async_trait, Address, ChainClient, ChainClientError, ContractConfig, DynSolValue,
    EventDescriptor, IndexerBuilder, LogStream, QueryOptions, B256, U256,
};
use evm_event_indexer::types::{BlockNumber, LogRecord};
use futures::channel::mpsc;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// A chain that mints one `Transfer` every half second after the current tip.
struct SimulatedChain {
    height: u64,
}

fn demo_log(address: Address, block: u64) -> LogRecord {
    let mut tx = [0u8; 32];
    tx[..8].copy_from_slice(&block.to_be_bytes());
    LogRecord {
        address,
        transaction_hash: B256::from(tx),
        block_number: block,
        log_index: 0,
        args: vec![
            DynSolValue::Address(Address::repeat_byte(0xaa)),
            DynSolValue::Address(Address::repeat_byte(0xbb)),
            DynSolValue::Uint(U256::from(block), 256),
        ],
    }
}

#[async_trait]
impl ChainClient for SimulatedChain {
    async fn current_height(&self) -> Result<BlockNumber, ChainClientError> {
        Ok(self.height)
    }

    async fn get_logs(
        &self,
        _address: Address,
        _event: &EventDescriptor,
        _from_block: BlockNumber,
        _to_block: BlockNumber,
    ) -> Result<Vec<LogRecord>, ChainClientError> {
        Ok(Vec::new())
    }

    async fn subscribe(
        &self,
        address: Address,
        _event: &EventDescriptor,
    ) -> Result<LogStream, ChainClientError> {
        let (sender, receiver) = mpsc::unbounded();
        let mut block = self.height + 1;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(500));
            loop {
                ticker.tick().await;
                if sender.unbounded_send(Ok(vec![demo_log(address, block)])).is_err() {
                    break;
                }
                block += 1;
            }
        });
        Ok(receiver.boxed())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Init tracing subscriber
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .with_level(true)
        .compact()
        .init();

    let token = "0x4242424242424242424242424242424242424242".parse::<Address>()?;

    let indexer = IndexerBuilder::new()
        .client(Arc::new(SimulatedChain { height: 100 }))
        .with_sqlite("sqlite::memory:")
        .add_contract(ContractConfig::new(token).named("demo-token"))
        .add_event("Transfer", "Transfer(address,address,uint256)")
        .build()
        .await?;

    let handles = indexer.watch().await?;
    info!(subscriptions = handles.len(), "watching");

    tokio::time::sleep(Duration::from_secs(5)).await;
    for handle in &handles {
        handle.stop();
    }

    let rows = indexer
        .store()
        .query(
            "Transfer",
            &QueryOptions {
                order_by: "block_number".into(),
                ..QueryOptions::default()
            },
        )
        .await?;
    info!(rows = rows.len(), "stopped watching");
    for row in &rows {
        info!(block = %row["block_number"], "live transfer");
    }
    Ok(())
}
