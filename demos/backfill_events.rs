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

//! Backfills a simulated chain into an in-memory database, then queries the
//! most recent rows back out.

use evm_event_indexer::prelude::{
    async_trait, Address, ChainClient, ChainClientError, ContractConfig, DynSolValue,
    EventDescriptor, IndexerBuilder, LogStream, QueryOptions, B256, U256,
};
use evm_event_indexer::types::{BlockNumber, LogRecord};
use futures::StreamExt;
use std::sync::Arc;
use tracing::info;

/// A chain that emits one `Transfer` every ten blocks.
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
            DynSolValue::Uint(U256::from(block) * U256::from(10u64).pow(U256::from(18u64)), 256),
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
        address: Address,
        _event: &EventDescriptor,
        from_block: BlockNumber,
        to_block: BlockNumber,
    ) -> Result<Vec<LogRecord>, ChainClientError> {
        Ok((from_block..=to_block)
            .filter(|b| b % 10 == 0)
            .map(|b| demo_log(address, b))
            .collect())
    }

    async fn subscribe(
        &self,
        _address: Address,
        _event: &EventDescriptor,
    ) -> Result<LogStream, ChainClientError> {
        Ok(futures::stream::pending().boxed())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Init tracing subscriber
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_level(true)
        .compact()
        .init();

    let token = "0x4242424242424242424242424242424242424242".parse::<Address>()?;

    let indexer = IndexerBuilder::new()
        .client(Arc::new(SimulatedChain { height: 25_000 }))
        .with_sqlite("sqlite::memory:")
        .add_contract(ContractConfig::new(token).named("demo-token"))
        .add_event("Transfer", "Transfer(address indexed from, address indexed to, uint256 value)")
        .start_from_block(1)
        .batch_size(4999)
        .build()
        .await?;

    let report = indexer.run_backfill().await?;
    info!(
        inserted = report.inserted,
        duplicates = report.duplicates,
        skipped_ranges = report.skipped_ranges,
        "backfill complete"
    );

    let rows = indexer
        .store()
        .query(
            "Transfer",
            &QueryOptions {
                order_by: "block_number".into(),
                limit: 5,
                ..QueryOptions::default()
            },
        )
        .await?;
    for row in rows {
        info!(
            block = %row["block_number"],
            value = %row["param_2_uint256"],
            "recent transfer"
        );
    }
    Ok(())
}
