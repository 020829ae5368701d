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

mod common;
use common::*;
use evm_event_indexer::{
    ContractConfig, Indexer, IndexerBuilder, IndexerError, QueryOptions, RetryConfig,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(10),
        strategy: None,
    }
}

async fn build_indexer(client: Arc<MockChainClient>, batch_size: u64) -> Indexer {
    IndexerBuilder::new()
        .client(client)
        .with_sqlite("sqlite::memory:")
        .add_contract(ContractConfig::new(contract_address()))
        .add_event("Transfer", "Transfer(address,address,uint256)")
        .start_from_block(1)
        .batch_size(batch_size)
        .retry(fast_retry())
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn oversized_range_splits_at_midpoint_without_boundary_duplication() {
    let client = Arc::new(
        MockChainClient::new(100)
            .with_logs(vec![transfer_log(50, 0, 1), transfer_log(51, 0, 2)]),
    );
    client.fail_once(1, 100, too_many_logs());

    let indexer = build_indexer(client.clone(), 4999).await;
    let report = indexer.run_backfill().await.unwrap();

    assert_eq!(
        *client.calls.lock().unwrap(),
        vec![(1, 100), (1, 50), (51, 100)]
    );
    assert_eq!(report.inserted, 2);
    assert_eq!(report.duplicates, 0);
    assert_eq!(report.skipped_ranges, 0);

    let rows = indexer
        .store()
        .query("Transfer", &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn nested_splits_cover_the_range_exactly_once() {
    let logs: Vec<_> = (1..=8).map(|b| transfer_log(b, 0, b)).collect();
    let client = Arc::new(MockChainClient::new(8).with_logs(logs));
    client.fail_once(1, 8, too_many_logs());
    client.fail_once(1, 4, too_many_logs());
    client.fail_once(5, 8, too_many_logs());

    let indexer = build_indexer(client.clone(), 4999).await;
    let report = indexer.run_backfill().await.unwrap();

    assert_eq!(
        *client.calls.lock().unwrap(),
        vec![(1, 8), (1, 4), (1, 2), (3, 4), (5, 8), (5, 6), (7, 8)]
    );
    assert_eq!(report.inserted, 8);
    assert_eq!(report.duplicates, 0);
}

#[tokio::test]
async fn unsplittable_single_block_is_skipped_permanently() {
    let client = Arc::new(MockChainClient::new(1).with_logs(vec![transfer_log(1, 0, 1)]));
    // Always oversized; retries would never help, so none are attempted.
    client.fail_times(1, 1, 10, too_many_logs());

    let indexer = build_indexer(client.clone(), 10).await;
    let report = indexer.run_backfill().await.unwrap();

    assert_eq!(client.calls_for(1, 1), 1);
    assert_eq!(report.skipped_ranges, 1);
    assert_eq!(report.inserted, 0);
}

#[tokio::test]
async fn rate_limit_exhaustion_skips_the_unit_and_continues() {
    let client = Arc::new(MockChainClient::new(100).with_logs(vec![transfer_log(60, 0, 1)]));
    // More failures queued than the retry budget allows.
    client.fail_times(1, 50, 5, rate_limited());

    let indexer = build_indexer(client.clone(), 50).await;
    let report = indexer.run_backfill().await.unwrap();

    // 1 initial attempt + 3 retries, then the unit is dropped.
    assert_eq!(client.calls_for(1, 50), 4);
    assert_eq!(client.calls_for(51, 100), 1);
    assert_eq!(report.skipped_ranges, 1);
    assert_eq!(report.inserted, 1);
}

#[tokio::test]
async fn transient_error_retries_same_range_then_succeeds() {
    let client = Arc::new(MockChainClient::new(20).with_logs(vec![transfer_log(10, 0, 7)]));
    client.fail_times(1, 20, 2, connection_reset());

    let indexer = build_indexer(client.clone(), 50).await;
    let report = indexer.run_backfill().await.unwrap();

    assert_eq!(client.calls_for(1, 20), 3);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.skipped_ranges, 0);
}

#[tokio::test]
async fn rerun_counts_duplicates_instead_of_rewriting() {
    let client = Arc::new(MockChainClient::new(10).with_logs(vec![
        transfer_log(3, 0, 1),
        transfer_log(7, 1, 2),
    ]));

    let indexer = build_indexer(client.clone(), 50).await;
    let first = indexer.run_backfill().await.unwrap();
    assert_eq!(first.inserted, 2);

    let second = indexer.run_backfill().await.unwrap();
    assert_eq!(second.inserted, 2); // cumulative across the run context
    assert_eq!(second.duplicates, 2);

    let rows = indexer
        .store()
        .query("Transfer", &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn per_contract_start_block_clips_ranges() {
    let client = Arc::new(MockChainClient::new(30).with_logs(vec![
        transfer_log(5, 0, 1),
        transfer_log(25, 0, 2),
    ]));

    let indexer = IndexerBuilder::new()
        .client(client.clone())
        .with_sqlite("sqlite::memory:")
        .add_contract(ContractConfig::new(contract_address()).start_from_block(20))
        .add_event("Transfer", "Transfer(address,address,uint256)")
        .start_from_block(1)
        .batch_size(10)
        .retry(fast_retry())
        .build()
        .await
        .unwrap();
    let report = indexer.run_backfill().await.unwrap();

    // Batches [1,10] and [11,20] are clipped to the contract's start block.
    assert_eq!(
        *client.calls.lock().unwrap(),
        vec![(20, 20), (21, 30)]
    );
    assert_eq!(report.inserted, 1);
    let rows = indexer
        .store()
        .query("Transfer", &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(rows[0]["block_number"], json!(25));
}

#[tokio::test]
async fn start_block_beyond_height_fails_fast() {
    let client = Arc::new(MockChainClient::new(100));
    let indexer = IndexerBuilder::new()
        .client(client.clone())
        .with_sqlite("sqlite::memory:")
        .add_contract(ContractConfig::new(contract_address()))
        .add_event("Transfer", "Transfer(address,address,uint256)")
        .start_from_block(200)
        .build()
        .await
        .unwrap();

    match indexer.run_backfill().await {
        Err(IndexerError::InvalidConfig { field, .. }) => assert_eq!(field, "start_block"),
        other => panic!("expected InvalidConfig, got {other:?}"),
    }
    assert!(client.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_chain_propagates() {
    let client = Arc::new(MockChainClient::new(0).fail_height(connection_reset()));
    let indexer = build_indexer(client, 10).await;
    assert!(matches!(
        indexer.run_backfill().await,
        Err(IndexerError::Chain(_))
    ));
}
