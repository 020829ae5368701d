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

use crate::error::ChainClientError;
use crate::types::{BlockNumber, EventDescriptor, LogRecord};
use alloy::primitives::Address;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Batches of decoded logs delivered by a live subscription.
pub type LogStream = BoxStream<'static, Result<Vec<LogRecord>, ChainClientError>>;

/// The chain capability the indexer consumes.
///
/// Implementations wrap an actual RPC transport (and own its timeouts); the
/// indexer itself never speaks JSON-RPC. Decoding raw logs into positional
/// [`DynSolValue`](alloy::dyn_abi::DynSolValue) args is the implementation's
/// job, guided by the passed [`EventDescriptor`].
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Latest confirmed block height.
    async fn current_height(&self) -> Result<BlockNumber, ChainClientError>;

    /// Decoded logs for one contract and event over an inclusive block range.
    async fn get_logs(
        &self,
        address: Address,
        event: &EventDescriptor,
        from_block: BlockNumber,
        to_block: BlockNumber,
    ) -> Result<Vec<LogRecord>, ChainClientError>;

    /// Subscribe to new logs matching one contract and event.
    ///
    /// The stream ends when the subscription closes; dropping it cancels.
    async fn subscribe(
        &self,
        address: Address,
        event: &EventDescriptor,
    ) -> Result<LogStream, ChainClientError>;
}
