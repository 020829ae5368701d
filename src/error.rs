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

use thiserror::Error;

/// Failure taxonomy of the chain client capability.
///
/// The indexer never implements JSON-RPC itself; it only needs to tell these
/// three classes apart to drive the retry/split state machine.
#[derive(Error, Debug, Clone)]
pub enum ChainClientError {
    #[error("Rate limited by RPC endpoint: {message}")]
    RateLimited { message: String },

    #[error("Log response too large for range: {message}")]
    ResponseTooLarge { message: String },

    #[error("Connection to RPC endpoint failed: {message}")]
    Connection { message: String },
}

impl ChainClientError {
    /// Classify a raw provider error message.
    ///
    /// Adapters over stringly-typed transports map their failures through
    /// here; the substrings match what public EVM endpoints actually return.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("rate limit") || lower.contains("429") {
            Self::RateLimited { message }
        } else if lower.contains("response size exceeded") || lower.contains("too many logs") {
            Self::ResponseTooLarge { message }
        } else {
            Self::Connection { message }
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    pub fn is_response_too_large(&self) -> bool {
        matches!(self, Self::ResponseTooLarge { .. })
    }
}

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Chain client error: {0}")]
    Chain(#[from] ChainClientError),

    #[error("Database error: {0}")]
    Database(Box<sqlx::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Invalid config for `{field}`: {message}")]
    InvalidConfig { field: String, message: String },

    #[error("Invalid event signature `{signature}`: {message}")]
    InvalidSignature { signature: String, message: String },

    #[error("Event name `{name}` is not a safe identifier")]
    UnsafeIdentifier { name: String },

    #[error("Schema for event `{event}` does not match the existing table: {message}")]
    SchemaMismatch { event: String, message: String },

    #[error("Storage {operation} failed for event `{event}`: {source}")]
    Storage {
        operation: String,
        event: String,
        #[source]
        source: Box<sqlx::Error>,
    },
}

impl IndexerError {
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn storage(
        operation: impl Into<String>,
        event: impl Into<String>,
        source: sqlx::Error,
    ) -> Self {
        Self::Storage {
            operation: operation.into(),
            event: event.into(),
            source: Box::new(source),
        }
    }
}

impl From<sqlx::Error> for IndexerError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(Box::new(err))
    }
}
