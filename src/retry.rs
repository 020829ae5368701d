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
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    Fixed,
    Linear,
    Exponential,
}

/// Retry policy for transient chain-client failures.
///
/// When `strategy` is unset, rate-limit responses back off exponentially
/// (2s, 4s, 8s, ...) and every other transient error backs off linearly
/// (1s, 2s, 3s, ...); setting it overrides both classes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub strategy: Option<BackoffStrategy>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            strategy: None,
        }
    }
}

impl RetryConfig {
    /// Backoff delay before retry number `attempt` (1-based), capped at
    /// `max_delay`.
    pub fn delay_for(&self, error: &ChainClientError, attempt: u32) -> Duration {
        let strategy = self.strategy.unwrap_or(if error.is_rate_limited() {
            BackoffStrategy::Exponential
        } else {
            BackoffStrategy::Linear
        });
        let delay = match strategy {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Linear => self.base_delay.saturating_mul(attempt.max(1)),
            BackoffStrategy::Exponential => self
                .base_delay
                .saturating_mul(2u32.saturating_pow(attempt.max(1))),
        };
        delay.min(self.max_delay)
    }
}
