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
use crate::storage::sqlite::SqliteEventStore;
use crate::storage::EventStore;
use std::path::Path;
use std::sync::Arc;

/// Resolve the event store from a database URL.
///
/// `None` defaults to `sqlite://database/events.db`, creating the directory
/// if needed.
pub async fn init_store(database_url: Option<String>) -> Result<Arc<dyn EventStore>, IndexerError> {
    let url = match database_url {
        Some(url) => {
            if !url.starts_with("sqlite:") {
                return Err(IndexerError::invalid_config(
                    "database_url",
                    "Unsupported database URL",
                ));
            }
            url
        }
        None => {
            let base_dir = Path::new("database");
            if !base_dir.exists() {
                tokio::fs::create_dir_all(base_dir).await?;
            }
            "sqlite://database/events.db".to_string()
        }
    };

    let store = SqliteEventStore::new(&url).await?;
    Ok(Arc::new(store))
}
