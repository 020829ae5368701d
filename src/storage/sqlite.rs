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
use crate::schema::{encode_arg, SqlValue, TableSchema};
use crate::storage::{EventStore, InsertOutcome, QueryOptions, StoredRow};
use crate::types::{EventDescriptor, LogRecord};
use alloy::primitives::hex;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::RwLock;

/// SQLite-backed [`EventStore`].
///
/// The pool is capped at one connection: the store is a single long-lived
/// handle shared by backfill inserts, live-watch inserts and reads, and a
/// single connection keeps `sqlite::memory:` databases coherent.
pub struct SqliteEventStore {
    pool: SqlitePool,
    registry: RwLock<HashMap<String, TableSchema>>,
}

impl SqliteEventStore {
    pub async fn new(url: &str) -> Result<Self, IndexerError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(IndexerError::from)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self {
            pool,
            registry: RwLock::new(HashMap::new()),
        })
    }

    fn schema_for(&self, event_name: &str) -> Option<TableSchema> {
        self.registry
            .read()
            .unwrap()
            .get(&event_name.to_lowercase())
            .cloned()
    }

    /// Column names of the live table, in definition order; empty when the
    /// table does not exist yet.
    async fn live_columns(&self, table_name: &str) -> Result<Vec<String>, IndexerError> {
        let names: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
                .bind(table_name)
                .fetch_all(&self.pool)
                .await?;
        Ok(names)
    }

    fn row_to_json(row: &SqliteRow) -> Result<StoredRow, IndexerError> {
        let mut out = StoredRow::new();
        for column in row.columns() {
            let idx = column.ordinal();
            let raw = row.try_get_raw(idx)?;
            let value = if raw.is_null() {
                Value::Null
            } else {
                match raw.type_info().name() {
                    "INTEGER" | "BOOLEAN" => {
                        let n: i64 = row.try_get(idx)?;
                        Value::from(n)
                    }
                    "REAL" => {
                        let f: f64 = row.try_get(idx)?;
                        Value::from(f)
                    }
                    "BLOB" => {
                        let bytes: Vec<u8> = row.try_get(idx)?;
                        Value::String(hex::encode_prefixed(&bytes))
                    }
                    _ => {
                        let text: String = row.try_get(idx)?;
                        parse_json_text(text)
                    }
                }
            };
            out.insert(column.name().to_string(), value);
        }
        Ok(out)
    }
}

/// Best-effort: JSON-looking text comes back structured, anything else stays
/// raw.
fn parse_json_text(text: String) -> Value {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    } else {
        Value::String(text)
    }
}

fn bind_sql_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(Option::<String>::None),
        SqlValue::Integer(n) => query.bind(n),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Blob(b) => query.bind(b),
    }
}

fn bind_filter_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else {
                query.bind(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn ensure_schema(&self, descriptor: &EventDescriptor) -> Result<(), IndexerError> {
        let schema = TableSchema::for_event(descriptor)?;

        // Schema drift guard: an existing table whose columns no longer
        // match the descriptor is rejected rather than silently mis-written.
        let live = self.live_columns(&schema.table_name).await?;
        if !live.is_empty() {
            let expected = schema.column_names();
            if live.iter().map(String::as_str).collect::<Vec<_>>() != expected {
                return Err(IndexerError::SchemaMismatch {
                    event: descriptor.name.clone(),
                    message: format!(
                        "table {} has columns [{}], descriptor requires [{}]",
                        schema.table_name,
                        live.join(", "),
                        expected.join(", ")
                    ),
                });
            }
        }

        for statement in schema.create_statements() {
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .map_err(|e| IndexerError::storage("create", &schema.event_key, e))?;
        }

        self.registry
            .write()
            .unwrap()
            .insert(schema.event_key.clone(), schema);
        Ok(())
    }

    async fn insert(
        &self,
        event_name: &str,
        record: &LogRecord,
    ) -> Result<InsertOutcome, IndexerError> {
        let Some(schema) = self.schema_for(event_name) else {
            return Ok(InsertOutcome::NoTable);
        };

        let existing: Option<i64> = sqlx::query_scalar(&format!(
            "SELECT id FROM {} WHERE transaction_hash = ?1 AND log_index = ?2 LIMIT 1",
            schema.table_name
        ))
        .bind(record.transaction_hash.to_string())
        .bind(record.log_index as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| IndexerError::storage("lookup", &schema.event_key, e))?;
        if existing.is_some() {
            return Ok(InsertOutcome::Duplicate);
        }

        let statement = schema.insert_statement();
        let mut query = sqlx::query(&statement)
            .bind(record.address.to_string())
            .bind(record.transaction_hash.to_string())
            .bind(record.block_number as i64)
            .bind(record.log_index as i64);
        for i in 0..schema.params.len() {
            let value = record.args.get(i).map(encode_arg).unwrap_or(SqlValue::Null);
            query = bind_sql_value(query, value);
        }

        match query.execute(&self.pool).await {
            Ok(_) => Ok(InsertOutcome::Inserted),
            // Lost a duplicate race; the earlier row wins.
            Err(e) if e
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation()) =>
            {
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(IndexerError::storage("insert", &schema.event_key, e)),
        }
    }

    async fn query(
        &self,
        event_name: &str,
        options: &QueryOptions,
    ) -> Result<Vec<StoredRow>, IndexerError> {
        let Some(schema) = self.schema_for(event_name) else {
            return Ok(Vec::new());
        };
        let columns = schema.column_names();

        if !columns.contains(&options.order_by.as_str()) {
            return Err(IndexerError::invalid_config(
                "order_by",
                format!("unknown column `{}`", options.order_by),
            ));
        }
        for (column, _) in &options.filters {
            if !columns.contains(&column.as_str()) {
                return Err(IndexerError::invalid_config(
                    "filters",
                    format!("unknown column `{column}`"),
                ));
            }
        }

        let mut sql = format!("SELECT * FROM {}", schema.table_name);
        if !options.filters.is_empty() {
            let clauses: Vec<String> = options
                .filters
                .iter()
                .map(|(column, _)| format!("{column} = ?"))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(&format!(
            " ORDER BY {} {} LIMIT ? OFFSET ?",
            options.order_by,
            options.direction.as_sql()
        ));

        let mut query = sqlx::query(&sql);
        for (_, value) in &options.filters {
            query = bind_filter_value(query, value);
        }
        query = query.bind(options.limit as i64).bind(options.offset as i64);

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IndexerError::storage("query", &schema.event_key, e))?;
        rows.iter().map(Self::row_to_json).collect()
    }

    async fn list_event_names(&self) -> Result<Vec<String>, IndexerError> {
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name LIKE 'event\\_%' ESCAPE '\\' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tables
            .into_iter()
            .filter_map(|t| t.strip_prefix("event_").map(str::to_string))
            .collect())
    }
}
