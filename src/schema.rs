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

//! Derives a per-event storage layout from an [`EventDescriptor`].
//!
//! Synthesis is a pure function of event metadata. Table and column names are
//! validated against an identifier-safe character set before they are ever
//! interpolated into SQL; argument values are bound, never interpolated.

use crate::error::IndexerError;
use crate::types::EventDescriptor;
use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::hex;
use serde_json::{json, Value};

/// Semantic column type; mapped to a storage-engine type by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
    Boolean,
    Blob,
}

impl ColumnType {
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
            Self::Boolean => "BOOLEAN",
            Self::Blob => "BLOB",
        }
    }
}

/// A value ready to be bound into a storage statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Bool(bool),
    Text(String),
    Blob(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
}

/// Synthesized storage layout for one event type.
#[derive(Debug, Clone)]
pub struct TableSchema {
    /// Case-folded event name, the registry key.
    pub event_key: String,
    pub table_name: String,
    /// One column per event input, `param_<i>_<type-tag>`.
    pub params: Vec<ColumnDef>,
}

/// True when `name` can safely name a table or column.
pub fn is_safe_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn type_tag(ty: &DynSolType) -> String {
    match ty {
        DynSolType::Array(inner) => format!("{}_array", type_tag(inner)),
        DynSolType::FixedArray(inner, _) => format!("{}_array", type_tag(inner)),
        DynSolType::Tuple(_) => "tuple".to_string(),
        other => other.sol_type_name().into_owned(),
    }
}

fn column_type(ty: &DynSolType) -> ColumnType {
    match ty {
        DynSolType::Bool => ColumnType::Boolean,
        // 96-bit and wider integers go to decimal text to avoid precision
        // loss; anything up to 64 bits fits a native integer column.
        DynSolType::Int(size) | DynSolType::Uint(size) => {
            if *size <= 64 {
                ColumnType::Integer
            } else {
                ColumnType::Text
            }
        }
        DynSolType::Address | DynSolType::String => ColumnType::Text,
        DynSolType::Bytes | DynSolType::FixedBytes(_) | DynSolType::Function => ColumnType::Blob,
        // Arrays and tuples are JSON-serialized.
        _ => ColumnType::Text,
    }
}

impl TableSchema {
    pub fn for_event(descriptor: &EventDescriptor) -> Result<Self, IndexerError> {
        let event_key = descriptor.table_key();
        if !is_safe_identifier(&event_key) {
            return Err(IndexerError::UnsafeIdentifier {
                name: descriptor.name.clone(),
            });
        }
        let params = descriptor
            .inputs
            .iter()
            .enumerate()
            .map(|(i, input)| ColumnDef {
                name: format!("param_{i}_{}", type_tag(&input.ty)),
                ty: column_type(&input.ty),
            })
            .collect();
        Ok(Self {
            table_name: format!("event_{event_key}"),
            event_key,
            params,
        })
    }

    /// Every column a caller may filter or order by.
    pub fn column_names(&self) -> Vec<&str> {
        let mut names = vec![
            "id",
            "contract_address",
            "transaction_hash",
            "block_number",
            "log_index",
            "timestamp",
        ];
        names.extend(self.params.iter().map(|c| c.name.as_str()));
        names
    }

    /// DDL for the table plus its three indexes.
    ///
    /// All statements use `IF NOT EXISTS` semantics, so re-running synthesis
    /// against an existing table is a no-op.
    pub fn create_statements(&self) -> Vec<String> {
        let mut columns = vec![
            "id INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
            "contract_address TEXT NOT NULL".to_string(),
            "transaction_hash TEXT NOT NULL".to_string(),
            "block_number INTEGER NOT NULL".to_string(),
            "log_index INTEGER NOT NULL DEFAULT 0".to_string(),
            "timestamp DATETIME DEFAULT CURRENT_TIMESTAMP".to_string(),
        ];
        columns.extend(
            self.params
                .iter()
                .map(|c| format!("{} {}", c.name, c.ty.sql_type())),
        );
        let table = &self.table_name;
        vec![
            format!("CREATE TABLE IF NOT EXISTS {table} ({})", columns.join(", ")),
            format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_contract ON {table} (contract_address)"
            ),
            format!("CREATE INDEX IF NOT EXISTS idx_{table}_block ON {table} (block_number)"),
            format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_tx_log \
                 ON {table} (transaction_hash, log_index)"
            ),
        ]
    }

    /// Parameterized insert covering every column except `id` and
    /// `timestamp`, which the engine assigns.
    pub fn insert_statement(&self) -> String {
        let mut columns = vec![
            "contract_address",
            "transaction_hash",
            "block_number",
            "log_index",
        ];
        columns.extend(self.params.iter().map(|c| c.name.as_str()));
        let placeholders = vec!["?"; columns.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            self.table_name,
            columns.join(", ")
        )
    }
}

/// Encode one decoded argument for its `param_<i>_<type>` column.
///
/// Wide integers become decimal text, complex values become JSON text; a
/// missing positional argument is bound as NULL by the caller.
pub fn encode_arg(value: &DynSolValue) -> SqlValue {
    match value {
        DynSolValue::Bool(b) => SqlValue::Bool(*b),
        DynSolValue::Uint(v, size) => {
            if *size <= 64 {
                i64::try_from(*v)
                    .map(SqlValue::Integer)
                    .unwrap_or_else(|_| SqlValue::Text(v.to_string()))
            } else {
                SqlValue::Text(v.to_string())
            }
        }
        DynSolValue::Int(v, size) => {
            if *size <= 64 {
                i64::try_from(*v)
                    .map(SqlValue::Integer)
                    .unwrap_or_else(|_| SqlValue::Text(v.to_string()))
            } else {
                SqlValue::Text(v.to_string())
            }
        }
        DynSolValue::Address(a) => SqlValue::Text(a.to_string()),
        DynSolValue::FixedBytes(word, size) => SqlValue::Blob(word[..*size].to_vec()),
        DynSolValue::Bytes(b) => SqlValue::Blob(b.clone()),
        DynSolValue::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(arg_to_json(other).to_string()),
    }
}

/// JSON rendering used for array/tuple arguments and for the read surface.
///
/// Integers wider than 64 bits (or not representable without loss) render as
/// decimal strings inside JSON as well.
pub fn arg_to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => json!(b),
        DynSolValue::Uint(v, size) => {
            if *size <= 64 {
                u64::try_from(*v)
                    .map(|n| json!(n))
                    .unwrap_or_else(|_| json!(v.to_string()))
            } else {
                json!(v.to_string())
            }
        }
        DynSolValue::Int(v, size) => {
            if *size <= 64 {
                i64::try_from(*v)
                    .map(|n| json!(n))
                    .unwrap_or_else(|_| json!(v.to_string()))
            } else {
                json!(v.to_string())
            }
        }
        DynSolValue::Address(a) => json!(a.to_string()),
        DynSolValue::FixedBytes(word, size) => json!(hex::encode_prefixed(&word[..*size])),
        DynSolValue::Bytes(b) => json!(hex::encode_prefixed(b)),
        DynSolValue::String(s) => json!(s),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(arg_to_json).collect())
        }
        _ => Value::Null,
    }
}
