//! Repository Module
//!
//! The abstract relational data source every other layer talks to, plus an
//! in-memory implementation.

mod memory;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{DataError, Result};
use crate::query::{Filter, QuerySpec};

pub use memory::{MemoryRepository, RpcHandler, Tables};

/// One record as returned by the data source.
pub type Row = Map<String, Value>;

/// Identifies a single row by its key column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowId {
    pub column: String,
    pub value: Value,
}

impl RowId {
    pub fn new(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// Rows plus the optional count requested by the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub count: Option<u64>,
}

/// Relational data source.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Executes a read.
    async fn query(&self, spec: &QuerySpec) -> Result<QueryResult>;

    /// Inserts rows in one round trip, returning them with server-generated
    /// fields populated.
    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>>;

    /// Applies `patch` to the row identified by `id`.
    async fn update(&self, table: &str, id: &RowId, patch: Row) -> Result<()>;

    /// Deletes every row matching all `filters`, returning the removed
    /// primary keys.
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>>;

    /// Calls a server-side procedure.
    async fn rpc(&self, name: &str, params: Value) -> Result<Value>;

    /// Returns an execution plan for `spec`.
    async fn explain(&self, spec: &QuerySpec) -> Result<Value> {
        Err(DataError::Unsupported(format!(
            "explain is not available for {}",
            spec.source
        )))
    }
}
