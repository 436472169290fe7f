//! In-memory repository.
//!
//! Evaluates [`QuerySpec`]s over rows held in process. Strings compare
//! lexicographically (timestamps are stored as RFC 3339 UTC strings so this
//! orders them correctly), numbers numerically, and any comparison involving
//! null is false.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DataError, Result};
use crate::query::optimizer::timestamp;
use crate::query::{Filter, Ordering, QuerySpec};
use crate::repository::{QueryResult, Repository, Row, RowId};

/// Server-side procedure: receives the tables and the call parameters.
pub type RpcHandler = Arc<dyn Fn(&mut Tables, Value) -> Result<Value> + Send + Sync>;

#[derive(Debug, Default)]
struct Table {
    primary_key: String,
    rows: Vec<Row>,
}

/// Table storage handed to rpc handlers.
#[derive(Debug, Default)]
pub struct Tables {
    tables: HashMap<String, Table>,
}

impl Tables {
    /// Rows of `table`, empty when it does not exist.
    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables
            .get(table)
            .map(|t| t.rows.as_slice())
            .unwrap_or(&[])
    }

    pub fn rows_mut(&mut self, table: &str) -> Result<&mut Vec<Row>> {
        self.table_mut(table).map(|t| &mut t.rows)
    }

    fn table(&self, name: &str) -> Result<&Table> {
        self.tables.get(name).ok_or_else(|| missing_relation(name))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables.get_mut(name).ok_or_else(|| missing_relation(name))
    }
}

/// Repository over in-process tables.
///
/// Tables, seed rows and procedures are registered up front with the
/// builder methods; views are simply tables holding denormalized rows.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
    procedures: HashMap<String, RpcHandler>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a table (or view) keyed by `primary_key`.
    pub fn with_table(mut self, name: &str, primary_key: &str) -> Self {
        self.tables.get_mut().tables.insert(
            name.to_string(),
            Table {
                primary_key: primary_key.to_string(),
                rows: Vec::new(),
            },
        );
        self
    }

    /// Appends rows to a declared table. Rows for undeclared tables create
    /// the table keyed by `id`.
    pub fn with_rows(mut self, name: &str, rows: Vec<Row>) -> Self {
        self.tables
            .get_mut()
            .tables
            .entry(name.to_string())
            .or_insert_with(|| Table {
                primary_key: "id".to_string(),
                rows: Vec::new(),
            })
            .rows
            .extend(rows);
        self
    }

    /// Registers a procedure callable through [`Repository::rpc`].
    pub fn with_rpc<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut Tables, Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.procedures.insert(name.to_string(), Arc::new(handler));
        self
    }

    /// Snapshot of one table's rows.
    pub async fn rows(&self, table: &str) -> Vec<Row> {
        self.tables.read().await.rows(table).to_vec()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn query(&self, spec: &QuerySpec) -> Result<QueryResult> {
        let tables = self.tables.read().await;
        let table = tables.table(&spec.source)?;

        let mut rows: Vec<&Row> = table
            .rows
            .iter()
            .filter(|row| spec.filters.iter().all(|f| matches_filter(row, f)))
            .collect();
        let count = spec.count.map(|_| rows.len() as u64);

        if !spec.order.is_empty() {
            rows.sort_by(|a, b| compare_rows(a, b, &spec.order));
        }

        if spec.head {
            return Ok(QueryResult {
                rows: Vec::new(),
                count,
            });
        }

        let (from, take) = match spec.range {
            Some((from, to)) if to >= from => (from, to.saturating_sub(from).saturating_add(1)),
            Some(_) => (0, 0),
            None => (0, u64::MAX),
        };
        let take = spec.limit.map_or(take, |limit| take.min(limit));

        let columns = spec.selected_columns();
        let rows = rows
            .into_iter()
            .skip(usize::try_from(from).unwrap_or(usize::MAX))
            .take(usize::try_from(take).unwrap_or(usize::MAX))
            .map(|row| project(row, columns.as_deref()))
            .collect();

        Ok(QueryResult { rows, count })
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>> {
        let mut tables = self.tables.write().await;
        let table = tables.table_mut(table)?;
        let pk = table.primary_key.clone();

        let mut prepared = Vec::with_capacity(rows.len());
        for mut row in rows {
            if !row.contains_key(&pk) {
                row.insert(pk.clone(), Value::String(Uuid::new_v4().to_string()));
            }
            row.entry("created_at")
                .or_insert_with(|| Value::String(timestamp(chrono::Utc::now())));

            let id = &row[&pk];
            let duplicate = table.rows.iter().chain(prepared.iter()).any(|r| r.get(&pk) == Some(id));
            if duplicate {
                // Nothing from this batch is written
                return Err(DataError::Repository(format!(
                    "duplicate key value violates unique constraint on {pk}: {id}"
                )));
            }
            prepared.push(row);
        }

        table.rows.extend(prepared.iter().cloned());
        debug!(inserted = prepared.len(), "memory insert");
        Ok(prepared)
    }

    async fn update(&self, table: &str, id: &RowId, patch: Row) -> Result<()> {
        let mut tables = self.tables.write().await;
        let table = tables.table_mut(table)?;
        for row in table
            .rows
            .iter_mut()
            .filter(|row| row.get(&id.column) == Some(&id.value))
        {
            for (column, value) in &patch {
                row.insert(column.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>> {
        let mut tables = self.tables.write().await;
        let table = tables.table_mut(table)?;
        let pk = table.primary_key.clone();

        let mut removed = Vec::new();
        table.rows.retain(|row| {
            let matched = filters.iter().all(|f| matches_filter(row, f));
            if matched {
                removed.push(row.get(&pk).cloned().unwrap_or(Value::Null));
            }
            !matched
        });
        Ok(removed)
    }

    async fn rpc(&self, name: &str, params: Value) -> Result<Value> {
        let handler = self
            .procedures
            .get(name)
            .cloned()
            .ok_or_else(|| DataError::Repository(format!("function {name} does not exist")))?;
        let mut tables = self.tables.write().await;
        handler(&mut *tables, params)
    }
}

fn missing_relation(name: &str) -> DataError {
    DataError::Repository(format!("relation \"{name}\" does not exist"))
}

// ============================================================================
// Evaluation
// ============================================================================

fn compare_values(a: &Value, b: &Value) -> Option<CmpOrdering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn field<'a>(row: &'a Row, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&Value::Null)
}

fn matches_filter(row: &Row, filter: &Filter) -> bool {
    let test = |column: &str, value: &Value, accept: fn(CmpOrdering) -> bool| {
        compare_values(field(row, column), value).is_some_and(accept)
    };
    match filter {
        Filter::Eq { column, value } => test(column, value, CmpOrdering::is_eq),
        Filter::Neq { column, value } => test(column, value, CmpOrdering::is_ne),
        Filter::Gt { column, value } => test(column, value, CmpOrdering::is_gt),
        Filter::Gte { column, value } => test(column, value, CmpOrdering::is_ge),
        Filter::Lt { column, value } => test(column, value, CmpOrdering::is_lt),
        Filter::Lte { column, value } => test(column, value, CmpOrdering::is_le),
        Filter::In { column, values } => values
            .iter()
            .any(|value| test(column, value, CmpOrdering::is_eq)),
        Filter::ILike { column, pattern } => match field(row, column) {
            Value::String(text) => like_match(&text.to_lowercase(), &pattern.to_lowercase()),
            _ => false,
        },
        Filter::Or { any } => any.iter().any(|inner| matches_filter(row, inner)),
    }
}

/// SQL `LIKE` with `%` wildcards only.
fn like_match(text: &str, pattern: &str) -> bool {
    let segments: Vec<&str> = pattern.split('%').collect();
    if segments.len() == 1 {
        return text == pattern;
    }

    let first = segments[0];
    let last = segments[segments.len() - 1];
    let middle = &segments[1..segments.len() - 1];
    let Some(mut remaining) = text.strip_prefix(first) else {
        return false;
    };
    for segment in middle {
        match remaining.find(segment) {
            Some(pos) => remaining = &remaining[pos + segment.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last)
}

fn compare_rows(a: &Row, b: &Row, order: &[Ordering]) -> CmpOrdering {
    for key in order {
        let (x, y) = (field(a, &key.column), field(b, &key.column));
        let ordering = match (x.is_null(), y.is_null()) {
            (true, true) => CmpOrdering::Equal,
            (true, false) if key.nulls_last => CmpOrdering::Greater,
            (true, false) => CmpOrdering::Less,
            (false, true) if key.nulls_last => CmpOrdering::Less,
            (false, true) => CmpOrdering::Greater,
            (false, false) => {
                let natural = compare_values(x, y).unwrap_or(CmpOrdering::Equal);
                if key.ascending {
                    natural
                } else {
                    natural.reverse()
                }
            }
        };
        if ordering != CmpOrdering::Equal {
            return ordering;
        }
    }
    CmpOrdering::Equal
}

fn project(row: &Row, columns: Option<&[&str]>) -> Row {
    match columns {
        Some(columns) => row
            .iter()
            .filter(|(key, _)| columns.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        None => row.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => Row::new(),
        }
    }

    fn events_repo() -> MemoryRepository {
        MemoryRepository::new().with_table("events", "event_id").with_rows(
            "events",
            vec![
                row(json!({"event_id": "e1", "title": "Installation", "event_start": "2026-11-01T10:00:00Z", "price": 50})),
                row(json!({"event_id": "e2", "title": "Grand Ball", "event_start": null, "price": 120})),
                row(json!({"event_id": "e3", "title": "Lodge Ball", "event_start": "2026-10-25T18:00:00Z", "price": 80})),
            ],
        )
    }

    fn ids(result: &QueryResult) -> Vec<&str> {
        result
            .rows
            .iter()
            .filter_map(|r| r.get("event_id").and_then(Value::as_str))
            .collect()
    }

    #[tokio::test]
    async fn test_filters_and_projection() {
        let repo = events_repo();
        let spec = QuerySpec::new("events")
            .select("event_id")
            .filter(Filter::gte("price", 80));

        let result = repo.query(&spec).await.unwrap();
        assert_eq!(ids(&result), vec!["e2", "e3"]);
        assert!(result.rows.iter().all(|r| r.len() == 1));
    }

    #[tokio::test]
    async fn test_ordering_nulls_last_both_directions() {
        let repo = events_repo();
        for ascending in [true, false] {
            let spec = QuerySpec::new("events").order_by("event_start", ascending, true);
            let result = repo.query(&spec).await.unwrap();
            assert_eq!(ids(&result).last(), Some(&"e2"));
        }
    }

    #[tokio::test]
    async fn test_ilike_or_chain() {
        let repo = events_repo();
        let spec = QuerySpec::new("events").filter(Filter::or(vec![
            Filter::ilike("title", "%BALL%"),
            Filter::ilike("event_id", "%zzz%"),
        ]));
        let result = repo.query(&spec).await.unwrap();
        assert_eq!(ids(&result), vec!["e2", "e3"]);
    }

    #[tokio::test]
    async fn test_range_and_count() {
        let repo = events_repo();
        let spec = QuerySpec::new("events")
            .order_by("price", true, true)
            .range(1, 1)
            .count(crate::query::CountMode::Exact, false);
        let result = repo.query(&spec).await.unwrap();
        assert_eq!(ids(&result), vec!["e3"]);
        assert_eq!(result.count, Some(3));

        let head = QuerySpec::new("events").count(crate::query::CountMode::Exact, true);
        let result = repo.query(&head).await.unwrap();
        assert!(result.rows.is_empty());
        assert_eq!(result.count, Some(3));
    }

    #[tokio::test]
    async fn test_open_ended_range() {
        let repo = events_repo();
        let spec = QuerySpec::new("events").range(1, u64::MAX);
        assert_eq!(repo.query(&spec).await.unwrap().rows.len(), 2);
    }

    #[tokio::test]
    async fn test_insert_generates_keys_and_rejects_duplicates() {
        let repo = events_repo();

        let inserted = repo
            .insert("events", vec![row(json!({"title": "Festive Board"}))])
            .await
            .unwrap();
        assert!(inserted[0].get("event_id").is_some());
        assert!(inserted[0].get("created_at").is_some());

        let err = repo
            .insert(
                "events",
                vec![row(json!({"event_id": "new"})), row(json!({"event_id": "e1"}))],
            )
            .await;
        assert!(err.is_err());
        assert_eq!(repo.rows("events").await.len(), 4, "batch rejected as a whole");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = events_repo();
        repo.update("events", &RowId::new("event_id", "e1"), row(json!({"price": 55})))
            .await
            .unwrap();
        let removed = repo
            .delete("events", &[Filter::lt("price", 60)])
            .await
            .unwrap();
        assert_eq!(removed, vec![json!("e1")]);
    }

    #[tokio::test]
    async fn test_unknown_relation_and_rpc() {
        let repo = MemoryRepository::new().with_rpc("ping", |_, params| Ok(params));

        assert!(repo.query(&QuerySpec::new("missing")).await.is_err());
        assert_eq!(repo.rpc("ping", json!(1)).await.unwrap(), json!(1));
        assert!(repo.rpc("pong", json!(1)).await.is_err());
    }

    #[test]
    fn test_like_match() {
        assert!(like_match("grand ball", "%ball%"));
        assert!(like_match("grand ball", "grand%"));
        assert!(like_match("grand ball", "%ball"));
        assert!(like_match("grand ball", "g%d%l"));
        assert!(!like_match("grand ball", "%dinner%"));
        assert!(like_match("exact", "exact"));
    }
}
