//! Bulk reads and writes against the repository.
//!
//! Consistency is deliberately mixed: writes surface errors, reads and
//! cleanup degrade to an empty result and log.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{DataError, Result};
use crate::query::optimizer::{select_columns, timestamp};
use crate::query::{Filter, QuerySpec};
use crate::repository::{Repository, Row, RowId};

/// Result of one item of a parallel update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateOutcome {
    pub id: RowId,
    /// `None` on success, otherwise the failure message
    pub error: Option<String>,
}

impl UpdateOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Every outcome of a parallel update in which at least one item failed.
///
/// Successful items were applied and are not rolled back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchUpdateFailure {
    pub table: String,
    pub outcomes: Vec<UpdateOutcome>,
}

impl BatchUpdateFailure {
    pub fn failed(&self) -> impl Iterator<Item = &UpdateOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }
}

impl fmt::Display for BatchUpdateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch update on {} failed for {} of {} items",
            self.table,
            self.failed_count(),
            self.outcomes.len()
        )
    }
}

/// Rows to purge: matching `statuses` and older than `older_than`.
#[derive(Debug, Clone)]
pub struct CleanupRequest {
    pub table: String,
    pub status_column: String,
    pub statuses: Vec<String>,
    pub timestamp_column: String,
    pub older_than: Duration,
}

/// Bulk operations over a shared repository.
#[derive(Clone)]
pub struct BatchOperations {
    repo: Arc<dyn Repository>,
}

impl BatchOperations {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// Inserts all rows in a single round trip.
    ///
    /// Atomicity is whatever the repository gives a multi-row insert; any
    /// error is returned.
    pub async fn batch_insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let count = rows.len();
        let inserted = self.repo.insert(table, rows).await?;
        info!(table, count, "batch insert complete");
        Ok(inserted)
    }

    /// Issues one update per item concurrently and waits for all of them.
    ///
    /// Returns every outcome when all succeed. If any item fails, returns
    /// [`DataError::BatchUpdate`] carrying every outcome; items that did
    /// succeed stay applied.
    pub async fn batch_update_by_ids(
        &self,
        table: &str,
        updates: Vec<(RowId, Row)>,
    ) -> Result<Vec<UpdateOutcome>> {
        let requests = updates.into_iter().map(|(id, patch)| async move {
            let result = self.repo.update(table, &id, patch).await;
            UpdateOutcome {
                id,
                error: result.err().map(|err| err.to_string()),
            }
        });
        let outcomes = join_all(requests).await;

        let failure = BatchUpdateFailure {
            table: table.to_string(),
            outcomes,
        };
        if failure.failed_count() > 0 {
            warn!(
                table,
                failed = failure.failed_count(),
                total = failure.outcomes.len(),
                "batch update partially failed"
            );
            return Err(DataError::BatchUpdate(failure));
        }
        Ok(failure.outcomes)
    }

    /// Fetches rows whose `id_column` is in `ids` in one round trip.
    pub async fn try_fetch_by_ids(
        &self,
        source: &str,
        id_column: &str,
        ids: &[Value],
        columns: Option<&[&str]>,
    ) -> Result<Vec<Row>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut spec = QuerySpec::new(source).filter(Filter::is_in(id_column, ids.to_vec()));
        if let Some(columns) = columns {
            spec = select_columns(spec, columns);
        }
        Ok(self.repo.query(&spec).await?.rows)
    }

    /// Like [`try_fetch_by_ids`](Self::try_fetch_by_ids), but a failed fetch
    /// is logged and yields no rows.
    pub async fn batch_fetch_by_ids(
        &self,
        source: &str,
        id_column: &str,
        ids: &[Value],
        columns: Option<&[&str]>,
    ) -> Vec<Row> {
        match self.try_fetch_by_ids(source, id_column, ids, columns).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(source, error = %err, "batch fetch failed, returning no rows");
                Vec::new()
            }
        }
    }

    /// Deletes stale rows. Best effort: failures are logged and count as 0.
    pub async fn batch_cleanup(&self, request: &CleanupRequest) -> usize {
        let older_than = chrono::Duration::from_std(request.older_than)
            .unwrap_or_else(|_| chrono::Duration::zero());
        let cutoff = timestamp(Utc::now() - older_than);
        let statuses = request
            .statuses
            .iter()
            .map(|s| Value::String(s.clone()))
            .collect();
        let filters = [
            Filter::is_in(request.status_column.as_str(), statuses),
            Filter::lt(request.timestamp_column.as_str(), cutoff),
        ];

        match self.repo.delete(&request.table, &filters).await {
            Ok(removed) => {
                info!(table = %request.table, removed = removed.len(), "batch cleanup complete");
                removed.len()
            }
            Err(err) => {
                warn!(table = %request.table, error = %err, "batch cleanup failed");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => Row::new(),
        }
    }

    fn tickets_repo() -> Arc<MemoryRepository> {
        Arc::new(
            MemoryRepository::new()
                .with_table("tickets", "ticket_id")
                .with_rows(
                    "tickets",
                    vec![
                        row(json!({"ticket_id": "t1", "status": "reserved", "created_at": "2020-01-01T00:00:00Z"})),
                        row(json!({"ticket_id": "t2", "status": "sold", "created_at": "2020-01-01T00:00:00Z"})),
                        row(json!({"ticket_id": "t3", "status": "reserved", "created_at": "2999-01-01T00:00:00Z"})),
                    ],
                ),
        )
    }

    #[tokio::test]
    async fn test_batch_insert_empty_is_noop() {
        let batch = BatchOperations::new(tickets_repo());
        assert!(batch.batch_insert("missing_table", vec![]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_insert_propagates_errors() {
        let batch = BatchOperations::new(tickets_repo());
        let result = batch.batch_insert("missing_table", vec![Row::new()]).await;
        assert!(matches!(result, Err(DataError::Repository(_))));
    }

    #[tokio::test]
    async fn test_batch_update_all_succeed() {
        let repo = tickets_repo();
        let batch = BatchOperations::new(repo.clone());

        let outcomes = batch
            .batch_update_by_ids(
                "tickets",
                vec![
                    (RowId::new("ticket_id", "t1"), row(json!({"status": "sold"}))),
                    (RowId::new("ticket_id", "t3"), row(json!({"status": "sold"}))),
                ],
            )
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(repo
            .rows("tickets")
            .await
            .iter()
            .all(|r| r["status"] == json!("sold")));
    }

    #[tokio::test]
    async fn test_fetch_by_ids_degrades_to_empty() {
        let batch = BatchOperations::new(tickets_repo());

        let rows = batch
            .batch_fetch_by_ids("tickets", "ticket_id", &[json!("t1"), json!("t2")], Some(&["ticket_id"]))
            .await;
        assert_eq!(rows.len(), 2);

        let rows = batch
            .batch_fetch_by_ids("no_such_view", "id", &[json!("t1")], None)
            .await;
        assert!(rows.is_empty());
        assert!(batch
            .try_fetch_by_ids("no_such_view", "id", &[json!("t1")], None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_batch_cleanup_counts_removed() {
        let repo = tickets_repo();
        let batch = BatchOperations::new(repo.clone());

        let removed = batch
            .batch_cleanup(&CleanupRequest {
                table: "tickets".into(),
                status_column: "status".into(),
                statuses: vec!["reserved".into()],
                timestamp_column: "created_at".into(),
                older_than: Duration::from_secs(15 * 60),
            })
            .await;

        assert_eq!(removed, 1);
        assert_eq!(repo.rows("tickets").await.len(), 2);
    }

    #[tokio::test]
    async fn test_batch_cleanup_failure_is_zero() {
        let batch = BatchOperations::new(tickets_repo());
        let removed = batch
            .batch_cleanup(&CleanupRequest {
                table: "missing".into(),
                status_column: "status".into(),
                statuses: vec!["reserved".into()],
                timestamp_column: "created_at".into(),
                older_than: Duration::from_secs(60),
            })
            .await;
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_failure_display() {
        let failure = BatchUpdateFailure {
            table: "tickets".into(),
            outcomes: vec![
                UpdateOutcome {
                    id: RowId::new("ticket_id", "t1"),
                    error: None,
                },
                UpdateOutcome {
                    id: RowId::new("ticket_id", "t2"),
                    error: Some("timeout".into()),
                },
            ],
        };
        assert_eq!(
            failure.to_string(),
            "batch update on tickets failed for 1 of 2 items"
        );
    }
}
