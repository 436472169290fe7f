//! Query shaping helpers.
//!
//! Every helper is a pure `QuerySpec -> QuerySpec` transformation that pushes
//! projection, filtering, paging or search down to the data source instead
//! of fetching everything and trimming client-side. Only [`analyze_query`]
//! touches the repository.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::query::spec::{CountMode, Filter, QuerySpec};
use crate::repository::Repository;

/// Columns every event listing needs.
pub const EVENT_LIST_COLUMNS: &[&str] = &[
    "event_id",
    "slug",
    "title",
    "subtitle",
    "event_start",
    "event_end",
    "location",
    "image_url",
    "is_published",
    "featured",
];

/// Columns every registration listing needs.
pub const REGISTRATION_COLUMNS: &[&str] = &[
    "registration_id",
    "confirmation_number",
    "event_id",
    "customer_id",
    "registration_type",
    "status",
    "payment_status",
    "total_amount_paid",
    "created_at",
];

const EVENT_TICKETS_RELATION: &str =
    "tickets:event_tickets(event_ticket_id, name, price, total_capacity, available_count)";
const EVENT_VENUE_RELATION: &str = "venue:locations(place_name, street_address, suburb, state)";
const REGISTRATION_ATTENDEES_RELATION: &str =
    "attendees(attendee_id, first_name, last_name, attendee_type)";
const REGISTRATION_PAYMENT_COLUMNS: &[&str] = &["stripe_payment_intent_id", "payment_completed_at"];

/// Optional extras for event list projections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventListOptions {
    pub include_tickets: bool,
    pub include_venue: bool,
    pub limit: Option<u64>,
}

/// Optional extras for registration projections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationQueryOptions {
    pub include_attendees: bool,
    pub include_payment: bool,
    pub limit: Option<u64>,
}

/// Restricts the result shape to exactly `columns`.
pub fn select_columns(spec: QuerySpec, columns: &[&str]) -> QuerySpec {
    spec.select(columns.join(","))
}

/// Converts a 1-based page into an inclusive zero-based row range.
///
/// `page` and `page_size` below 1 are clamped to 1.
pub fn paginate(spec: QuerySpec, page: u64, page_size: u64) -> QuerySpec {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let from = (page - 1).saturating_mul(page_size);
    spec.range(from, from.saturating_add(page_size - 1))
}

/// Keeps events that have not finished yet and, unless
/// `include_unpublished`, are published.
pub fn filter_active_events(
    spec: QuerySpec,
    include_unpublished: bool,
    now: DateTime<Utc>,
) -> QuerySpec {
    let spec = if include_unpublished {
        spec
    } else {
        spec.filter(Filter::eq("is_published", true))
    };
    spec.filter(Filter::gte("event_end", timestamp(now)))
}

pub fn optimize_event_list_query(spec: QuerySpec, options: &EventListOptions) -> QuerySpec {
    let mut columns = EVENT_LIST_COLUMNS.to_vec();
    if options.include_tickets {
        columns.push(EVENT_TICKETS_RELATION);
    }
    if options.include_venue {
        columns.push(EVENT_VENUE_RELATION);
    }
    let spec = select_columns(spec, &columns);
    match options.limit {
        Some(limit) => spec.limit(limit),
        None => spec,
    }
}

pub fn optimize_registration_query(
    spec: QuerySpec,
    options: &RegistrationQueryOptions,
) -> QuerySpec {
    let mut columns = REGISTRATION_COLUMNS.to_vec();
    if options.include_attendees {
        columns.push(REGISTRATION_ATTENDEES_RELATION);
    }
    if options.include_payment {
        columns.extend_from_slice(REGISTRATION_PAYMENT_COLUMNS);
    }
    let spec = select_columns(spec, &columns);
    match options.limit {
        Some(limit) => spec.limit(limit),
        None => spec,
    }
}

/// Switches to count-only mode: an exact count and no rows.
pub fn create_count_query(spec: QuerySpec) -> QuerySpec {
    spec.select("*").count(CountMode::Exact, true)
}

/// Orders by an indexed column. Nulls always sort last.
pub fn add_indexed_sort(spec: QuerySpec, column: &str, ascending: bool) -> QuerySpec {
    spec.order_by(column, ascending, true)
}

/// Matches rows where any of `columns` contains `term`, case-insensitively.
///
/// Returns `spec` unchanged when `term` is blank or `columns` is empty.
pub fn optimize_search_query(spec: QuerySpec, columns: &[&str], term: &str) -> QuerySpec {
    let term = term.trim();
    if term.is_empty() || columns.is_empty() {
        return spec;
    }
    let pattern = format!("%{term}%");
    let any = columns
        .iter()
        .map(|column| Filter::ilike(*column, pattern.clone()))
        .collect();
    spec.filter(Filter::or(any))
}

/// Reads from a precomputed view instead of a base table.
pub fn use_optimized_view(view: &str, columns: Option<&[&str]>) -> QuerySpec {
    let spec = QuerySpec::new(view);
    match columns {
        Some(columns) if !columns.is_empty() => select_columns(spec, columns),
        _ => spec,
    }
}

/// Summary numbers pulled out of an execution plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryStats {
    pub planning_time_ms: Option<f64>,
    pub execution_time_ms: Option<f64>,
    pub total_cost: Option<f64>,
    pub actual_rows: Option<f64>,
}

/// Outcome of [`analyze_query`]. Both fields are `None` when analysis failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryAnalysis {
    pub plan: Option<Value>,
    pub stats: Option<QueryStats>,
}

/// Asks the repository for an execution plan of `spec`.
///
/// Diagnostic only: failures are logged and produce an empty analysis.
pub async fn analyze_query(repo: &dyn Repository, spec: &QuerySpec) -> QueryAnalysis {
    match repo.explain(spec).await {
        Ok(plan) => {
            let stats = extract_stats(&plan);
            QueryAnalysis {
                plan: Some(plan),
                stats: Some(stats),
            }
        }
        Err(err) => {
            warn!(source = %spec.source, error = %err, "query analysis failed");
            QueryAnalysis::default()
        }
    }
}

/// Reads the headline numbers from a Postgres-style JSON plan.
fn extract_stats(plan: &Value) -> QueryStats {
    // EXPLAIN (FORMAT JSON) wraps the plan in a one-element array
    let root = match plan {
        Value::Array(items) => items.first().unwrap_or(&Value::Null),
        other => other,
    };
    let node = root.get("Plan").unwrap_or(&Value::Null);
    QueryStats {
        planning_time_ms: root.get("Planning Time").and_then(Value::as_f64),
        execution_time_ms: root.get("Execution Time").and_then(Value::as_f64),
        total_cost: node.get("Total Cost").and_then(Value::as_f64),
        actual_rows: node.get("Actual Rows").and_then(Value::as_f64),
    }
}

/// Timestamp format used for every time comparison pushed to the repository.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
