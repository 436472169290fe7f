//! Query specification.
//!
//! An immutable description of a read against a table or view. Nothing here
//! talks to a database; a [`Repository`](crate::repository::Repository)
//! turns a spec into an actual request.

use serde::Serialize;
use serde_json::Value;

/// A single row predicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
    Eq { column: String, value: Value },
    Neq { column: String, value: Value },
    Gt { column: String, value: Value },
    Gte { column: String, value: Value },
    Lt { column: String, value: Value },
    Lte { column: String, value: Value },
    In { column: String, values: Vec<Value> },
    /// Case-insensitive match with `%` wildcards.
    ILike { column: String, pattern: String },
    /// Matches when any inner predicate matches.
    Or { any: Vec<Filter> },
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn neq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Neq {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gt {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gte {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lt {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lte {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn is_in(column: impl Into<String>, values: Vec<Value>) -> Self {
        Filter::In {
            column: column.into(),
            values,
        }
    }

    pub fn ilike(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Filter::ILike {
            column: column.into(),
            pattern: pattern.into(),
        }
    }

    pub fn or(any: Vec<Filter>) -> Self {
        Filter::Or { any }
    }
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ordering {
    pub column: String,
    pub ascending: bool,
    /// Rows with a null sort value go after all others, in either direction.
    pub nulls_last: bool,
}

/// How a count should be computed alongside (or instead of) rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CountMode {
    Exact,
    Planned,
    Estimated,
}

/// Immutable description of one read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySpec {
    /// Table or view name
    pub source: String,
    /// Projection, `None` selects every column
    pub select: Option<String>,
    pub filters: Vec<Filter>,
    pub order: Vec<Ordering>,
    /// Inclusive zero-based row range
    pub range: Option<(u64, u64)>,
    pub limit: Option<u64>,
    pub count: Option<CountMode>,
    /// Return the count only, no rows
    pub head: bool,
}

impl QuerySpec {
    /// Starts a query against `source` selecting every column.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            select: None,
            filters: Vec::new(),
            order: Vec::new(),
            range: None,
            limit: None,
            count: None,
            head: false,
        }
    }

    pub fn select(mut self, projection: impl Into<String>) -> Self {
        self.select = Some(projection.into());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, ascending: bool, nulls_last: bool) -> Self {
        self.order.push(Ordering {
            column: column.into(),
            ascending,
            nulls_last,
        });
        self
    }

    pub fn range(mut self, from: u64, to: u64) -> Self {
        self.range = Some((from, to));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn count(mut self, mode: CountMode, head: bool) -> Self {
        self.count = Some(mode);
        self.head = head;
        self
    }

    /// Columns named by the projection, ignoring embedded relations.
    /// `None` when every column is selected.
    pub fn selected_columns(&self) -> Option<Vec<&str>> {
        let parts = split_projection(self.select.as_deref()?);
        if parts.contains(&"*") {
            return None;
        }
        Some(parts.into_iter().filter(|part| !part.contains('(')).collect())
    }
}

/// Splits a projection on top-level commas, keeping `rel(a, b)` parts whole.
pub fn split_projection(select: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in select.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(select[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(select[start..].trim());
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}
