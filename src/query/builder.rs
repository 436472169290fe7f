//! Canned query shapes built from the optimizer helpers.

use chrono::{DateTime, Utc};

use crate::query::optimizer::{
    add_indexed_sort, filter_active_events, optimize_search_query, paginate, timestamp,
    use_optimized_view,
};
use crate::query::spec::{Filter, QuerySpec};

/// Denormalized event view with venue and pricing already joined.
pub const EVENT_DISPLAY_VIEW: &str = "event_display_view";
/// Denormalized registration view with customer and event already joined.
pub const REGISTRATION_DETAIL_VIEW: &str = "registration_detail_view";

/// Columns searched by the registration search box.
pub const REGISTRATION_SEARCH_COLUMNS: &[&str] = &[
    "confirmation_number",
    "customer_name",
    "customer_email",
    "event_title",
];

/// Inputs for [`build_event_listing_query`].
#[derive(Debug, Clone)]
pub struct EventListingParams {
    /// Restrict to featured (`true`) or non-featured (`false`) events
    pub featured: Option<bool>,
    /// Override the default `event_start` ascending order: `(column, ascending)`
    pub order_by: Option<(String, bool)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Reference time for "not yet finished"
    pub now: DateTime<Utc>,
}

impl EventListingParams {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            featured: None,
            order_by: None,
            limit: None,
            offset: None,
            now,
        }
    }
}

/// Active, published events from the display view, soonest first by default.
pub fn build_event_listing_query(params: &EventListingParams) -> QuerySpec {
    let mut spec = filter_active_events(use_optimized_view(EVENT_DISPLAY_VIEW, None), false, params.now);

    if let Some(featured) = params.featured {
        spec = spec.filter(Filter::eq("featured", featured));
    }

    spec = match &params.order_by {
        Some((column, ascending)) => add_indexed_sort(spec, column, *ascending),
        None => add_indexed_sort(spec, "event_start", true),
    };

    match (params.limit, params.offset) {
        (Some(limit), offset) if limit > 0 => {
            let from = offset.unwrap_or(0);
            spec.range(from, from.saturating_add(limit - 1))
        }
        (_, Some(offset)) => spec.range(offset, u64::MAX),
        _ => spec,
    }
}

/// Inputs for [`build_registration_search_query`].
#[derive(Debug, Clone, Default)]
pub struct RegistrationSearchParams {
    pub search_term: Option<String>,
    pub status: Option<String>,
    pub event_id: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    /// 1-based page, paired with `page_size`
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// Registration search over the detail view, newest first.
pub fn build_registration_search_query(params: &RegistrationSearchParams) -> QuerySpec {
    let mut spec = use_optimized_view(REGISTRATION_DETAIL_VIEW, None);

    if let Some(term) = &params.search_term {
        spec = optimize_search_query(spec, REGISTRATION_SEARCH_COLUMNS, term);
    }
    if let Some(status) = &params.status {
        spec = spec.filter(Filter::eq("status", status.as_str()));
    }
    if let Some(event_id) = &params.event_id {
        spec = spec.filter(Filter::eq("event_id", event_id.as_str()));
    }
    if let Some(after) = params.created_after {
        spec = spec.filter(Filter::gte("created_at", timestamp(after)));
    }
    if let Some(before) = params.created_before {
        spec = spec.filter(Filter::lte("created_at", timestamp(before)));
    }

    spec = add_indexed_sort(spec, "created_at", false);

    match (params.page, params.page_size) {
        (Some(page), Some(size)) => paginate(spec, page, size),
        _ => spec,
    }
}
