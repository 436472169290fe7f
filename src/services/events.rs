//! Event reads and writes.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::cache::keys::patterns;
use crate::cache::{CacheKey, CacheManager, TtlPolicy};
use crate::error::{DataError, Result};
use crate::models::records::from_rows;
use crate::models::Event;
use crate::query::builder::EVENT_DISPLAY_VIEW;
use crate::query::optimizer::{select_columns, EVENT_LIST_COLUMNS};
use crate::query::{build_event_listing_query, EventListingParams, Filter, QuerySpec};
use crate::repository::{Repository, Row, RowId};

const EVENTS_TABLE: &str = "events";

/// Listing variants served from cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventListQuery {
    pub featured: Option<bool>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Clone)]
pub struct EventService {
    cache: Arc<CacheManager>,
    repo: Arc<dyn Repository>,
}

impl EventService {
    pub fn new(cache: Arc<CacheManager>, repo: Arc<dyn Repository>) -> Self {
        Self { cache, repo }
    }

    pub async fn get_event(&self, event_id: &str) -> Result<Event> {
        let key = CacheKey::event(event_id);
        self.cache
            .get_or_fetch(
                &key,
                || self.fetch_one(Filter::eq("event_id", event_id), &key),
                TtlPolicy::EventDetail,
            )
            .await
    }

    pub async fn get_event_by_slug(&self, slug: &str) -> Result<Event> {
        let key = CacheKey::event_slug(slug);
        self.cache
            .get_or_fetch(
                &key,
                || self.fetch_one(Filter::eq("slug", slug), &key),
                TtlPolicy::EventDetail,
            )
            .await
    }

    /// Active published events, soonest first.
    pub async fn list_events(&self, query: EventListQuery) -> Result<Vec<Event>> {
        let key = CacheKey::event_list(query.featured, query.limit, query.offset);
        self.cache
            .get_or_fetch(
                &key,
                || async {
                    let params = EventListingParams {
                        featured: query.featured,
                        limit: query.limit,
                        offset: query.offset,
                        ..EventListingParams::new(Utc::now())
                    };
                    let spec = select_columns(build_event_listing_query(&params), EVENT_LIST_COLUMNS);
                    from_rows(self.repo.query(&spec).await?.rows)
                },
                TtlPolicy::EventList,
            )
            .await
    }

    pub async fn get_featured_events(&self, limit: u64) -> Result<Vec<Event>> {
        self.list_events(EventListQuery {
            featured: Some(true),
            limit: Some(limit),
            offset: None,
        })
        .await
    }

    /// Applies `patch` to an event and drops every cached view of it.
    pub async fn update_event(&self, event_id: &str, patch: Row) -> Result<()> {
        self.repo
            .update(EVENTS_TABLE, &RowId::new("event_id", event_id), patch)
            .await?;
        self.invalidate_event(event_id);
        Ok(())
    }

    /// Drops the event's detail, every slug lookup (the slug may have
    /// changed), every listing, the homepage and the event's tickets.
    pub fn invalidate_event(&self, event_id: &str) {
        self.cache.clear(CacheKey::event(event_id));
        self.cache.clear(CacheKey::event_tickets(event_id));
        self.cache.clear(CacheKey::homepage());
        let slugs = self.cache.invalidate_pattern(&patterns::event_slugs());
        let lists = self.cache.invalidate_pattern(&patterns::event_lists());
        info!(event_id, slugs, lists, "event cache invalidated");
    }

    async fn fetch_one(&self, filter: Filter, key: &CacheKey) -> Result<Event> {
        let spec = QuerySpec::new(EVENT_DISPLAY_VIEW).filter(filter).limit(1);
        from_rows::<Event>(self.repo.query(&spec).await?.rows)?
            .pop()
            .ok_or_else(|| DataError::NotFound(key.to_string()))
    }
}
