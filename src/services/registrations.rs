//! Registration reads and writes.
//!
//! Registration data lives under three key families (detail, summary and
//! the composite "complete" view); every write drops all three.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::batch::{execute_sequence, BatchOperations, SequenceStep, UpdateOutcome};
use crate::cache::keys::patterns;
use crate::cache::{CacheKey, CacheManager, TtlPolicy};
use crate::error::{DataError, Result};
use crate::models::records::{from_row, from_rows};
use crate::models::{
    Attendee, CompleteRegistration, Registration, RegistrationPage, RegistrationSummary, Ticket,
};
use crate::query::optimizer::{
    create_count_query, optimize_registration_query, RegistrationQueryOptions,
};
use crate::query::{
    build_registration_search_query, CountMode, Filter, QuerySpec, RegistrationSearchParams,
};
use crate::repository::{Repository, Row, RowId};

const REGISTRATIONS_TABLE: &str = "registrations";
const ATTENDEES_TABLE: &str = "attendees";
const TICKETS_TABLE: &str = "tickets";

/// Lifetime of cached search pages; searches are too varied for a named policy.
const SEARCH_TTL: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct RegistrationService {
    cache: Arc<CacheManager>,
    repo: Arc<dyn Repository>,
    batch: BatchOperations,
}

impl RegistrationService {
    pub fn new(cache: Arc<CacheManager>, repo: Arc<dyn Repository>) -> Self {
        Self {
            batch: BatchOperations::new(repo.clone()),
            cache,
            repo,
        }
    }

    pub async fn get_registration(&self, registration_id: &str) -> Result<Registration> {
        self.cache
            .get_or_fetch(
                CacheKey::registration(registration_id),
                || self.fetch_registration(registration_id),
                TtlPolicy::EventDetail,
            )
            .await
    }

    pub async fn get_registration_summary(
        &self,
        registration_id: &str,
    ) -> Result<RegistrationSummary> {
        self.cache
            .get_or_fetch(
                CacheKey::registration_summary(registration_id),
                || async {
                    let (registration, attendee_count, ticket_count) = futures::try_join!(
                        self.fetch_registration(registration_id),
                        self.count(ATTENDEES_TABLE, registration_id),
                        self.count(TICKETS_TABLE, registration_id),
                    )?;
                    Ok(RegistrationSummary {
                        registration_id: registration.registration_id,
                        confirmation_number: registration.confirmation_number,
                        status: registration.status,
                        payment_status: registration.payment_status,
                        total_amount_paid: registration.total_amount_paid,
                        attendee_count,
                        ticket_count,
                    })
                },
                TtlPolicy::EventDetail,
            )
            .await
    }

    /// Registration with its attendees and tickets, fetched concurrently.
    pub async fn get_complete_registration(
        &self,
        registration_id: &str,
    ) -> Result<CompleteRegistration> {
        self.cache
            .get_or_fetch(
                CacheKey::registration_complete(registration_id),
                || async {
                    let by_registration = Filter::eq("registration_id", registration_id);
                    let attendees = QuerySpec::new(ATTENDEES_TABLE).filter(by_registration.clone());
                    let tickets = QuerySpec::new(TICKETS_TABLE).filter(by_registration);
                    let (registration, attendees, tickets) = futures::try_join!(
                        self.fetch_registration(registration_id),
                        self.repo.query(&attendees),
                        self.repo.query(&tickets),
                    )?;
                    Ok(CompleteRegistration {
                        registration,
                        attendees: from_rows::<Attendee>(attendees.rows)?,
                        tickets: from_rows::<Ticket>(tickets.rows)?,
                    })
                },
                TtlPolicy::EventDetail,
            )
            .await
    }

    /// Searches registrations. Pages are cached briefly under an explicit TTL.
    pub async fn search_registrations(
        &self,
        params: &RegistrationSearchParams,
    ) -> Result<RegistrationPage> {
        let key = CacheKey::registration_search(&[
            params.search_term.as_ref().map(|t| t.trim().to_lowercase()),
            params.status.clone(),
            params.event_id.clone(),
            params.created_after.map(|t| t.to_rfc3339()),
            params.created_before.map(|t| t.to_rfc3339()),
            params.page.map(|p| p.to_string()),
            params.page_size.map(|s| s.to_string()),
        ]);
        if let Some(page) = self.cache.get::<RegistrationPage>(&key) {
            return Ok(page);
        }

        let spec = build_registration_search_query(params)
            .count(CountMode::Exact, false);
        let result = self.repo.query(&spec).await?;
        let page = RegistrationPage {
            registrations: from_rows(result.rows)?,
            total: result.count,
        };
        self.cache.set_with_ttl(&key, &page, SEARCH_TTL);
        Ok(page)
    }

    /// Creates a registration and its attendees as a best-effort sequence:
    /// registration first, then attendees. If the attendee insert fails the
    /// registration row remains.
    pub async fn create_registration(
        &self,
        mut registration: Row,
        mut attendees: Vec<Row>,
    ) -> Result<Registration> {
        let registration_id = registration
            .get("registration_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        registration.insert("registration_id".into(), json!(registration_id));
        for attendee in &mut attendees {
            attendee.insert("registration_id".into(), json!(registration_id));
        }

        let batch = &self.batch;
        let insert_registration: SequenceStep<'_, Vec<Row>, DataError> =
            Box::new(move || batch.batch_insert(REGISTRATIONS_TABLE, vec![registration]).boxed());
        let insert_attendees: SequenceStep<'_, Vec<Row>, DataError> =
            Box::new(move || batch.batch_insert(ATTENDEES_TABLE, attendees).boxed());
        let mut inserted = execute_sequence(vec![insert_registration, insert_attendees]).await?;

        let row = inserted
            .first_mut()
            .and_then(|rows| rows.pop())
            .ok_or_else(|| DataError::Internal("registration insert returned no row".into()))?;
        let created: Registration = from_row(row)?;

        if let Some(event_id) = &created.event_id {
            self.cache.clear(CacheKey::event_tickets(event_id));
        }
        self.cache.invalidate_pattern(&patterns::registration_searches());
        info!(registration_id = %created.registration_id, "registration created");
        Ok(created)
    }

    /// Sets `status` on every registration in parallel.
    ///
    /// Caches are dropped for every id whether or not its update succeeded,
    /// since a partial failure still leaves some rows changed.
    pub async fn update_statuses(
        &self,
        registration_ids: &[String],
        status: &str,
    ) -> Result<Vec<UpdateOutcome>> {
        let updates = registration_ids
            .iter()
            .map(|id| {
                let mut patch = Row::new();
                patch.insert("status".into(), json!(status));
                (RowId::new("registration_id", id.as_str()), patch)
            })
            .collect();
        let result = self.batch.batch_update_by_ids(REGISTRATIONS_TABLE, updates).await;

        for id in registration_ids {
            self.invalidate_registration(id);
        }
        self.cache.invalidate_pattern(&patterns::registration_searches());
        result
    }

    /// Completes payment through the `complete_payment` procedure, which
    /// updates the registration and its tickets atomically server-side.
    pub async fn complete_payment(
        &self,
        registration_id: &str,
        payment_intent_id: &str,
        amount_paid: f64,
    ) -> Result<Registration> {
        let result = self
            .repo
            .rpc(
                "complete_payment",
                json!({
                    "registration_id": registration_id,
                    "payment_intent_id": payment_intent_id,
                    "total_amount_paid": amount_paid,
                }),
            )
            .await?;
        let registration: Registration = serde_json::from_value(result)?;

        self.invalidate_registration(registration_id);
        self.cache.invalidate_pattern(&patterns::registration_searches());
        if let Some(event_id) = &registration.event_id {
            self.cache.clear(CacheKey::event_tickets(event_id));
        }
        info!(registration_id, "payment completed");
        Ok(registration)
    }

    /// Drops the detail, summary and complete views of one registration.
    pub fn invalidate_registration(&self, registration_id: &str) {
        invalidate_registration_views(&self.cache, registration_id);
    }

    async fn fetch_registration(&self, registration_id: &str) -> Result<Registration> {
        let spec = optimize_registration_query(
            QuerySpec::new(REGISTRATIONS_TABLE),
            &RegistrationQueryOptions {
                include_attendees: false,
                include_payment: true,
                limit: Some(1),
            },
        )
        .filter(Filter::eq("registration_id", registration_id));
        from_rows::<Registration>(self.repo.query(&spec).await?.rows)?
            .pop()
            .ok_or_else(|| DataError::NotFound(CacheKey::registration(registration_id).to_string()))
    }

    async fn count(&self, table: &str, registration_id: &str) -> Result<u64> {
        let spec = create_count_query(
            QuerySpec::new(table).filter(Filter::eq("registration_id", registration_id)),
        );
        Ok(self.repo.query(&spec).await?.count.unwrap_or(0))
    }
}

/// Drops the detail, summary and complete views of one registration.
///
/// Shared with every service whose writes touch rows those views aggregate
/// (tickets, attendees).
pub fn invalidate_registration_views(cache: &CacheManager, registration_id: &str) {
    cache.clear(CacheKey::registration(registration_id));
    cache.clear(CacheKey::registration_summary(registration_id));
    cache.clear(CacheKey::registration_complete(registration_id));
}
