//! Ticket availability, reservations and QR asset generation.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::batch::{run_chunked, BatchOperations, CleanupRequest};
use crate::cache::keys::patterns;
use crate::cache::{CacheKey, CacheManager, TtlPolicy};
use crate::config::Config;
use crate::error::Result;
use crate::models::records::from_rows;
use crate::models::{EventTicket, Ticket};
use crate::query::optimizer::add_indexed_sort;
use crate::query::{Filter, QuerySpec};
use crate::repository::{Repository, Row, RowId};
use crate::services::registrations::invalidate_registration_views;

const EVENT_TICKETS_TABLE: &str = "event_tickets";
const TICKETS_TABLE: &str = "tickets";

/// Default number of QR codes rendered concurrently.
pub const DEFAULT_QR_BATCH_SIZE: usize = 5;

/// Reservations that were never paid for are released after this long.
pub const RESERVATION_HOLD: Duration = Duration::from_secs(15 * 60);

/// Renders ticket assets and returns where they were stored.
#[async_trait]
pub trait AssetGenerator: Send + Sync {
    async fn render_ticket_qr(&self, ticket: &Ticket) -> Result<String>;
}

/// Outcome of rendering one ticket's QR code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QrCodeResult {
    pub ticket_id: String,
    pub url: Option<String>,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct TicketService {
    cache: Arc<CacheManager>,
    repo: Arc<dyn Repository>,
    batch: BatchOperations,
    qr_batch_size: usize,
}

impl TicketService {
    pub fn new(cache: Arc<CacheManager>, repo: Arc<dyn Repository>) -> Self {
        Self {
            batch: BatchOperations::new(repo.clone()),
            cache,
            repo,
            qr_batch_size: DEFAULT_QR_BATCH_SIZE,
        }
    }

    /// Service with the configured QR fan-out.
    pub fn from_config(cache: Arc<CacheManager>, repo: Arc<dyn Repository>, config: &Config) -> Self {
        Self::new(cache, repo).with_qr_batch_size(config.qr_batch_size)
    }

    pub fn with_qr_batch_size(mut self, size: usize) -> Self {
        self.qr_batch_size = size.max(1);
        self
    }

    /// Ticket types of an event, cheapest first.
    pub async fn get_event_tickets(&self, event_id: &str) -> Result<Vec<EventTicket>> {
        self.cache
            .get_or_fetch(
                CacheKey::event_tickets(event_id),
                || async {
                    let spec = add_indexed_sort(
                        QuerySpec::new(EVENT_TICKETS_TABLE).filter(Filter::eq("event_id", event_id)),
                        "price",
                        true,
                    );
                    from_rows(self.repo.query(&spec).await?.rows)
                },
                TtlPolicy::EventDetail,
            )
            .await
    }

    /// Reserves `quantity` tickets of one type through the `reserve_tickets`
    /// procedure, which checks availability server-side.
    ///
    /// Tickets reserved for a registration also stale that registration's
    /// summary and composite views.
    pub async fn reserve_tickets(
        &self,
        event_id: &str,
        event_ticket_id: &str,
        quantity: u32,
        registration_id: Option<&str>,
    ) -> Result<Vec<Ticket>> {
        let result = self
            .repo
            .rpc(
                "reserve_tickets",
                json!({
                    "event_id": event_id,
                    "event_ticket_id": event_ticket_id,
                    "quantity": quantity,
                    "registration_id": registration_id,
                }),
            )
            .await?;
        let tickets: Vec<Ticket> = serde_json::from_value(result)?;

        self.cache.clear(CacheKey::event_tickets(event_id));
        self.cache.clear(CacheKey::event(event_id));
        if let Some(registration_id) = registration_id {
            invalidate_registration_views(&self.cache, registration_id);
        }
        info!(event_id, event_ticket_id, reserved = tickets.len(), "tickets reserved");
        Ok(tickets)
    }

    /// Releases reservations older than [`RESERVATION_HOLD`]. Best effort:
    /// returns how many were released, 0 on failure.
    pub async fn cleanup_expired_reservations(&self) -> usize {
        let removed = self
            .batch
            .batch_cleanup(&CleanupRequest {
                table: TICKETS_TABLE.into(),
                status_column: "status".into(),
                statuses: vec!["reserved".into()],
                timestamp_column: "created_at".into(),
                older_than: RESERVATION_HOLD,
            })
            .await;
        // Released rows may belong to any registration
        if removed > 0 {
            self.cache.invalidate_pattern(&patterns::event_tickets());
            self.cache.invalidate_pattern(&patterns::registration_summaries());
            self.cache.invalidate_pattern(&patterns::registration_completes());
        }
        removed
    }

    /// Renders a QR code for every ticket, at most `qr_batch_size` at a time,
    /// then stores the URLs of the successful renders.
    ///
    /// A failed render is reported in its result and does not stop the
    /// others. A failure persisting the URLs is returned as an error.
    pub async fn generate_qr_codes(
        &self,
        tickets: Vec<Ticket>,
        generator: &dyn AssetGenerator,
    ) -> Result<Vec<QrCodeResult>> {
        let registration_ids: BTreeSet<String> = tickets
            .iter()
            .filter_map(|t| t.registration_id.clone())
            .collect();

        let results = run_chunked(tickets, self.qr_batch_size, |ticket| async move {
            match generator.render_ticket_qr(&ticket).await {
                Ok(url) => QrCodeResult {
                    ticket_id: ticket.ticket_id,
                    url: Some(url),
                    error: None,
                },
                Err(err) => {
                    warn!(ticket_id = %ticket.ticket_id, error = %err, "qr render failed");
                    QrCodeResult {
                        ticket_id: ticket.ticket_id,
                        url: None,
                        error: Some(err.to_string()),
                    }
                }
            }
        })
        .await;

        let updates = results
            .iter()
            .filter_map(|result| {
                let url = result.url.as_ref()?;
                let mut patch = Row::new();
                patch.insert("qr_code_url".into(), json!(url));
                Some((RowId::new("ticket_id", result.ticket_id.as_str()), patch))
            })
            .collect::<Vec<_>>();
        let persisted = if updates.is_empty() {
            Ok(Vec::new())
        } else {
            self.batch.batch_update_by_ids(TICKETS_TABLE, updates).await
        };

        for registration_id in &registration_ids {
            invalidate_registration_views(&self.cache, registration_id);
        }
        persisted?;
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;

    #[test]
    fn test_from_config_uses_qr_batch_size() {
        let config = Config {
            qr_batch_size: 8,
            ..Config::default()
        };
        let service = TicketService::from_config(
            Arc::new(CacheManager::new()),
            Arc::new(MemoryRepository::new()),
            &config,
        );
        assert_eq!(service.qr_batch_size, 8);
    }

    #[test]
    fn test_qr_batch_size_never_zero() {
        let service = TicketService::new(
            Arc::new(CacheManager::new()),
            Arc::new(MemoryRepository::new()),
        )
        .with_qr_batch_size(0);
        assert_eq!(service.qr_batch_size, 1);
    }
}
