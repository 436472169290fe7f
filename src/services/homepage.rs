use std::sync::Arc;

use crate::cache::{CacheKey, CacheManager, TtlPolicy};
use crate::error::Result;
use crate::models::HomepageData;
use crate::services::events::{EventListQuery, EventService};
use crate::services::static_data::StaticDataService;

const FEATURED_LIMIT: u64 = 3;
const UPCOMING_LIMIT: u64 = 6;

/// Landing page aggregate, cached as one entry under the listing policy.
#[derive(Clone)]
pub struct HomepageService {
    cache: Arc<CacheManager>,
    events: EventService,
    static_data: StaticDataService,
}

impl HomepageService {
    pub fn new(cache: Arc<CacheManager>, events: EventService, static_data: StaticDataService) -> Self {
        Self {
            cache,
            events,
            static_data,
        }
    }

    pub async fn get_homepage(&self) -> Result<HomepageData> {
        self.cache
            .get_or_fetch(
                CacheKey::homepage(),
                || async {
                    let (featured_events, upcoming_events, grand_lodges) = futures::try_join!(
                        self.events.get_featured_events(FEATURED_LIMIT),
                        self.events.list_events(EventListQuery {
                            limit: Some(UPCOMING_LIMIT),
                            ..EventListQuery::default()
                        }),
                        self.static_data.grand_lodges(),
                    )?;
                    Ok(HomepageData {
                        featured_events,
                        upcoming_events,
                        grand_lodge_count: grand_lodges.len(),
                    })
                },
                TtlPolicy::EventList,
            )
            .await
    }
}
