//! Reference data: grand lodges, lodges, organizations, countries, titles
//! and attendee relationships.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::{CacheKey, CacheManager, TtlPolicy};
use crate::error::{DataError, Result};
use crate::models::records::from_rows;
use crate::models::{Country, GrandLodge, Lodge, Organization, ReferenceItem};
use crate::query::optimizer::add_indexed_sort;
use crate::query::{Filter, QuerySpec};
use crate::repository::Repository;

#[derive(Clone)]
pub struct StaticDataService {
    cache: Arc<CacheManager>,
    repo: Arc<dyn Repository>,
}

impl StaticDataService {
    pub fn new(cache: Arc<CacheManager>, repo: Arc<dyn Repository>) -> Self {
        Self { cache, repo }
    }

    pub async fn grand_lodges(&self) -> Result<Vec<GrandLodge>> {
        self.load_list(CacheKey::grand_lodges(), "grand_lodges", "name", TtlPolicy::GrandLodge)
            .await
    }

    pub async fn countries(&self) -> Result<Vec<Country>> {
        self.load_list(CacheKey::countries(), "countries", "name", TtlPolicy::Countries)
            .await
    }

    pub async fn titles(&self) -> Result<Vec<ReferenceItem>> {
        self.load_list(CacheKey::titles(), "titles", "sort_order", TtlPolicy::Titles)
            .await
    }

    pub async fn relationships(&self) -> Result<Vec<ReferenceItem>> {
        self.load_list(
            CacheKey::relationships(),
            "relationships",
            "sort_order",
            TtlPolicy::Relationships,
        )
        .await
    }

    /// Lodges under one grand lodge, by name.
    pub async fn lodges(&self, grand_lodge_id: &str) -> Result<Vec<Lodge>> {
        self.cache
            .get_or_fetch(
                CacheKey::lodges(grand_lodge_id),
                || async {
                    let spec = add_indexed_sort(
                        QuerySpec::new("lodges").filter(Filter::eq("grand_lodge_id", grand_lodge_id)),
                        "name",
                        true,
                    );
                    from_rows(self.repo.query(&spec).await?.rows)
                },
                TtlPolicy::LodgeList,
            )
            .await
    }

    pub async fn organization(&self, organization_id: &str) -> Result<Organization> {
        let key = CacheKey::organization(organization_id);
        self.cache
            .get_or_fetch(
                &key,
                || async {
                    let spec = QuerySpec::new("organisations")
                        .filter(Filter::eq("organization_id", organization_id))
                        .limit(1);
                    from_rows::<Organization>(self.repo.query(&spec).await?.rows)?
                        .pop()
                        .ok_or_else(|| DataError::NotFound(key.to_string()))
                },
                TtlPolicy::Organization,
            )
            .await
    }

    /// Loads the four never-expiring reference lists concurrently so later
    /// reads are hits. Failures are logged; the rest still load.
    pub async fn warm_up(&self) -> usize {
        let (grand_lodges, countries, titles, relationships) = tokio::join!(
            self.grand_lodges(),
            self.countries(),
            self.titles(),
            self.relationships(),
        );

        let outcomes = [
            ("grand_lodges", grand_lodges.err()),
            ("countries", countries.err()),
            ("titles", titles.err()),
            ("relationships", relationships.err()),
        ];
        let mut loaded = 0;
        for (name, error) in outcomes {
            match error {
                None => loaded += 1,
                Some(err) => warn!(list = name, error = %err, "reference data warm-up failed"),
            }
        }
        info!(loaded, "reference data warmed");
        loaded
    }

    async fn load_list<T>(
        &self,
        key: CacheKey,
        table: &str,
        order_column: &str,
        policy: TtlPolicy,
    ) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        self.cache
            .get_or_fetch(
                key,
                || async {
                    let spec = add_indexed_sort(QuerySpec::new(table), order_column, true);
                    from_rows(self.repo.query(&spec).await?.rows)
                },
                policy,
            )
            .await
    }
}
