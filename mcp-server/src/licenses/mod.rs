//! Consumed-licenses queries.
//!
//! Full walks go through the [`LicenseCache`]; per-user views are projected
//! from the cached aggregate.

mod cache;

pub use cache::{LicenseCache, DEFAULT_TTL};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use ghe_mcp_common::{
    enterprise_roles_for, find_seat, organizations_for, CanonicalSeat, ConsumedLicenses,
    RawLicenseAggregate, UserAccess, UserOrganization,
};

use crate::error::Result;

/// Where raw consumed-license pages come from.
#[async_trait]
pub trait LicenseSource: Send + Sync {
    /// Walk every page.
    async fn fetch_all(&self) -> Result<RawLicenseAggregate>;

    /// Fetch page 1 only.
    async fn fetch_first_page(&self) -> Result<RawLicenseAggregate>;
}

pub struct LicenseService {
    source: Arc<dyn LicenseSource>,
    cache: LicenseCache,
}

impl LicenseService {
    pub fn new(source: Arc<dyn LicenseSource>, ttl: Duration, single_flight: bool) -> Self {
        Self {
            cache: LicenseCache::new(source.clone(), ttl).with_single_flight(single_flight),
            source,
        }
    }

    pub fn cache(&self) -> &LicenseCache {
        &self.cache
    }

    /// Summary totals, plus every seat when `include_users` is set.
    ///
    /// Without `full_pagination` only page 1 is fetched; that partial result
    /// bypasses the cache and is never stored in it.
    pub async fn list_consumed_licenses(
        &self,
        include_users: bool,
        full_pagination: bool,
        force_refresh: bool,
    ) -> Result<ConsumedLicenses> {
        let (summary, seats) = if full_pagination {
            let aggregate = self.cache.get_aggregate(force_refresh).await?;
            let seats = include_users.then(|| aggregate.seats.clone());
            (aggregate.summary(), seats)
        } else {
            let aggregate = self.source.fetch_first_page().await?.normalize(Utc::now());
            let summary = aggregate.summary();
            (summary, include_users.then_some(aggregate.seats))
        };

        Ok(ConsumedLicenses {
            summary,
            users: seats,
        })
    }

    pub async fn user_detail(&self, username: &str) -> Result<CanonicalSeat> {
        let aggregate = self.cache.get_aggregate(false).await?;
        Ok(find_seat(&aggregate, username)?.clone())
    }

    pub async fn user_organizations(&self, username: &str) -> Result<Vec<UserOrganization>> {
        let aggregate = self.cache.get_aggregate(false).await?;
        Ok(organizations_for(find_seat(&aggregate, username)?))
    }

    pub async fn user_enterprise_roles(&self, username: &str) -> Result<Vec<String>> {
        let aggregate = self.cache.get_aggregate(false).await?;
        Ok(enterprise_roles_for(find_seat(&aggregate, username)?))
    }

    pub async fn user_access(&self, username: &str) -> Result<UserAccess> {
        let aggregate = self.cache.get_aggregate(false).await?;
        let seat = find_seat(&aggregate, username)?;
        Ok(UserAccess::for_seat(username, seat))
    }
}
