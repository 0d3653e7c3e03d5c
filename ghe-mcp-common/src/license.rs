//! Consumed-license pages and the aggregate built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::seat::{normalize, CanonicalSeat, RawSeat};

/// One page of `GET .../consumed-licenses`.
///
/// Newer API versions list seats under `users`, older ones under `seats`.
/// Both are read and concatenated. A list that is missing, `null` or not an
/// array counts as empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLicensePage {
    #[serde(default)]
    pub total_seats_purchased: Option<u64>,
    #[serde(default)]
    pub total_seats_consumed: Option<u64>,
    #[serde(default, deserialize_with = "lenient_seats")]
    pub users: Vec<RawSeat>,
    #[serde(default, deserialize_with = "lenient_seats")]
    pub seats: Vec<RawSeat>,
}

impl RawLicensePage {
    pub fn seat_count(&self) -> usize {
        self.users.len() + self.seats.len()
    }

    /// `users` first, then `seats`.
    pub fn into_seats(self) -> impl Iterator<Item = RawSeat> {
        self.users.into_iter().chain(self.seats)
    }
}

fn lenient_seats<'de, D>(deserializer: D) -> Result<Vec<RawSeat>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().map(RawSeat::from).collect(),
        _ => Vec::new(),
    })
}

/// All pages of a walk, concatenated, before normalization.
#[derive(Debug, Clone, Default)]
pub struct RawLicenseAggregate {
    pub total_seats_purchased: u64,
    pub total_seats_consumed: u64,
    pub seats: Vec<RawSeat>,
    /// Number of pages absorbed so far.
    pub pages: u32,
}

impl RawLicenseAggregate {
    /// Append a page. Summary totals are only read from the first page;
    /// later pages never overwrite them, even when the first page said zero.
    pub fn push_page(&mut self, page: RawLicensePage) {
        if self.pages == 0 {
            self.total_seats_purchased = page.total_seats_purchased.unwrap_or(0);
            self.total_seats_consumed = page.total_seats_consumed.unwrap_or(0);
        }
        self.seats.extend(page.into_seats());
        self.pages += 1;
    }

    /// Normalize every seat, keeping page-then-seat order.
    pub fn normalize(self, fetched_at: DateTime<Utc>) -> LicenseAggregate {
        LicenseAggregate {
            total_seats_purchased: self.total_seats_purchased,
            total_seats_consumed: self.total_seats_consumed,
            seats: self.seats.iter().map(normalize).collect(),
            fetched_at,
        }
    }
}

/// The fully paginated, normalized consumed-licenses document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseAggregate {
    pub total_seats_purchased: u64,
    pub total_seats_consumed: u64,
    pub seats: Vec<CanonicalSeat>,
    pub fetched_at: DateTime<Utc>,
}

impl LicenseAggregate {
    pub fn summary(&self) -> LicenseSummary {
        LicenseSummary {
            total_seats_consumed: self.total_seats_consumed,
            total_seats_purchased: self.total_seats_purchased,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseSummary {
    pub total_seats_consumed: u64,
    pub total_seats_purchased: u64,
}

/// Result of the `list_consumed_licenses` query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumedLicenses {
    pub summary: LicenseSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<CanonicalSeat>>,
}
