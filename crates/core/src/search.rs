//! Pending search record for the store-and-forward path.
//!
//! A search submission usually triggers a full navigation before a normal
//! event could complete, and beacons are unreliable across browsers for
//! that case. The record is persisted just before navigation and consumed
//! (read then deleted) by the results page, with staleness rejection so a
//! record left behind by an abandoned navigation is never replayed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Storage key for the single pending search record.
pub const PENDING_SEARCH_STORAGE_KEY: &str = "hearth_pending_search";

/// Maximum age a pending search record may reach before it is rejected as
/// stale instead of replayed. Named constant on purpose; see
/// `SESSION_IDLE_TIMEOUT_MINUTES` for the same reasoning.
pub const PENDING_SEARCH_MAX_AGE_MS: i64 = 30_000;

/// A search submission as the UI describes it, before it is stamped and
/// persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchSubmission {
    /// "sale" or "rent" as far as the site is concerned; free-form here.
    pub listing_type: String,
    pub location: Option<String>,
    pub postcode: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub property_type: Option<String>,
    /// Any further filters the search UI applied, verbatim.
    #[serde(default)]
    pub filters: Map<String, Value>,
    pub source_page: String,
    pub source_component: String,
}

impl SearchSubmission {
    /// Number of filters the visitor actually set.
    pub fn active_filter_count(&self) -> u32 {
        let named = [
            self.location.is_some(),
            self.postcode.is_some(),
            self.min_price.is_some(),
            self.max_price.is_some(),
            self.bedrooms.is_some(),
            self.bathrooms.is_some(),
            self.property_type.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();

        (named + self.filters.len()) as u32
    }
}

/// The persisted form of a search submission: the submission plus a
/// client-clock timestamp and a precomputed filter count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingSearchRecord {
    pub listing_type: String,
    /// Client clock at store time, epoch milliseconds.
    pub timestamp_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default)]
    pub filters: Map<String, Value>,
    pub filters_count: u32,
    pub source_page: String,
    pub source_component: String,
}

impl PendingSearchRecord {
    /// Stamps a submission with the client clock.
    pub fn from_submission(submission: SearchSubmission, now: DateTime<Utc>) -> Self {
        let filters_count = submission.active_filter_count();
        Self {
            listing_type: submission.listing_type,
            timestamp_ms: now.timestamp_millis(),
            location: submission.location,
            postcode: submission.postcode,
            min_price: submission.min_price,
            max_price: submission.max_price,
            bedrooms: submission.bedrooms,
            bathrooms: submission.bathrooms,
            property_type: submission.property_type,
            filters: submission.filters,
            filters_count,
            source_page: submission.source_page,
            source_component: submission.source_component,
        }
    }

    /// How long ago the record was stored, by the client clock.
    ///
    /// Clamped at zero: a record "from the future" (clock adjustment
    /// between store and load) is treated as brand new, not stale.
    pub fn age_ms(&self, now: DateTime<Utc>) -> i64 {
        (now.timestamp_millis() - self.timestamp_ms).max(0)
    }

    /// Whether the record is too old to replay.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.age_ms(now) > PENDING_SEARCH_MAX_AGE_MS
    }
}
