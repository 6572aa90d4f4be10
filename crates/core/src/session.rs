//! Visitor identity and session record types.
//!
//! A visitor is a browser/device identified by a UUID that is only persisted
//! when analytics consent exists. A session is a bounded run of page
//! activity from one visitor, expiring after 30 minutes of inactivity.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Storage key for the persisted visitor identifier.
pub const VISITOR_ID_STORAGE_KEY: &str = "hearth_visitor_id";

/// Storage key for the persisted session record.
pub const SESSION_STORAGE_KEY: &str = "hearth_session";

/// Session idle timeout (30 minutes of inactivity).
///
/// Fixed in production to date; kept as a named constant rather than a
/// config knob so tuning stays a one-line change.
pub const SESSION_IDLE_TIMEOUT_MINUTES: i64 = 30;

/// A rolling session record for one visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub visitor_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    /// Page views recorded within this session; monotonically non-decreasing.
    pub page_views: u64,
}

impl SessionRecord {
    /// Creates a fresh session for a visitor.
    ///
    /// Starts at zero page views; the creating read immediately records one
    /// activity update, so callers never observe zero.
    pub fn new(visitor_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            visitor_id,
            created_at: now,
            last_activity_at: now,
            page_views: 0,
        }
    }

    /// Whether the session has idle-expired as of `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.last_activity_at > Duration::minutes(SESSION_IDLE_TIMEOUT_MINUTES)
    }

    /// Records one unit of page activity: bumps the activity timestamp and
    /// increments the page-view counter.
    pub fn record_activity_at(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now;
        self.page_views += 1;
    }

    /// Session age from creation to `now`.
    pub fn duration_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }
}
