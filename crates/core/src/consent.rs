//! Consent record types.
//!
//! A single consent decision is persisted under one well-known key. It is
//! written by the consent banner (an external collaborator), overwritten
//! whole on every re-decision, and never partially updated. Absence means
//! "no consent" for every category.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage key for the persisted consent decision.
pub const CONSENT_STORAGE_KEY: &str = "hearth_consent";

/// A visitor's persisted consent decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    /// Strictly-necessary cookies; always true once a decision exists.
    pub necessary: bool,
    /// Behavioural analytics (the gate for everything this SDK does).
    pub analytics: bool,
    /// Marketing/advertising.
    pub marketing: bool,
    /// When the decision was made.
    pub timestamp: DateTime<Utc>,
    /// Consent policy version the decision was made against.
    pub version: String,
}

impl ConsentRecord {
    /// Creates a fresh decision record stamped with the current time.
    pub fn decided(analytics: bool, marketing: bool, version: impl Into<String>) -> Self {
        Self {
            necessary: true,
            analytics,
            marketing,
            timestamp: Utc::now(),
            version: version.into(),
        }
    }
}

/// A "consent updated" notification from the consent banner.
///
/// Carries only the categories the tracker cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentUpdate {
    pub analytics: bool,
    pub marketing: bool,
}
