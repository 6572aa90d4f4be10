//! Canonical event payload and its builder.
//!
//! Every tracked action, whatever its domain, is delivered as one
//! `EventPayload`. Payloads are built fresh per call from the ambient page
//! and session state, sent once, and never persisted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

/// The page the visitor is currently on, as reported by the embedder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
    pub url: String,
    pub title: Option<String>,
    pub referrer: Option<String>,
}

impl PageContext {
    pub fn new(
        url: impl Into<String>,
        title: Option<String>,
        referrer: Option<String>,
    ) -> Self {
        Self {
            url: url.into(),
            title,
            referrer,
        }
    }
}

/// Snapshot of the ambient state an event is built from: who the visitor
/// is, which session they are in, and which page they are on.
#[derive(Debug, Clone)]
pub struct EventScope {
    pub session_id: Uuid,
    pub visitor_id: Uuid,
    pub page: PageContext,
}

/// Canonical tracking event payload.
///
/// `property_id`/`article_id` are promoted to the top level from
/// `event_data` when present. That is an ingestion-API convenience, not a
/// semantic duplication: both forms carry the same value.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EventPayload {
    #[validate(length(min = 1, max = 64))]
    pub event_type: String,
    pub session_id: Uuid,
    pub visitor_id: Uuid,
    #[validate(length(max = 2048))]
    pub page_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500))]
    pub page_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2048))]
    pub referrer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_data: Option<Map<String, Value>>,
}

impl EventPayload {
    /// Builds a payload from the ambient scope and optional free-form data.
    ///
    /// Pure given its inputs: no clocks, no I/O, no randomness.
    pub fn build(
        event_type: impl Into<String>,
        scope: &EventScope,
        data: Option<Map<String, Value>>,
    ) -> Self {
        let property_id = data.as_ref().and_then(|d| promoted_id(d, "property_id"));
        let article_id = data.as_ref().and_then(|d| promoted_id(d, "article_id"));

        Self {
            event_type: event_type.into(),
            session_id: scope.session_id,
            visitor_id: scope.visitor_id,
            page_url: scope.page.url.clone(),
            page_title: scope.page.title.clone(),
            referrer: scope.page.referrer.clone(),
            property_id,
            article_id,
            event_data: data.filter(|d| !d.is_empty()),
        }
    }
}

/// Reads a promotable identifier out of event data.
///
/// Accepts both string and numeric forms, since listing ids arrive as
/// either depending on which API object the caller had in hand.
fn promoted_id(data: &Map<String, Value>, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
