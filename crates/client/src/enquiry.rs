//! Enquiry funnel tracking.
//!
//! The funnel is `idle → started → submitted`. "Started" means the visitor
//! focused a form field for the first time (once per form instance);
//! "submitted" means they attempted a submit, whatever the validation
//! outcome decided afterwards.

use serde_json::{json, Map};

use tracker_core::{EventPayload, EventScope};
use tracker_transport::EventTransport;

/// Auto-tracking state for one enquiry form instance.
#[derive(Debug, Clone, Default)]
pub struct EnquiryFormState {
    pub property_id: Option<String>,
    started: bool,
}

impl EnquiryFormState {
    pub fn new(property_id: Option<String>) -> Self {
        Self {
            property_id,
            started: false,
        }
    }

    /// Consumes the `started` transition: `true` on the first field focus,
    /// `false` ever after.
    pub fn take_started(&mut self) -> bool {
        !std::mem::replace(&mut self.started, true)
    }
}

/// Sends an `enquiry_started` event.
pub async fn track_enquiry_started(
    transport: &EventTransport,
    scope: &EventScope,
    property_id: Option<&str>,
) {
    let mut data = Map::new();
    if let Some(id) = property_id {
        data.insert("property_id".into(), json!(id));
    }
    let payload = EventPayload::build("enquiry_started", scope, Some(data));
    transport.send_event(&payload).await;
}

/// Sends an `enquiry_submitted` event. Tracks the attempt, not success;
/// server-side validation failures still count.
pub async fn track_enquiry_submitted(
    transport: &EventTransport,
    scope: &EventScope,
    property_id: Option<&str>,
    enquiry_type: Option<&str>,
) {
    let mut data = Map::new();
    if let Some(id) = property_id {
        data.insert("property_id".into(), json!(id));
    }
    if let Some(kind) = enquiry_type {
        data.insert("enquiry_type".into(), json!(kind));
    }
    let payload = EventPayload::build("enquiry_submitted", scope, Some(data));
    transport.send_event(&payload).await;
}
