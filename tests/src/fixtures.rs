//! Test fixtures.

use std::sync::Arc;

use tracker_client::{Tracker, TrackerConfig};
use tracker_core::{ConsentRecord, SearchSubmission, CONSENT_STORAGE_KEY};
use tracker_storage::{KeyValueStorage, MemoryStorage};

/// API key the mock server tests assert on.
pub fn test_api_key() -> String {
    "hearth_test_k3y".to_string()
}

/// In-memory storage with an analytics-accepting consent decision.
pub fn consented_storage() -> Arc<MemoryStorage> {
    let storage = Arc::new(MemoryStorage::new());
    let record = ConsentRecord::decided(true, false, "2024-03");
    storage
        .set(
            CONSENT_STORAGE_KEY,
            &serde_json::to_string(&record).expect("Failed to serialize consent record"),
        )
        .expect("Failed to seed consent record");
    storage
}

/// Tracker pointed at a mock server over the given storage.
pub fn tracker_for(api_url: &str, storage: Arc<MemoryStorage>) -> Tracker {
    let config = TrackerConfig {
        api_url: api_url.to_string(),
        api_key: test_api_key(),
        enabled: true,
        debug: false,
    };
    Tracker::new(config, storage).expect("Failed to build tracker")
}

/// A typical hero-search submission.
pub fn sale_search() -> SearchSubmission {
    SearchSubmission {
        listing_type: "sale".to_string(),
        location: Some("Leeds".to_string()),
        min_price: Some(200_000),
        max_price: Some(350_000),
        bedrooms: Some(3),
        source_page: "/".to_string(),
        source_component: "hero_search".to_string(),
        ..Default::default()
    }
}
