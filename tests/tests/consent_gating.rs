//! Consent gating end-to-end.
//!
//! Without an analytics-accepting decision, the tracker must produce no
//! network traffic and no persisted identifiers, whatever is called.

use std::sync::Arc;

use integration_tests::fixtures::{consented_storage, sale_search, tracker_for};
use integration_tests::server::MockIngestionServer;
use tracker_core::{
    ConsentRecord, ConsentUpdate, CONSENT_STORAGE_KEY, SESSION_STORAGE_KEY,
    VISITOR_ID_STORAGE_KEY,
};
use tracker_storage::{KeyValueStorage, MemoryStorage};

#[tokio::test]
async fn test_unconsented_tracker_emits_nothing() {
    let server = MockIngestionServer::start().await;
    let storage = Arc::new(MemoryStorage::new());
    let tracker = tracker_for(&server.url, storage.clone());

    tracker.init().await;
    tracker
        .track_page_view("https://hearth.example/", None, None)
        .await;
    tracker.track_property_view("prop-1").await;
    tracker.track_phone_click(Some("prop-1"), "header").await;
    tracker.store_search_for_tracking(sale_search());
    assert!(!tracker.send_pending_search_event().await);

    server.settle().await;
    assert_eq!(server.event_count(), 0);

    // Ids still exist, ephemeral and unpersisted.
    assert_eq!(tracker.visitor_id(), tracker.visitor_id());
    let _ = tracker.session_id();
    assert_eq!(storage.get(VISITOR_ID_STORAGE_KEY).unwrap(), None);
    assert_eq!(storage.get(SESSION_STORAGE_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_denied_consent_regenerates_visitor_id_per_page_load() {
    let server = MockIngestionServer::start().await;
    let storage = Arc::new(MemoryStorage::new());

    // Two separate page loads over the same storage: two distinct ids,
    // nothing persisted that could link them.
    let first_load = tracker_for(&server.url, storage.clone());
    let first = first_load.visitor_id();
    drop(first_load);

    let second_load = tracker_for(&server.url, storage.clone());
    let second = second_load.visitor_id();

    assert_ne!(first, second);
    assert_eq!(storage.get(VISITOR_ID_STORAGE_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_consent_grant_enables_tracking_mid_page() {
    let server = MockIngestionServer::start().await;
    let storage = Arc::new(MemoryStorage::new());
    let tracker = tracker_for(&server.url, storage.clone());

    tracker
        .track_page_view("https://hearth.example/", None, None)
        .await;
    server.settle().await;
    assert_eq!(server.event_count(), 0);

    // Banner accepted mid-page: the banner persists the decision itself,
    // then notifies the tracker.
    let record = ConsentRecord::decided(true, false, "2024-03");
    storage
        .set(CONSENT_STORAGE_KEY, &serde_json::to_string(&record).unwrap())
        .unwrap();
    tracker.notify_consent_update(ConsentUpdate {
        analytics: true,
        marketing: false,
    });

    tracker
        .track_page_view("https://hearth.example/", None, None)
        .await;
    let events = server.wait_for_events(1).await;
    assert_eq!(events[0].event_type(), "page_view");
    assert!(storage.get(VISITOR_ID_STORAGE_KEY).unwrap().is_some());
}

#[tokio::test]
async fn test_revoke_stops_tracking_and_clear_wipes_identifiers() {
    let server = MockIngestionServer::start().await;
    let storage = consented_storage();
    let tracker = tracker_for(&server.url, storage.clone());

    tracker
        .track_page_view("https://hearth.example/", None, None)
        .await;
    server.wait_for_events(1).await;
    assert!(storage.get(VISITOR_ID_STORAGE_KEY).unwrap().is_some());

    tracker.notify_consent_update(ConsentUpdate {
        analytics: false,
        marketing: false,
    });
    // The banner's revoke path also wipes accumulated identifiers.
    tracker.clear_all_tracking_data();

    tracker.track_property_view("prop-1").await;
    server.settle().await;
    assert_eq!(server.event_count(), 1);
    assert_eq!(storage.get(VISITOR_ID_STORAGE_KEY).unwrap(), None);
    assert_eq!(storage.get(SESSION_STORAGE_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_disabled_tracker_is_silent_despite_consent() {
    let server = MockIngestionServer::start().await;
    let tracker = tracker_for(&server.url, consented_storage());
    tracker.set_tracking_enabled(false);

    tracker
        .track_page_view("https://hearth.example/", None, None)
        .await;
    tracker.track_cta_click("book_valuation", None).await;

    server.settle().await;
    assert_eq!(server.event_count(), 0);
}
