//! Search store-and-forward across simulated page loads.
//!
//! A "page load" here is a fresh `Tracker` over the same storage, which is
//! exactly what a navigation gives the browser build.

use chrono::{Duration, Utc};

use integration_tests::fixtures::{consented_storage, sale_search, tracker_for};
use integration_tests::server::MockIngestionServer;
use tracker_core::{PendingSearchRecord, PENDING_SEARCH_STORAGE_KEY};
use tracker_storage::KeyValueStorage;

#[tokio::test]
async fn test_navigating_search_replayed_exactly_once() {
    let server = MockIngestionServer::start().await;
    let storage = consented_storage();

    // Homepage: submit the hero search, persist, navigate away.
    let homepage = tracker_for(&server.url, storage.clone());
    homepage.store_search_for_tracking(sale_search());
    drop(homepage);

    // Results page: init replays the pending record.
    let results_page = tracker_for(&server.url, storage.clone());
    results_page.init().await;

    let events = server.wait_for_events(1).await;
    assert_eq!(events[0].event_type(), "search");
    let data = &events[0].payload["event_data"];
    assert_eq!(data["listing_type"], "sale");
    assert_eq!(data["location"], "Leeds");
    assert_eq!(data["source_component"], "hero_search");
    assert!(data["tracking_delay_ms"].as_i64().unwrap() >= 0);
    // The raw store timestamp is not forwarded.
    assert!(data.get("timestamp_ms").is_none());

    // Refresh: another page load finds nothing.
    let refreshed = tracker_for(&server.url, storage.clone());
    assert!(!refreshed.send_pending_search_event().await);
    server.settle().await;
    assert_eq!(server.events_of_type("search").len(), 1);
}

#[tokio::test]
async fn test_stale_record_is_dropped_not_replayed() {
    let server = MockIngestionServer::start().await;
    let storage = consented_storage();

    // A record from 31 seconds ago, past the staleness window.
    let mut record = PendingSearchRecord::from_submission(sale_search(), Utc::now());
    record.timestamp_ms = (Utc::now() - Duration::seconds(31)).timestamp_millis();
    storage
        .set(
            PENDING_SEARCH_STORAGE_KEY,
            &serde_json::to_string(&record).unwrap(),
        )
        .unwrap();

    let tracker = tracker_for(&server.url, storage.clone());
    assert!(!tracker.send_pending_search_event().await);

    server.settle().await;
    assert!(server.events_of_type("search").is_empty());
    // Dropped means consumed as well.
    assert_eq!(storage.get(PENDING_SEARCH_STORAGE_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_url_fallback_for_direct_arrival() {
    let server = MockIngestionServer::start().await;
    let tracker = tracker_for(&server.url, consented_storage());
    tracker.init().await;

    // No pending record (bookmark/shared link); reconstruct from the URL.
    assert!(!tracker.send_pending_search_event().await);
    assert!(
        tracker
            .track_search_from_url(
                "https://hearth.example/search?type=rent&location=York&bedrooms=2"
            )
            .await
    );

    let events = server.wait_for_events(1).await;
    let data = &events[0].payload["event_data"];
    assert_eq!(events[0].event_type(), "search");
    assert_eq!(data["listing_type"], "rent");
    assert_eq!(data["location"], "York");
    assert_eq!(data["source_component"], "url_params");
}

#[tokio::test]
async fn test_newer_search_wins_before_navigation() {
    let server = MockIngestionServer::start().await;
    let storage = consented_storage();

    let homepage = tracker_for(&server.url, storage.clone());
    homepage.store_search_for_tracking(sale_search());

    let mut refined = sale_search();
    refined.location = Some("York".to_string());
    homepage.store_search_for_tracking(refined);
    drop(homepage);

    let results_page = tracker_for(&server.url, storage);
    assert!(results_page.send_pending_search_event().await);

    let events = server.wait_for_events(1).await;
    assert_eq!(events[0].payload["event_data"]["location"], "York");
}
