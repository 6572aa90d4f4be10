//! Mock ingestion API.
//!
//! A small Axum server standing in for the tracking backend: it captures
//! every `/track-event` payload (along with how the API key arrived, so
//! tests can tell fetch-style sends from beacons) and keeps an in-memory
//! favourite set behind the favourites endpoints.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

/// One captured `/track-event` request.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub payload: Value,
    /// `x-api-key` header, as sent by awaitable fetch-style delivery.
    pub header_api_key: Option<String>,
    /// `api_key` query parameter, as sent by the beacon path.
    pub query_api_key: Option<String>,
}

impl CapturedEvent {
    pub fn event_type(&self) -> &str {
        self.payload["event_type"].as_str().unwrap_or("")
    }
}

#[derive(Clone, Default)]
struct ServerState {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
    favourites: Arc<Mutex<BTreeSet<String>>>,
}

/// Handle to a running mock ingestion server.
pub struct MockIngestionServer {
    pub url: String,
    state: ServerState,
}

impl MockIngestionServer {
    /// Binds an ephemeral port and serves the mock API on it.
    pub async fn start() -> Self {
        let state = ServerState::default();

        let app = Router::new()
            .route("/track-event", post(track_event))
            .route("/toggle-favourite", post(toggle_favourite))
            .route("/get-favourites", get(get_favourites))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().expect("Failed to read local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Mock server error");
        });

        Self {
            url: format!("http://{addr}"),
            state,
        }
    }

    /// All captured events, in arrival order.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.state.events.lock().clone()
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|e| e.event_type().to_string())
            .collect()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.state.events.lock().len()
    }

    pub fn clear(&self) {
        self.state.events.lock().clear();
    }

    /// Polls until at least `n` events arrived, panicking after 5 seconds.
    /// Delivery is fire-and-forget on the client side, so tests must wait.
    pub async fn wait_for_events(&self, n: usize) -> Vec<CapturedEvent> {
        for _ in 0..100 {
            if self.event_count() >= n {
                return self.events();
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!(
            "expected at least {n} events, captured {:?}",
            self.event_types()
        );
    }

    /// Waits long enough to be confident nothing (more) is in flight.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(300)).await;
    }
}

async fn track_event(
    State(state): State<ServerState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> StatusCode {
    // Beacon bodies arrive as text/plain, so parse from the raw body.
    let payload: Value = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(_) => return StatusCode::BAD_REQUEST,
    };

    state.events.lock().push(CapturedEvent {
        payload,
        header_api_key: headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        query_api_key: params.get("api_key").cloned(),
    });

    StatusCode::NO_CONTENT
}

async fn toggle_favourite(
    State(state): State<ServerState>,
    Json(request): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let Some(property_id) = request["property_id"].as_str().map(str::to_string) else {
        return (StatusCode::BAD_REQUEST, Json(json!({})));
    };

    let mut favourites = state.favourites.lock();
    let is_favourited = if favourites.remove(&property_id) {
        false
    } else {
        favourites.insert(property_id);
        true
    };

    (
        StatusCode::OK,
        Json(json!({
            "is_favourited": is_favourited,
            "count": favourites.len(),
        })),
    )
}

async fn get_favourites(State(state): State<ServerState>) -> Json<Value> {
    let favourites = state.favourites.lock();
    Json(json!({
        "favourites": favourites.iter().cloned().collect::<Vec<_>>(),
        "count": favourites.len(),
    }))
}
