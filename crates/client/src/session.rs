//! Visitor identity and session management.
//!
//! Persistence is consent-gated: with analytics consent, the visitor id and
//! session record live in persisted storage and survive restarts; without
//! it, both live only in this instance's memory and a new page load gets a
//! fresh anonymous identity. There is deliberately no way to recognize a
//! returning visitor without consent.
//!
//! All fallback state is held as instance fields so independent trackers
//! (and tests) never share identity through module globals.

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use tracker_core::{
    SessionRecord, PENDING_SEARCH_STORAGE_KEY, SESSION_STORAGE_KEY, VISITOR_ID_STORAGE_KEY,
};
use tracker_storage::KeyValueStorage;

use crate::consent::ConsentStore;

/// Derives and maintains the visitor id and the rolling session record.
pub struct SessionManager {
    storage: Arc<dyn KeyValueStorage>,
    consent: Arc<ConsentStore>,
    /// Process-lifetime visitor id used when consent is absent or storage
    /// fails. Stable within one page lifetime, regenerated on reload.
    memory_visitor: Mutex<Option<Uuid>>,
    /// In-memory session used when consent is absent.
    memory_session: Mutex<Option<SessionRecord>>,
}

impl SessionManager {
    pub fn new(storage: Arc<dyn KeyValueStorage>, consent: Arc<ConsentStore>) -> Self {
        Self {
            storage,
            consent,
            memory_visitor: Mutex::new(None),
            memory_session: Mutex::new(None),
        }
    }

    /// Returns the visitor id.
    ///
    /// With analytics consent this is the persisted UUID, created on first
    /// use. Without consent (or when storage fails) it is an in-memory id
    /// that never leaves this instance.
    pub fn visitor_id(&self) -> Uuid {
        if !self.consent.has_analytics_consent() {
            return self.ephemeral_visitor_id();
        }

        match self.storage.get(VISITOR_ID_STORAGE_KEY) {
            Ok(Some(raw)) => {
                if let Ok(id) = raw.trim().parse::<Uuid>() {
                    return id;
                }
                warn!("corrupt visitor id in storage, regenerating");
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "visitor id read failed, using in-memory id");
                return self.ephemeral_visitor_id();
            }
        }

        let id = Uuid::new_v4();
        if let Err(e) = self.storage.set(VISITOR_ID_STORAGE_KEY, &id.to_string()) {
            warn!(error = %e, "failed to persist visitor id, using in-memory id");
            return self.ephemeral_visitor_id();
        }
        debug!(visitor_id = %id, "created visitor id");
        id
    }

    /// Records one page activity and returns the current session id.
    ///
    /// This is deliberately a single conflated operation: every session-id
    /// read bumps `last_activity_at` and increments `page_views`, so
    /// calling it twice counts two page views. An absent or idle-expired
    /// session is replaced in the same call; the expired state is never
    /// observable.
    pub fn record_activity_and_session_id(&self) -> Uuid {
        let now = Utc::now();
        let consented = self.consent.has_analytics_consent();

        let mut session = self
            .load_session(consented)
            .filter(|s| !s.is_expired_at(now))
            .unwrap_or_else(|| {
                let session = SessionRecord::new(self.visitor_id(), now);
                debug!(session_id = %session.session_id, "created session");
                session
            });

        session.record_activity_at(now);
        self.store_session(session.clone(), consented);
        session.session_id
    }

    /// Non-mutating session read; `None` when absent or idle-expired.
    pub fn peek_session(&self) -> Option<SessionRecord> {
        let consented = self.consent.has_analytics_consent();
        self.load_session(consented)
            .filter(|s| !s.is_expired_at(Utc::now()))
    }

    /// Seconds since the current session was created, if one exists.
    pub fn session_duration_secs(&self) -> Option<i64> {
        self.peek_session()
            .map(|s| s.duration_at(Utc::now()).num_seconds())
    }

    /// Removes the session record, persisted and in-memory. Idempotent.
    pub fn clear_session(&self) {
        if let Err(e) = self.storage.remove(SESSION_STORAGE_KEY) {
            warn!(error = %e, "failed to remove session record");
        }
        *self.memory_session.lock() = None;
    }

    /// Removes the visitor id, persisted and in-memory. Idempotent.
    pub fn clear_visitor_id(&self) {
        if let Err(e) = self.storage.remove(VISITOR_ID_STORAGE_KEY) {
            warn!(error = %e, "failed to remove visitor id");
        }
        *self.memory_visitor.lock() = None;
    }

    /// Removes everything the tracker ever persists about a visitor.
    pub fn clear_all_tracking_data(&self) {
        self.clear_session();
        self.clear_visitor_id();
        if let Err(e) = self.storage.remove(PENDING_SEARCH_STORAGE_KEY) {
            warn!(error = %e, "failed to remove pending search record");
        }
    }

    fn ephemeral_visitor_id(&self) -> Uuid {
        let mut memory = self.memory_visitor.lock();
        *memory.get_or_insert_with(Uuid::new_v4)
    }

    fn load_session(&self, consented: bool) -> Option<SessionRecord> {
        if !consented {
            return self.memory_session.lock().clone();
        }

        let raw = match self.storage.get(SESSION_STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "session read failed, treating as absent");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(error = %e, "corrupt session record, replacing");
                None
            }
        }
    }

    fn store_session(&self, session: SessionRecord, consented: bool) {
        if !consented {
            // No consent: the session must never touch persisted storage.
            *self.memory_session.lock() = Some(session);
            return;
        }

        // Read-modify-write here is not atomic across instances sharing a
        // storage directory; two concurrent pages can race and one update
        // wins. Accepted limitation (last-write-wins).
        match serde_json::to_string(&session) {
            Ok(raw) => {
                if let Err(e) = self.storage.set(SESSION_STORAGE_KEY, &raw) {
                    warn!(error = %e, "failed to persist session, keeping it in memory");
                    *self.memory_session.lock() = Some(session);
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize session record"),
        }
    }
}
