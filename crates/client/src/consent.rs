//! Read-only consent store with change notification.
//!
//! Writing consent is the consent banner's job; this store only reads the
//! persisted decision and relays the banner's "consent updated" signal to
//! registered listeners. Missing or corrupt data is always treated as "no
//! consent", never as an error.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use tracker_core::{ConsentRecord, ConsentUpdate, CONSENT_STORAGE_KEY};
use tracker_storage::KeyValueStorage;

/// Callback pair fired on analytics consent transitions.
///
/// `on_granted` fires when analytics flips false→true, `on_revoked` on
/// true→false. Re-notifying an unchanged state fires nothing.
pub struct ConsentListener {
    pub on_granted: Box<dyn Fn() + Send + Sync>,
    pub on_revoked: Box<dyn Fn() + Send + Sync>,
}

/// Handle returned by [`ConsentStore::subscribe`]; pass it back to
/// [`ConsentStore::unsubscribe`] on teardown so long-lived pages don't leak
/// listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Query layer over the persisted consent decision.
pub struct ConsentStore {
    storage: Arc<dyn KeyValueStorage>,
    listeners: Mutex<Vec<(SubscriptionId, ConsentListener)>>,
    /// Analytics consent as of the last notification (seeded from storage);
    /// the baseline for transition detection.
    last_analytics: Mutex<bool>,
    next_subscription: AtomicU64,
}

impl ConsentStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        let seeded = read_record(storage.as_ref())
            .map(|r| r.analytics)
            .unwrap_or(false);
        Self {
            storage,
            listeners: Mutex::new(Vec::new()),
            last_analytics: Mutex::new(seeded),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Reads the persisted decision. Missing or corrupt ⇒ `None`.
    pub fn get_consent_status(&self) -> Option<ConsentRecord> {
        read_record(self.storage.as_ref())
    }

    pub fn has_analytics_consent(&self) -> bool {
        self.get_consent_status()
            .map(|r| r.analytics)
            .unwrap_or(false)
    }

    pub fn has_marketing_consent(&self) -> bool {
        self.get_consent_status()
            .map(|r| r.marketing)
            .unwrap_or(false)
    }

    /// Whether any decision exists, whatever its content. Used to decide
    /// whether to show the consent prompt.
    pub fn has_consent_decision(&self) -> bool {
        self.get_consent_status().is_some()
    }

    /// Registers a transition listener.
    pub fn subscribe(&self, listener: ConsentListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    /// Removes a listener; a no-op for unknown ids.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.lock().retain(|(sid, _)| *sid != id);
    }

    /// Relays the consent banner's notification to listeners.
    ///
    /// Only transitions fire; re-notifying an already-granted (or
    /// already-revoked) state does nothing.
    pub fn handle_consent_update(&self, update: ConsentUpdate) {
        let previous = {
            let mut last = self.last_analytics.lock();
            std::mem::replace(&mut *last, update.analytics)
        };

        if !previous && update.analytics {
            debug!("analytics consent granted");
            for (_, listener) in self.listeners.lock().iter() {
                (listener.on_granted)();
            }
        } else if previous && !update.analytics {
            debug!("analytics consent revoked");
            for (_, listener) in self.listeners.lock().iter() {
                (listener.on_revoked)();
            }
        } else {
            debug!(analytics = update.analytics, "consent unchanged, no-op");
        }
    }
}

fn read_record(storage: &dyn KeyValueStorage) -> Option<ConsentRecord> {
    let raw = match storage.get(CONSENT_STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            debug!(error = %e, "consent read failed, treating as no consent");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(error = %e, "corrupt consent record, treating as no consent");
            None
        }
    }
}
