//! Persisted key-value storage seam for the Hearth tracking SDK.
//!
//! The tracker persists a handful of independent, well-known keys (consent
//! decision, session record, visitor id, pending search record), mirroring
//! per-origin browser local storage. Implementations are synchronous and
//! fallible; callers are expected to treat every failure as "absent" and
//! degrade, never to surface storage errors to page code.

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use tracker_core::Result;

/// String-keyed, string-valued persisted storage.
///
/// Values are JSON documents serialized by the caller; the store treats
/// them as opaque. There is no transactional guarantee across keys or
/// across instances sharing the same backing store: a read-then-write
/// sequence can race with another instance and lose one update
/// (last-write-wins, an accepted limitation of the design).
pub trait KeyValueStorage: Send + Sync {
    /// Reads a value, `None` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes a key; succeeds when the key is already absent.
    fn remove(&self, key: &str) -> Result<()>;
}
