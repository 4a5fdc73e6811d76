//! Snapshot persistence between check cycles.
//!
//! Only the available set survives a cycle:
//!
//! ```json
//! {
//!   "last_available": [{"room": "...", "date": "2025-10-24", "count": 2, "price": "¥8000"}],
//!   "last_check": "2025-10-20T09:00:00Z",
//!   "check_count": 42
//! }
//! ```

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::AvailabilityTuple;

// Re-export for convenience
pub use local::LocalSnapshotStore;

/// The persisted state of the previous cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub last_available: Vec<AvailabilityTuple>,

    #[serde(default)]
    pub last_check: Option<DateTime<Utc>>,

    #[serde(default)]
    pub check_count: u64,
}

impl Snapshot {
    /// The snapshot that follows this one.
    pub fn next(&self, available: Vec<AvailabilityTuple>, now: DateTime<Utc>) -> Self {
        Self {
            last_available: available,
            last_check: Some(now),
            check_count: self.check_count + 1,
        }
    }
}

/// Trait for snapshot storage backends.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Read the previous snapshot. `Ok(None)` if none was ever written.
    async fn load(&self) -> Result<Option<Snapshot>>;

    /// Replace the stored snapshot.
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Read the previous snapshot, starting over on any failure.
///
/// A corrupt or unreadable snapshot makes every available room look new for
/// one cycle.
pub async fn load_or_empty(store: &dyn SnapshotStore) -> Snapshot {
    match store.load().await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => {
            log::info!("No previous snapshot, starting fresh");
            Snapshot::default()
        }
        Err(e) => {
            log::warn!("Could not load snapshot, starting fresh: {}", e);
            Snapshot::default()
        }
    }
}
