//! Read and write policies attached to a collection handle.
//!
//! Settings travel with every backend call. They are plain values: a collection handle
//! reconfigured with `with_read_concern` and friends gets a new [`CollectionSettings`]
//! while the handle it was derived from keeps its own.
//!
//! Settings deserialize with defaults for every missing field, so they can be loaded
//! straight from a configuration file:
//!
//! ```ignore
//! let settings: CollectionSettings = serde_json::from_str(r#"{
//!     "read_concern": "majority",
//!     "write_concern": { "w": "majority", "journal": true }
//! }"#)?;
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Consistency level requested for reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadConcern {
    Local,
    Available,
    Majority,
    Linearizable,
    Snapshot,
}

/// Which members of a replicated deployment may serve reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadPreference {
    Primary,
    PrimaryPreferred,
    Secondary,
    SecondaryPreferred,
    Nearest,
}

/// How many acknowledgments a write waits for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acknowledgment {
    /// A fixed number of members; `0` requests no acknowledgment at all.
    Nodes(u32),
    /// A majority of voting members.
    Majority,
    /// A named tag set configured on the deployment.
    Tag(String),
}

/// Acknowledgment requested for writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteConcern {
    pub w: Option<Acknowledgment>,
    /// Wait for the write to reach the on-disk journal.
    pub journal: Option<bool>,
    /// Give up waiting for acknowledgment after this many milliseconds.
    pub w_timeout_ms: Option<u64>,
}

impl WriteConcern {
    pub fn majority() -> Self {
        Self { w: Some(Acknowledgment::Majority), ..Self::default() }
    }

    pub fn nodes(count: u32) -> Self {
        Self { w: Some(Acknowledgment::Nodes(count)), ..Self::default() }
    }

    pub fn unacknowledged() -> Self {
        Self::nodes(0)
    }

    pub fn with_journal(mut self, journal: bool) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.w_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.w_timeout_ms.map(Duration::from_millis)
    }
}

/// Durability policy of one collection handle. `None` defers to the backend's default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionSettings {
    pub read_concern: Option<ReadConcern>,
    pub read_preference: Option<ReadPreference>,
    pub write_concern: Option<WriteConcern>,
}

impl CollectionSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read_concern(mut self, read_concern: ReadConcern) -> Self {
        self.read_concern = Some(read_concern);
        self
    }

    pub fn with_read_preference(mut self, read_preference: ReadPreference) -> Self {
        self.read_preference = Some(read_preference);
        self
    }

    pub fn with_write_concern(mut self, write_concern: WriteConcern) -> Self {
        self.write_concern = Some(write_concern);
        self
    }
}
