//! Point-in-time views of the aggregated depth, for publication and
//! integrity-checked hand-off to other processes.

use super::depth::Depth;
use super::depth_level::DepthLevel;
use super::error::BookError;
use super::types::{ChangeId, Price, Quantity};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One populated price level in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotLevel {
    /// The level price
    pub price: Price,
    /// Number of orders resting at the price
    pub order_count: u32,
    /// Total open quantity at the price
    pub aggregate_qty: Quantity,
    /// Stamp of the last visible mutation of the level
    pub last_change: ChangeId,
}

impl From<&DepthLevel> for SnapshotLevel {
    fn from(level: &DepthLevel) -> Self {
        Self {
            price: level.price(),
            order_count: level.order_count(),
            aggregate_qty: level.aggregate_qty(),
            last_change: level.last_change(),
        }
    }
}

/// A serializable view of the visible depth of one book.
///
/// `sequence` is the engine-local transaction counter at capture time;
/// subscribers order updates of one symbol by it. Counters of different
/// symbols are not coordinated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthSnapshot {
    /// The symbol this snapshot belongs to
    pub symbol: String,
    /// Engine-local sequence number at capture time
    pub sequence: u64,
    /// Populated visible bid levels, best first
    pub bids: Vec<SnapshotLevel>,
    /// Populated visible ask levels, best first
    pub asks: Vec<SnapshotLevel>,
    /// The depth-wide change stamp at capture time
    pub last_change: ChangeId,
}

impl DepthSnapshot {
    /// Capture the populated visible levels of `depth`.
    #[must_use]
    pub fn capture(symbol: &str, sequence: u64, depth: &Depth) -> Self {
        Self {
            symbol: symbol.to_string(),
            sequence,
            bids: depth
                .bids()
                .iter()
                .filter(|level| level.is_valid())
                .map(SnapshotLevel::from)
                .collect(),
            asks: depth
                .asks()
                .iter()
                .filter(|level| level.is_valid())
                .map(SnapshotLevel::from)
                .collect(),
            last_change: depth.last_change(),
        }
    }

    /// Capture only the levels stamped after `since`, for incremental
    /// publication. Vacated levels publish with a zero count so
    /// subscribers can drop them.
    #[must_use]
    pub fn capture_changes(symbol: &str, sequence: u64, depth: &Depth, since: ChangeId) -> Self {
        Self {
            symbol: symbol.to_string(),
            sequence,
            bids: depth
                .bids()
                .iter()
                .filter(|level| level.changed_since(since))
                .map(SnapshotLevel::from)
                .collect(),
            asks: depth
                .asks()
                .iter()
                .filter(|level| level.changed_since(since))
                .map(SnapshotLevel::from)
                .collect(),
            last_change: depth.last_change(),
        }
    }
}

/// A depth snapshot together with an integrity checksum of its serialized
/// form, for hand-off across process boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthSnapshotPackage {
    /// The wrapped snapshot
    pub snapshot: DepthSnapshot,
    /// Hex digest of the serialized snapshot
    pub checksum: String,
}

impl DepthSnapshotPackage {
    /// Package `snapshot` with its checksum.
    ///
    /// # Errors
    /// Returns [`BookError::Serialization`] when the snapshot cannot be
    /// serialized for digesting.
    pub fn new(snapshot: DepthSnapshot) -> Result<Self, BookError> {
        let checksum = Self::compute_checksum(&snapshot)?;
        Ok(Self { snapshot, checksum })
    }

    /// Verify the stored checksum against the snapshot content.
    ///
    /// # Errors
    /// Returns [`BookError::ChecksumMismatch`] when the content does not
    /// match, or [`BookError::Serialization`] when digesting fails.
    pub fn validate(&self) -> Result<(), BookError> {
        let actual = Self::compute_checksum(&self.snapshot)?;
        if actual != self.checksum {
            return Err(BookError::ChecksumMismatch {
                expected: self.checksum.clone(),
                actual,
            });
        }
        Ok(())
    }

    /// Consume the package and return the validated snapshot.
    ///
    /// # Errors
    /// Same conditions as [`DepthSnapshotPackage::validate`].
    pub fn into_snapshot(self) -> Result<DepthSnapshot, BookError> {
        self.validate()?;
        Ok(self.snapshot)
    }

    fn compute_checksum(snapshot: &DepthSnapshot) -> Result<String, BookError> {
        let payload =
            serde_json::to_vec(snapshot).map_err(|error| BookError::Serialization {
                message: error.to_string(),
            })?;
        let mut hasher = Sha256::new();
        hasher.update(payload);
        Ok(format!("{:x}", hasher.finalize()))
    }
}
