//! The journal's fixed-layout header record.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{JournalError, JournalResult};
use crate::types::{CommitPoint, CommitTime, StoreId};

/// One root block: the journal header written atomically on each commit.
///
/// Root blocks are immutable once written. A journal holds two alternating
/// root blocks (current and prior) for crash atomicity; only the current one
/// is exposed by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootBlock {
    /// The store this root block belongs to.
    pub store_id: StoreId,
    /// Number of commits on the journal, starting at zero for genesis.
    pub commit_counter: u64,
    /// Timestamp of the commit that wrote this root block.
    pub commit_time: CommitTime,
    /// Timestamp of the preceding commit.
    pub prior_commit_time: CommitTime,
}

impl RootBlock {
    /// The root block of an empty journal.
    #[must_use]
    pub const fn genesis(store_id: StoreId) -> Self {
        Self {
            store_id,
            commit_counter: 0,
            commit_time: CommitTime::ZERO,
            prior_commit_time: CommitTime::ZERO,
        }
    }

    /// Builds the successor root block for a commit at `commit_time`.
    #[must_use]
    pub const fn next(&self, commit_time: CommitTime) -> Self {
        Self {
            store_id: self.store_id,
            commit_counter: self.commit_counter + 1,
            commit_time,
            prior_commit_time: self.commit_time,
        }
    }

    /// The commit point this root block records.
    #[must_use]
    pub const fn commit_point(&self) -> CommitPoint {
        CommitPoint::new(self.commit_time, self.commit_counter)
    }

    /// Serializes the root block for the wire.
    ///
    /// # Errors
    ///
    /// Returns `JournalError::Serialization` if encoding fails.
    pub fn encode(&self) -> JournalResult<Bytes> {
        let payload =
            bincode::serialize(self).map_err(|e| JournalError::Serialization(e.to_string()))?;
        Ok(Bytes::from(payload))
    }

    /// Deserializes a root block received over the wire.
    ///
    /// # Errors
    ///
    /// Returns `JournalError::Serialization` if decoding fails.
    pub fn decode(bytes: &Bytes) -> JournalResult<Self> {
        bincode::deserialize(bytes).map_err(|e| JournalError::Serialization(e.to_string()))
    }
}
