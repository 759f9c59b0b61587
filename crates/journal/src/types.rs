//! Identity and commit-point types shared across the journal.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Commit timestamp in epoch milliseconds, as assigned by the leader at
/// commit time.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CommitTime(pub u64);

impl CommitTime {
    /// The zero commit time, used by genesis root blocks.
    pub const ZERO: Self = Self(0);

    /// Epoch milliseconds of this commit time.
    #[must_use]
    pub const fn millis(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommitTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A commit point on the journal: commit time plus the commit counter that
/// disambiguates commits sharing a timestamp.
///
/// Ordering is lexicographic on (time, counter), which is the order commits
/// are written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommitPoint {
    /// Commit timestamp.
    pub time: CommitTime,
    /// Commit counter.
    pub counter: u64,
}

impl CommitPoint {
    /// Creates a commit point.
    #[must_use]
    pub const fn new(time: CommitTime, counter: u64) -> Self {
        Self { time, counter }
    }
}

impl fmt::Display for CommitPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.counter, self.time)
    }
}

/// Identifies one logical journal store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreId(Uuid);

impl StoreId {
    /// Generates a fresh store identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for StoreId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
