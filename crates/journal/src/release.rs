//! The committed release time.

use parking_lot::RwLock;
use tracing::debug;

use crate::types::CommitTime;

/// The commit timestamp below which journal history may be garbage-collected.
///
/// Mutated only by the commit step of a successful release-time round. The
/// record enforces monotonicity itself: advancing takes the max with the
/// previously committed value, so out-of-order round completions can never
/// move the release time backward.
#[derive(Debug, Default)]
pub struct ReleaseTimeRecord {
    committed: RwLock<CommitTime>,
}

impl ReleaseTimeRecord {
    /// Creates a record starting at `initial`.
    #[must_use]
    pub const fn new(initial: CommitTime) -> Self {
        Self {
            committed: RwLock::new(initial),
        }
    }

    /// The currently committed release time.
    #[must_use]
    pub fn current(&self) -> CommitTime {
        *self.committed.read()
    }

    /// Commits `candidate` as the new release time and returns the effective
    /// committed value, which is `max(previous, candidate)`.
    pub fn advance(&self, candidate: CommitTime) -> CommitTime {
        let mut committed = self.committed.write();
        let previous = *committed;
        let effective = previous.max(candidate);
        // The release time must never regress; max-with-previous guarantees
        // it, and anything else here is a bug in the guard logic.
        assert!(effective >= previous, "release time regressed");
        if candidate < previous {
            debug!(
                "Release time candidate {} below committed {}, keeping committed",
                candidate, previous
            );
        }
        *committed = effective;
        effective
    }
}
