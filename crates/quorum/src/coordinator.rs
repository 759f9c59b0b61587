//! The entry point for release-time advancement.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use quill_journal::CommitTime;

use crate::error::QuorumResult;
use crate::leader::LeaderCoordinator;
use crate::messages::ReleaseTimeDecision;
use crate::view::QuorumMembership;

/// Drives one end-to-end release-time advancement round.
///
/// Invoked by the external collaborator that decides *when* to advance —
/// periodically, or before recycling log segments. Rounds triggered
/// concurrently on one service are serialized here; a failed round is
/// reported upward and leaves the committed release time untouched.
pub struct ReleaseTimeCoordinator {
    membership: Arc<QuorumMembership>,
    leader: Arc<LeaderCoordinator>,
    round_gate: Mutex<()>,
}

impl ReleaseTimeCoordinator {
    /// Creates the coordinator for one member.
    #[must_use]
    pub fn new(membership: Arc<QuorumMembership>, leader: Arc<LeaderCoordinator>) -> Self {
        Self {
            membership,
            leader,
            round_gate: Mutex::new(()),
        }
    }

    /// Runs one release-time round and returns its decision.
    ///
    /// # Errors
    ///
    /// Propagates the round failure (`NotLeader`, `InsufficientResponses`,
    /// `ClockSkewDetected`, `TokenChanged`, ...). The caller may retry with
    /// a fresh round later; nothing is partially applied.
    pub async fn advance_release_time(&self) -> QuorumResult<ReleaseTimeDecision> {
        let _gate = self.round_gate.lock().await;
        let token = self.membership.token();
        match self.leader.run_round().await {
            Ok(decision) => Ok(decision),
            Err(e) => {
                warn!("Release-time round under token {} failed: {}", token, e);
                Err(e)
            }
        }
    }

    /// The currently committed release time on this service.
    #[must_use]
    pub fn current_release_time(&self) -> CommitTime {
        self.leader.release_time()
    }
}
