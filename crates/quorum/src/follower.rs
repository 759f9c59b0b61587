//! The follower side of a release-time round.

use std::sync::Arc;

use tracing::{debug, warn};

use quill_journal::Journal;

use crate::clock::WallClock;
use crate::error::QuorumResult;
use crate::messages::{GatherReleaseTimeRequest, NotifyReleaseTimeRequest};
use crate::rpc::QuorumRpc;
use crate::token::TokenGuard;
use crate::types::ServiceId;
use crate::view::QuorumMembership;

/// Handles inbound Gather requests on a follower.
///
/// The handler runs Idle → GatherReceived → PinComputed → NotifySent and
/// back to Idle within one call: the Notify back to the leader is awaited
/// *inside* the Gather handler. That ordering is load-bearing — the leader
/// can never observe a Notify for a round whose Gather it did not send, and
/// there is no suspension point between computing the pin and reporting it
/// in which the pin could be released and re-acquired at a lower value.
pub struct FollowerResponder {
    service_id: ServiceId,
    membership: Arc<QuorumMembership>,
    guard: TokenGuard,
    journal: Arc<Journal>,
    clock: Arc<dyn WallClock>,
    rpc: Arc<dyn QuorumRpc>,
}

impl FollowerResponder {
    /// Creates the responder for one member.
    #[must_use]
    pub fn new(
        service_id: ServiceId,
        membership: Arc<QuorumMembership>,
        journal: Arc<Journal>,
        clock: Arc<dyn WallClock>,
        rpc: Arc<dyn QuorumRpc>,
    ) -> Self {
        let guard = TokenGuard::new(Arc::clone(&membership));
        Self {
            service_id,
            membership,
            guard,
            journal,
            clock,
            rpc,
        }
    }

    /// Handles one Gather request: validates the token, computes the local
    /// pin, and sends the Notify to the leader before returning.
    ///
    /// A follower that cannot compute its pin still responds, with a mock
    /// Notify telling the leader to use its own floor.
    ///
    /// # Errors
    ///
    /// Returns `QuorumError::StaleToken` for a request from a past epoch
    /// (the round is dropped without notifying) and `QuorumError::Rpc` when
    /// the Notify could not be delivered.
    pub async fn handle_gather(&self, request: GatherReleaseTimeRequest) -> QuorumResult<()> {
        self.guard.validate_message(&request)?;
        let leader = self.membership.snapshot().leader;

        let (pinned, mock) = match self.journal.earliest_pinned().await {
            Ok(pinned) => (pinned, false),
            Err(e) => {
                warn!(
                    "Cannot compute pinned commit time on {}: {}; sending mock notify",
                    self.service_id, e
                );
                (None, true)
            }
        };

        let notify = NotifyReleaseTimeRequest {
            token: request.token,
            pinned,
            mock,
            timestamp_on_follower: self.clock.now(),
            service_id: self.service_id,
        };

        debug!(
            "Gather under token {} on {}: reporting pinned={:?} mock={}",
            request.token, self.service_id, pinned, mock
        );

        // Awaited here, not detached: the gather handler must not return
        // until the leader has the report.
        self.rpc.notify(leader, notify).await?;
        Ok(())
    }
}
