//! One quorum member, wired end to end.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use quill_journal::{Journal, RootBlockService, StoreId};

use crate::clock::WallClock;
use crate::config::QuorumConfig;
use crate::coordinator::ReleaseTimeCoordinator;
use crate::error::QuorumResult;
use crate::follower::FollowerResponder;
use crate::leader::LeaderCoordinator;
use crate::messages::{
    GatherReleaseTimeRequest, NotifyReleaseTimeRequest, RootBlockRequest, RootBlockResponse,
};
use crate::rpc::{QuorumRpc, QuorumService};
use crate::token::TokenGuard;
use crate::types::ServiceId;
use crate::view::QuorumMembership;

/// One service in the quorum: its journal, its inbound handler surface, and
/// both protocol roles.
///
/// Every member carries both roles — whichever service the external election
/// mechanism names leader drives rounds; the rest respond to Gathers.
pub struct QuorumMember {
    service_id: ServiceId,
    membership: Arc<QuorumMembership>,
    guard: TokenGuard,
    journal: Arc<Journal>,
    root_blocks: Arc<RootBlockService>,
    follower: FollowerResponder,
    leader: Arc<LeaderCoordinator>,
    coordinator: ReleaseTimeCoordinator,
    rpc: Arc<dyn QuorumRpc>,
}

impl QuorumMember {
    /// Wires a member from its parts.
    #[must_use]
    pub fn new(
        service_id: ServiceId,
        membership: Arc<QuorumMembership>,
        config: QuorumConfig,
        journal: Arc<Journal>,
        root_blocks: Arc<RootBlockService>,
        clock: Arc<dyn WallClock>,
        rpc: Arc<dyn QuorumRpc>,
    ) -> Self {
        let guard = TokenGuard::new(Arc::clone(&membership));
        let follower = FollowerResponder::new(
            service_id,
            Arc::clone(&membership),
            Arc::clone(&journal),
            Arc::clone(&clock),
            Arc::clone(&rpc),
        );
        let leader = Arc::new(LeaderCoordinator::new(
            service_id,
            Arc::clone(&membership),
            config,
            Arc::clone(&journal),
            clock,
            Arc::clone(&rpc),
        ));
        let coordinator =
            ReleaseTimeCoordinator::new(Arc::clone(&membership), Arc::clone(&leader));
        Self {
            service_id,
            membership,
            guard,
            journal,
            root_blocks,
            follower,
            leader,
            coordinator,
            rpc,
        }
    }

    /// This member's identity.
    #[must_use]
    pub const fn id(&self) -> ServiceId {
        self.service_id
    }

    /// This member's view of the quorum.
    #[must_use]
    pub fn membership(&self) -> &Arc<QuorumMembership> {
        &self.membership
    }

    /// This member's local journal.
    #[must_use]
    pub fn journal(&self) -> &Arc<Journal> {
        &self.journal
    }

    /// The release-time coordinator, for the external trigger that decides
    /// when to run a round.
    #[must_use]
    pub const fn coordinator(&self) -> &ReleaseTimeCoordinator {
        &self.coordinator
    }

    /// Fetches the authoritative root block from another member, typically
    /// the leader, before requesting missing log segments during
    /// resynchronization.
    ///
    /// # Errors
    ///
    /// Returns `QuorumError::Rpc` when the member is unreachable or rejected
    /// the request.
    pub async fn fetch_root_block(
        &self,
        from: ServiceId,
        store_id: Option<StoreId>,
    ) -> QuorumResult<RootBlockResponse> {
        let request = RootBlockRequest {
            token: self.membership.token(),
            store_id,
        };
        debug!(
            "Fetching root block from {} (store {:?})",
            from, request.store_id
        );
        Ok(self.rpc.get_root_block(from, request).await?)
    }

    /// Fetches the leader's current root block for the live journal.
    ///
    /// # Errors
    ///
    /// Returns `QuorumError::Rpc` when the leader is unreachable or rejected
    /// the request.
    pub async fn fetch_root_block_from_leader(&self) -> QuorumResult<RootBlockResponse> {
        let leader = self.membership.snapshot().leader;
        self.fetch_root_block(leader, None).await
    }
}

#[async_trait]
impl QuorumService for QuorumMember {
    fn service_id(&self) -> ServiceId {
        self.service_id
    }

    async fn handle_gather(&self, request: GatherReleaseTimeRequest) -> QuorumResult<()> {
        self.follower.handle_gather(request).await
    }

    async fn handle_notify(&self, request: NotifyReleaseTimeRequest) -> QuorumResult<()> {
        self.leader.handle_notify(request)
    }

    async fn handle_root_block(
        &self,
        request: RootBlockRequest,
    ) -> QuorumResult<RootBlockResponse> {
        self.guard.validate_message(&request)?;
        let block = self.root_blocks.get_root_block(request.store_id)?;
        Ok(RootBlockResponse {
            store_id: block.store_id,
            commit_counter: block.commit_counter,
            commit_time: block.commit_time,
            prior_commit_time: block.prior_commit_time,
            root_block: block.encode()?,
        })
    }
}
