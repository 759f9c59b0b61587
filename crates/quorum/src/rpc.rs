//! The transport seam.
//!
//! Real transports (serialization, connections, retries) are an external
//! concern. The protocol only needs two things: an outbound client that can
//! deliver one request to one member and report success or failure
//! ([`QuorumRpc`]), and the inbound handler surface a member exposes
//! ([`QuorumService`]). `quill-quorum-memory` wires the two together in
//! process for tests and local development.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::QuorumResult;
use crate::messages::{
    GatherReleaseTimeRequest, NotifyReleaseTimeRequest, RootBlockRequest, RootBlockResponse,
};
use crate::types::ServiceId;

/// Transport-level delivery failure.
///
/// The leader treats every variant the same way: the affected member is
/// excluded from the current round.
#[derive(Error, Debug, Clone)]
pub enum RpcError {
    /// No route to the member.
    #[error("Service {0} unreachable")]
    Unreachable(ServiceId),

    /// The call did not complete in time.
    #[error("Request timed out after {millis} ms")]
    Timeout {
        /// Elapsed time before giving up.
        millis: u64,
    },

    /// The remote handler rejected the request.
    #[error("Request rejected by remote: {reason}")]
    Rejected {
        /// The remote's rejection reason.
        reason: String,
    },
}

/// Outbound RPC primitives, one per protocol message.
///
/// Every call delivers one request to one member and resolves when the
/// remote handler has finished — for [`QuorumRpc::gather`] that includes the
/// follower's synchronous Notify call back to the leader.
#[async_trait]
pub trait QuorumRpc: Send + Sync + 'static {
    /// Delivers a Gather request to a follower.
    ///
    /// # Errors
    ///
    /// Returns an [`RpcError`] when the member is unreachable or its handler
    /// rejected the request.
    async fn gather(
        &self,
        to: ServiceId,
        request: GatherReleaseTimeRequest,
    ) -> Result<(), RpcError>;

    /// Delivers a Notify call to the leader and waits for its ack.
    ///
    /// # Errors
    ///
    /// Returns an [`RpcError`] when the leader is unreachable or rejected
    /// the Notify.
    async fn notify(
        &self,
        to: ServiceId,
        request: NotifyReleaseTimeRequest,
    ) -> Result<(), RpcError>;

    /// Fetches the current root block of a store hosted by `to`.
    ///
    /// # Errors
    ///
    /// Returns an [`RpcError`] when the member is unreachable or its handler
    /// rejected the request (including unknown stores).
    async fn get_root_block(
        &self,
        to: ServiceId,
        request: RootBlockRequest,
    ) -> Result<RootBlockResponse, RpcError>;
}

/// The inbound handler surface of one quorum member.
#[async_trait]
pub trait QuorumService: Send + Sync + 'static {
    /// The member's identity.
    fn service_id(&self) -> ServiceId;

    /// Handles a Gather request from the leader. The handler issues the
    /// member's Notify back to the leader and waits for it before
    /// returning.
    ///
    /// # Errors
    ///
    /// Returns `QuorumError::StaleToken` for a request from a past epoch (no
    /// Notify is sent; the leader times the member out).
    async fn handle_gather(&self, request: GatherReleaseTimeRequest) -> QuorumResult<()>;

    /// Handles a follower's Notify on the leader.
    ///
    /// # Errors
    ///
    /// Returns `QuorumError::StaleToken` or `QuorumError::UnexpectedNotify`
    /// when the Notify does not belong to the active round.
    async fn handle_notify(&self, request: NotifyReleaseTimeRequest) -> QuorumResult<()>;

    /// Handles a root-block request from any member.
    ///
    /// # Errors
    ///
    /// Returns `QuorumError::StaleToken` for a request from a past epoch and
    /// `QuorumError::Journal` for unknown stores.
    async fn handle_root_block(&self, request: RootBlockRequest)
    -> QuorumResult<RootBlockResponse>;
}
