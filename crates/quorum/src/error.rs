//! Error types for the release-time coordination protocol.
//!
//! All protocol-level errors are recovered at the round boundary: a failed
//! round never touches the previously committed release time and is reported
//! to whatever triggered the round.

use thiserror::Error;

use quill_journal::JournalError;

use crate::rpc::RpcError;
use crate::token::QuorumToken;
use crate::types::ServiceId;

/// Errors raised by quorum protocol operations.
#[derive(Error, Debug, Clone)]
pub enum QuorumError {
    /// An inbound message carried a token from a past epoch.
    #[error("Stale token: presented {presented}, current {current}")]
    StaleToken {
        /// The token carried by the message.
        presented: QuorumToken,
        /// The locally known current token.
        current: QuorumToken,
    },

    /// The token changed between round start and commit; the round is
    /// aborted without a partial commit.
    #[error("Token changed during round: started under {started}, current {current}")]
    TokenChanged {
        /// The token the round started under.
        started: QuorumToken,
        /// The locally known current token.
        current: QuorumToken,
    },

    /// Fewer members responded in time than the configured policy requires.
    #[error("Insufficient responses: {received} of {required} required")]
    InsufficientResponses {
        /// Members that responded, leader included.
        received: usize,
        /// Members required by the response policy.
        required: usize,
    },

    /// A follower's clock deviates from the leader's beyond the configured
    /// bound; its pinned value cannot be trusted and the member's clock
    /// should be flagged for operator attention.
    #[error("Clock skew of {skew_ms} ms on service {service} exceeds bound of {bound_ms} ms")]
    ClockSkewDetected {
        /// The member with the deviating clock.
        service: ServiceId,
        /// Observed deviation in milliseconds.
        skew_ms: u64,
        /// Configured bound in milliseconds.
        bound_ms: u64,
    },

    /// A Notify arrived that matches no round this leader initiated.
    #[error("Notify from {service} matches no active round")]
    UnexpectedNotify {
        /// The member that sent the Notify.
        service: ServiceId,
    },

    /// A second round was started while one was still collecting.
    #[error("A release-time round is already in progress")]
    RoundInProgress,

    /// A round was triggered on a service that is not the current leader.
    #[error("Not the quorum leader: current leader is {leader}")]
    NotLeader {
        /// The current leader.
        leader: ServiceId,
    },

    /// Local journal error, including `UnknownStore` for root-block
    /// requests naming a journal this service does not host.
    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),

    /// Transport-level failure, treated like a timeout: the affected member
    /// is excluded from the round, never fatal to the leader.
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),
}

/// Result alias for quorum protocol operations.
pub type QuorumResult<T> = Result<T, QuorumError>;
