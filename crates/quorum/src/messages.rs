//! The quorum message family.
//!
//! One flat set of message structs sharing the [`QuorumMessage`] capability:
//! every request carries the token of the epoch it was issued under, and the
//! recipient validates it before doing anything else. Messages are created
//! per round and discarded after aggregation.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use quill_journal::{CommitPoint, CommitTime, StoreId};

use crate::token::QuorumToken;
use crate::types::{ServiceId, Timestamp};

/// Capability shared by every quorum request: the epoch token it is fenced
/// by.
pub trait QuorumMessage {
    /// The token this message is valid under.
    fn token(&self) -> QuorumToken;
}

/// Leader → follower: report the earliest commit point you still need.
///
/// Causes the follower to send a [`NotifyReleaseTimeRequest`] back to the
/// leader from within the handler servicing this request, which keeps the
/// protocol synchronized across the quorum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatherReleaseTimeRequest {
    /// The token this round runs under.
    pub token: QuorumToken,
    /// The leader's clock at round start; used only for skew detection,
    /// never for ordering.
    pub timestamp_on_leader: Timestamp,
}

impl QuorumMessage for GatherReleaseTimeRequest {
    fn token(&self) -> QuorumToken {
        self.token
    }
}

/// Follower → leader: the follower's earliest pinned commit point, delivered
/// as a new outbound call rather than a return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyReleaseTimeRequest {
    /// The token of the round being answered.
    pub token: QuorumToken,
    /// Earliest commit point still required by an active local reader,
    /// transaction, or backup; `None` when nothing is pinned.
    pub pinned: Option<CommitPoint>,
    /// True when the follower could not compute a pin (e.g. journal not
    /// ready) and the leader should fall back to its own floor. Kept
    /// distinct from an absent pin for diagnostics.
    pub mock: bool,
    /// The follower's clock when the pin was computed.
    pub timestamp_on_follower: Timestamp,
    /// The responding member.
    pub service_id: ServiceId,
}

impl QuorumMessage for NotifyReleaseTimeRequest {
    fn token(&self) -> QuorumToken {
        self.token
    }
}

/// Request for the current root block of a store on a remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootBlockRequest {
    /// The token this request is valid under.
    pub token: QuorumToken,
    /// The journal whose root block is wanted; defaults to the remote
    /// service's live journal. Naming a UUID is a scale-out hook for
    /// historical journals.
    pub store_id: Option<StoreId>,
}

impl QuorumMessage for RootBlockRequest {
    fn token(&self) -> QuorumToken {
        self.token
    }
}

/// The current root block of the requested store.
///
/// Commit counter and times are lifted out of the serialized block so a
/// resyncing follower can plan segment requests without deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootBlockResponse {
    /// The store the root block belongs to.
    pub store_id: StoreId,
    /// Commit counter recorded by the root block.
    pub commit_counter: u64,
    /// Commit time recorded by the root block.
    pub commit_time: CommitTime,
    /// Commit time of the preceding commit.
    pub prior_commit_time: CommitTime,
    /// The serialized root block.
    pub root_block: Bytes,
}

/// The outcome of one successful release-time round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseTimeDecision {
    /// The token the round ran under.
    pub token: QuorumToken,
    /// The committed release time; never below the previously committed
    /// value.
    pub new_release_time: CommitTime,
    /// The raw minimum pinned commit point across the leader and all
    /// accepted followers.
    pub minimum_across_quorum: CommitPoint,
    /// The member that reported the minimum; diagnostics only.
    pub contributing_service: ServiceId,
}
