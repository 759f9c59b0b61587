//! Release-time coordination for a replicated journal quorum.
//!
//! One leader and N followers replicate a write-ahead-log journal. Before
//! old commit points can be garbage-collected, the quorum must agree on the
//! earliest commit point any member still needs. This crate implements that
//! agreement: the Gather/Notify round-trip, the quorum-token fencing that
//! guards it, and the root-block exchange used during the protocol and
//! during follower resynchronization.
//!
//! Leader election and quorum membership changes are external collaborators;
//! this crate only reads the current token and member list. Transport is a
//! seam ([`rpc::QuorumRpc`]): sending a request to a member and getting a
//! response or failure is treated as a primitive.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod follower;
pub mod leader;
pub mod member;
pub mod messages;
pub mod rpc;
pub mod token;
pub mod types;
pub mod view;

pub use clock::{SystemClock, WallClock};
pub use config::{QuorumConfig, ResponsePolicy};
pub use coordinator::ReleaseTimeCoordinator;
pub use error::{QuorumError, QuorumResult};
pub use follower::FollowerResponder;
pub use leader::LeaderCoordinator;
pub use member::QuorumMember;
pub use messages::{
    GatherReleaseTimeRequest, NotifyReleaseTimeRequest, QuorumMessage, ReleaseTimeDecision,
    RootBlockRequest, RootBlockResponse,
};
pub use rpc::{QuorumRpc, QuorumService, RpcError};
pub use token::{QuorumToken, TokenGuard};
pub use types::{ServiceId, Timestamp};
pub use view::{QuorumMembership, QuorumView};
