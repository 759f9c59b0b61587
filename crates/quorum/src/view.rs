//! The process-wide view of the current quorum.

use parking_lot::RwLock;
use tracing::info;

use crate::token::QuorumToken;
use crate::types::ServiceId;

/// One epoch's quorum: the token, the leader, and the joined members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuorumView {
    /// Token of this leadership epoch.
    pub token: QuorumToken,
    /// The elected leader.
    pub leader: ServiceId,
    /// All currently joined members, leader included.
    pub members: Vec<ServiceId>,
}

impl QuorumView {
    /// The joined members other than the leader.
    pub fn followers(&self) -> impl Iterator<Item = ServiceId> + '_ {
        let leader = self.leader;
        self.members.iter().copied().filter(move |m| *m != leader)
    }

    /// Whether `service` is currently joined.
    #[must_use]
    pub fn is_member(&self, service: ServiceId) -> bool {
        self.members.contains(&service)
    }
}

/// Holds a service's current [`QuorumView`].
///
/// Mutated only by the external leader-election mechanism via
/// [`QuorumMembership::install`]; everything in this crate takes snapshot
/// reads, so a round observes one consistent view per read.
#[derive(Debug)]
pub struct QuorumMembership {
    view: RwLock<QuorumView>,
}

impl QuorumMembership {
    /// Creates membership state from the initial view.
    #[must_use]
    pub const fn new(view: QuorumView) -> Self {
        Self {
            view: RwLock::new(view),
        }
    }

    /// Snapshot of the current view.
    #[must_use]
    pub fn snapshot(&self) -> QuorumView {
        self.view.read().clone()
    }

    /// The current quorum token.
    #[must_use]
    pub fn token(&self) -> QuorumToken {
        self.view.read().token
    }

    /// Installs the view of a new epoch. Called by the external
    /// leader-election mechanism on election or reconfiguration.
    ///
    /// Tokens are monotonically increasing across epochs; a decreasing token
    /// means the election machinery is broken.
    pub fn install(&self, view: QuorumView) {
        let mut current = self.view.write();
        assert!(
            view.token >= current.token,
            "quorum token regressed: {} -> {}",
            current.token,
            view.token
        );
        if view.token != current.token {
            info!(
                "Quorum epoch changed: token {} -> {}, leader {}",
                current.token, view.token, view.leader
            );
        }
        *current = view;
    }
}
