//! Quorum tokens and the fencing guard.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{QuorumError, QuorumResult};
use crate::messages::QuorumMessage;
use crate::view::QuorumMembership;

/// Identifies one leadership epoch / quorum configuration.
///
/// Opaque and monotonically increasing; a message carrying token T is valid
/// only while the recipient's current token equals T.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct QuorumToken(pub u64);

impl fmt::Display for QuorumToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validates presented tokens against the locally known current token.
///
/// A pure check with no side effects; the current token is mutated only by
/// the external leader-election mechanism through [`QuorumMembership`].
/// Checked at the start of handling any Gather, Notify, or root-block
/// request, and again immediately before committing a release-time decision.
#[derive(Clone)]
pub struct TokenGuard {
    membership: Arc<QuorumMembership>,
}

impl TokenGuard {
    /// Creates a guard over the given membership state.
    #[must_use]
    pub fn new(membership: Arc<QuorumMembership>) -> Self {
        Self { membership }
    }

    /// Rejects `presented` unless it matches the current token.
    ///
    /// # Errors
    ///
    /// Returns `QuorumError::StaleToken` on mismatch.
    pub fn validate(&self, presented: QuorumToken) -> QuorumResult<()> {
        let current = self.membership.token();
        if presented == current {
            Ok(())
        } else {
            Err(QuorumError::StaleToken { presented, current })
        }
    }

    /// Rejects an inbound quorum message unless the token it carries
    /// matches the current token.
    ///
    /// # Errors
    ///
    /// Returns `QuorumError::StaleToken` on mismatch.
    pub fn validate_message<M: QuorumMessage>(&self, message: &M) -> QuorumResult<()> {
        self.validate(message.token())
    }

    /// Re-validates a round's token immediately before committing its
    /// decision. A mismatch here means the token changed mid-round and the
    /// whole round must fail without a partial commit.
    ///
    /// # Errors
    ///
    /// Returns `QuorumError::TokenChanged` on mismatch.
    pub fn validate_for_commit(&self, started: QuorumToken) -> QuorumResult<()> {
        let current = self.membership.token();
        if started == current {
            Ok(())
        } else {
            Err(QuorumError::TokenChanged { started, current })
        }
    }
}
