//! Configuration for release-time rounds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How many quorum members must respond before a round may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponsePolicy {
    /// Every currently joined member must respond.
    AllMembers,
    /// A simple majority of the joined members must respond.
    Majority,
}

/// Configuration for the release-time coordination protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuorumConfig {
    /// Per-follower timeout on the Gather fan-out; a member that has not
    /// responded by then is excluded from the round.
    pub gather_timeout: Duration,
    /// Maximum tolerated difference between the leader's and a follower's
    /// wall clocks; beyond it the round fails rather than trusting the
    /// member's pinned value.
    pub max_clock_skew: Duration,
    /// Response threshold required for a round to commit.
    pub response_policy: ResponsePolicy,
}

impl QuorumConfig {
    /// Responses required for a quorum of `member_count` joined members,
    /// leader included.
    #[must_use]
    pub const fn required_responses(&self, member_count: usize) -> usize {
        match self.response_policy {
            ResponsePolicy::AllMembers => member_count,
            ResponsePolicy::Majority => member_count / 2 + 1,
        }
    }
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self {
            // Matches the transport-level connection timeout; a member
            // slower than this is effectively partitioned for the round.
            gather_timeout: Duration::from_secs(5),
            // NTP-disciplined clocks sit well under this; exceeding it means
            // a clock needs operator attention.
            max_clock_skew: Duration::from_secs(2),
            // The conservative policy: release time only advances when every
            // joined member has reported its pin.
            response_policy: ResponsePolicy::AllMembers,
        }
    }
}
