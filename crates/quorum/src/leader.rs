//! The leader side of a release-time round.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until, timeout};
use tracing::{debug, info, warn};

use quill_journal::{CommitPoint, CommitTime, Journal};

use crate::clock::WallClock;
use crate::config::QuorumConfig;
use crate::error::{QuorumError, QuorumResult};
use crate::messages::{GatherReleaseTimeRequest, NotifyReleaseTimeRequest, ReleaseTimeDecision};
use crate::rpc::QuorumRpc;
use crate::token::{QuorumToken, TokenGuard};
use crate::types::{ServiceId, Timestamp};
use crate::view::{QuorumMembership, QuorumView};

/// The round currently collecting Notify responses, if any.
struct ActiveRound {
    token: QuorumToken,
    tx: mpsc::UnboundedSender<NotifyReleaseTimeRequest>,
}

/// Runs release-time rounds on the leader.
///
/// One round fans Gather requests out to every joined follower concurrently,
/// each with an independent timeout, collects the Notify calls the followers
/// make back, and commits the minimum pinned commit point across the leader
/// and all accepted followers as the new release time. A round that cannot
/// collect the configured minimum of responses under one unchanged token
/// fails and leaves the release time untouched.
pub struct LeaderCoordinator {
    service_id: ServiceId,
    membership: Arc<QuorumMembership>,
    guard: TokenGuard,
    config: QuorumConfig,
    journal: Arc<Journal>,
    clock: Arc<dyn WallClock>,
    rpc: Arc<dyn QuorumRpc>,
    round: Mutex<Option<ActiveRound>>,
}

impl LeaderCoordinator {
    /// Creates the coordinator for one member.
    #[must_use]
    pub fn new(
        service_id: ServiceId,
        membership: Arc<QuorumMembership>,
        config: QuorumConfig,
        journal: Arc<Journal>,
        clock: Arc<dyn WallClock>,
        rpc: Arc<dyn QuorumRpc>,
    ) -> Self {
        let guard = TokenGuard::new(Arc::clone(&membership));
        Self {
            service_id,
            membership,
            guard,
            config,
            journal,
            clock,
            rpc,
            round: Mutex::new(None),
        }
    }

    /// Runs one release-time round under the current token.
    ///
    /// # Errors
    ///
    /// Returns `NotLeader` when this member is not the current leader,
    /// `RoundInProgress` when a round is already collecting,
    /// `InsufficientResponses`, `ClockSkewDetected`, or `TokenChanged` when
    /// the round must fail, and `Journal` when the local floor cannot be
    /// computed. No failure touches the committed release time.
    pub async fn run_round(&self) -> QuorumResult<ReleaseTimeDecision> {
        let view = self.membership.snapshot();
        if view.leader != self.service_id {
            return Err(QuorumError::NotLeader {
                leader: view.leader,
            });
        }
        let token = view.token;
        let timestamp_on_leader = self.clock.now();
        // The leader participates in the minimum like any follower. Its
        // floor is always concrete: the earliest local pin, or the current
        // commit point when nothing is pinned.
        let own_floor = self.journal.local_floor().await?;

        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut slot = self.round.lock();
            if slot.is_some() {
                return Err(QuorumError::RoundInProgress);
            }
            *slot = Some(ActiveRound { token, tx });
        }

        debug!(
            "Starting release-time round under token {} with {} followers, leader floor {}",
            token,
            view.members.len() - 1,
            own_floor
        );

        let result = self
            .drive_round(token, timestamp_on_leader, own_floor, &view, rx)
            .await;
        self.round.lock().take();
        result
    }

    /// The currently committed release time on this service.
    #[must_use]
    pub fn release_time(&self) -> CommitTime {
        self.journal.release().current()
    }

    /// Accepts a follower's Notify into the active round.
    ///
    /// # Errors
    ///
    /// Returns `StaleToken` for a Notify from a past epoch and
    /// `UnexpectedNotify` when no round under that token is collecting.
    pub fn handle_notify(&self, request: NotifyReleaseTimeRequest) -> QuorumResult<()> {
        self.guard.validate_message(&request)?;
        let slot = self.round.lock();
        match slot.as_ref() {
            Some(round) if round.token == request.token => {
                round
                    .tx
                    .send(request)
                    .map_err(|_| QuorumError::UnexpectedNotify {
                        service: request.service_id,
                    })
            }
            _ => Err(QuorumError::UnexpectedNotify {
                service: request.service_id,
            }),
        }
    }

    async fn drive_round(
        &self,
        token: QuorumToken,
        timestamp_on_leader: Timestamp,
        own_floor: CommitPoint,
        view: &QuorumView,
        rx: mpsc::UnboundedReceiver<NotifyReleaseTimeRequest>,
    ) -> QuorumResult<ReleaseTimeDecision> {
        let followers: Vec<ServiceId> = view.followers().collect();
        let responded = self
            .collect_notifies(token, timestamp_on_leader, &followers, rx)
            .await;

        // Any member whose clock is out of bounds fails the round: a skewed
        // clock could mask a pin that should have blocked advancement.
        let bound_ms = u64::try_from(self.config.max_clock_skew.as_millis()).unwrap_or(u64::MAX);
        for notify in responded.values() {
            let skew = notify.timestamp_on_follower.abs_diff(timestamp_on_leader);
            let skew_ms = u64::try_from(skew.as_millis()).unwrap_or(u64::MAX);
            if skew_ms > bound_ms {
                return Err(QuorumError::ClockSkewDetected {
                    service: notify.service_id,
                    skew_ms,
                    bound_ms,
                });
            }
        }

        // The leader itself counts as a responding member.
        let received = responded.len() + 1;
        let required = self.config.required_responses(view.members.len());
        if received < required {
            return Err(QuorumError::InsufficientResponses { received, required });
        }

        let mut minimum = own_floor;
        let mut contributor = self.service_id;
        for notify in responded.values() {
            if notify.mock {
                debug!(
                    "{} could not compute a pin; leader floor applies",
                    notify.service_id
                );
                continue;
            }
            // An absent pin does not constrain the minimum.
            let Some(pinned) = notify.pinned else { continue };
            if pinned < minimum {
                minimum = pinned;
                contributor = notify.service_id;
            }
        }

        // The token must not have changed between round start and commit.
        self.guard.validate_for_commit(token)?;

        let committed = self.journal.release().advance(minimum.time);
        info!(
            "Release-time round under token {} committed {} (quorum minimum {} from {})",
            token, committed, minimum, contributor
        );

        Ok(ReleaseTimeDecision {
            token,
            new_release_time: committed,
            minimum_across_quorum: minimum,
            contributing_service: contributor,
        })
    }

    /// Fans Gather requests out and collects Notify responses until every
    /// follower has responded or been excluded, or the round deadline
    /// passes. Excluded members are simply absent from the result.
    async fn collect_notifies(
        &self,
        token: QuorumToken,
        timestamp_on_leader: Timestamp,
        followers: &[ServiceId],
        mut rx: mpsc::UnboundedReceiver<NotifyReleaseTimeRequest>,
    ) -> HashMap<ServiceId, NotifyReleaseTimeRequest> {
        let request = GatherReleaseTimeRequest {
            token,
            timestamp_on_leader,
        };

        let mut gathers: FuturesUnordered<_> = followers
            .iter()
            .map(|&follower| {
                let rpc = Arc::clone(&self.rpc);
                let gather_timeout = self.config.gather_timeout;
                tokio::spawn(async move {
                    let outcome = timeout(gather_timeout, rpc.gather(follower, request)).await;
                    (follower, outcome)
                })
            })
            .collect();

        let deadline = Instant::now() + self.config.gather_timeout;
        let mut responded: HashMap<ServiceId, NotifyReleaseTimeRequest> = HashMap::new();
        let mut excluded: HashSet<ServiceId> = HashSet::new();

        while !followers
            .iter()
            .all(|f| responded.contains_key(f) || excluded.contains(f))
        {
            tokio::select! {
                notify = rx.recv() => {
                    let Some(notify) = notify else { break };
                    // Fencing: only this round's token contributes, even if
                    // the stray value is lower than the true minimum.
                    if notify.token != token {
                        warn!(
                            "Discarding notify from {} under token {} (round token {})",
                            notify.service_id, notify.token, token
                        );
                        continue;
                    }
                    if !followers.contains(&notify.service_id) {
                        warn!("Discarding notify from non-member {}", notify.service_id);
                        continue;
                    }
                    if responded.insert(notify.service_id, notify).is_some() {
                        warn!("Duplicate notify from {}", notify.service_id);
                    }
                }
                Some(joined) = gathers.next(), if !gathers.is_empty() => {
                    match joined {
                        Ok((follower, Ok(Ok(())))) => {
                            debug!("Gather to {} acknowledged", follower);
                        }
                        Ok((follower, Ok(Err(e)))) => {
                            warn!("Excluding {} from round: {}", follower, e);
                            excluded.insert(follower);
                        }
                        Ok((follower, Err(_))) => {
                            warn!(
                                "Excluding {} from round: no response within {:?}",
                                follower, self.config.gather_timeout
                            );
                            excluded.insert(follower);
                        }
                        Err(e) => warn!("Gather task failed: {}", e),
                    }
                }
                () = sleep_until(deadline) => {
                    for follower in followers {
                        if !responded.contains_key(follower) && !excluded.contains(follower) {
                            warn!("Excluding {} from round: deadline reached", follower);
                        }
                    }
                    break;
                }
            }
        }

        responded
    }
}
