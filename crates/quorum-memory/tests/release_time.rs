//! End-to-end release-time rounds over the in-process fabric.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::sleep;

use quill_journal::{CommitPoint, CommitTime, Journal, JournalError, PinnedTimeProvider};
use quill_quorum::{
    GatherReleaseTimeRequest, NotifyReleaseTimeRequest, QuorumConfig, QuorumError, QuorumRpc,
    QuorumService, QuorumToken, QuorumView, ResponsePolicy, RootBlockRequest, RootBlockResponse,
    ServiceId, Timestamp,
};
use quill_quorum_memory::{MemoryFabric, MemoryRpc};

use common::{BASE_TS, build_cluster, build_member, fast_config};

#[tokio::test]
async fn round_commits_quorum_minimum() {
    let _ = tracing_subscriber::fmt::try_init();
    let cluster = build_cluster(2, &fast_config(), QuorumToken(7));

    let _leader_pin = cluster.leader.pin(120, 12);
    let _a_pin = cluster.followers[0].pin(100, 10);
    let _b_pin = cluster.followers[1].pin(80, 8);

    let decision = cluster
        .leader
        .member
        .coordinator()
        .advance_release_time()
        .await
        .unwrap();

    assert_eq!(decision.token, QuorumToken(7));
    assert_eq!(decision.new_release_time, CommitTime(80));
    assert_eq!(
        decision.minimum_across_quorum,
        CommitPoint::new(CommitTime(80), 8)
    );
    assert_eq!(decision.contributing_service, cluster.followers[1].id());
    assert_eq!(
        cluster.leader.member.coordinator().current_release_time(),
        CommitTime(80)
    );
}

/// A follower that never answers its Gather.
struct SilentFollower {
    id: ServiceId,
}

#[async_trait]
impl QuorumService for SilentFollower {
    fn service_id(&self) -> ServiceId {
        self.id
    }

    async fn handle_gather(&self, _request: GatherReleaseTimeRequest) -> Result<(), QuorumError> {
        sleep(Duration::from_secs(60)).await;
        Ok(())
    }

    async fn handle_notify(&self, _request: NotifyReleaseTimeRequest) -> Result<(), QuorumError> {
        unreachable!("silent follower never receives notifies")
    }

    async fn handle_root_block(
        &self,
        _request: RootBlockRequest,
    ) -> Result<RootBlockResponse, QuorumError> {
        unreachable!("silent follower never serves root blocks")
    }
}

#[tokio::test]
async fn all_members_policy_fails_on_timeout() {
    let _ = tracing_subscriber::fmt::try_init();
    let fabric = MemoryFabric::new();
    let leader_id = ServiceId::generate();
    let a_id = ServiceId::generate();
    let b_id = ServiceId::generate();
    let members = vec![leader_id, a_id, b_id];

    let leader = build_member(
        &fabric,
        leader_id,
        leader_id,
        members.clone(),
        QuorumToken(7),
        fast_config(),
        0,
    );
    let a = build_member(
        &fabric,
        a_id,
        leader_id,
        members.clone(),
        QuorumToken(7),
        fast_config(),
        0,
    );
    fabric.register(Arc::new(SilentFollower { id: b_id }));

    let _leader_pin = leader.pin(120, 12);
    let _a_pin = a.pin(100, 10);

    let result = leader.member.coordinator().advance_release_time().await;

    assert!(matches!(
        result,
        Err(QuorumError::InsufficientResponses {
            received: 2,
            required: 3
        })
    ));
    assert_eq!(
        leader.member.coordinator().current_release_time(),
        CommitTime::ZERO
    );
}

#[tokio::test]
async fn majority_policy_tolerates_missing_follower() {
    let _ = tracing_subscriber::fmt::try_init();
    let config = QuorumConfig {
        response_policy: ResponsePolicy::Majority,
        ..fast_config()
    };
    let fabric = MemoryFabric::new();
    let leader_id = ServiceId::generate();
    let a_id = ServiceId::generate();
    let b_id = ServiceId::generate();
    let members = vec![leader_id, a_id, b_id];

    let leader = build_member(
        &fabric,
        leader_id,
        leader_id,
        members.clone(),
        QuorumToken(7),
        config.clone(),
        0,
    );
    let a = build_member(
        &fabric,
        a_id,
        leader_id,
        members.clone(),
        QuorumToken(7),
        config,
        0,
    );
    fabric.register(Arc::new(SilentFollower { id: b_id }));

    let _leader_pin = leader.pin(120, 12);
    let _a_pin = a.pin(80, 8);

    let decision = leader
        .member
        .coordinator()
        .advance_release_time()
        .await
        .unwrap();

    assert_eq!(decision.new_release_time, CommitTime(80));
    assert_eq!(decision.contributing_service, a_id);
}

#[tokio::test]
async fn release_time_never_regresses() {
    let _ = tracing_subscriber::fmt::try_init();
    let cluster = build_cluster(2, &fast_config(), QuorumToken(7));
    let coordinator = cluster.leader.member.coordinator();

    // First round establishes 90.
    {
        let _leader = cluster.leader.pin(200, 20);
        let _a = cluster.followers[0].pin(90, 9);
        let _b = cluster.followers[1].pin(150, 15);
        let decision = coordinator.advance_release_time().await.unwrap();
        assert_eq!(decision.new_release_time, CommitTime(90));
    }

    // A lower minimum still succeeds, but the committed value stays put.
    {
        let _leader = cluster.leader.pin(100, 10);
        let _a = cluster.followers[0].pin(80, 8);
        let _b = cluster.followers[1].pin(85, 8);
        let decision = coordinator.advance_release_time().await.unwrap();
        assert_eq!(decision.minimum_across_quorum.time, CommitTime(80));
        assert_eq!(decision.new_release_time, CommitTime(90));
        assert_eq!(coordinator.current_release_time(), CommitTime(90));
    }

    // A higher minimum advances it.
    {
        let _leader = cluster.leader.pin(125, 12);
        let _a = cluster.followers[0].pin(120, 11);
        let _b = cluster.followers[1].pin(130, 13);
        let decision = coordinator.advance_release_time().await.unwrap();
        assert_eq!(decision.new_release_time, CommitTime(120));
    }
}

#[tokio::test]
async fn absent_pins_do_not_constrain_the_minimum() {
    let _ = tracing_subscriber::fmt::try_init();
    let cluster = build_cluster(2, &fast_config(), QuorumToken(7));

    // Follower 0 has nothing pinned and reports no pin.
    let _leader_pin = cluster.leader.pin(200, 20);
    let _b_pin = cluster.followers[1].pin(50, 5);

    let decision = cluster
        .leader
        .member
        .coordinator()
        .advance_release_time()
        .await
        .unwrap();

    assert_eq!(decision.new_release_time, CommitTime(50));
    assert_eq!(decision.contributing_service, cluster.followers[1].id());
}

struct BrokenPins;

#[async_trait]
impl PinnedTimeProvider for BrokenPins {
    async fn earliest_pinned(&self) -> Result<Option<CommitPoint>, JournalError> {
        Err(JournalError::NotReady {
            reason: "recovering".into(),
        })
    }
}

#[tokio::test]
async fn mock_notify_falls_back_to_leader_floor() {
    let _ = tracing_subscriber::fmt::try_init();
    let fabric = MemoryFabric::new();
    let leader_id = ServiceId::generate();
    let a_id = ServiceId::generate();
    let members = vec![leader_id, a_id];

    let leader = build_member(
        &fabric,
        leader_id,
        leader_id,
        members.clone(),
        QuorumToken(7),
        fast_config(),
        0,
    );

    // A real member whose storage engine cannot answer yet.
    let a_membership = Arc::new(quill_quorum::QuorumMembership::new(QuorumView {
        token: QuorumToken(7),
        leader: leader_id,
        members,
    }));
    let a_store = Arc::new(quill_journal::RootBlockStore::new(
        quill_journal::StoreId::generate(),
    ));
    let a_journal = Arc::new(Journal::new(
        Arc::clone(&a_store),
        Arc::new(BrokenPins),
        Arc::new(quill_journal::ReleaseTimeRecord::default()),
    ));
    let a = Arc::new(quill_quorum::QuorumMember::new(
        a_id,
        a_membership,
        fast_config(),
        a_journal,
        Arc::new(quill_journal::RootBlockService::new(a_store)),
        Arc::new(common::FixedClock(Timestamp(BASE_TS))),
        Arc::new(fabric.rpc()),
    ));
    fabric.register(a);

    let _leader_pin = leader.pin(200, 20);

    let decision = leader
        .member
        .coordinator()
        .advance_release_time()
        .await
        .unwrap();

    assert_eq!(decision.new_release_time, CommitTime(200));
    assert_eq!(decision.contributing_service, leader_id);
}

/// Sends a valid Notify, then wakes the waiting peer.
struct NotifyThenSignal {
    id: ServiceId,
    leader: ServiceId,
    rpc: MemoryRpc,
    done: Arc<Notify>,
}

#[async_trait]
impl QuorumService for NotifyThenSignal {
    fn service_id(&self) -> ServiceId {
        self.id
    }

    async fn handle_gather(&self, request: GatherReleaseTimeRequest) -> Result<(), QuorumError> {
        self.rpc
            .notify(
                self.leader,
                NotifyReleaseTimeRequest {
                    token: request.token,
                    pinned: Some(CommitPoint::new(CommitTime(80), 8)),
                    mock: false,
                    timestamp_on_follower: request.timestamp_on_leader,
                    service_id: self.id,
                },
            )
            .await
            .expect("notify should be accepted");
        self.done.notify_one();
        Ok(())
    }

    async fn handle_notify(&self, _request: NotifyReleaseTimeRequest) -> Result<(), QuorumError> {
        unreachable!()
    }

    async fn handle_root_block(
        &self,
        _request: RootBlockRequest,
    ) -> Result<RootBlockResponse, QuorumError> {
        unreachable!()
    }
}

/// Waits for the signal, then installs a new epoch on the leader mid-round.
struct TokenChanger {
    id: ServiceId,
    leader_membership: Arc<quill_quorum::QuorumMembership>,
    new_view: QuorumView,
    trigger: Arc<Notify>,
}

#[async_trait]
impl QuorumService for TokenChanger {
    fn service_id(&self) -> ServiceId {
        self.id
    }

    async fn handle_gather(&self, request: GatherReleaseTimeRequest) -> Result<(), QuorumError> {
        self.trigger.notified().await;
        self.leader_membership.install(self.new_view.clone());
        Err(QuorumError::StaleToken {
            presented: request.token,
            current: self.new_view.token,
        })
    }

    async fn handle_notify(&self, _request: NotifyReleaseTimeRequest) -> Result<(), QuorumError> {
        unreachable!()
    }

    async fn handle_root_block(
        &self,
        _request: RootBlockRequest,
    ) -> Result<RootBlockResponse, QuorumError> {
        unreachable!()
    }
}

#[tokio::test]
async fn token_change_mid_round_aborts_the_commit() {
    let _ = tracing_subscriber::fmt::try_init();
    let config = QuorumConfig {
        response_policy: ResponsePolicy::Majority,
        ..fast_config()
    };
    let fabric = MemoryFabric::new();
    let leader_id = ServiceId::generate();
    let a_id = ServiceId::generate();
    let b_id = ServiceId::generate();
    let members = vec![leader_id, a_id, b_id];

    let leader = build_member(
        &fabric,
        leader_id,
        leader_id,
        members.clone(),
        QuorumToken(7),
        config,
        0,
    );
    let _leader_pin = leader.pin(120, 12);

    let signal = Arc::new(Notify::new());
    fabric.register(Arc::new(NotifyThenSignal {
        id: a_id,
        leader: leader_id,
        rpc: fabric.rpc(),
        done: Arc::clone(&signal),
    }));
    fabric.register(Arc::new(TokenChanger {
        id: b_id,
        leader_membership: Arc::clone(&leader.membership),
        new_view: QuorumView {
            token: QuorumToken(8),
            leader: leader_id,
            members,
        },
        trigger: signal,
    }));

    let result = leader.member.coordinator().advance_release_time().await;

    assert!(matches!(
        result,
        Err(QuorumError::TokenChanged {
            started: QuorumToken(7),
            current: QuorumToken(8)
        })
    ));
    assert_eq!(
        leader.member.coordinator().current_release_time(),
        CommitTime::ZERO
    );
}

/// Sends a stale-token Notify first, then the real one.
struct StrayThenValid {
    id: ServiceId,
    leader: ServiceId,
    rpc: MemoryRpc,
}

#[async_trait]
impl QuorumService for StrayThenValid {
    fn service_id(&self) -> ServiceId {
        self.id
    }

    async fn handle_gather(&self, request: GatherReleaseTimeRequest) -> Result<(), QuorumError> {
        // A lower value under a stale token must be fenced out, not
        // aggregated.
        let stray = NotifyReleaseTimeRequest {
            token: QuorumToken(6),
            pinned: Some(CommitPoint::new(CommitTime(10), 1)),
            mock: false,
            timestamp_on_follower: request.timestamp_on_leader,
            service_id: self.id,
        };
        self.rpc
            .notify(self.leader, stray)
            .await
            .expect_err("stale notify must be rejected");

        self.rpc
            .notify(
                self.leader,
                NotifyReleaseTimeRequest {
                    token: request.token,
                    pinned: Some(CommitPoint::new(CommitTime(100), 2)),
                    mock: false,
                    timestamp_on_follower: request.timestamp_on_leader,
                    service_id: self.id,
                },
            )
            .await
            .expect("valid notify should be accepted");
        Ok(())
    }

    async fn handle_notify(&self, _request: NotifyReleaseTimeRequest) -> Result<(), QuorumError> {
        unreachable!()
    }

    async fn handle_root_block(
        &self,
        _request: RootBlockRequest,
    ) -> Result<RootBlockResponse, QuorumError> {
        unreachable!()
    }
}

#[tokio::test]
async fn stale_token_notify_is_fenced_out_of_aggregation() {
    let _ = tracing_subscriber::fmt::try_init();
    let fabric = MemoryFabric::new();
    let leader_id = ServiceId::generate();
    let a_id = ServiceId::generate();
    let members = vec![leader_id, a_id];

    let leader = build_member(
        &fabric,
        leader_id,
        leader_id,
        members,
        QuorumToken(7),
        fast_config(),
        0,
    );
    fabric.register(Arc::new(StrayThenValid {
        id: a_id,
        leader: leader_id,
        rpc: fabric.rpc(),
    }));

    let _leader_pin = leader.pin(150, 15);

    let decision = leader
        .member
        .coordinator()
        .advance_release_time()
        .await
        .unwrap();

    // The stray 10 under token 6 never contributed.
    assert_eq!(decision.new_release_time, CommitTime(100));
    assert_eq!(decision.contributing_service, a_id);
}

#[tokio::test]
async fn skewed_follower_clock_fails_the_round() {
    let _ = tracing_subscriber::fmt::try_init();
    let config = fast_config();
    let fabric = MemoryFabric::new();
    let leader_id = ServiceId::generate();
    let a_id = ServiceId::generate();
    let b_id = ServiceId::generate();
    let members = vec![leader_id, a_id, b_id];

    let leader = build_member(
        &fabric,
        leader_id,
        leader_id,
        members.clone(),
        QuorumToken(7),
        config.clone(),
        0,
    );
    let _a = build_member(
        &fabric,
        a_id,
        leader_id,
        members.clone(),
        QuorumToken(7),
        config.clone(),
        100,
    );
    // Five seconds ahead of the leader, past the two-second bound.
    let _b = build_member(
        &fabric,
        b_id,
        leader_id,
        members,
        QuorumToken(7),
        config,
        5_000,
    );

    let _leader_pin = leader.pin(120, 12);

    let result = leader.member.coordinator().advance_release_time().await;

    assert!(matches!(
        result,
        Err(QuorumError::ClockSkewDetected { service, skew_ms: 5_000, .. }) if service == b_id
    ));
    assert_eq!(
        leader.member.coordinator().current_release_time(),
        CommitTime::ZERO
    );
}

#[tokio::test]
async fn only_the_leader_can_run_a_round() {
    let _ = tracing_subscriber::fmt::try_init();
    let cluster = build_cluster(1, &fast_config(), QuorumToken(7));

    let result = cluster.followers[0]
        .member
        .coordinator()
        .advance_release_time()
        .await;

    assert!(matches!(
        result,
        Err(QuorumError::NotLeader { leader }) if leader == cluster.leader.id()
    ));
}

#[tokio::test]
async fn unreachable_follower_is_excluded_like_a_timeout() {
    let _ = tracing_subscriber::fmt::try_init();
    let cluster = build_cluster(2, &fast_config(), QuorumToken(7));

    let _leader_pin = cluster.leader.pin(120, 12);
    let _a_pin = cluster.followers[0].pin(100, 10);
    let _b_pin = cluster.followers[1].pin(80, 8);

    // Partition follower 1 away; under AllMembers the round must fail
    // without touching the release time.
    cluster.fabric.unregister(cluster.followers[1].id());

    let result = cluster
        .leader
        .member
        .coordinator()
        .advance_release_time()
        .await;

    assert!(matches!(
        result,
        Err(QuorumError::InsufficientResponses {
            received: 2,
            required: 3
        })
    ));
    assert_eq!(
        cluster.leader.member.coordinator().current_release_time(),
        CommitTime::ZERO
    );
}
