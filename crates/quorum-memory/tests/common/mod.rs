//! Shared in-process cluster harness for protocol tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use quill_journal::{
    CommitPoint, CommitTime, Journal, PinGuard, PinRegistry, ReleaseTimeRecord, RootBlockService,
    RootBlockStore, StoreId,
};
use quill_quorum::{
    QuorumConfig, QuorumMember, QuorumMembership, QuorumToken, QuorumView, ServiceId, Timestamp,
    WallClock,
};
use quill_quorum_memory::MemoryFabric;

/// Wall-clock base for the fixed test clocks, epoch millis.
pub const BASE_TS: i64 = 1_700_000_000_000;

/// A clock pinned to one reading, optionally offset to simulate skew.
pub struct FixedClock(pub Timestamp);

impl WallClock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// One fully wired member plus the handles tests poke at.
pub struct TestMember {
    pub member: Arc<QuorumMember>,
    pub membership: Arc<QuorumMembership>,
    pub pins: PinRegistry,
    pub store: Arc<RootBlockStore>,
    pub root_blocks: Arc<RootBlockService>,
}

impl TestMember {
    pub fn id(&self) -> ServiceId {
        self.member.id()
    }

    /// Pins a commit point on this member until the guard is dropped.
    pub fn pin(&self, time: u64, counter: u64) -> PinGuard {
        self.pins.pin(CommitPoint::new(CommitTime(time), counter))
    }
}

/// Builds and registers one member with a fixed clock offset from `BASE_TS`.
pub fn build_member(
    fabric: &MemoryFabric,
    id: ServiceId,
    leader: ServiceId,
    members: Vec<ServiceId>,
    token: QuorumToken,
    config: QuorumConfig,
    clock_offset_ms: i64,
) -> TestMember {
    let membership = Arc::new(QuorumMembership::new(QuorumView {
        token,
        leader,
        members,
    }));
    let store = Arc::new(RootBlockStore::new(StoreId::generate()));
    let pins = PinRegistry::new();
    let journal = Arc::new(Journal::new(
        Arc::clone(&store),
        Arc::new(pins.clone()),
        Arc::new(ReleaseTimeRecord::default()),
    ));
    let root_blocks = Arc::new(RootBlockService::new(Arc::clone(&store)));
    let member = Arc::new(QuorumMember::new(
        id,
        Arc::clone(&membership),
        config,
        journal,
        Arc::clone(&root_blocks),
        Arc::new(FixedClock(Timestamp(BASE_TS + clock_offset_ms))),
        Arc::new(fabric.rpc()),
    ));
    fabric.register(member.clone());
    TestMember {
        member,
        membership,
        pins,
        store,
        root_blocks,
    }
}

/// One leader plus N followers sharing a fabric, all under the same token.
pub struct TestCluster {
    pub fabric: MemoryFabric,
    pub leader: TestMember,
    pub followers: Vec<TestMember>,
}

pub fn build_cluster(
    follower_count: usize,
    config: &QuorumConfig,
    token: QuorumToken,
) -> TestCluster {
    let fabric = MemoryFabric::new();
    let leader_id = ServiceId::generate();
    let follower_ids: Vec<ServiceId> = (0..follower_count).map(|_| ServiceId::generate()).collect();
    let mut members = vec![leader_id];
    members.extend(&follower_ids);

    let leader = build_member(
        &fabric,
        leader_id,
        leader_id,
        members.clone(),
        token,
        config.clone(),
        0,
    );
    let followers = follower_ids
        .iter()
        .map(|&id| {
            build_member(
                &fabric,
                id,
                leader_id,
                members.clone(),
                token,
                config.clone(),
                0,
            )
        })
        .collect();

    TestCluster {
        fabric,
        leader,
        followers,
    }
}

/// Default config with a short gather timeout so exclusion tests stay fast.
pub fn fast_config() -> QuorumConfig {
    QuorumConfig {
        gather_timeout: Duration::from_millis(250),
        ..QuorumConfig::default()
    }
}
