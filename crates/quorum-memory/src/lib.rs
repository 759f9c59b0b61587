//! In-process quorum fabric for testing and local development.
//!
//! Routes the RPC seam between quorum members living in one process. A call
//! resolves by awaiting the target member's inbound handler directly, so the
//! protocol's ordering guarantees hold exactly as they would over a real
//! transport: a Gather does not complete until the follower's synchronous
//! Notify back to the leader has been handled.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use quill_quorum::{
    GatherReleaseTimeRequest, NotifyReleaseTimeRequest, QuorumRpc, QuorumService, RootBlockRequest,
    RootBlockResponse, RpcError, ServiceId,
};

/// Registry of the quorum members reachable in this process.
///
/// Scoped to a handle rather than process-global so concurrent tests stay
/// isolated. Unregistering a member simulates a partition: calls to it fail
/// as unreachable.
#[derive(Clone, Default)]
pub struct MemoryFabric {
    services: Arc<DashMap<ServiceId, Arc<dyn QuorumService>>>,
}

impl MemoryFabric {
    /// Creates an empty fabric.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a member reachable under its service id.
    pub fn register(&self, service: Arc<dyn QuorumService>) {
        debug!("Registering quorum member {}", service.service_id());
        self.services.insert(service.service_id(), service);
    }

    /// Cuts a member off, as a partition would.
    pub fn unregister(&self, service_id: ServiceId) {
        debug!("Unregistering quorum member {}", service_id);
        self.services.remove(&service_id);
    }

    /// An RPC client routing over this fabric.
    #[must_use]
    pub fn rpc(&self) -> MemoryRpc {
        MemoryRpc {
            fabric: self.clone(),
        }
    }

    fn lookup(&self, service_id: ServiceId) -> Result<Arc<dyn QuorumService>, RpcError> {
        self.services
            .get(&service_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(RpcError::Unreachable(service_id))
    }
}

/// [`QuorumRpc`] implementation that delivers calls in process.
#[derive(Clone)]
pub struct MemoryRpc {
    fabric: MemoryFabric,
}

#[async_trait]
impl QuorumRpc for MemoryRpc {
    async fn gather(
        &self,
        to: ServiceId,
        request: GatherReleaseTimeRequest,
    ) -> Result<(), RpcError> {
        let service = self.fabric.lookup(to)?;
        service
            .handle_gather(request)
            .await
            .map_err(|e| RpcError::Rejected {
                reason: e.to_string(),
            })
    }

    async fn notify(
        &self,
        to: ServiceId,
        request: NotifyReleaseTimeRequest,
    ) -> Result<(), RpcError> {
        let service = self.fabric.lookup(to)?;
        service
            .handle_notify(request)
            .await
            .map_err(|e| RpcError::Rejected {
                reason: e.to_string(),
            })
    }

    async fn get_root_block(
        &self,
        to: ServiceId,
        request: RootBlockRequest,
    ) -> Result<RootBlockResponse, RpcError> {
        let service = self.fabric.lookup(to)?;
        service
            .handle_root_block(request)
            .await
            .map_err(|e| RpcError::Rejected {
                reason: e.to_string(),
            })
    }
}
