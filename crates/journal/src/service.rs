//! Root-block lookup across the locally hosted stores.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{JournalError, JournalResult};
use crate::root_block::RootBlock;
use crate::store::RootBlockStore;
use crate::types::StoreId;

/// Serves current root blocks for the live journal and any historical
/// journals hosted by this service.
///
/// Used by the release-time protocol and by followers resynchronizing against
/// the leader. Snapshot consistency is inherited from [`RootBlockStore`]: a
/// returned root block is always one atomically written record, never a torn
/// read between the two alternating slots.
pub struct RootBlockService {
    live: Arc<RootBlockStore>,
    historical: RwLock<HashMap<StoreId, Arc<RootBlockStore>>>,
}

impl RootBlockService {
    /// Creates a service fronting the live journal.
    #[must_use]
    pub fn new(live: Arc<RootBlockStore>) -> Self {
        Self {
            live,
            historical: RwLock::new(HashMap::new()),
        }
    }

    /// The live journal's store identifier.
    #[must_use]
    pub fn live_store_id(&self) -> StoreId {
        self.live.store_id()
    }

    /// Registers a historical journal so scale-out callers can fetch its
    /// root block by UUID.
    pub fn register_historical(&self, store: Arc<RootBlockStore>) {
        debug!("Registering historical store {}", store.store_id());
        self.historical.write().insert(store.store_id(), store);
    }

    /// Returns the current root block for `store_id`, or for the live
    /// journal when no store is named.
    ///
    /// # Errors
    ///
    /// Returns `JournalError::UnknownStore` if `store_id` matches no locally
    /// known journal.
    pub fn get_root_block(&self, store_id: Option<StoreId>) -> JournalResult<RootBlock> {
        match store_id {
            None => Ok(self.live.current()),
            Some(id) if id == self.live.store_id() => Ok(self.live.current()),
            Some(id) => self
                .historical
                .read()
                .get(&id)
                .map(|store| store.current())
                .ok_or(JournalError::UnknownStore(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CommitTime;

    #[test]
    fn defaults_to_live_store() {
        let live = Arc::new(RootBlockStore::new(StoreId::generate()));
        live.publish(live.current().next(CommitTime(100))).unwrap();
        let service = RootBlockService::new(Arc::clone(&live));

        let block = service.get_root_block(None).unwrap();
        assert_eq!(block.commit_time, CommitTime(100));

        let by_id = service.get_root_block(Some(live.store_id())).unwrap();
        assert_eq!(by_id, block);
    }

    #[test]
    fn unknown_store_is_rejected() {
        let service = RootBlockService::new(Arc::new(RootBlockStore::new(StoreId::generate())));
        let missing = StoreId::generate();

        assert!(matches!(
            service.get_root_block(Some(missing)),
            Err(JournalError::UnknownStore(id)) if id == missing
        ));
    }

    #[test]
    fn historical_stores_resolve_by_id() {
        let service = RootBlockService::new(Arc::new(RootBlockStore::new(StoreId::generate())));
        let old = Arc::new(RootBlockStore::new(StoreId::generate()));
        service.register_historical(Arc::clone(&old));

        let block = service.get_root_block(Some(old.store_id())).unwrap();
        assert_eq!(block.store_id, old.store_id());
    }
}
