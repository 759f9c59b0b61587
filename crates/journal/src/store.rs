//! The two-slot root-block store.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{JournalError, JournalResult};
use crate::root_block::RootBlock;
use crate::types::StoreId;

/// The current and prior root blocks, published as one unit so readers can
/// never observe fields from two different commits.
#[derive(Debug, Clone)]
pub struct RootBlockPair {
    /// The most recently committed root block.
    pub current: RootBlock,
    /// The root block it replaced.
    pub prior: RootBlock,
}

/// Holds a journal's alternating root-block pair.
///
/// Reads are lock-free snapshots of the whole pair; publishing swaps the pair
/// atomically, so a read concurrent with a publish sees either the old pair
/// or the new pair, never a mixture. Writers are serialized: the journal is
/// the only writer, and publishing validates the successor against the
/// current root block while holding the write lock.
#[derive(Debug)]
pub struct RootBlockStore {
    store_id: StoreId,
    slots: ArcSwap<RootBlockPair>,
    write_lock: Mutex<()>,
}

impl RootBlockStore {
    /// Creates a store holding the genesis root block in both slots.
    #[must_use]
    pub fn new(store_id: StoreId) -> Self {
        let genesis = RootBlock::genesis(store_id);
        Self {
            store_id,
            slots: ArcSwap::from_pointee(RootBlockPair {
                current: genesis.clone(),
                prior: genesis,
            }),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a store resuming from a previously written pair.
    #[must_use]
    pub fn resume(pair: RootBlockPair) -> Self {
        Self {
            store_id: pair.current.store_id,
            slots: ArcSwap::from_pointee(pair),
            write_lock: Mutex::new(()),
        }
    }

    /// The store this root-block pair belongs to.
    #[must_use]
    pub const fn store_id(&self) -> StoreId {
        self.store_id
    }

    /// Snapshot of the current root block.
    #[must_use]
    pub fn current(&self) -> RootBlock {
        self.slots.load().current.clone()
    }

    /// Snapshot of the full pair.
    #[must_use]
    pub fn pair(&self) -> Arc<RootBlockPair> {
        self.slots.load_full()
    }

    /// Publishes the root block of a new commit. The old current block
    /// becomes the prior block.
    ///
    /// # Errors
    ///
    /// Returns `JournalError::InvalidRootBlock` if `next` is not the direct
    /// successor of the current root block.
    pub fn publish(&self, next: RootBlock) -> JournalResult<()> {
        let _write = self.write_lock.lock();
        let pair = self.slots.load();

        if next.store_id != self.store_id {
            return Err(JournalError::InvalidRootBlock {
                reason: format!("store mismatch: {} != {}", next.store_id, self.store_id),
            });
        }
        if next.commit_counter != pair.current.commit_counter + 1 {
            return Err(JournalError::InvalidRootBlock {
                reason: format!(
                    "commit counter {} does not follow {}",
                    next.commit_counter, pair.current.commit_counter
                ),
            });
        }
        if next.commit_time <= pair.current.commit_time {
            return Err(JournalError::InvalidRootBlock {
                reason: format!(
                    "commit time {} does not advance past {}",
                    next.commit_time, pair.current.commit_time
                ),
            });
        }
        if next.prior_commit_time != pair.current.commit_time {
            return Err(JournalError::InvalidRootBlock {
                reason: format!(
                    "prior commit time {} does not match current commit time {}",
                    next.prior_commit_time, pair.current.commit_time
                ),
            });
        }

        debug!(
            "Publishing root block {} for store {}",
            next.commit_point(),
            self.store_id
        );

        self.slots.store(Arc::new(RootBlockPair {
            prior: pair.current.clone(),
            current: next,
        }));

        Ok(())
    }
}
