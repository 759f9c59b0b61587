//! The local journal facade handed to the quorum protocol.

use std::sync::Arc;

use crate::error::JournalResult;
use crate::pins::PinnedTimeProvider;
use crate::release::ReleaseTimeRecord;
use crate::store::RootBlockStore;
use crate::types::{CommitPoint, StoreId};

/// One service's local journal: its root-block store, its release-time
/// record, and the pinned-commit-time view of its storage engine.
pub struct Journal {
    store: Arc<RootBlockStore>,
    pins: Arc<dyn PinnedTimeProvider>,
    release: Arc<ReleaseTimeRecord>,
}

impl Journal {
    /// Wires a journal from its parts.
    #[must_use]
    pub fn new(
        store: Arc<RootBlockStore>,
        pins: Arc<dyn PinnedTimeProvider>,
        release: Arc<ReleaseTimeRecord>,
    ) -> Self {
        Self {
            store,
            pins,
            release,
        }
    }

    /// Creates a fresh journal with an empty pin registry, suitable for a
    /// newly provisioned service.
    #[must_use]
    pub fn fresh(store_id: StoreId) -> Self {
        Self::new(
            Arc::new(RootBlockStore::new(store_id)),
            Arc::new(crate::pins::PinRegistry::new()),
            Arc::new(ReleaseTimeRecord::default()),
        )
    }

    /// The root-block store.
    #[must_use]
    pub fn store(&self) -> &Arc<RootBlockStore> {
        &self.store
    }

    /// The release-time record.
    #[must_use]
    pub fn release(&self) -> &Arc<ReleaseTimeRecord> {
        &self.release
    }

    /// The earliest commit point pinned by a local reader, transaction, or
    /// backup, or `None` if nothing is pinned.
    ///
    /// # Errors
    ///
    /// Returns `JournalError::NotReady` when the storage engine cannot
    /// answer yet.
    pub async fn earliest_pinned(&self) -> JournalResult<Option<CommitPoint>> {
        self.pins.earliest_pinned().await
    }

    /// The leader-side floor for a release-time round: the earliest pinned
    /// commit point, or the current commit point when nothing is pinned.
    /// History at or after the latest commit is never releasable, so the
    /// floor is always concrete.
    ///
    /// # Errors
    ///
    /// Returns `JournalError::NotReady` when the storage engine cannot
    /// answer yet.
    pub async fn local_floor(&self) -> JournalResult<CommitPoint> {
        let pinned = self.pins.earliest_pinned().await?;
        Ok(pinned.unwrap_or_else(|| self.store.current().commit_point()))
    }
}
