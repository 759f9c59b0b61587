//! The pinned-commit-time seam to the storage engine.
//!
//! A commit point is pinned while an active reader, transaction, or backup
//! still needs history at or after it. The release-time protocol only ever
//! asks one question of the storage engine: the earliest pinned commit point,
//! or none if nothing is pinned.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::JournalResult;
use crate::types::CommitPoint;

/// Answers "what is the earliest commit point still required locally?".
///
/// Implemented by the storage engine; `PinRegistry` is the in-process
/// implementation used by the journal itself and by tests.
#[async_trait]
pub trait PinnedTimeProvider: Send + Sync + 'static {
    /// The earliest pinned commit point, or `None` if nothing is pinned.
    ///
    /// # Errors
    ///
    /// Returns `JournalError::NotReady` if the local journal cannot answer,
    /// e.g. while still recovering. The caller must still respond to the
    /// quorum protocol in that case, with a mock value.
    async fn earliest_pinned(&self) -> JournalResult<Option<CommitPoint>>;
}

/// Reference-counted registry of pinned commit points.
///
/// Pins are released by dropping the guard returned from [`PinRegistry::pin`],
/// so a reader cannot forget to release.
#[derive(Debug, Default, Clone)]
pub struct PinRegistry {
    pins: Arc<Mutex<BTreeMap<CommitPoint, usize>>>,
}

impl PinRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins a commit point until the returned guard is dropped.
    #[must_use]
    pub fn pin(&self, point: CommitPoint) -> PinGuard {
        *self.pins.lock().entry(point).or_insert(0) += 1;
        PinGuard {
            pins: Arc::clone(&self.pins),
            point,
        }
    }

    /// The earliest pinned commit point, if any.
    #[must_use]
    pub fn earliest(&self) -> Option<CommitPoint> {
        self.pins.lock().keys().next().copied()
    }
}

#[async_trait]
impl PinnedTimeProvider for PinRegistry {
    async fn earliest_pinned(&self) -> JournalResult<Option<CommitPoint>> {
        Ok(self.earliest())
    }
}

/// Releases one pin on a commit point when dropped.
#[derive(Debug)]
pub struct PinGuard {
    pins: Arc<Mutex<BTreeMap<CommitPoint, usize>>>,
    point: CommitPoint,
}

impl PinGuard {
    /// The pinned commit point.
    #[must_use]
    pub const fn point(&self) -> CommitPoint {
        self.point
    }
}

impl Drop for PinGuard {
    fn drop(&mut self) {
        let mut pins = self.pins.lock();
        if let Some(count) = pins.get_mut(&self.point) {
            *count -= 1;
            if *count == 0 {
                pins.remove(&self.point);
            }
        }
    }
}
