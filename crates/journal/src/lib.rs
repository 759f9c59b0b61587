//! Local journal state for a replicated write-ahead-log store.
//!
//! This crate owns the per-service side of the journal: the alternating
//! root-block pair with torn-read-free snapshots, the monotonic release-time
//! record, and the pinned-commit-time seam to the storage engine. The
//! cross-service coordination protocol lives in `quill-quorum`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod error;
pub mod journal;
pub mod pins;
pub mod release;
pub mod root_block;
pub mod service;
pub mod store;
pub mod types;

pub use error::{JournalError, JournalResult};
pub use journal::Journal;
pub use pins::{PinGuard, PinRegistry, PinnedTimeProvider};
pub use release::ReleaseTimeRecord;
pub use root_block::RootBlock;
pub use service::RootBlockService;
pub use store::RootBlockStore;
pub use types::{CommitPoint, CommitTime, StoreId};
