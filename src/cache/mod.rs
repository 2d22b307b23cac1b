//! In-memory snapshot of the most recent timeline
//!
//! The service keeps exactly one timeline at a time. Readers take the
//! current snapshot without waiting for fetches; a refresh fetches outside
//! the lock and swaps the snapshot in only when the fetch succeeded.

mod snapshot;

pub use snapshot::{Snapshot, SnapshotCache};
