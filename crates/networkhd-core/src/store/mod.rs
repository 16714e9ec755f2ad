// ── Device store ──
//
// Merge engine, merged collection, and the snapshot the coordinator
// publishes.

pub(crate) mod cache;
pub mod collection;
pub mod merge;
pub mod snapshot;

pub use collection::DeviceCollection;
pub use merge::{merge, project_matrix};
pub use snapshot::CoordinatorSnapshot;
