//! Push contexts and the project snapshots they carry

pub mod context;
pub mod snapshot;

pub use context::PushContext;
pub use snapshot::ProjectSnapshot;
