//! Snapshot persistence.
//!
//! Model weights are stored as safetensors files with the node name,
//! architecture, and crate version embedded in the header.

mod load;
mod model;
mod save;

pub use load::load_snapshot;
pub use model::{Snapshot, SnapshotMetadata};
pub use save::save_snapshot;
