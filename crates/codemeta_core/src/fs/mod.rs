//! Filesystem access for project snapshots.

pub mod walker;
