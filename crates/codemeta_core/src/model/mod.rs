//! Domain model for project identity, notes and canonical paths.
//!
//! # Responsibility
//! - Define the data structures shared by walker, store and views.
//!
//! # Invariants
//! - Every note is scoped by a stable `ProjectId`.
//! - `CanonicalPath` is the only join key between filesystem and store.

pub mod note;
pub mod path;
pub mod project;
