//! Presentation models consumed by the rendering layer.
//!
//! # Responsibility
//! - Turn a classification into render-agnostic data.
//!
//! # Invariants
//! - Outputs hold no references into walker or store state.

pub mod dangling;
pub mod tree;

pub use dangling::{build_dangling_list, DanglingList};
pub use tree::{build_tree_model, DecoratedNode, DecoratedTree};
