//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into project and workspace use-cases.
//! - Keep the rendering shell decoupled from storage details.

pub mod project_service;
pub mod reconcile_service;
pub mod workspace_service;
