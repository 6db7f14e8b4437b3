//! Application services: the operations the CLI exposes.
//!
//! Mutations run inside [`crate::state::with_workspace`] so each call is one
//! locked load, in-memory change and all-or-nothing commit.

pub mod activities;
pub mod dashboard;
pub mod data;
pub mod import;
pub mod insights;
pub mod stakeholders;
pub mod sync;
pub mod workspaces;
