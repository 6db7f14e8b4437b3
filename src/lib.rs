//! Deal stakeholder tracking.
//!
//! Keeps a per-workspace roster of the people on a deal and a timeline of
//! interactions with them, fed by manual entry, AI-assisted import of
//! transcripts, and Gmail/Calendar sync. Reconciliation (identity resolution,
//! activity dedup, field merge) is pure and lives in [`reconcile`]; scoring
//! and gap detection live in [`intelligence`].

pub mod db;
pub mod error;
pub mod google_api;
pub mod intelligence;
pub mod migrations;
pub mod pty;
pub mod reconcile;
pub mod services;
pub mod state;
pub mod types;
pub mod util;

pub use error::DealError;
pub use state::AppState;
