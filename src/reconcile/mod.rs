//! Reconciliation core: identity resolution, activity dedup, field merge.
//!
//! Everything in here is pure and synchronous. Network fetches and oracle
//! calls finish before a pass reaches these functions.

pub mod events;
pub mod identity;
pub mod merge;
pub mod snapshot;

pub use events::{record_activity, reconcile, ActivityCandidate, ReconcileDecision, RecordOutcome};
pub use identity::{domain_allows_auto_create, resolve, IdentityMatch, MatchRule};
pub use merge::{apply_patch, merge, MergeOutcome, MergeSource, Provenance, StakeholderUpdate};
pub use snapshot::{IdCounters, RemovedStakeholder, WorkspaceSnapshot};
