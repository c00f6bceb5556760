//! Append-only audit trail with field-level diffs.
//!
//! Every balance-affecting mutation records one audit event plus a list of
//! named before/after changes, scoped to a root entity so the full history
//! of a document can be read back in one query. Events are written inside
//! the caller's transaction and are never updated or deleted. Actors are
//! stored as value snapshots, not foreign keys, so records survive actor
//! deletion.

pub mod model;
pub mod store;

pub use model::{
    ActionKind, ActorSnapshot, AuditChange, AuditEvent, Change, ChangeValue, NewAuditEvent,
};
pub use store::{find_by_root, record, AuditError, AuditTrailEntry};
