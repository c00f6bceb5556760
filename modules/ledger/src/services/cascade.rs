//! Soft-delete cascade resolution.
//!
//! Cancelling a document touches the document itself, its still-active
//! payments, and the ledger entries of all of those. The traversal is an
//! explicit, testable function rather than updates inlined ad hoc, so the
//! exact blast radius of a cancellation can be asserted on.

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::repos::payment_repo;

/// The full set of rows a document cancellation will soft-delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeSet {
    pub document_id: Uuid,
    pub payment_ids: Vec<Uuid>,
}

/// Resolve what a cancellation of `document_id` will soft-delete.
///
/// Only still-active payments are collected; payments already soft-deleted
/// keep their state and are not touched again.
pub async fn cancellation_targets(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
) -> Result<CascadeSet, sqlx::Error> {
    let payment_ids = payment_repo::list_active_ids_for_document(tx, document_id).await?;

    Ok(CascadeSet {
        document_id,
        payment_ids,
    })
}
