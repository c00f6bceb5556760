//! Balance reconciliation engine.
//!
//! The outstanding balance of a billable document is always a fresh
//! aggregation over its active payments, never a stored running total, so
//! editing or soft-deleting a payment is reflected immediately without a
//! separate reconciliation pass.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::repos::{document_repo, payment_repo};
use crate::validation::ValidationError;

/// Errors that can occur during balance computation
#[derive(Debug, thiserror::Error)]
pub enum BalanceError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A document's reconciled position.
///
/// `balance` floors at zero; callers that need to detect overpayment in
/// inconsistent legacy data must compare `paid` against `total` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceResult {
    pub total: Decimal,
    pub paid: Decimal,
    pub balance: Decimal,
}

impl BalanceResult {
    fn reconcile(total: Decimal, paid: Decimal) -> Self {
        let balance = (total - paid).max(Decimal::ZERO);
        Self {
            total,
            paid,
            balance,
        }
    }
}

/// Compute a document's outstanding balance: total minus the sum of active
/// payments in the direction that settles this document kind, floored at
/// zero.
pub async fn compute_balance(
    pool: &PgPool,
    document_id: Uuid,
) -> Result<BalanceResult, BalanceError> {
    let document = document_repo::find_by_id(pool, document_id)
        .await?
        .ok_or(ValidationError::DocumentNotFound(document_id))?;

    let paid = match document.kind.payment_direction() {
        Some(direction) => {
            payment_repo::sum_active_for_document_pool(pool, document_id, direction).await?
        }
        None => Decimal::ZERO,
    };

    Ok(BalanceResult::reconcile(document.total, paid))
}

/// Compute a document's balance inside a transaction, optionally excluding
/// one payment.
///
/// Write paths use this so the guard re-reads the current aggregate in the
/// same transaction as the write; a payment edit passes its own id so its
/// previous amount does not count against its headroom.
pub async fn compute_balance_tx(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
    exclude_payment: Option<Uuid>,
) -> Result<BalanceResult, BalanceError> {
    let document = document_repo::find_by_id_tx(tx, document_id)
        .await?
        .ok_or(ValidationError::DocumentNotFound(document_id))?;

    let paid = match document.kind.payment_direction() {
        Some(direction) => {
            payment_repo::sum_active_for_document(tx, document_id, direction, exclude_payment)
                .await?
        }
        None => Decimal::ZERO,
    };

    Ok(BalanceResult::reconcile(document.total, paid))
}
