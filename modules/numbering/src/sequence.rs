use chrono::NaiveDate;
use sqlx::{Postgres, Transaction};
use thiserror::Error;

use crate::folio::{Folio, FolioScope};

/// Errors that can occur during folio issuance
#[derive(Debug, Error)]
pub enum NumberingError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Folio sequence for {kind} {year:04}-{month:02} disappeared during issuance")]
    SequenceUnavailable { kind: String, year: i32, month: u32 },
}

/// Issue the next folio for (kind, year, month) within the caller's
/// transaction.
///
/// Protocol: atomic increment-and-read on the counter row; on a missing row,
/// seed it so the first issued number is 1 and the stored next value is 2;
/// if seeding loses a first-of-month race, fall back to the increment path
/// once. No table-level lock is ever taken; the unique constraint on the
/// scope and row-level update atomicity are the arbiters.
///
/// Issued numbers are unique and strictly increasing per scope. Because
/// the increment lives in the caller's transaction, a rollback returns the
/// claimed number; callers must still not rely on contiguity, which is a
/// non-goal of the contract.
pub async fn issue(
    tx: &mut Transaction<'_, Postgres>,
    kind: &str,
    as_of: NaiveDate,
) -> Result<Folio, NumberingError> {
    let scope = FolioScope::for_date(kind, as_of);

    if let Some(number) = try_increment(tx, &scope).await? {
        return Ok(Folio { scope, number });
    }

    if try_seed(tx, &scope).await? {
        return Ok(Folio { scope, number: 1 });
    }

    // Seed lost a concurrent first-of-month race; the row exists now.
    tracing::debug!(
        kind = %scope.kind,
        year = scope.year,
        month = scope.month,
        "Folio seed raced with a concurrent issuer, retrying increment"
    );

    match try_increment(tx, &scope).await? {
        Some(number) => Ok(Folio { scope, number }),
        None => Err(NumberingError::SequenceUnavailable {
            kind: scope.kind,
            year: scope.year,
            month: scope.month,
        }),
    }
}

/// Increment the counter row and return the issued number, or None if no
/// row exists yet for the scope.
async fn try_increment(
    tx: &mut Transaction<'_, Postgres>,
    scope: &FolioScope,
) -> Result<Option<i64>, NumberingError> {
    let next: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE folio_sequences
        SET next_value = next_value + 1, updated_at = NOW()
        WHERE doc_type = $1 AND year = $2 AND month = $3
        RETURNING next_value
        "#,
    )
    .bind(&scope.kind)
    .bind(scope.year)
    .bind(scope.month as i32)
    .fetch_optional(&mut **tx)
    .await?;

    // next_value holds the number to issue next; the one we just claimed
    // is one less.
    Ok(next.map(|n| n - 1))
}

/// Create the counter row for a scope's first issuance. Returns false if a
/// concurrent issuer created it first.
async fn try_seed(
    tx: &mut Transaction<'_, Postgres>,
    scope: &FolioScope,
) -> Result<bool, NumberingError> {
    let result = sqlx::query(
        r#"
        INSERT INTO folio_sequences (doc_type, year, month, next_value)
        VALUES ($1, $2, $3, 2)
        ON CONFLICT (doc_type, year, month) DO NOTHING
        "#,
    )
    .bind(&scope.kind)
    .bind(scope.year)
    .bind(scope.month as i32)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() == 1)
}
