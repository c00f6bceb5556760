//! Repository for the party ledger: derived accounting rows, one per
//! (source, side).
//!
//! The ledger is a materialized view of documents and payments; it is only
//! ever written through the lifecycle services. The partial unique index on
//! (source_type, source_id, side) for active rows is the final arbiter of
//! the one-active-entry invariant, not application logic.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{LedgerSide, LedgerSource};

/// Party ledger entry (for reading from DB)
#[derive(Debug, Clone, FromRow)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub party_id: Uuid,
    pub side: LedgerSide,
    pub source_type: LedgerSource,
    pub source_id: Uuid,
    pub amount: Decimal,
    pub reference: String,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Struct for upserting a ledger entry.
///
/// `amount` is the current, fully-recomputed signed value for the source:
/// positive for receivable/payable increases, negative for reductions.
/// The store replaces, never accumulates.
#[derive(Debug, Clone)]
pub struct LedgerEntryUpsert {
    pub party_id: Uuid,
    pub side: LedgerSide,
    pub source_type: LedgerSource,
    pub source_id: Uuid,
    pub amount: Decimal,
    pub reference: String,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Upsert the ledger entry for a source.
///
/// Inserts, or updates the existing active row for the same
/// (source_type, source_id, side) key in place. Idempotent: calling again
/// with the same inputs leaves the same single row.
pub async fn upsert_entry(
    tx: &mut Transaction<'_, Postgres>,
    entry: &LedgerEntryUpsert,
) -> Result<LedgerEntry, sqlx::Error> {
    sqlx::query_as::<_, LedgerEntry>(
        r#"
        INSERT INTO party_ledger_entries
            (id, party_id, side, source_type, source_id, amount,
             reference, notes, occurred_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (source_type, source_id, side) WHERE NOT is_deleted
        DO UPDATE SET
            party_id = EXCLUDED.party_id,
            amount = EXCLUDED.amount,
            reference = EXCLUDED.reference,
            notes = EXCLUDED.notes,
            occurred_at = EXCLUDED.occurred_at,
            updated_at = NOW()
        RETURNING id, party_id, side, source_type, source_id, amount,
                  reference, notes, occurred_at, is_deleted, deleted_at,
                  created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.party_id)
    .bind(entry.side)
    .bind(entry.source_type)
    .bind(entry.source_id)
    .bind(entry.amount)
    .bind(&entry.reference)
    .bind(&entry.notes)
    .bind(entry.occurred_at)
    .fetch_one(&mut **tx)
    .await
}

/// Collapse duplicate active rows for one (source_type, source_id, side).
///
/// Self-healing for legacy data that predates the unique index: keeps the
/// oldest row, soft-deletes the rest, and returns the survivor. Not part of
/// the steady-state write path.
pub async fn ensure_single_entry_for_source(
    tx: &mut Transaction<'_, Postgres>,
    source_type: LedgerSource,
    source_id: Uuid,
    side: LedgerSide,
) -> Result<Option<LedgerEntry>, sqlx::Error> {
    let rows = sqlx::query_as::<_, LedgerEntry>(
        r#"
        SELECT id, party_id, side, source_type, source_id, amount,
               reference, notes, occurred_at, is_deleted, deleted_at,
               created_at, updated_at
        FROM party_ledger_entries
        WHERE source_type = $1 AND source_id = $2 AND side = $3 AND NOT is_deleted
        ORDER BY created_at, id
        "#,
    )
    .bind(source_type)
    .bind(source_id)
    .bind(side)
    .fetch_all(&mut **tx)
    .await?;

    let Some((survivor, duplicates)) = rows.split_first() else {
        return Ok(None);
    };

    if !duplicates.is_empty() {
        let duplicate_ids: Vec<Uuid> = duplicates.iter().map(|e| e.id).collect();

        tracing::warn!(
            source_id = %source_id,
            side = ?side,
            survivor_id = %survivor.id,
            duplicate_count = duplicate_ids.len(),
            "Duplicate ledger entries found for source, collapsing to oldest"
        );

        sqlx::query(
            r#"
            UPDATE party_ledger_entries
            SET is_deleted = TRUE, deleted_at = NOW(), updated_at = NOW()
            WHERE id = ANY($1)
            "#,
        )
        .bind(&duplicate_ids)
        .execute(&mut **tx)
        .await?;
    }

    Ok(Some(survivor.clone()))
}

/// Find all active ledger entries for a source (any side)
pub async fn find_active_by_source(
    pool: &PgPool,
    source_type: LedgerSource,
    source_id: Uuid,
) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    sqlx::query_as::<_, LedgerEntry>(
        r#"
        SELECT id, party_id, side, source_type, source_id, amount,
               reference, notes, occurred_at, is_deleted, deleted_at,
               created_at, updated_at
        FROM party_ledger_entries
        WHERE source_type = $1 AND source_id = $2 AND NOT is_deleted
        ORDER BY created_at
        "#,
    )
    .bind(source_type)
    .bind(source_id)
    .fetch_all(pool)
    .await
}

/// Soft-delete all active ledger entries for one source
pub async fn soft_delete_for_source(
    tx: &mut Transaction<'_, Postgres>,
    source_type: LedgerSource,
    source_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE party_ledger_entries
        SET is_deleted = TRUE, deleted_at = NOW(), updated_at = NOW()
        WHERE source_type = $1 AND source_id = $2 AND NOT is_deleted
        "#,
    )
    .bind(source_type)
    .bind(source_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

/// Soft-delete the ledger entries of a set of payment sources in one
/// statement (cancellation cascade)
pub async fn soft_delete_for_payment_sources(
    tx: &mut Transaction<'_, Postgres>,
    payment_ids: &[Uuid],
) -> Result<u64, sqlx::Error> {
    if payment_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"
        UPDATE party_ledger_entries
        SET is_deleted = TRUE, deleted_at = NOW(), updated_at = NOW()
        WHERE source_type = 'payment' AND source_id = ANY($1) AND NOT is_deleted
        "#,
    )
    .bind(payment_ids)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

/// List a party's active ledger entries, oldest occurrence first.
/// This is the query party statements are built from.
pub async fn list_active_by_party(
    pool: &PgPool,
    party_id: Uuid,
) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    sqlx::query_as::<_, LedgerEntry>(
        r#"
        SELECT id, party_id, side, source_type, source_id, amount,
               reference, notes, occurred_at, is_deleted, deleted_at,
               created_at, updated_at
        FROM party_ledger_entries
        WHERE party_id = $1 AND NOT is_deleted
        ORDER BY occurred_at, created_at
        "#,
    )
    .bind(party_id)
    .fetch_all(pool)
    .await
}
