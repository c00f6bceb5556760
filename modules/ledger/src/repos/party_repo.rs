use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

/// System key of the implicitly-materialized walk-in customer used for
/// anonymous/unregistered sales.
pub const WALK_IN_SYSTEM_KEY: &str = "walk_in_customer";

/// Party model: a customer, supplier, or both
#[derive(Debug, Clone, FromRow)]
pub struct Party {
    pub id: Uuid,
    pub display_name: String,
    /// Set on system-reserved parties that must never be deleted
    pub system_key: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Struct for inserting a party
#[derive(Debug, Clone)]
pub struct NewParty {
    pub display_name: String,
    pub system_key: Option<String>,
}

/// Errors that can occur during party repository operations
#[derive(Debug, Error)]
pub enum PartyError {
    #[error("Party not found: {0}")]
    NotFound(Uuid),

    #[error("Party {0} has been deleted")]
    Deleted(Uuid),

    #[error("Party {0} is system-reserved and cannot be deleted")]
    SystemReserved(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Insert a new party and return its id
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    party: &NewParty,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO parties (id, display_name, system_key)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(id)
    .bind(&party.display_name)
    .bind(&party.system_key)
    .execute(&mut **tx)
    .await?;

    Ok(id)
}

/// Find a party by id, deleted or not
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Party>, sqlx::Error> {
    sqlx::query_as::<_, Party>(
        r#"
        SELECT id, display_name, system_key, is_deleted, deleted_at, created_at
        FROM parties
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Find a party by id within a transaction
pub async fn find_by_id_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<Party>, sqlx::Error> {
    sqlx::query_as::<_, Party>(
        r#"
        SELECT id, display_name, system_key, is_deleted, deleted_at, created_at
        FROM parties
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

/// Find an active party by id within a transaction
/// Returns an error if the party doesn't exist or has been soft-deleted
pub async fn find_active_by_id_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Party, PartyError> {
    let party = find_by_id_tx(tx, id).await?;

    match party {
        Some(p) if !p.is_deleted => Ok(p),
        Some(_) => Err(PartyError::Deleted(id)),
        None => Err(PartyError::NotFound(id)),
    }
}

/// Find a system party by its key, materializing it on first use.
///
/// Safe under concurrent first-callers: the insert is `ON CONFLICT DO
/// NOTHING` on the unique system_key and the winner's row is re-read.
pub async fn find_or_create_system(
    tx: &mut Transaction<'_, Postgres>,
    system_key: &str,
    display_name: &str,
) -> Result<Party, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO parties (id, display_name, system_key)
        VALUES ($1, $2, $3)
        ON CONFLICT (system_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(display_name)
    .bind(system_key)
    .execute(&mut **tx)
    .await?;

    sqlx::query_as::<_, Party>(
        r#"
        SELECT id, display_name, system_key, is_deleted, deleted_at, created_at
        FROM parties
        WHERE system_key = $1
        "#,
    )
    .bind(system_key)
    .fetch_one(&mut **tx)
    .await
}

/// Soft-delete a party. System-reserved parties are refused.
pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<(), PartyError> {
    let party = find_by_id(pool, id).await?.ok_or(PartyError::NotFound(id))?;

    if party.system_key.is_some() {
        return Err(PartyError::SystemReserved(id));
    }

    sqlx::query(
        r#"
        UPDATE parties
        SET is_deleted = TRUE, deleted_at = NOW()
        WHERE id = $1 AND NOT is_deleted
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    tracing::info!(party_id = %id, "Party soft-deleted");

    Ok(())
}
