mod common;

use chrono::NaiveDate;
use serial_test::serial;
use uuid::Uuid;

use common::setup_test_pool;

/// A sequence kind no other run has touched, so issued numbers start at 1.
fn fresh_kind() -> String {
    format!("test_{}", Uuid::new_v4().simple())
}

#[tokio::test]
#[serial]
async fn test_concurrent_issuance_yields_dense_unique_range() {
    let pool = setup_test_pool().await;
    let kind = fresh_kind();
    let date = NaiveDate::from_ymd_opt(2025, 6, 15).expect("valid date");

    let mut handles = Vec::new();
    for _ in 0..50 {
        let pool = pool.clone();
        let kind = kind.clone();
        handles.push(tokio::spawn(async move {
            let mut tx = pool.begin().await.expect("Failed to begin transaction");
            let folio = numbering::issue(&mut tx, &kind, date)
                .await
                .expect("Failed to issue folio");
            tx.commit().await.expect("Failed to commit transaction");
            folio.number
        }));
    }

    let mut numbers = Vec::with_capacity(handles.len());
    for handle in handles {
        numbers.push(handle.await.expect("Issuer task panicked"));
    }
    numbers.sort_unstable();

    // Exactly 1..50: no duplicates, no gaps, even under a first-of-month race
    assert_eq!(numbers, (1..=50).collect::<Vec<i64>>());

    sqlx::query("DELETE FROM folio_sequences WHERE doc_type = $1")
        .bind(&kind)
        .execute(&pool)
        .await
        .expect("Failed to cleanup sequence");
}

#[tokio::test]
#[serial]
async fn test_scopes_count_independently() {
    let pool = setup_test_pool().await;
    let kind_a = fresh_kind();
    let kind_b = fresh_kind();
    let june = NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date");
    let july = NaiveDate::from_ymd_opt(2025, 7, 1).expect("valid date");

    let mut tx = pool.begin().await.expect("Failed to begin transaction");

    let a_june_1 = numbering::issue(&mut tx, &kind_a, june).await.expect("issue");
    let a_june_2 = numbering::issue(&mut tx, &kind_a, june).await.expect("issue");
    let a_july = numbering::issue(&mut tx, &kind_a, july).await.expect("issue");
    let b_june = numbering::issue(&mut tx, &kind_b, june).await.expect("issue");

    tx.commit().await.expect("Failed to commit transaction");

    assert_eq!(a_june_1.formatted(), "2025-06-01");
    assert_eq!(a_june_2.formatted(), "2025-06-02");
    // A new month and a different kind each restart at 1
    assert_eq!(a_july.formatted(), "2025-07-01");
    assert_eq!(b_june.formatted(), "2025-06-01");

    for kind in [&kind_a, &kind_b] {
        sqlx::query("DELETE FROM folio_sequences WHERE doc_type = $1")
            .bind(kind)
            .execute(&pool)
            .await
            .expect("Failed to cleanup sequence");
    }
}

#[tokio::test]
#[serial]
async fn test_rollback_returns_number_without_duplicating() {
    let pool = setup_test_pool().await;
    let kind = fresh_kind();
    let date = NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date");

    let mut tx = pool.begin().await.expect("Failed to begin transaction");
    let first = numbering::issue(&mut tx, &kind, date).await.expect("issue");
    tx.commit().await.expect("Failed to commit transaction");
    assert_eq!(first.number, 1);

    // The increment lives in the caller's transaction, so a rollback
    // returns the claimed number instead of burning it
    let mut tx = pool.begin().await.expect("Failed to begin transaction");
    let abandoned = numbering::issue(&mut tx, &kind, date).await.expect("issue");
    assert_eq!(abandoned.number, 2);
    tx.rollback().await.expect("Failed to roll back transaction");

    let mut tx = pool.begin().await.expect("Failed to begin transaction");
    let second = numbering::issue(&mut tx, &kind, date).await.expect("issue");
    tx.commit().await.expect("Failed to commit transaction");
    assert_eq!(second.number, 2);

    sqlx::query("DELETE FROM folio_sequences WHERE doc_type = $1")
        .bind(&kind)
        .execute(&pool)
        .await
        .expect("Failed to cleanup sequence");
}
