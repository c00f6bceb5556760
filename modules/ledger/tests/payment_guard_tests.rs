mod common;

use serial_test::serial;
use uuid::Uuid;

use ledger_rs::models::LedgerSource;
use ledger_rs::repos::ledger_repo;
use ledger_rs::services::{balance_service, document_service, payment_service};
use ledger_rs::validation::ValidationError;

use common::{
    cleanup_document, create_test_party, dec, minutes_ago, payment_input, sales_note_input,
    setup_test_pool, test_actor,
};

#[tokio::test]
#[serial]
async fn test_rejected_overpayment_leaves_no_partial_writes() {
    let pool = setup_test_pool().await;
    let actor = test_actor();
    let party_id = create_test_party(&pool, "Guarded Nursery").await;

    let doc_id = document_service::create_document(
        &pool,
        &actor,
        &sales_note_input(party_id, minutes_ago(60), &[("Grapevine", "5", "100.00")]),
    )
    .await
    .expect("Failed to create document");

    let err = payment_service::create_payment(&pool, &actor, doc_id, &payment_input("600.00", minutes_ago(50)))
        .await
        .expect_err("Overpayment should be rejected");
    assert!(matches!(
        err,
        payment_service::PaymentError::Validation(ValidationError::AmountExceedsBalance { .. })
    ));

    // Full rollback: no payment row, no payment ledger row, and the audit
    // trail still only holds the document creation event
    let payment_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE document_id = $1")
            .bind(doc_id)
            .fetch_one(&pool)
            .await
            .expect("Failed to count payments");
    assert_eq!(payment_count, 0);

    let ledger_count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM party_ledger_entries
        WHERE source_type = 'payment'
          AND source_id IN (SELECT id FROM payments WHERE document_id = $1)
        "#,
    )
    .bind(doc_id)
    .fetch_one(&pool)
    .await
    .expect("Failed to count ledger entries");
    assert_eq!(ledger_count, 0);

    let audit_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM audit_events WHERE root_entity_id = $1")
            .bind(doc_id)
            .fetch_one(&pool)
            .await
            .expect("Failed to count audit events");
    assert_eq!(audit_count, 1);

    cleanup_document(&pool, doc_id).await;
}

#[tokio::test]
#[serial]
async fn test_payment_on_cancelled_document_rejected() {
    let pool = setup_test_pool().await;
    let actor = test_actor();
    let party_id = create_test_party(&pool, "Closed Account Nursery").await;

    let doc_id = document_service::create_document(
        &pool,
        &actor,
        &sales_note_input(party_id, minutes_ago(60), &[("Orchid", "2", "200.00")]),
    )
    .await
    .expect("Failed to create document");
    document_service::cancel_document(&pool, &actor, doc_id)
        .await
        .expect("Failed to cancel document");

    let err = payment_service::create_payment(&pool, &actor, doc_id, &payment_input("100.00", minutes_ago(40)))
        .await
        .expect_err("Payment against a cancelled document should fail");
    assert!(matches!(
        err,
        payment_service::PaymentError::Validation(ValidationError::DocumentCancelled(_))
    ));

    cleanup_document(&pool, doc_id).await;
}

#[tokio::test]
#[serial]
async fn test_payment_on_missing_document_rejected() {
    let pool = setup_test_pool().await;
    let actor = test_actor();
    let missing = Uuid::new_v4();

    let err = payment_service::create_payment(&pool, &actor, missing, &payment_input("100.00", minutes_ago(10)))
        .await
        .expect_err("Payment against a missing document should fail");
    assert!(matches!(
        err,
        payment_service::PaymentError::Validation(ValidationError::DocumentNotFound(_))
    ));
}

#[tokio::test]
#[serial]
async fn test_non_positive_amount_rejected_before_any_read() {
    let pool = setup_test_pool().await;
    let actor = test_actor();

    let err = payment_service::create_payment(
        &pool,
        &actor,
        Uuid::new_v4(),
        &payment_input("0", minutes_ago(10)),
    )
    .await
    .expect_err("Zero amount should be rejected");
    assert!(matches!(
        err,
        payment_service::PaymentError::Validation(ValidationError::NonPositiveAmount(_))
    ));
}

#[tokio::test]
#[serial]
async fn test_soft_deleting_payment_restores_balance() {
    let pool = setup_test_pool().await;
    let actor = test_actor();
    let party_id = create_test_party(&pool, "Refund Nursery").await;

    let doc_id = document_service::create_document(
        &pool,
        &actor,
        &sales_note_input(party_id, minutes_ago(60), &[("Bonsai", "1", "1000.00")]),
    )
    .await
    .expect("Failed to create document");
    let payment_id = payment_service::create_payment(
        &pool,
        &actor,
        doc_id,
        &payment_input("400.00", minutes_ago(50)),
    )
    .await
    .expect("Failed to create payment");

    payment_service::soft_delete_payment(&pool, &actor, payment_id)
        .await
        .expect("Failed to soft-delete payment");

    // The fresh aggregation reflects the deletion immediately
    let balance = balance_service::compute_balance(&pool, doc_id)
        .await
        .expect("Failed to compute balance");
    assert_eq!(balance.paid, dec("0"));
    assert_eq!(balance.balance, dec("1000.00"));

    assert!(
        ledger_repo::find_active_by_source(&pool, LedgerSource::Payment, payment_id)
            .await
            .expect("Failed to query payment ledger entries")
            .is_empty()
    );

    // Deleting an already-deleted payment is a not-found, not a double
    // deletion
    let err = payment_service::soft_delete_payment(&pool, &actor, payment_id)
        .await
        .expect_err("Second deletion should fail");
    assert!(matches!(
        err,
        payment_service::PaymentError::Validation(ValidationError::PaymentNotFound(_))
    ));

    cleanup_document(&pool, doc_id).await;
}
