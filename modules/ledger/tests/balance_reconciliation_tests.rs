mod common;

use rust_decimal::Decimal;
use serial_test::serial;

use ledger_rs::models::{DocumentStatus, DocumentUpdate, LedgerSource, LineInput};
use ledger_rs::repos::ledger_repo;
use ledger_rs::services::{balance_service, document_service, payment_service};
use ledger_rs::validation::ValidationError;

use common::{
    cleanup_document, create_test_party, dec, minutes_ago, payment_input, sales_note_input,
    setup_test_pool, test_actor,
};

#[tokio::test]
#[serial]
async fn test_balance_scenario_full_lifecycle() {
    let pool = setup_test_pool().await;
    let actor = test_actor();
    let party_id = create_test_party(&pool, "Scenario Garden Center").await;

    // Document total 1000.00, no payments
    let input = sales_note_input(
        party_id,
        minutes_ago(60),
        &[("Olive tree 10L", "4", "250.00")],
    );
    let doc_id = document_service::create_document(&pool, &actor, &input)
        .await
        .expect("Failed to create document");

    let balance = balance_service::compute_balance(&pool, doc_id)
        .await
        .expect("Failed to compute balance");
    assert_eq!(balance.total, dec("1000.00"));
    assert_eq!(balance.paid, dec("0"));
    assert_eq!(balance.balance, dec("1000.00"));

    // Add payment 400.00 -> balance 600.00
    let payment_id =
        payment_service::create_payment(&pool, &actor, doc_id, &payment_input("400.00", minutes_ago(50)))
            .await
            .expect("Failed to create payment");

    let balance = balance_service::compute_balance(&pool, doc_id)
        .await
        .expect("Failed to compute balance");
    assert_eq!(balance.paid, dec("400.00"));
    assert_eq!(balance.balance, dec("600.00"));

    // Attempt payment 700.00 -> rejected
    let err = payment_service::create_payment(
        &pool,
        &actor,
        doc_id,
        &payment_input("700.00", minutes_ago(40)),
    )
    .await
    .expect_err("Overpayment should be rejected");
    assert!(matches!(
        err,
        payment_service::PaymentError::Validation(ValidationError::AmountExceedsBalance { .. })
    ));

    // Edit the 400.00 payment to 1000.00 -> balance 0.00
    payment_service::update_payment(
        &pool,
        &actor,
        payment_id,
        &payment_input("1000.00", minutes_ago(30)),
    )
    .await
    .expect("Failed to update payment to the full total");

    let balance = balance_service::compute_balance(&pool, doc_id)
        .await
        .expect("Failed to compute balance");
    assert_eq!(balance.paid, dec("1000.00"));
    assert_eq!(balance.balance, Decimal::ZERO);

    // Cancel the document -> no active ledger rows for either source
    document_service::cancel_document(&pool, &actor, doc_id)
        .await
        .expect("Failed to cancel document");

    let doc_entries = ledger_repo::find_active_by_source(&pool, LedgerSource::Document, doc_id)
        .await
        .expect("Failed to query document ledger entries");
    assert!(doc_entries.is_empty(), "Document ledger entry should be inactive");

    let payment_entries =
        ledger_repo::find_active_by_source(&pool, LedgerSource::Payment, payment_id)
            .await
            .expect("Failed to query payment ledger entries");
    assert!(payment_entries.is_empty(), "Payment ledger entry should be inactive");

    cleanup_document(&pool, doc_id).await;
}

#[tokio::test]
#[serial]
async fn test_balance_floors_at_zero_when_total_shrinks() {
    let pool = setup_test_pool().await;
    let actor = test_actor();
    let party_id = create_test_party(&pool, "Shrinking Order Nursery").await;

    let input = sales_note_input(
        party_id,
        minutes_ago(60),
        &[("Palm seedling", "10", "100.00")],
    );
    let doc_id = document_service::create_document(&pool, &actor, &input)
        .await
        .expect("Failed to create document");

    payment_service::create_payment(&pool, &actor, doc_id, &payment_input("400.00", minutes_ago(50)))
        .await
        .expect("Failed to create payment");

    // Shrink the document below what has already been paid
    let update = DocumentUpdate {
        status: DocumentStatus::Confirmed,
        occurred_at: minutes_ago(40),
        notes: None,
        lines: vec![LineInput {
            description: "Palm seedling".to_string(),
            quantity: dec("3"),
            unit_price: dec("100.00"),
        }],
    };
    document_service::update_document(&pool, &actor, doc_id, &update)
        .await
        .expect("Failed to update document");

    let balance = balance_service::compute_balance(&pool, doc_id)
        .await
        .expect("Failed to compute balance");
    assert_eq!(balance.total, dec("300.00"));
    assert_eq!(balance.paid, dec("400.00"));
    // Floors at zero; overpayment stays visible through paid > total
    assert_eq!(balance.balance, Decimal::ZERO);
    assert!(balance.paid > balance.total);

    cleanup_document(&pool, doc_id).await;
}

#[tokio::test]
#[serial]
async fn test_update_payment_headroom_excludes_itself() {
    let pool = setup_test_pool().await;
    let actor = test_actor();
    let party_id = create_test_party(&pool, "Headroom Nursery").await;

    let input = sales_note_input(party_id, minutes_ago(60), &[("Compost 50L", "5", "100.00")]);
    let doc_id = document_service::create_document(&pool, &actor, &input)
        .await
        .expect("Failed to create document");

    let payment_id =
        payment_service::create_payment(&pool, &actor, doc_id, &payment_input("200.00", minutes_ago(50)))
            .await
            .expect("Failed to create payment");

    // Raising the payment to the full document total is allowed
    payment_service::update_payment(
        &pool,
        &actor,
        payment_id,
        &payment_input("500.00", minutes_ago(40)),
    )
    .await
    .expect("Raising the payment to the full total should be allowed");

    // One cent beyond is not
    let err = payment_service::update_payment(
        &pool,
        &actor,
        payment_id,
        &payment_input("500.01", minutes_ago(30)),
    )
    .await
    .expect_err("Exceeding the total should be rejected");
    assert!(matches!(
        err,
        payment_service::PaymentError::Validation(ValidationError::AmountExceedsBalance { .. })
    ));

    cleanup_document(&pool, doc_id).await;
}
