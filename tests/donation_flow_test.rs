mod common;

use common::*;
use fundline::{
    domain::{CallbackOutcome, DonationFilters, PaymentStatus},
    error::AppError,
    gateway::InitiationOutcome,
    repository::{DonationRepository, UserRepository},
    service::reconciliation_service::GatewayCallback,
};

fn callback(tran_id: &str, val_id: Option<&str>) -> GatewayCallback {
    GatewayCallback {
        tran_id: Some(tran_id.to_string()),
        val_id: val_id.map(str::to_string),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_initiation_persists_pending_donation_after_redirect() -> anyhow::Result<()> {
    let app = setup().await;

    let initiated = app
        .ctx
        .initiation_service
        .initiate_donation(donation_request("Donor@Example.com", 500.0))
        .await?;

    assert_eq!(initiated.url, GATEWAY_PAGE);
    assert!(initiated.transaction_id.starts_with("DON-"));

    let request = app.gateway.last_request().expect("gateway called");
    assert_eq!(request.amount_minor, 50_000);
    assert_eq!(request.success_url, "http://api.test/api/v1/donations/payment/success");
    assert_eq!(request.cancel_url, "http://api.test/api/v1/donations/payment/cancel");
    assert_eq!(request.customer.email, "donor@example.com");

    let donation = app
        .ctx
        .donation_repo
        .find_by_transaction_id(&initiated.transaction_id)
        .await?
        .expect("donation stored");
    assert_eq!(donation.id, initiated.id);
    assert_eq!(donation.status, PaymentStatus::Pending);
    assert_eq!(donation.amount_minor, 50_000);
    assert_eq!(donation.contact, "donor@example.com");

    Ok(())
}

#[tokio::test]
async fn test_gateway_refusal_leaves_no_record() -> anyhow::Result<()> {
    let app = setup().await;

    app.gateway.set_outcome(InitiationOutcome::Rejected {
        reason: "Store Credential Error".to_string(),
    });
    let result = app
        .ctx
        .initiation_service
        .initiate_donation(donation_request("donor@example.com", 100.0))
        .await;
    match result {
        Err(AppError::GatewayInitiationFailed(reason)) => assert_eq!(reason, "Store Credential Error"),
        other => panic!("expected initiation failure, got {:?}", other.map(|d| d.transaction_id)),
    }

    app.gateway.set_outcome(InitiationOutcome::Unavailable {
        reason: "timeout".to_string(),
    });
    let result = app
        .ctx
        .initiation_service
        .initiate_donation(donation_request("donor@example.com", 100.0))
        .await;
    assert!(matches!(result, Err(AppError::GatewayUnavailable(_))));

    assert_eq!(app.ctx.donation_repo.count(&DonationFilters::default()).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_invalid_request_never_reaches_gateway() {
    let app = setup().await;

    let result = app
        .ctx
        .initiation_service
        .initiate_donation(donation_request("not-a-contact", 100.0))
        .await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));

    let result = app
        .ctx
        .initiation_service
        .initiate_donation(donation_request("donor@example.com", 0.0))
        .await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));

    assert_eq!(app.gateway.request_count(), 0);
}

#[tokio::test]
async fn test_sub_cent_amount_is_rejected_before_gateway() -> anyhow::Result<()> {
    let app = setup().await;

    let result = app
        .ctx
        .initiation_service
        .initiate_donation(donation_request("donor@example.com", 0.001))
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    assert_eq!(app.gateway.request_count(), 0);
    assert_eq!(app.ctx.donation_repo.count(&DonationFilters::default()).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_verified_success_completes_and_provisions_once() -> anyhow::Result<()> {
    let app = setup().await;
    let initiated = app
        .ctx
        .initiation_service
        .initiate_donation(donation_request("donor@example.com", 500.0))
        .await?;
    let tran_id = initiated.transaction_id.as_str();
    app.gateway.approve("VAL-1", tran_id, "500.00");

    let ack = app
        .ctx
        .reconciliation_service
        .handle_donation_callback(CallbackOutcome::Success, &callback(tran_id, Some("VAL-1")))
        .await?;
    assert!(ack.changed);
    assert_eq!(ack.status, PaymentStatus::Completed);

    let user = app
        .ctx
        .user_repo
        .find_by_identifier("donor@example.com")
        .await?
        .expect("account provisioned");
    assert_eq!(user.full_name, "Rahim Uddin");

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "donor@example.com");

    // Gateway retries the same callback
    let ack = app
        .ctx
        .reconciliation_service
        .handle_donation_callback(CallbackOutcome::Success, &callback(tran_id, Some("VAL-1")))
        .await?;
    assert!(!ack.changed);
    assert_eq!(app.notifier.sent().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_completed_donation_is_final() -> anyhow::Result<()> {
    let app = setup_with(|s| s.gateway.verify_callbacks = false).await;
    let initiated = app
        .ctx
        .initiation_service
        .initiate_donation(donation_request("01712345678", 250.0))
        .await?;
    let tran_id = initiated.transaction_id.as_str();

    app.ctx
        .reconciliation_service
        .handle_donation_callback(CallbackOutcome::Success, &callback(tran_id, None))
        .await?;

    for outcome in [CallbackOutcome::Fail, CallbackOutcome::Cancel] {
        let result = app
            .ctx
            .reconciliation_service
            .handle_donation_callback(outcome, &callback(tran_id, None))
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    let donation = app.ctx.donation_repo.find_by_transaction_id(tran_id).await?.unwrap();
    assert_eq!(donation.status, PaymentStatus::Completed);

    // Phone contacts get an account but no email
    assert!(app.ctx.user_repo.find_by_identifier("01712345678").await?.is_some());
    assert!(app.notifier.sent().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_unverified_success_is_refused() -> anyhow::Result<()> {
    let app = setup().await;
    let initiated = app
        .ctx
        .initiation_service
        .initiate_donation(donation_request("donor@example.com", 500.0))
        .await?;
    let tran_id = initiated.transaction_id.as_str();

    let missing_val_id = app
        .ctx
        .reconciliation_service
        .handle_donation_callback(CallbackOutcome::Success, &callback(tran_id, None))
        .await;
    assert!(matches!(missing_val_id, Err(AppError::ValidationMismatch(_))));

    app.gateway.approve("VAL-LOW", tran_id, "50.00");
    let wrong_amount = app
        .ctx
        .reconciliation_service
        .handle_donation_callback(CallbackOutcome::Success, &callback(tran_id, Some("VAL-LOW")))
        .await;
    assert!(matches!(wrong_amount, Err(AppError::ValidationMismatch(_))));

    app.gateway.approve("VAL-OTHER", "DON-0-000000000000", "500.00");
    let wrong_tran = app
        .ctx
        .reconciliation_service
        .handle_donation_callback(CallbackOutcome::Success, &callback(tran_id, Some("VAL-OTHER")))
        .await;
    assert!(matches!(wrong_tran, Err(AppError::ValidationMismatch(_))));

    let donation = app.ctx.donation_repo.find_by_transaction_id(tran_id).await?.unwrap();
    assert_eq!(donation.status, PaymentStatus::Pending);
    assert!(app.ctx.user_repo.find_by_identifier("donor@example.com").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_cancel_marks_donation_failed() -> anyhow::Result<()> {
    let app = setup().await;
    let initiated = app
        .ctx
        .initiation_service
        .initiate_donation(donation_request("donor@example.com", 500.0))
        .await?;
    let tran_id = initiated.transaction_id.as_str();

    let ack = app
        .ctx
        .reconciliation_service
        .handle_donation_callback(CallbackOutcome::Cancel, &callback(tran_id, None))
        .await?;
    assert_eq!(ack.status, PaymentStatus::Failed);
    // Fail and cancel are both "failed" for donations, so a later fail is a repeat
    let ack = app
        .ctx
        .reconciliation_service
        .handle_donation_callback(CallbackOutcome::Fail, &callback(tran_id, None))
        .await?;
    assert!(!ack.changed);

    // A late success cannot revive it
    app.gateway.approve("VAL-1", tran_id, "500.00");
    let late = app
        .ctx
        .reconciliation_service
        .handle_donation_callback(CallbackOutcome::Success, &callback(tran_id, Some("VAL-1")))
        .await;
    assert!(matches!(late, Err(AppError::Conflict(_))));
    assert_eq!(app.gateway.validate_count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_unknown_or_missing_transaction() {
    let app = setup().await;

    let unknown = app
        .ctx
        .reconciliation_service
        .handle_donation_callback(CallbackOutcome::Fail, &callback("DON-404", None))
        .await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));

    let missing = app
        .ctx
        .reconciliation_service
        .handle_donation_callback(CallbackOutcome::Fail, &GatewayCallback::default())
        .await;
    assert!(matches!(missing, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_admin_listing_and_donor_history() -> anyhow::Result<()> {
    let app = setup_with(|s| s.gateway.verify_callbacks = false).await;
    let service = &app.ctx.initiation_service;

    let first = service.initiate_donation(donation_request("donor@example.com", 500.0)).await?;
    let second = service.initiate_donation(donation_request("donor@example.com", 250.5)).await?;
    let _pending = service.initiate_donation(donation_request("other@example.com", 99.0)).await?;

    for tran_id in [&first.transaction_id, &second.transaction_id] {
        app.ctx
            .reconciliation_service
            .handle_donation_callback(CallbackOutcome::Success, &callback(tran_id, None))
            .await?;
    }

    let page = app
        .ctx
        .donation_service
        .list_completed(DonationFilters::default(), None, Some(1))
        .await?;
    assert_eq!(page.donations.len(), 1);
    assert_eq!(page.meta.total_items, 2);
    assert_eq!(page.meta.total_pages, 2);
    assert_eq!(page.total_amount_minor, 75_050);

    let by_contact = app
        .ctx
        .donation_service
        .list_completed(
            DonationFilters {
                contact: Some("Other@Example.com".to_string()),
                ..Default::default()
            },
            None,
            None,
        )
        .await?;
    assert_eq!(by_contact.meta.total_items, 0);

    let user = app
        .ctx
        .user_repo
        .find_by_identifier("donor@example.com")
        .await?
        .expect("provisioned");
    let history = app.ctx.donation_service.list_for_user(&user).await?;
    assert_eq!(history.len(), 2);

    Ok(())
}
