mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use common::*;
use fundline::{
    api::create_app,
    auth::AuthService,
    domain::{NewUser, PaymentStatus, Role},
    repository::{DonationRepository, UserRepository},
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app_router(app: &TestApp) -> Router {
    create_app(app.ctx.clone(), app.settings.clone())
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn create_user(app: &TestApp, email: &str, password: &str, role: Role) {
    let password_hash = AuthService::hash_password(password).await.unwrap();
    app.ctx
        .user_repo
        .create(NewUser {
            full_name: "Site Admin".to_string(),
            email: Some(email.to_string()),
            phone: None,
            password_hash,
            role,
        })
        .await
        .unwrap();
}

/// Logs in and returns the `name=value` part of the session cookie.
async fn login(router: &Router, identifier: &str, password: &str) -> String {
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            json!({ "identifier": identifier, "password": password }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("session cookie")
        .to_string();
    cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn test_health_and_root() {
    let app = setup().await;
    let router = app_router(&app);

    let response = router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_create_donation_returns_redirect_url() {
    let app = setup().await;
    let router = app_router(&app);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/donations",
            json!({ "purpose": "Zakat", "contact": "donor@example.com", "amount": 1200 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["url"], GATEWAY_PAGE);
    assert!(body["data"]["transactionId"].as_str().unwrap().starts_with("DON-"));
}

#[tokio::test]
async fn test_invalid_donation_is_400_with_details() {
    let app = setup().await;
    let router = app_router(&app);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/donations",
            json!({ "purpose": "", "contact": "nope", "amount": 10 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["success"], false);
    assert!(body["details"].is_object());
}

#[tokio::test]
async fn test_callback_redirects_browser_to_frontend() {
    let app = setup_with(|s| s.gateway.verify_callbacks = false).await;
    let router = app_router(&app);

    let initiated = app
        .ctx
        .initiation_service
        .initiate_donation(donation_request("donor@example.com", 100.0))
        .await
        .unwrap();
    let tran_id = initiated.transaction_id;

    let response = router
        .clone()
        .oneshot(form_request(
            "/api/v1/donations/payment/success",
            &format!("tran_id={}&status=VALID", tran_id),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains(&format!(
        "window.location.replace(\"http://web.test/payment/success?tran_id={}\")",
        tran_id
    )));

    let donation = app.ctx.donation_repo.find_by_transaction_id(&tran_id).await.unwrap().unwrap();
    assert_eq!(donation.status, PaymentStatus::Completed);

    // A late fail is rejected but the browser still gets a page
    let response = router
        .oneshot(form_request("/api/v1/donations/payment/fail", &format!("tran_id={}", tran_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let html = body_text(response).await;
    assert!(html.contains("http://web.test/payment/fail?tran_id="));
}

#[tokio::test]
async fn test_callback_for_unknown_transaction_is_404() {
    let app = setup().await;
    let router = app_router(&app);

    let response = router
        .oneshot(form_request("/api/v1/members/payment/cancel", "tran_id=MEM-unknown"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("payment/fail?tran_id=MEM-unknown"));
}

#[tokio::test]
async fn test_callback_with_unreadable_body_still_redirects() {
    let app = setup().await;
    let router = app_router(&app);

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/donations/payment/success",
            json!({ "tran_id": "DON-1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let html = body_text(response).await;
    assert!(html.contains("window.location.replace(\"http://web.test/payment/fail\")"));

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/members/payment/cancel")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("http://web.test/payment/fail"));
    assert_eq!(app.gateway.validate_count(), 0);
}

#[tokio::test]
async fn test_admin_routes_require_admin_session() {
    let app = setup().await;
    create_user(&app, "admin@example.com", "correct-horse", Role::Admin).await;
    create_user(&app, "donor@example.com", "donor-pass", Role::Donor).await;
    let router = app_router(&app);

    let anonymous = router
        .clone()
        .oneshot(Request::builder().uri("/api/v1/members").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let donor_cookie = login(&router, "donor@example.com", "donor-pass").await;
    let donor = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/donations")
                .header(header::COOKIE, &donor_cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(donor.status(), StatusCode::FORBIDDEN);

    // Donors may still see their own history
    let mine = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/donations/my")
                .header(header::COOKIE, &donor_cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(mine.status(), StatusCode::OK);

    let admin_cookie = login(&router, "ADMIN@example.com", "correct-horse").await;
    let admin = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/members?page=1&limit=5&status=pending_approval")
                .header(header::COOKIE, &admin_cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(admin.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(admin).await).unwrap();
    assert_eq!(body["data"]["pagination"]["itemsPerPage"], 5);
    assert_eq!(body["data"]["pagination"]["totalPages"], 1);
}

#[tokio::test]
async fn test_wrong_password_is_401() {
    let app = setup().await;
    create_user(&app, "admin@example.com", "correct-horse", Role::Admin).await;
    let router = app_router(&app);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            json!({ "identifier": "admin@example.com", "password": "battery-staple" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_updates_payment_status() {
    let app = setup().await;
    create_user(&app, "admin@example.com", "correct-horse", Role::Admin).await;
    let router = app_router(&app);
    let cookie = login(&router, "admin@example.com", "correct-horse").await;

    let application = app
        .ctx
        .member_service
        .submit_bank_application(fundline::service::member_service::BankApplication {
            form: member_form("donor", 50_000.0),
            payment_method: fundline::domain::MemberPaymentMethod::BankDeposit,
            transaction_id: None,
            document: Some(fundline::service::member_service::PaymentDocument {
                filename: "slip.pdf".to_string(),
                data: b"%PDF-1.4".to_vec(),
            }),
        })
        .await
        .unwrap();

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/v1/members/{}/payment-status", application.id))
                .header(header::COOKIE, &cookie)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "paymentStatus": "cancel" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["data"]["paymentStatus"], "cancelled");

    let bad = router
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/v1/members/{}/status", application.id))
                .header(header::COOKIE, &cookie)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "status": "expired" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

    assert_eq!(app.notifier.sent().len(), 1);
}
