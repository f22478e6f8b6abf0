//! Integration tests for registration, OTP verification and login

mod common;

use chrono::{Duration, Utc};
use common::{create_test_server, register_user, verify_user};
use serde_json::{json, Value};

#[tokio::test]
async fn test_register_creates_user_and_sends_otp() {
    let (server, _store, mailer) = create_test_server();

    let user_id = register_user(&server, "bob@example.com", "hunter2hunter2").await;
    assert!(user_id > 0);

    let code = mailer.get_code("bob@example.com").expect("No OTP sent");
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn test_register_missing_field_returns_400() {
    let (server, _store, _mailer) = create_test_server();

    let response = server
        .post("/auth/register")
        .json(&json!({
            "fullName": "Bob",
            "email": "bob@example.com",
            "password": "hunter2hunter2",
            // companyName missing
            "agreeToTerms": true,
        }))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_register_without_terms_returns_400() {
    let (server, _store, _mailer) = create_test_server();

    let response = server
        .post("/auth/register")
        .json(&json!({
            "fullName": "Bob",
            "email": "bob@example.com",
            "password": "hunter2hunter2",
            "companyName": "Acme Construction",
            "agreeToTerms": false,
        }))
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_register_duplicate_email_returns_409() {
    let (server, _store, _mailer) = create_test_server();

    register_user(&server, "bob@example.com", "hunter2hunter2").await;

    let response = server
        .post("/auth/register")
        .json(&json!({
            "fullName": "Other Bob",
            "email": "bob@example.com",
            "password": "differentpass",
            "companyName": "Other Co",
            "agreeToTerms": true,
        }))
        .await;

    assert_eq!(response.status_code(), 409);
}

#[tokio::test]
async fn test_verify_otp_marks_user_verified_and_issues_token() {
    let (server, _store, mailer) = create_test_server();

    register_user(&server, "bob@example.com", "hunter2hunter2").await;
    let code = mailer.get_code("bob@example.com").unwrap();

    let response = server
        .post("/auth/verify-2fa")
        .json(&json!({ "email": "bob@example.com", "code": code }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["user"]["verified"], true);
    assert_eq!(body["user"]["email"], "bob@example.com");
    // Password hash must never leak
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_verify_otp_is_single_use() {
    let (server, _store, mailer) = create_test_server();

    register_user(&server, "bob@example.com", "hunter2hunter2").await;
    let code = mailer.get_code("bob@example.com").unwrap();

    verify_user(&server, &mailer, "bob@example.com").await;

    // Replay with the same code fails
    let response = server
        .post("/auth/verify-2fa")
        .json(&json!({ "email": "bob@example.com", "code": code }))
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_verify_wrong_code_returns_401() {
    let (server, _store, mailer) = create_test_server();

    register_user(&server, "bob@example.com", "hunter2hunter2").await;
    let code = mailer.get_code("bob@example.com").unwrap();
    // Pick a different valid-format code
    let wrong = if code == "999999" { "111111" } else { "999999" };

    let response = server
        .post("/auth/verify-2fa")
        .json(&json!({ "email": "bob@example.com", "code": wrong }))
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_verify_malformed_code_returns_400() {
    let (server, _store, mailer) = create_test_server();

    register_user(&server, "bob@example.com", "hunter2hunter2").await;
    let _ = mailer.get_code("bob@example.com").unwrap();

    for bad in ["12345", "1234567", "12345a", "abcdef"] {
        let response = server
            .post("/auth/verify-2fa")
            .json(&json!({ "email": "bob@example.com", "code": bad }))
            .await;
        assert_eq!(response.status_code(), 400, "code {bad:?}");
    }
}

#[tokio::test]
async fn test_verify_unknown_email_returns_404() {
    let (server, _store, _mailer) = create_test_server();

    let response = server
        .post("/auth/verify-2fa")
        .json(&json!({ "email": "ghost@example.com", "code": "123456" }))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_verify_expired_otp_returns_401() {
    let (server, store, mailer) = create_test_server();

    register_user(&server, "bob@example.com", "hunter2hunter2").await;
    let code = mailer.get_code("bob@example.com").unwrap();

    // Push the stored OTP past its expiry
    store
        .set_otp_expiry("bob@example.com", Utc::now() - Duration::minutes(1))
        .unwrap();

    let response = server
        .post("/auth/verify-2fa")
        .json(&json!({ "email": "bob@example.com", "code": code }))
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_resend_invalidates_previous_otp() {
    let (server, _store, mailer) = create_test_server();

    register_user(&server, "bob@example.com", "hunter2hunter2").await;
    let old_code = mailer.get_code("bob@example.com").unwrap();

    let response = server
        .post("/auth/register")
        .json(&json!({ "resend": true, "email": "bob@example.com" }))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(mailer.sent_count(), 2);

    let new_code = mailer.get_code("bob@example.com").unwrap();

    // Old code no longer verifies (unless the reissue happened to collide)
    if new_code != old_code {
        let response = server
            .post("/auth/verify-2fa")
            .json(&json!({ "email": "bob@example.com", "code": old_code }))
            .await;
        assert_eq!(response.status_code(), 401);
    }

    let response = server
        .post("/auth/verify-2fa")
        .json(&json!({ "email": "bob@example.com", "code": new_code }))
        .await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_resend_without_email_returns_400() {
    let (server, _store, _mailer) = create_test_server();

    let response = server
        .post("/auth/register")
        .json(&json!({ "resend": true }))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_logout_invalidates_session() {
    let (server, _store, mailer) = create_test_server();

    register_user(&server, "bob@example.com", "hunter2hunter2").await;
    let token = verify_user(&server, &mailer, "bob@example.com").await;

    let response = server
        .post("/auth/logout")
        .json(&json!({ "token": token }))
        .await;
    assert_eq!(response.status_code(), 200);

    // The token is gone; a second logout fails
    let response = server
        .post("/auth/logout")
        .json(&json!({ "token": token }))
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_logout_unknown_token_returns_401() {
    let (server, _store, _mailer) = create_test_server();

    let response = server
        .post("/auth/logout")
        .json(&json!({ "token": "not-a-session" }))
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_logout_missing_token_returns_400() {
    let (server, _store, _mailer) = create_test_server();

    let response = server.post("/auth/logout").json(&json!({})).await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_login_success() {
    let (server, _store, mailer) = create_test_server();

    register_user(&server, "bob@example.com", "hunter2hunter2").await;
    verify_user(&server, &mailer, "bob@example.com").await;

    let response = server
        .post("/auth/login")
        .json(&json!({ "email": "bob@example.com", "password": "hunter2hunter2" }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["user"]["email"], "bob@example.com");
    assert_eq!(body["requiresTwoFactor"], false);
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_login_wrong_password_returns_401() {
    let (server, _store, _mailer) = create_test_server();

    register_user(&server, "bob@example.com", "hunter2hunter2").await;

    let response = server
        .post("/auth/login")
        .json(&json!({ "email": "bob@example.com", "password": "wrongpassword" }))
        .await;

    assert_eq!(response.status_code(), 401);
    let body: Value = response.json();
    // Never return user data on a failed login
    assert!(body.get("user").is_none());
}

#[tokio::test]
async fn test_login_unknown_email_returns_401() {
    let (server, _store, _mailer) = create_test_server();

    let response = server
        .post("/auth/login")
        .json(&json!({ "email": "ghost@example.com", "password": "whatever" }))
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_login_missing_fields_returns_400() {
    let (server, _store, _mailer) = create_test_server();

    let response = server
        .post("/auth/login")
        .json(&json!({ "email": "bob@example.com" }))
        .await;
    assert_eq!(response.status_code(), 400);
}
