//! Common test utilities for service integration tests

#![allow(dead_code)]

use std::sync::{Arc, RwLock};

use axum_test::TestServer;
use serde_json::json;
use sitestock::{routes, AppState, EmailSender, MemoryStore};

/// Mock email sender that captures OTP codes
#[derive(Default, Clone)]
pub struct MockEmailSender {
    /// Captured (email, code) pairs
    pub sent: Arc<RwLock<Vec<(String, String)>>>,
}

impl MockEmailSender {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Get the last OTP sent to an email
    pub fn get_code(&self, email: &str) -> Option<String> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .rev()
            .find(|(e, _)| e == email)
            .map(|(_, c)| c.clone())
    }

    /// Number of codes sent so far
    pub fn sent_count(&self) -> usize {
        self.sent.read().unwrap().len()
    }
}

impl EmailSender for MockEmailSender {
    fn send_otp(&self, email: &str, code: &str) -> Result<(), String> {
        self.sent
            .write()
            .unwrap()
            .push((email.to_string(), code.to_string()));
        Ok(())
    }
}

/// Create a test server backed by the in-memory store and mock mailer
pub fn create_test_server() -> (TestServer, Arc<MemoryStore>, MockEmailSender) {
    let store = Arc::new(MemoryStore::new());
    let mailer = MockEmailSender::new();

    let state = Arc::new(AppState::new(store.clone(), mailer.clone()));
    let app = routes::create_router(state);
    let server = TestServer::new(app).expect("Failed to create test server");

    (server, store, mailer)
}

/// Register a user and return the new user id
pub async fn register_user(server: &TestServer, email: &str, password: &str) -> i64 {
    let response = server
        .post("/auth/register")
        .json(&json!({
            "fullName": "Test User",
            "email": email,
            "password": password,
            "companyName": "Acme Construction",
            "agreeToTerms": true,
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: serde_json::Value = response.json();
    body["userId"].as_i64().expect("No userId in response")
}

/// Verify a registered user with the captured OTP; returns the session token
pub async fn verify_user(server: &TestServer, mailer: &MockEmailSender, email: &str) -> String {
    let code = mailer.get_code(email).expect("No OTP sent");

    let response = server
        .post("/auth/verify-2fa")
        .json(&json!({ "email": email, "code": code }))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: serde_json::Value = response.json();
    body["token"].as_str().expect("No token in response").to_string()
}

/// Create a purchase order with a single Cement line and return its id
pub async fn create_cement_order(server: &TestServer, po_number: &str) -> i64 {
    let response = server
        .post("/procurement/orders")
        .json(&json!({
            "poNumber": po_number,
            "supplier": "Acme Supplies",
            "deliveryAddress": "Site B",
            "items": [
                { "name": "Cement", "quantity": 50, "unit": "Bags", "price": 12.5 }
            ],
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: serde_json::Value = response.json();
    body["orderId"].as_i64().expect("No orderId in response")
}
