//! Authentication endpoints: registration, OTP verification, login

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{generate_otp_code, hash_password, verify_password};
use crate::email::EmailSender;
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{Datastore, NewUser, PublicUser};

/// OTP lifetime from issuance
const OTP_TTL_MINUTES: i64 = 15;

/// Role assigned to self-registered accounts
const DEFAULT_ROLE: &str = "Admin";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub agree_to_terms: Option<bool>,
    /// When true, only re-issues an OTP for an earlier registration
    #[serde(default)]
    pub resend: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

fn require(field: Option<String>) -> Result<String, AppError> {
    field
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::Validation("All fields are required".to_string()))
}

/// Generate a fresh OTP for the email, store it (invalidating any prior
/// one), and hand it to the mailer. A mail failure is logged but does not
/// fail the request: the DB rows are already committed and the resend
/// endpoint is the recovery path.
fn issue_otp<D, E>(state: &AppState<D, E>, email: &str) -> Result<(), AppError>
where
    D: Datastore,
    E: EmailSender,
{
    let code = generate_otp_code();
    let expires_at = Utc::now() + Duration::minutes(OTP_TTL_MINUTES);
    state.store.replace_otp(email, &code, expires_at)?;

    if let Err(e) = state.mailer.send_otp(email, &code) {
        tracing::warn!(email = %email, error = %e, "Failed to send OTP email");
    }

    Ok(())
}

/// POST /auth/register
///
/// With `resend: true` only an email is required and a fresh OTP is
/// issued. Otherwise creates the account and sends the first OTP.
pub async fn register<D, E>(
    State(state): State<Arc<AppState<D, E>>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError>
where
    D: Datastore,
    E: EmailSender,
{
    if req.resend {
        let email = req
            .email
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppError::missing("email"))?;

        issue_otp(&state, &email)?;

        return Ok(Json(RegisterResponse {
            message: "Verification code resent".to_string(),
            user_id: None,
        }));
    }

    let full_name = require(req.full_name)?;
    let email = require(req.email)?;
    let password = require(req.password)?;
    let company_name = require(req.company_name)?;
    if !req.agree_to_terms.unwrap_or(false) {
        return Err(AppError::Validation("All fields are required".to_string()));
    }

    if state.store.get_user_by_email(&email)?.is_some() {
        return Err(AppError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let password_hash = hash_password(&password).map_err(|e| AppError::Internal(e.to_string()))?;

    let user_id = state.store.create_user(NewUser {
        full_name,
        email: email.clone(),
        password_hash,
        company_name,
        role: DEFAULT_ROLE.to_string(),
    })?;

    issue_otp(&state, &email)?;

    Ok(Json(RegisterResponse {
        message: "Registration successful".to_string(),
        user_id: Some(user_id.0),
    }))
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub user: PublicUser,
    pub token: String,
    pub message: String,
}

/// POST /auth/verify-2fa
///
/// Consumes an unexpired OTP for the email, marks the user verified and
/// issues a session token. Codes are single-use: a replay fails with 401.
pub async fn verify_2fa<D, E>(
    State(state): State<Arc<AppState<D, E>>>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, AppError>
where
    D: Datastore,
    E: EmailSender,
{
    let email = req.email.filter(|s| !s.trim().is_empty()).ok_or_else(|| {
        AppError::Validation("Email and verification code are required".to_string())
    })?;
    let code = req
        .code
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            AppError::Validation("Email and verification code are required".to_string())
        })?;

    // Canonical OTP format rule: exactly 6 digits, checked before any
    // store lookup so the caller sees 400 rather than 401 for a malformed
    // code.
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "Verification code must be 6 digits".to_string(),
        ));
    }

    if state.store.get_user_by_email(&email)?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    if !state.store.consume_otp(&email, &code, Utc::now())? {
        return Err(AppError::Auth("Invalid or expired OTP".to_string()));
    }

    state.store.mark_verified(&email)?;

    // Re-fetch so the response reflects the verified flag
    let user = state
        .store
        .get_user_by_email(&email)?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let session = state.store.create_session(user.id)?;

    Ok(Json(VerifyResponse {
        user: user.sanitized(),
        token: session.token,
        message: "Two-factor authentication successful".to_string(),
    }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: PublicUser,
    pub message: String,
    pub requires_two_factor: bool,
}

/// POST /auth/login
pub async fn login<D, E>(
    State(state): State<Arc<AppState<D, E>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError>
where
    D: Datastore,
    E: EmailSender,
{
    let email = req
        .email
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Email and password are required".to_string()))?;
    let password = req
        .password
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("Email and password are required".to_string()))?;

    let user = state
        .store
        .get_user_by_email(&email)?
        .ok_or_else(|| AppError::Auth("Invalid credentials".to_string()))?;

    let valid = verify_password(&password, &user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if !valid {
        return Err(AppError::Auth("Invalid credentials".to_string()));
    }

    Ok(Json(LoginResponse {
        requires_two_factor: user.two_factor_enabled,
        user: user.sanitized(),
        message: "Login successful".to_string(),
    }))
}

#[derive(Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// POST /auth/logout
///
/// Invalidates a session token. The token must belong to a live session;
/// a second logout with the same token fails with 401.
pub async fn logout<D, E>(
    State(state): State<Arc<AppState<D, E>>>,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<LogoutResponse>, AppError>
where
    D: Datastore,
    E: EmailSender,
{
    let token = req
        .token
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::missing("token"))?;

    if state.store.get_session(&token)?.is_none() {
        return Err(AppError::Auth("Invalid session".to_string()));
    }

    state.store.delete_session(&token)?;

    Ok(Json(LogoutResponse {
        message: "Logged out successfully".to_string(),
    }))
}
