//! User registration and email verification routes.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, FixedOffset};
use corebank_core::auth::hash_password;
use corebank_core::task::{QUEUE_CRITICAL, TaskOptions};
use corebank_core::user::validate_new_user;
use corebank_db::entities::users;
use corebank_db::{CreateUserParams, CreateUserTxParams, VerifyEmailTxParams};
use corebank_shared::AppError;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{AppState, error::ApiError};

/// Retry budget of the verification email task.
const VERIFY_EMAIL_MAX_RETRY: i32 = 10;

/// Delay before the verification email is sent, leaving room for the
/// enclosing request to finish.
const VERIFY_EMAIL_DELAY_SECS: i64 = 10;

/// Default options of the verification email task.
pub fn verify_email_options() -> TaskOptions {
    TaskOptions::default()
        .queue(QUEUE_CRITICAL)
        .max_retry(VERIFY_EMAIL_MAX_RETRY)
        .delay(chrono::Duration::seconds(VERIFY_EMAIL_DELAY_SECS))
}

/// Creates the user routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/verify-email", get(verify_email))
}

/// Request body for registering a user.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// Login name, `[a-z0-9_]{3,100}`.
    pub username: String,
    /// Plaintext password, 6-100 characters.
    pub password: String,
    /// Display name.
    pub full_name: String,
    /// Email address to verify.
    pub email: String,
}

/// Public view of a user; never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// Login name.
    pub username: String,
    /// Display name.
    pub full_name: String,
    /// Email address.
    pub email: String,
    /// Whether the email address was verified.
    pub is_email_verified: bool,
    /// Last password change.
    pub password_changed_at: DateTime<FixedOffset>,
    /// Registration time.
    pub created_at: DateTime<FixedOffset>,
}

impl From<users::Model> for UserResponse {
    fn from(user: users::Model) -> Self {
        Self {
            username: user.username,
            full_name: user.full_name,
            email: user.email,
            is_email_verified: user.is_email_verified,
            password_changed_at: user.password_changed_at,
            created_at: user.created_at,
        }
    }
}

/// Query of the link mailed by the verification task.
#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    /// Verification record id.
    pub email_id: i64,
    /// Plaintext secret code.
    pub secret_code: String,
}

/// Response of a successful verification.
#[derive(Debug, Serialize)]
pub struct VerifyEmailResponse {
    /// Always true on success.
    pub is_verified: bool,
}

/// POST /users - Register a user and schedule the verification email.
async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_new_user(
        &payload.username,
        &payload.password,
        &payload.full_name,
        &payload.email,
    )
    .map_err(|e| AppError::Validation(e.to_string()))?;

    let hashed_password = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        AppError::Internal("failed to hash password".to_string())
    })?;

    let user = state
        .store
        .create_user_tx(CreateUserTxParams {
            user: CreateUserParams {
                username: payload.username,
                hashed_password,
                full_name: payload.full_name.trim().to_string(),
                email: payload.email,
            },
            verify_email: state.verify_email.clone(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /users/verify-email - Redeem a verification link.
async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Json<VerifyEmailResponse>, ApiError> {
    let result = state
        .store
        .verify_email_tx(VerifyEmailTxParams {
            email_id: query.email_id,
            secret_code: query.secret_code,
        })
        .await?;

    Ok(Json(VerifyEmailResponse {
        is_verified: result.user.is_email_verified,
    }))
}
