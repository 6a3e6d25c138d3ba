//! Account API Endpoints
//! Mission: Registration, login, profile, password change, and account deletion

use crate::auth::{
    extract::JsonOrForm,
    jwt::TokenService,
    middleware::unauthorized,
    models::{
        Claims, DetailsResponse, LoginRequest, LoginResponse, MessageResponse, NewUser,
        PasswordRequest, RegisterRequest, UserResponse,
    },
    password::PasswordHasher,
    user_store::{AccountStore, StoreError},
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Minimum accepted password length, in UTF-16 code units
pub const MIN_PASSWORD_LEN: usize = 8;

/// Shared account state
#[derive(Clone)]
pub struct AccountsState {
    pub store: Arc<dyn AccountStore>,
    pub tokens: Arc<TokenService>,
    pub hasher: PasswordHasher,
}

impl AccountsState {
    pub fn new(
        store: Arc<dyn AccountStore>,
        tokens: Arc<TokenService>,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            store,
            tokens,
            hasher,
        }
    }
}

/// Account API errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    /// Public message only; the cause is logged where it happens
    #[error("{0}")]
    Internal(&'static str),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(message) => return unauthorized(message),
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

const INVALID_LOGIN: ApiError = ApiError::Unauthenticated("Invalid email or password");
const USER_NOT_FOUND: ApiError = ApiError::NotFound("User not found");
const WEAK_PASSWORD: ApiError = ApiError::Validation("Password must be at least 8 characters");

/// Length is measured in UTF-16 code units, so astral characters count twice
fn strong_enough(password: &str) -> bool {
    password.encode_utf16().count() >= MIN_PASSWORD_LEN
}

/// Log an unexpected failure with context and hide it behind a generic message
fn internal(context: &'static str, public: &'static str) -> impl FnOnce(anyhow::Error) -> ApiError {
    move |e| {
        error!(error = ?e, "{}", context);
        ApiError::Internal(public)
    }
}

fn store_failure(context: &'static str, public: &'static str) -> impl FnOnce(StoreError) -> ApiError {
    move |e| {
        error!(error = %e, "{}", context);
        ApiError::Internal(public)
    }
}

/// Registration endpoint - POST /users/register
///
/// The duplicate-email lookup deliberately runs before any field checks, so a
/// colliding email answers 409 even when other fields are malformed.
pub async fn register(
    State(state): State<AccountsState>,
    JsonOrForm(payload): JsonOrForm<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    const FAILED: &str = "Server Error";

    if let Some(email) = payload.email.as_str() {
        let existing = state
            .store
            .find_by_email(email)
            .await
            .map_err(store_failure("Registration lookup failed", FAILED))?;
        if existing.is_some() {
            warn!("Registration rejected: email already registered");
            return Err(ApiError::Conflict("Email already registered"));
        }
    }

    let first_name = payload
        .first_name
        .as_str()
        .ok_or(ApiError::Validation("First Name invalid"))?;
    let last_name = payload
        .last_name
        .as_str()
        .ok_or(ApiError::Validation("Last Name invalid"))?;
    let email = payload
        .email
        .as_str()
        .filter(|e| e.contains('@'))
        .ok_or(ApiError::Validation("Email invalid"))?;
    let password = payload
        .password
        .as_str()
        .filter(|p| strong_enough(p))
        .ok_or(WEAK_PASSWORD)?;
    let is_admin = payload
        .is_admin
        .as_bool()
        .ok_or(ApiError::Validation("isAdmin must be a boolean value"))?;

    let password_hash = state
        .hasher
        .hash(password)
        .await
        .map_err(internal("Password hashing failed during registration", FAILED))?;

    let user = state
        .store
        .create(NewUser {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            password_hash,
            is_admin,
        })
        .await
        .map_err(|e| match e {
            StoreError::DuplicateEmail => ApiError::Conflict("Email already registered"),
            other => store_failure("Failed to create user", FAILED)(other),
        })?;

    info!(user_id = %user.id, "Registered user");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Registered Successfully")),
    ))
}

/// Login endpoint - POST /users/login
pub async fn login(
    State(state): State<AccountsState>,
    JsonOrForm(payload): JsonOrForm<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    const FAILED: &str = "Server Error";

    let (email, password) = match (payload.email.as_deref(), payload.password.as_deref()) {
        (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
            (email, password)
        }
        _ => return Err(ApiError::Validation("Email and password are required")),
    };

    if !email.contains('@') {
        return Err(ApiError::Validation("Invalid email format"));
    }

    // Unknown email and wrong password must be indistinguishable
    let Some(user) = state
        .store
        .find_by_email(email)
        .await
        .map_err(store_failure("Login lookup failed", FAILED))?
    else {
        warn!("Failed login attempt: unknown email");
        return Err(INVALID_LOGIN);
    };

    let valid = state
        .hasher
        .verify(password, &user.password_hash)
        .await
        .map_err(internal("Password verification failed during login", FAILED))?;

    if !valid {
        warn!(user_id = %user.id, "Failed login attempt: wrong password");
        return Err(INVALID_LOGIN);
    }

    let access = state
        .tokens
        .issue(&user)
        .map_err(internal("Failed to issue access token", FAILED))?;

    info!(user_id = %user.id, is_admin = user.is_admin, "Login successful");

    Ok(Json(LoginResponse { access }))
}

/// Current user profile - GET /users/details
pub async fn details(
    State(state): State<AccountsState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DetailsResponse>, ApiError> {
    let user = state
        .store
        .find_by_id(&claims.sub)
        .await
        .map_err(store_failure(
            "Error in fetching user profile",
            "Failed to fetch user profile",
        ))?
        .ok_or(USER_NOT_FOUND)?;

    Ok(Json(DetailsResponse {
        user: UserResponse::from_user(&user),
    }))
}

/// Change password - PATCH /users/update-password
pub async fn update_password(
    State(state): State<AccountsState>,
    Extension(claims): Extension<Claims>,
    JsonOrForm(payload): JsonOrForm<PasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    const FAILED: &str = "Failed to update password";

    let mut user = state
        .store
        .find_by_id(&claims.sub)
        .await
        .map_err(store_failure("Error in changing password", FAILED))?
        .ok_or(USER_NOT_FOUND)?;

    let new_password = payload
        .password
        .as_deref()
        .filter(|p| strong_enough(p))
        .ok_or(WEAK_PASSWORD)?;

    user.password_hash = state
        .hasher
        .hash(new_password)
        .await
        .map_err(internal("Password hashing failed during password change", FAILED))?;

    // The record may vanish between lookup and save (concurrent deletion)
    state.store.save(&user).await.map_err(|e| match e {
        StoreError::NotFound(_) => USER_NOT_FOUND,
        other => store_failure("Error in changing password", FAILED)(other),
    })?;

    info!(user_id = %user.id, "Password changed");

    Ok(Json(MessageResponse::new("Password changed successfully")))
}

/// Delete own account after re-authentication - DELETE /users/delete-account
pub async fn delete_account(
    State(state): State<AccountsState>,
    Extension(claims): Extension<Claims>,
    JsonOrForm(payload): JsonOrForm<PasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    const FAILED: &str = "Failed to delete account";

    let user = state
        .store
        .find_by_id(&claims.sub)
        .await
        .map_err(store_failure("Error in deleting account", FAILED))?
        .ok_or(USER_NOT_FOUND)?;

    let password = payload
        .password
        .as_deref()
        .ok_or(ApiError::Validation("Password is required"))?;

    let valid = state
        .hasher
        .verify(password, &user.password_hash)
        .await
        .map_err(internal("Password verification failed during deletion", FAILED))?;

    if !valid {
        warn!(user_id = %user.id, "Account deletion rejected: wrong password");
        return Err(ApiError::Unauthenticated("Incorrect password"));
    }

    state
        .store
        .delete_by_id(&user.id)
        .await
        .map_err(store_failure("Error in deleting account", FAILED))?;

    info!(user_id = %user.id, "Account deleted");

    Ok(Json(MessageResponse::new("Account deleted successfully")))
}
