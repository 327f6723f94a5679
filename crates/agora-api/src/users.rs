//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/register` | 201 `{token, user}`; 400 if the email is taken |
//! | `POST` | `/auth/login` | 401 on bad credentials |
//! | `GET`  | `/auth/me` | Requires a token |
//! | `POST` | `/auth/logout` | 204; revokes the presented token |

use agora_core::user::{NewUser, User};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};

use crate::{
  ApiState, Backend,
  auth::{CurrentUser, hash_password, start_session, verify_password},
  error::ApiError,
};

/// Response to a successful register or login.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
  pub token: String,
  pub user:  User,
}

// ─── Register ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub username: String,
  pub email:    String,
  pub password: String,
}

/// `POST /auth/register`
pub async fn register<S: Backend>(
  State(state): State<ApiState<S>>,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError> {
  if body.password.is_empty() {
    return Err(ApiError::BadRequest("password must not be empty".into()));
  }

  // Validate before paying for the hash.
  let input = NewUser {
    username:      body.username,
    email:         body.email,
    password_hash: String::new(),
  }
  .normalized()?;
  let input = NewUser { password_hash: hash_password(body.password).await?, ..input };

  let user = state
    .store
    .create_user(input)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::BadRequest("email is already registered".into()))?;

  let token = start_session(&state, user.user_id).await?;
  tracing::info!(user_id = %user.user_id, "registered user");
  Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

/// `POST /auth/login`
pub async fn login<S: Backend>(
  State(state): State<ApiState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<AuthResponse>, ApiError> {
  let email = body.email.trim().to_lowercase();
  let creds = state
    .store
    .find_credentials(email)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Unauthorized)?;

  if !verify_password(body.password, creds.password_hash).await? {
    tracing::warn!(user_id = %creds.user.user_id, "rejected login");
    return Err(ApiError::Unauthorized);
  }

  let token = start_session(&state, creds.user.user_id).await?;
  tracing::info!(user_id = %creds.user.user_id, "user logged in");
  Ok(Json(AuthResponse { token, user: creds.user }))
}

// ─── Session ──────────────────────────────────────────────────────────────────

/// `GET /auth/me`
pub async fn me<S: Backend>(current: CurrentUser) -> Json<User> { Json(current.user) }

/// `POST /auth/logout`
pub async fn logout<S: Backend>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
) -> Result<StatusCode, ApiError> {
  state.store.delete_session(current.token_hash).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
