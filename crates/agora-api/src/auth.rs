//! Bearer-token authentication.
//!
//! A token is 32 random bytes, hex-encoded, handed to the client once at
//! login. The store only ever sees its SHA-256 digest, so a leaked database
//! does not leak usable tokens.

use agora_core::user::{Session, User};
use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use chrono::Utc;
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{ApiState, Backend, error::ApiError};

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash `password` into an argon2 PHC string off the async runtime.
pub async fn hash_password(password: String) -> Result<String, ApiError> {
  tokio::task::spawn_blocking(move || {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map(|h| h.to_string())
  })
  .await
  .map_err(|e| ApiError::Internal(e.to_string()))?
  .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Check `password` against a stored PHC string. A malformed hash never
/// verifies.
pub async fn verify_password(password: String, phc: String) -> Result<bool, ApiError> {
  tokio::task::spawn_blocking(move || {
    let Ok(parsed) = PasswordHash::new(&phc) else {
      return false;
    };
    Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
  })
  .await
  .map_err(|e| ApiError::Internal(e.to_string()))
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

/// A fresh random bearer token.
pub fn issue_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

/// Digest under which a token is stored.
pub fn token_digest(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// Extract the token from an `Authorization: Bearer …` header.
///
/// `Ok(None)` when the header is absent; `Err` when it is present but not a
/// usable bearer credential.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
  let Some(value) = headers.get(header::AUTHORIZATION) else {
    return Ok(None);
  };
  let token = value
    .to_str()
    .ok()
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or(ApiError::Unauthorized)?;
  Ok(Some(token))
}

/// Issue a token for `user_id` and persist its session.
pub async fn start_session<S: Backend>(
  state: &ApiState<S>,
  user_id: Uuid,
) -> Result<String, ApiError> {
  let token = issue_token();
  let now = Utc::now();
  let session = Session {
    token_hash: token_digest(&token),
    user_id,
    issued_at:  now,
    expires_at: now + state.settings.session_ttl,
  };
  state.store.create_session(session).await.map_err(ApiError::store)?;
  Ok(token)
}

async fn resolve<S: Backend>(
  headers: &HeaderMap,
  state: &ApiState<S>,
) -> Result<Option<CurrentUser>, ApiError> {
  let Some(token) = bearer_token(headers)? else {
    return Ok(None);
  };
  let token_hash = token_digest(token);

  let session = state
    .store
    .get_session(token_hash.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Unauthorized)?;
  if session.is_expired(Utc::now()) {
    tracing::warn!(user_id = %session.user_id, "rejected expired session");
    return Err(ApiError::Unauthorized);
  }

  let user = state
    .store
    .get_user(session.user_id)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Unauthorized)?;

  Ok(Some(CurrentUser { user, token_hash }))
}

// ─── Extractors ──────────────────────────────────────────────────────────────

/// The authenticated caller. Rejects with 401 when no valid token is sent.
#[derive(Debug, Clone)]
pub struct CurrentUser {
  pub user:       User,
  pub token_hash: String,
}

impl<S: Backend> FromRequestParts<ApiState<S>> for CurrentUser {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    resolve(&parts.headers, state).await?.ok_or(ApiError::Unauthorized)
  }
}

/// The caller if a token was sent, otherwise anonymous. A token that is sent
/// but invalid or expired is still rejected with 401.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl MaybeUser {
  pub fn user_id(&self) -> Option<Uuid> { self.0.as_ref().map(|c| c.user.user_id) }
}

impl<S: Backend> FromRequestParts<ApiState<S>> for MaybeUser {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    Ok(MaybeUser(resolve(&parts.headers, state).await?))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;

  fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    h
  }

  #[test]
  fn tokens_are_random_hex() {
    let a = issue_token();
    let b = issue_token();
    assert_eq!(a.len(), 64);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, b);
  }

  #[test]
  fn digest_is_stable_and_not_the_token() {
    let token = issue_token();
    assert_eq!(token_digest(&token), token_digest(&token));
    assert_ne!(token_digest(&token), token);
    assert_eq!(token_digest(&token).len(), 64);
  }

  #[test]
  fn bearer_header_parsing() {
    assert!(bearer_token(&HeaderMap::new()).unwrap().is_none());
    assert_eq!(bearer_token(&headers("Bearer abc")).unwrap(), Some("abc"));
    assert!(bearer_token(&headers("Basic dXNlcjpwYXNz")).is_err());
    assert!(bearer_token(&headers("Bearer ")).is_err());
  }

  #[tokio::test]
  async fn password_round_trip() {
    let phc = hash_password("hunter2".into()).await.unwrap();
    assert!(phc.starts_with("$argon2"));
    assert!(verify_password("hunter2".into(), phc.clone()).await.unwrap());
    assert!(!verify_password("hunter3".into(), phc).await.unwrap());
  }

  #[tokio::test]
  async fn malformed_hash_never_verifies() {
    assert!(!verify_password("x".into(), "not-a-phc".into()).await.unwrap());
  }
}
