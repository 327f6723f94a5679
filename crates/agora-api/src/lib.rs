//! JSON REST API for Agora.
//!
//! Exposes an axum [`Router`] backed by any store implementing both
//! [`ForumStore`] and [`ReactionStore`]. TLS and tracing layers are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", agora_api::api_router(store.clone(), ApiSettings::default()))
//! ```

pub mod auth;
pub mod comments;
pub mod error;
pub mod forums;
pub mod likes;
pub mod users;

use std::sync::Arc;

use agora_core::store::{ForumStore, ReactionStore};
use axum::{
  Router,
  routing::{get, post},
};
use chrono::TimeDelta;

pub use error::ApiError;

/// A store that can back the whole API.
pub trait Backend: ForumStore + ReactionStore + 'static {}

impl<T> Backend for T where T: ForumStore + ReactionStore + 'static {}

/// Tunables for the API layer.
#[derive(Debug, Clone)]
pub struct ApiSettings {
  /// Lifetime of a bearer token issued at login or registration.
  pub session_ttl: TimeDelta,
}

impl Default for ApiSettings {
  fn default() -> Self { Self { session_ttl: TimeDelta::hours(24) } }
}

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:    Arc<S>,
  pub settings: Arc<ApiSettings>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), settings: Arc::clone(&self.settings) }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S: Backend>(store: Arc<S>, settings: ApiSettings) -> Router<()> {
  let state = ApiState { store, settings: Arc::new(settings) };

  Router::new()
    // Accounts
    .route("/auth/register", post(users::register::<S>))
    .route("/auth/login", post(users::login::<S>))
    .route("/auth/logout", post(users::logout::<S>))
    .route("/auth/me", get(users::me::<S>))
    // Forums
    .route("/forums", get(forums::list::<S>).post(forums::create::<S>))
    .route(
      "/forums/{id}",
      get(forums::get_one::<S>).put(forums::update::<S>).delete(forums::remove::<S>),
    )
    .route("/forums/{id}/like", post(forums::like::<S>))
    // Comments
    .route(
      "/comments/forum/{forum_id}",
      get(comments::list::<S>).post(comments::create::<S>),
    )
    .route(
      "/comments/{id}",
      get(comments::get_one::<S>).put(comments::update::<S>).delete(comments::remove::<S>),
    )
    .route("/comments/{id}/like", post(comments::like::<S>))
    .with_state(state)
}
