//! HTTP server for Agora.
//!
//! Mounts the [`agora_api`] router under `/api` and wraps it in request
//! tracing. The binary in `main.rs` loads [`ServerConfig`], opens the SQLite
//! store, and serves the result.

use std::{path::PathBuf, sync::Arc};

use agora_api::{ApiSettings, Backend, api_router};
use anyhow::Context as _;
use axum::Router;
use chrono::TimeDelta;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `AGORA_*` environment variables. Every field has a default.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  pub store_path:        PathBuf,
  pub session_ttl_hours: i64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:              "127.0.0.1".to_string(),
      port:              8080,
      store_path:        PathBuf::from("~/.local/share/agora/agora.db"),
      session_ttl_hours: 24,
    }
  }
}

impl ServerConfig {
  pub fn api_settings(&self) -> anyhow::Result<ApiSettings> {
    anyhow::ensure!(self.session_ttl_hours > 0, "session_ttl_hours must be positive");
    let session_ttl = TimeDelta::try_hours(self.session_ttl_hours)
      .context("session_ttl_hours is out of range")?;
    Ok(ApiSettings { session_ttl })
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the complete application router.
pub fn router<S: Backend>(store: Arc<S>, settings: ApiSettings) -> Router {
  Router::new()
    .nest("/api", api_router(store, settings))
    .layer(TraceLayer::new_for_http())
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use agora_api::auth::{issue_token, token_digest};
  use agora_core::{
    reaction::LikeTarget,
    store::{ForumStore, ReactionStore},
    user::{NewUser, Session},
  };
  use agora_store_sqlite::SqliteStore;
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use chrono::Utc;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  struct Harness {
    app:   Router,
    store: Arc<SqliteStore>,
  }

  async fn harness() -> Harness {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let app = router(store.clone(), ApiSettings::default());
    Harness { app, store }
  }

  impl Harness {
    async fn send(
      &self,
      method: &str,
      uri: &str,
      token: Option<&str>,
      body: Option<Value>,
    ) -> (StatusCode, Value) {
      let mut builder = Request::builder().method(method).uri(uri);
      if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
      }
      let req = match body {
        Some(body) => builder
          .header(header::CONTENT_TYPE, "application/json")
          .body(Body::from(body.to_string()))
          .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
      };

      let resp = self.app.clone().oneshot(req).await.unwrap();
      let status = resp.status();
      let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
      let value = if bytes.is_empty() {
        Value::Null
      } else {
        serde_json::from_slice(&bytes).unwrap()
      };
      (status, value)
    }

    /// A user with a live session, created without going through argon2.
    async fn user(&self, name: &str) -> (Uuid, String) {
      let user = self
        .store
        .create_user(NewUser {
          username:      name.to_string(),
          email:         format!("{name}@example.com"),
          password_hash: "unused".to_string(),
        })
        .await
        .unwrap()
        .unwrap();
      let token = issue_token();
      let now = Utc::now();
      self
        .store
        .create_session(Session {
          token_hash: token_digest(&token),
          user_id:    user.user_id,
          issued_at:  now,
          expires_at: now + TimeDelta::hours(1),
        })
        .await
        .unwrap();
      (user.user_id, token)
    }

    async fn forum(&self, token: &str, title: &str) -> Uuid {
      let (status, body) = self
        .send(
          "POST",
          "/api/forums",
          Some(token),
          Some(json!({ "title": title, "description": "about things", "tags": ["Rust"] })),
        )
        .await;
      assert_eq!(status, StatusCode::CREATED, "{body}");
      body["forum_id"].as_str().unwrap().parse().unwrap()
    }
  }

  // ── Config ──────────────────────────────────────────────────────────────────

  #[test]
  fn config_defaults_and_ttl() {
    let cfg = ServerConfig::default();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.api_settings().unwrap().session_ttl, TimeDelta::hours(24));

    let bad = ServerConfig { session_ttl_hours: 0, ..ServerConfig::default() };
    assert!(bad.api_settings().is_err());
  }

  // ── Accounts ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn register_login_me_logout() {
    let h = harness().await;

    let (status, body) = h
      .send(
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "alice", "email": "Alice@Example.com", "password": "pw" })),
      )
      .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert!(body["user"].get("password_hash").is_none());

    let (status, body) = h
      .send(
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "pw" })),
      )
      .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, me) = h.send("GET", "/api/auth/me", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "alice");

    let (status, _) = h.send("POST", "/api/auth/logout", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = h.send("GET", "/api/auth/me", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn register_rejects_duplicates_and_blanks() {
    let h = harness().await;
    h.user("bob").await;

    let (status, body) = h
      .send(
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "bobby", "email": "bob@example.com", "password": "pw" })),
      )
      .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("already registered"));

    let (status, _) = h
      .send(
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "  ", "email": "new@example.com", "password": "pw" })),
      )
      .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn login_with_wrong_password_is_unauthorized() {
    let h = harness().await;
    h.send(
      "POST",
      "/api/auth/register",
      None,
      Some(json!({ "username": "carol", "email": "carol@example.com", "password": "right" })),
    )
    .await;

    let (status, body) = h
      .send(
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "carol@example.com", "password": "wrong" })),
      )
      .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = h
      .send(
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "right" })),
      )
      .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn missing_bad_or_expired_tokens_are_rejected() {
    let h = harness().await;

    let req = Request::builder().method("POST").uri("/api/forums").body(Body::empty()).unwrap();
    let resp = h.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));

    let (status, _) = h.send("GET", "/api/auth/me", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (user_id, _) = h.user("dave").await;
    let stale = issue_token();
    let past = Utc::now() - TimeDelta::hours(2);
    h.store
      .create_session(Session {
        token_hash: token_digest(&stale),
        user_id,
        issued_at:  past,
        expires_at: past + TimeDelta::hours(1),
      })
      .await
      .unwrap();
    let (status, _) = h.send("GET", "/api/auth/me", Some(stale.as_str()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  // ── Forums ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn forum_crud_is_owner_only() {
    let h = harness().await;
    let (_, owner) = h.user("owner").await;
    let (_, other) = h.user("other").await;
    let id = h.forum(&owner, "First").await;

    let (status, list) = h.send("GET", "/api/forums", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["tags"], json!(["Rust"]));

    let uri = format!("/api/forums/{id}");
    let (status, _) = h.send("PUT", &uri, Some(other.as_str()), Some(json!({ "title": "Mine" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) =
      h.send("PUT", &uri, Some(owner.as_str()), Some(json!({ "title": "Renamed" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Renamed");
    assert_eq!(body["description"], "about things");

    let (status, _) = h.send("PUT", &uri, Some(owner.as_str()), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = h.send("DELETE", &uri, Some(other.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = h.send("DELETE", &uri, Some(owner.as_str()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = h.send("GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
  }

  #[tokio::test]
  async fn forum_validation_errors_are_bad_requests() {
    let h = harness().await;
    let (_, token) = h.user("val").await;
    let (status, _) = h
      .send("POST", "/api/forums", Some(token.as_str()), Some(json!({ "title": "", "description": "x" })))
      .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  // ── Likes ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn paired_toggles_walk_five_six_five() {
    let h = harness().await;
    let (_, author) = h.user("author").await;
    let id = h.forum(&author, "Popular").await;

    // Five existing likes from other users.
    for i in 0..5 {
      let (fan, _) = h.user(&format!("fan{i}")).await;
      h.store.toggle_like(fan, LikeTarget::forum(id)).await.unwrap().unwrap();
    }
    let (_, a) = h.user("a").await;

    let (status, before) =
      h.send("GET", &format!("/api/forums/{id}"), Some(a.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!((before["likes"].as_u64(), before["liked"].as_bool()), (Some(5), Some(false)));

    let uri = format!("/api/forums/{id}/like");
    let (status, body) = h.send("POST", &uri, Some(a.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["likes"], 6);
    assert_eq!(body["liked"], true);
    assert_eq!(body["title"], "Popular");

    let (_, body) = h.send("POST", &uri, Some(a.as_str()), None).await;
    assert_eq!(body["likes"], 5);
    assert_eq!(body["liked"], false);
  }

  #[tokio::test]
  async fn concurrent_likes_from_two_users_count_twice() {
    let h = harness().await;
    let (_, author) = h.user("author").await;
    let id = h.forum(&author, "Fresh").await;
    let (_, a) = h.user("a").await;
    let (_, b) = h.user("b").await;

    let uri = format!("/api/forums/{id}/like");
    let ((sa, _), (sb, _)) = tokio::join!(
      h.send("POST", &uri, Some(a.as_str()), None),
      h.send("POST", &uri, Some(b.as_str()), None),
    );
    assert_eq!((sa, sb), (StatusCode::OK, StatusCode::OK));

    let forum_uri = format!("/api/forums/{id}");
    for token in [&a, &b] {
      let (_, body) = h.send("GET", &forum_uri, Some(token.as_str()), None).await;
      assert_eq!(body["likes"], 2);
      assert_eq!(body["liked"], true);
    }
    let (_, anon) = h.send("GET", &forum_uri, None, None).await;
    assert_eq!(anon["liked"], false);
  }

  #[tokio::test]
  async fn like_requires_auth_and_an_existing_target() {
    let h = harness().await;
    let (_, token) = h.user("eve").await;
    let id = h.forum(&token, "Here").await;

    let (status, _) = h.send("POST", &format!("/api/forums/{id}/like"), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let missing = Uuid::new_v4();
    let (status, _) =
      h.send("POST", &format!("/api/forums/{missing}/like"), Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) =
      h.send("POST", &format!("/api/comments/{missing}/like"), Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Comments ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn comments_are_listed_liked_and_owned() {
    let h = harness().await;
    let (_, author) = h.user("author").await;
    let (_, reader) = h.user("reader").await;
    let forum_id = h.forum(&author, "Thread").await;
    let list_uri = format!("/api/comments/forum/{forum_id}");

    let (status, comment) =
      h.send("POST", &list_uri, Some(reader.as_str()), Some(json!({ "content": "first!" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_id = comment["comment_id"].as_str().unwrap().to_string();

    let (status, body) =
      h.send("POST", &format!("/api/comments/{comment_id}/like"), Some(author.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!((body["likes"].as_u64(), body["liked"].as_bool()), (Some(1), Some(true)));
    assert_eq!(body["content"], "first!");

    let (status, single) = h.send("GET", &format!("/api/comments/{comment_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!((single["likes"].as_u64(), single["liked"].as_bool()), (Some(1), Some(false)));

    let (_, as_author) = h.send("GET", &list_uri, Some(author.as_str()), None).await;
    assert_eq!(as_author[0]["liked"], true);
    let (_, as_reader) = h.send("GET", &list_uri, Some(reader.as_str()), None).await;
    assert_eq!(as_reader[0]["liked"], false);
    assert_eq!(as_reader[0]["likes"], 1);

    let (_, detail) = h.send("GET", &format!("/api/forums/{forum_id}"), None, None).await;
    assert_eq!(detail["comments"].as_array().unwrap().len(), 1);

    let comment_uri = format!("/api/comments/{comment_id}");
    let (status, _) =
      h.send("PUT", &comment_uri, Some(author.as_str()), Some(json!({ "content": "hijack" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) =
      h.send("PUT", &comment_uri, Some(reader.as_str()), Some(json!({ "content": "edited" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "edited");
    assert_eq!(body["likes"], 1);

    let (status, _) = h.send("DELETE", &comment_uri, Some(reader.as_str()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, after) = h.send("GET", &list_uri, None, None).await;
    assert!(after.as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn comments_on_a_missing_forum_are_not_found() {
    let h = harness().await;
    let (_, token) = h.user("frank").await;
    let uri = format!("/api/comments/forum/{}", Uuid::new_v4());

    let (status, _) = h.send("GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = h.send("POST", &uri, Some(token.as_str()), Some(json!({ "content": "hi" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }
}
