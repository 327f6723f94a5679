//! Async HTTP client wrapping the Agora JSON API.

use std::time::Duration;

use agora_core::{
  forum::{Comment, CommentView, ForumDetail, ForumView, NewForum},
  reaction::{LikeState, LikeTarget},
  user::User,
};
use anyhow::{Context, Result, anyhow};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sync::{LikeError, LikeTransport};

/// Connection settings for the Agora API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub token:    Option<String>,
}

/// Body of a successful register or login.
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
  pub token: String,
  pub user:  User,
}

#[derive(Serialize)]
struct Register<'a> {
  username: &'a str,
  email:    &'a str,
  password: &'a str,
}

#[derive(Serialize)]
struct Login<'a> {
  email:    &'a str,
  password: &'a str,
}

#[derive(Serialize)]
struct CommentBody<'a> {
  content: &'a str,
}

/// Async HTTP client for the Agora JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    match &self.config.token {
      Some(token) => req.bearer_auth(token),
      None => req,
    }
  }

  /// Turn a non-success response into an error carrying the server's message.
  async fn check(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let message = resp
      .json::<serde_json::Value>()
      .await
      .ok()
      .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_owned))
      .unwrap_or_else(|| status.to_string());
    Err(anyhow!("{what} → {status}: {message}"))
  }

  // ── Accounts ──────────────────────────────────────────────────────────────

  /// `POST /api/auth/register`
  pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<AuthResponse> {
    let resp = self
      .client
      .post(self.url("/auth/register"))
      .json(&Register { username, email, password })
      .send()
      .await
      .context("POST /auth/register failed")?;
    Self::check(resp, "register").await?.json().await.context("deserialising auth response")
  }

  /// `POST /api/auth/login`
  pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
    let resp = self
      .client
      .post(self.url("/auth/login"))
      .json(&Login { email, password })
      .send()
      .await
      .context("POST /auth/login failed")?;
    Self::check(resp, "login").await?.json().await.context("deserialising auth response")
  }

  /// `POST /api/auth/logout`
  pub async fn logout(&self) -> Result<()> {
    let resp = self
      .auth(self.client.post(self.url("/auth/logout")))
      .send()
      .await
      .context("POST /auth/logout failed")?;
    Self::check(resp, "logout").await?;
    Ok(())
  }

  /// `GET /api/auth/me`
  pub async fn me(&self) -> Result<User> {
    let resp = self
      .auth(self.client.get(self.url("/auth/me")))
      .send()
      .await
      .context("GET /auth/me failed")?;
    Self::check(resp, "whoami").await?.json().await.context("deserialising user")
  }

  // ── Forums ────────────────────────────────────────────────────────────────

  /// `GET /api/forums`
  pub async fn list_forums(&self) -> Result<Vec<ForumView>> {
    let resp = self
      .auth(self.client.get(self.url("/forums")))
      .send()
      .await
      .context("GET /forums failed")?;
    Self::check(resp, "list forums").await?.json().await.context("deserialising forums")
  }

  /// `GET /api/forums/{id}`
  pub async fn get_forum(&self, id: Uuid) -> Result<ForumDetail> {
    let resp = self
      .auth(self.client.get(self.url(&format!("/forums/{id}"))))
      .send()
      .await
      .with_context(|| format!("GET /forums/{id} failed"))?;
    Self::check(resp, "show forum").await?.json().await.context("deserialising forum")
  }

  /// `POST /api/forums`
  pub async fn create_forum(&self, input: &NewForum) -> Result<ForumView> {
    #[derive(Serialize)]
    struct Body<'a> {
      title:       &'a str,
      description: &'a str,
      tags:        &'a [String],
    }
    let resp = self
      .auth(self.client.post(self.url("/forums")))
      .json(&Body { title: &input.title, description: &input.description, tags: &input.tags })
      .send()
      .await
      .context("POST /forums failed")?;
    Self::check(resp, "create forum").await?.json().await.context("deserialising forum")
  }

  // ── Comments ──────────────────────────────────────────────────────────────

  /// `GET /api/comments/{id}`
  pub async fn get_comment(&self, id: Uuid) -> Result<CommentView> {
    let resp = self
      .auth(self.client.get(self.url(&format!("/comments/{id}"))))
      .send()
      .await
      .with_context(|| format!("GET /comments/{id} failed"))?;
    Self::check(resp, "show comment").await?.json().await.context("deserialising comment")
  }

  /// `POST /api/comments/forum/{forum_id}`
  pub async fn create_comment(&self, forum_id: Uuid, content: &str) -> Result<Comment> {
    let resp = self
      .auth(self.client.post(self.url(&format!("/comments/forum/{forum_id}"))))
      .json(&CommentBody { content })
      .send()
      .await
      .with_context(|| format!("POST /comments/forum/{forum_id} failed"))?;
    Self::check(resp, "comment").await?.json().await.context("deserialising comment")
  }
}

// ─── Likes ───────────────────────────────────────────────────────────────────

/// Map a toggle response status onto the like error taxonomy.
pub fn classify_status(status: StatusCode) -> Option<LikeError> {
  match status {
    s if s.is_success() => None,
    StatusCode::UNAUTHORIZED => Some(LikeError::Unauthorized),
    StatusCode::NOT_FOUND => Some(LikeError::NotFound),
    StatusCode::REQUEST_TIMEOUT
    | StatusCode::TOO_MANY_REQUESTS
    | StatusCode::BAD_GATEWAY
    | StatusCode::SERVICE_UNAVAILABLE
    | StatusCode::GATEWAY_TIMEOUT => Some(LikeError::Transient(status.to_string())),
    s => Some(LikeError::Protocol(s.to_string())),
  }
}

fn classify_transport(e: &reqwest::Error) -> LikeError {
  if e.is_timeout() || e.is_connect() || e.is_request() {
    LikeError::Transient(e.to_string())
  } else {
    LikeError::Protocol(e.to_string())
  }
}

impl LikeTransport for ApiClient {
  /// `POST /api/{forums|comments}/{id}/like`
  async fn send_toggle(&self, target: LikeTarget) -> Result<LikeState, LikeError> {
    let path = format!("/{}/{}/like", target.kind.collection(), target.id);
    let resp = self
      .auth(self.client.post(self.url(&path)))
      .send()
      .await
      .map_err(|e| classify_transport(&e))?;

    if let Some(err) = classify_status(resp.status()) {
      return Err(err);
    }
    // Only the pair is read; the rest of the likeable is ignored.
    resp
      .json::<LikeState>()
      .await
      .map_err(|e| LikeError::Protocol(format!("decoding like response: {e}")))
  }
}
