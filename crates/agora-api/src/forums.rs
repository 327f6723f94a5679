//! Handlers for `/forums` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/forums` | Newest first; `liked` reflects the caller if a token is sent |
//! | `POST`   | `/forums` | Body: `{"title", "description", "tags"?}` |
//! | `GET`    | `/forums/{id}` | Forum with its comments |
//! | `PUT`    | `/forums/{id}` | Author only; partial update |
//! | `DELETE` | `/forums/{id}` | Author only; removes comments and likes |
//! | `POST`   | `/forums/{id}/like` | Toggle; returns the forum with the new pair |

use agora_core::{
  forum::{Forum, ForumDetail, ForumUpdate, ForumView, NewForum},
  reaction::LikeTarget,
};
use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use uuid::Uuid;

use crate::{
  ApiState, Backend,
  auth::{CurrentUser, MaybeUser},
  error::ApiError,
  likes,
};

fn not_found(id: Uuid) -> ApiError { ApiError::NotFound(format!("forum {id}")) }

async fn owned_forum<S: Backend>(
  state: &ApiState<S>,
  id: Uuid,
  current: &CurrentUser,
) -> Result<ForumView, ApiError> {
  let view = state
    .store
    .get_forum(id, Some(current.user.user_id))
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  if view.forum.author.user_id != current.user.user_id {
    return Err(ApiError::Forbidden("only the author may modify this forum".into()));
  }
  Ok(view)
}

// ─── Read ─────────────────────────────────────────────────────────────────────

/// `GET /forums`
pub async fn list<S: Backend>(
  State(state): State<ApiState<S>>,
  viewer: MaybeUser,
) -> Result<Json<Vec<ForumView>>, ApiError> {
  let forums = state.store.list_forums(viewer.user_id()).await.map_err(ApiError::store)?;
  Ok(Json(forums))
}

/// `GET /forums/{id}`
pub async fn get_one<S: Backend>(
  State(state): State<ApiState<S>>,
  viewer: MaybeUser,
  Path(id): Path<Uuid>,
) -> Result<Json<ForumDetail>, ApiError> {
  let viewer_id = viewer.user_id();
  let view = state
    .store
    .get_forum(id, viewer_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  let comments = state.store.list_comments(id, viewer_id).await.map_err(ApiError::store)?;
  Ok(Json(ForumDetail { view, comments }))
}

// ─── Write ────────────────────────────────────────────────────────────────────

/// `POST /forums`
pub async fn create<S: Backend>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  Json(body): Json<NewForum>,
) -> Result<impl IntoResponse, ApiError> {
  let forum = state
    .store
    .create_forum(current.user.user_id, body.validated()?)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(forum_id = %forum.forum_id, author = %current.user.user_id, "created forum");
  Ok((StatusCode::CREATED, Json(ForumView { forum, liked: false })))
}

/// `PUT /forums/{id}`
pub async fn update<S: Backend>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<ForumUpdate>,
) -> Result<Json<ForumView>, ApiError> {
  let update = body.validated()?;
  if update.is_empty() {
    return Err(ApiError::BadRequest("nothing to update".into()));
  }
  let liked = owned_forum(&state, id, &current).await?.liked;

  let forum: Forum = state
    .store
    .update_forum(id, update)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  Ok(Json(ForumView { forum, liked }))
}

/// `DELETE /forums/{id}`
pub async fn remove<S: Backend>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  owned_forum(&state, id, &current).await?;
  if !state.store.delete_forum(id).await.map_err(ApiError::store)? {
    return Err(not_found(id));
  }
  tracing::info!(forum_id = %id, "deleted forum");
  Ok(StatusCode::NO_CONTENT)
}

// ─── Like ─────────────────────────────────────────────────────────────────────

/// `POST /forums/{id}/like`
pub async fn like<S: Backend>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<ForumView>, ApiError> {
  let user_id = current.user.user_id;
  let result = likes::toggle(&state, user_id, LikeTarget::forum(id)).await?;

  let view = state
    .store
    .get_forum(id, Some(user_id))
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  Ok(Json(view.with_like_state(result)))
}
