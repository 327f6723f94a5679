//! Handlers for `/comments` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/comments/forum/{forum_id}` | Newest first; 404 if the forum is missing |
//! | `POST`   | `/comments/forum/{forum_id}` | Body: `{"content"}` |
//! | `GET`    | `/comments/{id}` | One comment |
//! | `PUT`    | `/comments/{id}` | Author only |
//! | `DELETE` | `/comments/{id}` | Author only |
//! | `POST`   | `/comments/{id}/like` | Toggle; returns the comment with the new pair |

use agora_core::{
  forum::{CommentView, NewComment},
  reaction::LikeTarget,
};
use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  ApiState, Backend,
  auth::{CurrentUser, MaybeUser},
  error::ApiError,
  likes,
};

#[derive(Debug, Deserialize)]
pub struct CommentBody {
  pub content: String,
}

fn not_found(id: Uuid) -> ApiError { ApiError::NotFound(format!("comment {id}")) }

async fn owned_comment<S: Backend>(
  state: &ApiState<S>,
  id: Uuid,
  current: &CurrentUser,
) -> Result<CommentView, ApiError> {
  let view = state
    .store
    .get_comment(id, Some(current.user.user_id))
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  if view.comment.author.user_id != current.user.user_id {
    return Err(ApiError::Forbidden("only the author may modify this comment".into()));
  }
  Ok(view)
}

/// `GET /comments/forum/{forum_id}`
pub async fn list<S: Backend>(
  State(state): State<ApiState<S>>,
  viewer: MaybeUser,
  Path(forum_id): Path<Uuid>,
) -> Result<Json<Vec<CommentView>>, ApiError> {
  let viewer_id = viewer.user_id();
  // An empty list is ambiguous; check the forum so a bad id is a 404.
  if state.store.get_forum(forum_id, viewer_id).await.map_err(ApiError::store)?.is_none() {
    return Err(ApiError::NotFound(format!("forum {forum_id}")));
  }
  let comments = state.store.list_comments(forum_id, viewer_id).await.map_err(ApiError::store)?;
  Ok(Json(comments))
}

/// `GET /comments/{id}`
pub async fn get_one<S: Backend>(
  State(state): State<ApiState<S>>,
  viewer: MaybeUser,
  Path(id): Path<Uuid>,
) -> Result<Json<CommentView>, ApiError> {
  let view = state
    .store
    .get_comment(id, viewer.user_id())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  Ok(Json(view))
}

/// `POST /comments/forum/{forum_id}`
pub async fn create<S: Backend>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  Path(forum_id): Path<Uuid>,
  Json(body): Json<CommentBody>,
) -> Result<impl IntoResponse, ApiError> {
  let input = NewComment {
    forum_id,
    author_id: current.user.user_id,
    content: body.content,
  }
  .validated()?;

  let comment = state
    .store
    .create_comment(input)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("forum {forum_id}")))?;
  tracing::info!(comment_id = %comment.comment_id, %forum_id, "created comment");
  Ok((StatusCode::CREATED, Json(CommentView { comment, liked: false })))
}

/// `PUT /comments/{id}`
pub async fn update<S: Backend>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<CommentBody>,
) -> Result<Json<CommentView>, ApiError> {
  let content = agora_core::forum::validate_text("content", &body.content)?;
  let liked = owned_comment(&state, id, &current).await?.liked;

  let comment = state
    .store
    .update_comment(id, content)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  Ok(Json(CommentView { comment, liked }))
}

/// `DELETE /comments/{id}`
pub async fn remove<S: Backend>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  owned_comment(&state, id, &current).await?;
  if !state.store.delete_comment(id).await.map_err(ApiError::store)? {
    return Err(not_found(id));
  }
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /comments/{id}/like`
pub async fn like<S: Backend>(
  State(state): State<ApiState<S>>,
  current: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<CommentView>, ApiError> {
  let user_id = current.user.user_id;
  let result = likes::toggle(&state, user_id, LikeTarget::comment(id)).await?;

  let view = state
    .store
    .get_comment(id, Some(user_id))
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  Ok(Json(view.with_like_state(result)))
}
