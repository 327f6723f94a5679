//! The like toggle shared by forum and comment handlers.
//!
//! The response to a toggle is built from the pair the store committed, never
//! from a separate read, so the client receives exactly the state its toggle
//! produced even if other users toggle concurrently.

use agora_core::reaction::{LikeState, LikeTarget};
use uuid::Uuid;

use crate::{ApiState, Backend, error::ApiError};

/// Flip `user_id`'s like on `target`; 404 if the target does not exist.
pub async fn toggle<S: Backend>(
  state: &ApiState<S>,
  user_id: Uuid,
  target: LikeTarget,
) -> Result<LikeState, ApiError> {
  let result = state
    .store
    .toggle_like(user_id, target)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("{} {}", target.kind, target.id)))?;

  tracing::debug!(%user_id, %target, likes = result.likes, liked = result.liked, "like toggled");
  Ok(result)
}
