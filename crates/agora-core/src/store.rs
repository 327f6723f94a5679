//! The `ForumStore` and `ReactionStore` traits.
//!
//! Both are implemented by storage backends (e.g. `agora-store-sqlite`).
//! Higher layers (`agora-api`, `agora-server`) depend on these abstractions,
//! not on any concrete backend.
//!
//! Reactions sit behind their own trait so the toggle protocol is independent
//! of where memberships are kept; [`crate::memory::MemoryReactionStore`] is a
//! second strategy.

use std::future::Future;

use uuid::Uuid;

use crate::{
  forum::{Comment, CommentView, Forum, ForumUpdate, ForumView, NewComment, NewForum},
  reaction::{LikeState, LikeTarget},
  user::{NewUser, Session, User, UserCredentials},
};

// ─── ForumStore ──────────────────────────────────────────────────────────────

/// Persistence for users, sessions, forums, and comments.
///
/// Methods that address a single row return `Option`/`bool` for "not found"
/// rather than an error so that callers can map absence to their own status.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait ForumStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Persist a new user. Returns `None` if the email is already registered.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look up a user and password hash by (normalised) email.
  fn find_credentials(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<UserCredentials>, Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  fn create_session(
    &self,
    session: Session,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Fetch a session by token digest. Expiry is checked by the caller.
  fn get_session(
    &self,
    token_hash: String,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + '_;

  /// Revoke a session. Returns `false` if it did not exist.
  fn delete_session(
    &self,
    token_hash: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Forums ────────────────────────────────────────────────────────────

  fn create_forum(
    &self,
    author_id: Uuid,
    input: NewForum,
  ) -> impl Future<Output = Result<Forum, Self::Error>> + Send + '_;

  /// `viewer` decides the `liked` flag on the returned view.
  fn get_forum(
    &self,
    forum_id: Uuid,
    viewer: Option<Uuid>,
  ) -> impl Future<Output = Result<Option<ForumView>, Self::Error>> + Send + '_;

  /// All forums, newest first.
  fn list_forums(
    &self,
    viewer: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<ForumView>, Self::Error>> + Send + '_;

  /// Apply a partial update and bump `updated_at`. `None` if not found.
  fn update_forum(
    &self,
    forum_id: Uuid,
    update: ForumUpdate,
  ) -> impl Future<Output = Result<Option<Forum>, Self::Error>> + Send + '_;

  /// Delete a forum together with its comments and all of their likes.
  fn delete_forum(
    &self,
    forum_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Comments ──────────────────────────────────────────────────────────

  /// Returns `None` if the parent forum does not exist.
  fn create_comment(
    &self,
    input: NewComment,
  ) -> impl Future<Output = Result<Option<Comment>, Self::Error>> + Send + '_;

  fn get_comment(
    &self,
    comment_id: Uuid,
    viewer: Option<Uuid>,
  ) -> impl Future<Output = Result<Option<CommentView>, Self::Error>> + Send + '_;

  /// Comments on a forum, newest first. Empty if the forum does not exist.
  fn list_comments(
    &self,
    forum_id: Uuid,
    viewer: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<CommentView>, Self::Error>> + Send + '_;

  fn update_comment(
    &self,
    comment_id: Uuid,
    content: String,
  ) -> impl Future<Output = Result<Option<Comment>, Self::Error>> + Send + '_;

  fn delete_comment(
    &self,
    comment_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── ReactionStore ───────────────────────────────────────────────────────────

/// Authoritative like state: per-user memberships and per-likeable counters.
///
/// Implementations must make [`toggle_like`](Self::toggle_like) a single
/// atomic test-and-set: two concurrent toggles by the same user on the same
/// likeable serialise, and toggles by different users on the same likeable
/// leave `likes` equal to the number of surviving memberships.
pub trait ReactionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Flip `user_id`'s membership on `target`.
  ///
  /// - absent: insert it, increment `likes`, return `liked = true`;
  /// - present: remove it, decrement `likes` (floored at zero), return
  ///   `liked = false`.
  ///
  /// Returns `None` if `target` does not exist.
  fn toggle_like(
    &self,
    user_id: Uuid,
    target: LikeTarget,
  ) -> impl Future<Output = Result<Option<LikeState>, Self::Error>> + Send + '_;

  /// Read the current pair for `target` without modifying it. `liked` is
  /// always `false` for an anonymous viewer. `None` if `target` does not
  /// exist.
  fn like_state(
    &self,
    viewer: Option<Uuid>,
    target: LikeTarget,
  ) -> impl Future<Output = Result<Option<LikeState>, Self::Error>> + Send + '_;
}
