//! Forums (discussion threads) and their comments.
//!
//! Both are likeable: each row carries a denormalised `likes` counter owned by
//! the reaction store. Whether the *current viewer* has liked an item is not a
//! property of the item, so it lives on the read models [`ForumView`] and
//! [`CommentView`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  reaction::{LikeState, LikeTarget},
  user::AuthorRef,
};

const MAX_TITLE: usize = 200;
const MAX_TAGS: usize = 16;

// ─── Forum ───────────────────────────────────────────────────────────────────

/// A discussion thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forum {
  pub forum_id:    Uuid,
  pub title:       String,
  pub description: String,
  pub tags:        Vec<String>,
  pub author:      AuthorRef,
  /// Server-authoritative like count; never negative.
  pub likes:       u64,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl Forum {
  pub fn like_target(&self) -> LikeTarget { LikeTarget::forum(self.forum_id) }
}

/// A forum as seen by a particular viewer.
///
/// Serialises flat: `{ "forum_id": …, "likes": 5, "liked": true, … }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumView {
  #[serde(flatten)]
  pub forum: Forum,
  /// `true` iff the viewer holds a like membership; always `false` for
  /// anonymous viewers.
  pub liked: bool,
}

impl ForumView {
  pub fn like_state(&self) -> LikeState {
    LikeState { likes: self.forum.likes, liked: self.liked }
  }

  /// Overwrite the like pair with a freshly confirmed one.
  pub fn with_like_state(mut self, state: LikeState) -> Self {
    self.forum.likes = state.likes;
    self.liked = state.liked;
    self
  }
}

/// A forum with its comments, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumDetail {
  #[serde(flatten)]
  pub view:     ForumView,
  pub comments: Vec<CommentView>,
}

/// Input to [`crate::store::ForumStore::create_forum`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewForum {
  pub title:       String,
  pub description: String,
  #[serde(default)]
  pub tags:        Vec<String>,
}

impl NewForum {
  pub fn validated(self) -> Result<Self> {
    Ok(Self {
      title:       validate_title(&self.title)?,
      description: validate_text("description", &self.description)?,
      tags:        normalize_tags(self.tags)?,
    })
  }
}

/// Partial update for a forum; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForumUpdate {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub tags:        Option<Vec<String>>,
}

impl ForumUpdate {
  pub fn validated(self) -> Result<Self> {
    Ok(Self {
      title:       self.title.as_deref().map(validate_title).transpose()?,
      description: self
        .description
        .as_deref()
        .map(|d| validate_text("description", d))
        .transpose()?,
      tags:        self.tags.map(normalize_tags).transpose()?,
    })
  }

  pub fn is_empty(&self) -> bool {
    self.title.is_none() && self.description.is_none() && self.tags.is_none()
  }
}

// ─── Comment ─────────────────────────────────────────────────────────────────

/// A reply posted to a forum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
  pub comment_id: Uuid,
  pub forum_id:   Uuid,
  pub content:    String,
  pub author:     AuthorRef,
  pub likes:      u64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Comment {
  pub fn like_target(&self) -> LikeTarget { LikeTarget::comment(self.comment_id) }
}

/// A comment as seen by a particular viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
  #[serde(flatten)]
  pub comment: Comment,
  pub liked:   bool,
}

impl CommentView {
  pub fn like_state(&self) -> LikeState {
    LikeState { likes: self.comment.likes, liked: self.liked }
  }

  pub fn with_like_state(mut self, state: LikeState) -> Self {
    self.comment.likes = state.likes;
    self.liked = state.liked;
    self
  }
}

/// Input to [`crate::store::ForumStore::create_comment`].
#[derive(Debug, Clone)]
pub struct NewComment {
  pub forum_id:  Uuid,
  pub author_id: Uuid,
  pub content:   String,
}

impl NewComment {
  pub fn validated(self) -> Result<Self> {
    Ok(Self { content: validate_text("content", &self.content)?, ..self })
  }
}

// ─── Validation helpers ──────────────────────────────────────────────────────

fn validate_title(title: &str) -> Result<String> {
  let title = validate_text("title", title)?;
  if title.chars().count() > MAX_TITLE {
    return Err(Error::TooLong { field: "title", max: MAX_TITLE });
  }
  Ok(title)
}

/// Body text is trimmed for the emptiness check only.
pub fn validate_text(field: &'static str, text: &str) -> Result<String> {
  if text.trim().is_empty() {
    return Err(Error::EmptyField(field));
  }
  Ok(text.to_owned())
}

/// Trim, drop blanks, and de-duplicate while preserving first-seen order.
fn normalize_tags(tags: Vec<String>) -> Result<Vec<String>> {
  let mut out: Vec<String> = Vec::with_capacity(tags.len());
  for tag in tags {
    let tag = tag.trim();
    if tag.is_empty() || out.iter().any(|t| t == tag) {
      continue;
    }
    out.push(tag.to_owned());
  }
  if out.len() > MAX_TAGS {
    return Err(Error::TooLong { field: "tags", max: MAX_TAGS });
  }
  Ok(out)
}
