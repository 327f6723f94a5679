//! Like reactions: the toggle model shared by server and client.
//!
//! A like is a membership of `(user, likeable)`. Existence of the membership is
//! the only source of truth for "has this user liked this item"; the `likes`
//! counter on the likeable is denormalised from it and never goes below zero.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

/// The kinds of entity that carry a like counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeableKind {
  Forum,
  Comment,
}

impl LikeableKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Forum => "forum",
      Self::Comment => "comment",
    }
  }

  /// The collection segment used in API paths, e.g. `forums`.
  pub fn collection(self) -> &'static str {
    match self {
      Self::Forum => "forums",
      Self::Comment => "comments",
    }
  }
}

impl fmt::Display for LikeableKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for LikeableKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "forum" | "forums" => Ok(Self::Forum),
      "comment" | "comments" => Ok(Self::Comment),
      other => Err(Error::UnknownLikeableKind(other.to_owned())),
    }
  }
}

/// A reference to one likeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LikeTarget {
  pub kind: LikeableKind,
  pub id:   Uuid,
}

impl LikeTarget {
  pub fn forum(id: Uuid) -> Self { Self { kind: LikeableKind::Forum, id } }

  pub fn comment(id: Uuid) -> Self { Self { kind: LikeableKind::Comment, id } }
}

impl fmt::Display for LikeTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.kind, self.id)
  }
}

/// The `(likes, liked)` pair for one likeable, relative to one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LikeState {
  pub likes: u64,
  pub liked: bool,
}

impl LikeState {
  pub fn new(likes: u64, liked: bool) -> Self { Self { likes, liked } }

  /// The state a toggle is expected to produce: `liked` flips and `likes`
  /// moves one unit in the same direction.
  ///
  /// The decrement saturates so that a corrupted `(0, true)` pair stays
  /// representable; for any state the server actually produced it is exact.
  pub fn toggled(self) -> Self {
    if self.liked {
      Self { likes: self.likes.saturating_sub(1), liked: false }
    } else {
      Self { likes: self.likes + 1, liked: true }
    }
  }
}

/// A single persisted like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Membership {
  pub user_id: Uuid,
  pub target:  LikeTarget,
}
