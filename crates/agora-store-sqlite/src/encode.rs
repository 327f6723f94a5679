//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that lexical order equals chronological order.
//! Tags are stored as compact JSON. UUIDs are stored as hyphenated lowercase
//! strings.

use agora_core::{
  forum::{Comment, CommentView, Forum, ForumView},
  user::{AuthorRef, Session, User, UserCredentials},
};
use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ──────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

/// The current time at the precision timestamps are stored with, so values
/// handed back from a write compare equal to what a later read returns.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_tags(tags: &[String]) -> Result<String> {
  Ok(serde_json::to_string(tags)?)
}

pub fn decode_tags(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

pub fn decode_count(n: i64) -> Result<u64> {
  u64::try_from(n).map_err(|_| Error::CorruptCount(n))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawUser::from_row`].
pub const USER_COLUMNS: &str = "user_id, username, email, created_at";

pub struct RawUser {
  pub user_id:    String,
  pub username:   String,
  pub email:      String,
  pub created_at: String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:    row.get(0)?,
      username:   row.get(1)?,
      email:      row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:    decode_uuid(&self.user_id)?,
      username:   self.username,
      email:      self.email,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawCredentials {
  pub user:          RawUser,
  pub password_hash: String,
}

impl RawCredentials {
  pub fn into_credentials(self) -> Result<UserCredentials> {
    Ok(UserCredentials { user: self.user.into_user()?, password_hash: self.password_hash })
  }
}

pub struct RawSession {
  pub token_hash: String,
  pub user_id:    String,
  pub issued_at:  String,
  pub expires_at: String,
}

impl RawSession {
  pub fn into_session(self) -> Result<Session> {
    Ok(Session {
      token_hash: self.token_hash,
      user_id:    decode_uuid(&self.user_id)?,
      issued_at:  decode_dt(&self.issued_at)?,
      expires_at: decode_dt(&self.expires_at)?,
    })
  }
}

/// Select list for forums joined with their author, plus the viewer's
/// membership. `?1` must be bound to the viewer's id (or NULL).
pub const FORUM_SELECT: &str = "
  SELECT f.forum_id, f.title, f.description, f.tags, f.likes,
         f.created_at, f.updated_at, u.user_id, u.username,
         EXISTS (
           SELECT 1 FROM forum_likes l
           WHERE l.forum_id = f.forum_id AND l.user_id = ?1
         ) AS liked
  FROM forums f
  JOIN users u ON u.user_id = f.author_id";

pub struct RawForum {
  pub forum_id:    String,
  pub title:       String,
  pub description: String,
  pub tags:        String,
  pub likes:       i64,
  pub created_at:  String,
  pub updated_at:  String,
  pub author_id:   String,
  pub author_name: String,
  pub liked:       bool,
}

impl RawForum {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      forum_id:    row.get(0)?,
      title:       row.get(1)?,
      description: row.get(2)?,
      tags:        row.get(3)?,
      likes:       row.get(4)?,
      created_at:  row.get(5)?,
      updated_at:  row.get(6)?,
      author_id:   row.get(7)?,
      author_name: row.get(8)?,
      liked:       row.get(9)?,
    })
  }

  pub fn into_view(self) -> Result<ForumView> {
    let liked = self.liked;
    let forum = Forum {
      forum_id:    decode_uuid(&self.forum_id)?,
      title:       self.title,
      description: self.description,
      tags:        decode_tags(&self.tags)?,
      author:      AuthorRef {
        user_id:  decode_uuid(&self.author_id)?,
        username: self.author_name,
      },
      likes:       decode_count(self.likes)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    };
    Ok(ForumView { forum, liked })
  }
}

/// Select list for comments joined with their author, plus the viewer's
/// membership. `?1` must be bound to the viewer's id (or NULL).
pub const COMMENT_SELECT: &str = "
  SELECT c.comment_id, c.forum_id, c.content, c.likes,
         c.created_at, c.updated_at, u.user_id, u.username,
         EXISTS (
           SELECT 1 FROM comment_likes l
           WHERE l.comment_id = c.comment_id AND l.user_id = ?1
         ) AS liked
  FROM comments c
  JOIN users u ON u.user_id = c.author_id";

pub struct RawComment {
  pub comment_id:  String,
  pub forum_id:    String,
  pub content:     String,
  pub likes:       i64,
  pub created_at:  String,
  pub updated_at:  String,
  pub author_id:   String,
  pub author_name: String,
  pub liked:       bool,
}

impl RawComment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      comment_id:  row.get(0)?,
      forum_id:    row.get(1)?,
      content:     row.get(2)?,
      likes:       row.get(3)?,
      created_at:  row.get(4)?,
      updated_at:  row.get(5)?,
      author_id:   row.get(6)?,
      author_name: row.get(7)?,
      liked:       row.get(8)?,
    })
  }

  pub fn into_view(self) -> Result<CommentView> {
    let liked = self.liked;
    let comment = Comment {
      comment_id: decode_uuid(&self.comment_id)?,
      forum_id:   decode_uuid(&self.forum_id)?,
      content:    self.content,
      author:     AuthorRef {
        user_id:  decode_uuid(&self.author_id)?,
        username: self.author_name,
      },
      likes:      decode_count(self.likes)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    };
    Ok(CommentView { comment, liked })
  }
}
