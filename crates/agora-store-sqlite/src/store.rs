//! [`SqliteStore`]: the SQLite implementation of [`ForumStore`].
//!
//! The [`ReactionStore`](agora_core::store::ReactionStore) half lives in
//! `reactions.rs`.

use std::path::Path;

use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use agora_core::{
  forum::{Comment, CommentView, Forum, ForumUpdate, ForumView, NewComment, NewForum},
  store::ForumStore,
  user::{AuthorRef, NewUser, Session, User, UserCredentials},
};

use crate::{
  Error, Result,
  encode::{
    COMMENT_SELECT, FORUM_SELECT, RawComment, RawCredentials, RawForum, RawSession,
    RawUser, USER_COLUMNS, encode_dt, encode_tags, encode_uuid, now,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Agora store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn author_ref(&self, user_id: Uuid) -> Result<AuthorRef> {
    let id_str = encode_uuid(user_id);
    let username: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT username FROM users WHERE user_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;

    username
      .map(|username| AuthorRef { user_id, username })
      .ok_or(Error::UserNotFound(user_id))
  }
}

// ─── ForumStore impl ─────────────────────────────────────────────────────────

impl ForumStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<Option<User>> {
    let user = User {
      user_id:    Uuid::new_v4(),
      username:   input.username,
      email:      input.email,
      created_at: now(),
    };

    let id_str   = encode_uuid(user.user_id);
    let username = user.username.clone();
    let email    = user.email.clone();
    let at_str   = encode_dt(user.created_at);
    let hash     = input.password_hash;

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO users (user_id, username, email, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (email) DO NOTHING",
          rusqlite::params![id_str, username, email, hash, at_str],
        )?)
      })
      .await?;

    Ok((inserted == 1).then_some(user))
  }

  async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(user_id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
            rusqlite::params![id_str],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn find_credentials(&self, email: String) -> Result<Option<UserCredentials>> {
    let raw: Option<RawCredentials> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1"),
            rusqlite::params![email],
            |row| {
              Ok(RawCredentials {
                user:          RawUser::from_row(row)?,
                password_hash: row.get(4)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCredentials::into_credentials).transpose()
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn create_session(&self, session: Session) -> Result<()> {
    let user_str   = encode_uuid(session.user_id);
    let issued     = encode_dt(session.issued_at);
    let expires    = encode_dt(session.expires_at);
    let token_hash = session.token_hash;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        // Expired sessions for this user are dead weight; drop them here.
        tx.execute(
          "DELETE FROM sessions WHERE user_id = ?1 AND expires_at <= ?2",
          rusqlite::params![user_str, issued],
        )?;
        tx.execute(
          "INSERT INTO sessions (token_hash, user_id, issued_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![token_hash, user_str, issued, expires],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_session(&self, token_hash: String) -> Result<Option<Session>> {
    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT token_hash, user_id, issued_at, expires_at
             FROM sessions WHERE token_hash = ?1",
            rusqlite::params![token_hash],
            |row| {
              Ok(RawSession {
                token_hash: row.get(0)?,
                user_id:    row.get(1)?,
                issued_at:  row.get(2)?,
                expires_at: row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  async fn delete_session(&self, token_hash: String) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions WHERE token_hash = ?1",
          rusqlite::params![token_hash],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }

  // ── Forums ────────────────────────────────────────────────────────────────

  async fn create_forum(&self, author_id: Uuid, input: NewForum) -> Result<Forum> {
    let author = self.author_ref(author_id).await?;
    let ts = now();
    let forum = Forum {
      forum_id:    Uuid::new_v4(),
      title:       input.title,
      description: input.description,
      tags:        input.tags,
      author,
      likes:       0,
      created_at:  ts,
      updated_at:  ts,
    };

    let id_str      = encode_uuid(forum.forum_id);
    let author_str  = encode_uuid(author_id);
    let title       = forum.title.clone();
    let description = forum.description.clone();
    let tags_str    = encode_tags(&forum.tags)?;
    let at_str      = encode_dt(ts);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO forums (
             forum_id, author_id, title, description, tags, likes, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)",
          rusqlite::params![id_str, author_str, title, description, tags_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(forum)
  }

  async fn get_forum(&self, forum_id: Uuid, viewer: Option<Uuid>) -> Result<Option<ForumView>> {
    let id_str     = encode_uuid(forum_id);
    let viewer_str = viewer.map(encode_uuid);

    let raw: Option<RawForum> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("{FORUM_SELECT} WHERE f.forum_id = ?2"),
            rusqlite::params![viewer_str, id_str],
            RawForum::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawForum::into_view).transpose()
  }

  async fn list_forums(&self, viewer: Option<Uuid>) -> Result<Vec<ForumView>> {
    let viewer_str = viewer.map(encode_uuid);

    let raws: Vec<RawForum> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn
          .prepare(&format!("{FORUM_SELECT} ORDER BY f.created_at DESC, f.rowid DESC"))?;
        let rows = stmt
          .query_map(rusqlite::params![viewer_str], RawForum::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawForum::into_view).collect()
  }

  async fn update_forum(&self, forum_id: Uuid, update: ForumUpdate) -> Result<Option<Forum>> {
    let id_str      = encode_uuid(forum_id);
    let title       = update.title;
    let description = update.description;
    let tags_str    = update.tags.as_deref().map(encode_tags).transpose()?;
    let at_str      = encode_dt(now());

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE forums SET
             title       = COALESCE(?2, title),
             description = COALESCE(?3, description),
             tags        = COALESCE(?4, tags),
             updated_at  = ?5
           WHERE forum_id = ?1",
          rusqlite::params![id_str, title, description, tags_str, at_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Ok(None);
    }
    Ok(self.get_forum(forum_id, None).await?.map(|v| v.forum))
  }

  async fn delete_forum(&self, forum_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(forum_id);
    // Comments, forum_likes, and comment_likes go with it via ON DELETE CASCADE.
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM forums WHERE forum_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;
    Ok(deleted > 0)
  }

  // ── Comments ──────────────────────────────────────────────────────────────

  async fn create_comment(&self, input: NewComment) -> Result<Option<Comment>> {
    let author = self.author_ref(input.author_id).await?;
    let ts = now();
    let comment = Comment {
      comment_id: Uuid::new_v4(),
      forum_id:   input.forum_id,
      content:    input.content,
      author,
      likes:      0,
      created_at: ts,
      updated_at: ts,
    };

    let id_str     = encode_uuid(comment.comment_id);
    let forum_str  = encode_uuid(comment.forum_id);
    let author_str = encode_uuid(input.author_id);
    let content    = comment.content.clone();
    let at_str     = encode_dt(ts);

    // Insert-select so a forum deleted concurrently yields zero rows rather
    // than a foreign-key failure.
    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO comments (
             comment_id, forum_id, author_id, content, likes, created_at, updated_at
           )
           SELECT ?1, forum_id, ?3, ?4, 0, ?5, ?5 FROM forums WHERE forum_id = ?2",
          rusqlite::params![id_str, forum_str, author_str, content, at_str],
        )?)
      })
      .await?;

    Ok((inserted == 1).then_some(comment))
  }

  async fn get_comment(
    &self,
    comment_id: Uuid,
    viewer: Option<Uuid>,
  ) -> Result<Option<CommentView>> {
    let id_str     = encode_uuid(comment_id);
    let viewer_str = viewer.map(encode_uuid);

    let raw: Option<RawComment> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("{COMMENT_SELECT} WHERE c.comment_id = ?2"),
            rusqlite::params![viewer_str, id_str],
            RawComment::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawComment::into_view).transpose()
  }

  async fn list_comments(
    &self,
    forum_id: Uuid,
    viewer: Option<Uuid>,
  ) -> Result<Vec<CommentView>> {
    let forum_str  = encode_uuid(forum_id);
    let viewer_str = viewer.map(encode_uuid);

    let raws: Vec<RawComment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{COMMENT_SELECT} WHERE c.forum_id = ?2 ORDER BY c.created_at DESC, c.rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![viewer_str, forum_str], RawComment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawComment::into_view).collect()
  }

  async fn update_comment(&self, comment_id: Uuid, content: String) -> Result<Option<Comment>> {
    let id_str = encode_uuid(comment_id);
    let at_str = encode_dt(now());

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE comments SET content = ?2, updated_at = ?3 WHERE comment_id = ?1",
          rusqlite::params![id_str, content, at_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Ok(None);
    }
    Ok(self.get_comment(comment_id, None).await?.map(|v| v.comment))
  }

  async fn delete_comment(&self, comment_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(comment_id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM comments WHERE comment_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }
}
