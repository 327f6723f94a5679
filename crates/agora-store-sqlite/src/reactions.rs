//! [`ReactionStore`] for [`SqliteStore`].
//!
//! Each toggle runs as one `BEGIN IMMEDIATE` transaction: the write lock is
//! taken before the membership is inspected, so two toggles on the same
//! `(user, likeable)` cannot both observe "not liked". The membership primary
//! key backs this up; an insert that still collides is reported as
//! "already liked" instead of failing.

use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use agora_core::{
  reaction::{LikeState, LikeTarget, LikeableKind},
  store::ReactionStore,
};

use crate::{
  Error, Result,
  encode::{decode_count, encode_dt, encode_uuid, now},
  store::SqliteStore,
};

/// `(likeable table, membership table, id column)` for a kind.
fn tables(kind: LikeableKind) -> (&'static str, &'static str, &'static str) {
  match kind {
    LikeableKind::Forum => ("forums", "forum_likes", "forum_id"),
    LikeableKind::Comment => ("comments", "comment_likes", "comment_id"),
  }
}

pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(err, _)
      if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

/// What the transaction did to the membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Toggled {
  Liked,
  Unliked,
  /// The insert lost a race on the primary key; the user already likes it.
  AlreadyLiked,
}

/// Add the membership row and bump the counter. A collision on the
/// membership key leaves the counter alone.
pub(crate) fn insert_membership(
  tx: &rusqlite::Transaction<'_>,
  kind: LikeableKind,
  user: &str,
  item: &str,
  at: &str,
) -> rusqlite::Result<Toggled> {
  let (items, members, id_col) = tables(kind);
  let inserted = tx.execute(
    &format!("INSERT INTO {members} (user_id, {id_col}, created_at) VALUES (?1, ?2, ?3)"),
    rusqlite::params![user, item, at],
  );
  match inserted {
    Ok(_) => {
      tx.execute(
        &format!("UPDATE {items} SET likes = likes + 1 WHERE {id_col} = ?1"),
        rusqlite::params![item],
      )?;
      Ok(Toggled::Liked)
    }
    Err(e) if is_unique_violation(&e) => Ok(Toggled::AlreadyLiked),
    Err(e) => Err(e),
  }
}

impl ReactionStore for SqliteStore {
  type Error = Error;

  async fn toggle_like(&self, user_id: Uuid, target: LikeTarget) -> Result<Option<LikeState>> {
    let (items, members, id_col) = tables(target.kind);
    let user_str = encode_uuid(user_id);
    let item_str = encode_uuid(target.id);
    let at_str   = encode_dt(now());

    let outcome: Option<(i64, Toggled)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists = tx
          .query_row(
            &format!("SELECT 1 FROM {items} WHERE {id_col} = ?1"),
            rusqlite::params![item_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !exists {
          return Ok(None);
        }

        let removed = tx.execute(
          &format!("DELETE FROM {members} WHERE user_id = ?1 AND {id_col} = ?2"),
          rusqlite::params![user_str, item_str],
        )?;

        let toggled = if removed > 0 {
          tx.execute(
            &format!("UPDATE {items} SET likes = MAX(likes - 1, 0) WHERE {id_col} = ?1"),
            rusqlite::params![item_str],
          )?;
          Toggled::Unliked
        } else {
          insert_membership(&tx, target.kind, &user_str, &item_str, &at_str)?
        };

        let likes: i64 = tx.query_row(
          &format!("SELECT likes FROM {items} WHERE {id_col} = ?1"),
          rusqlite::params![item_str],
          |r| r.get(0),
        )?;

        tx.commit()?;
        Ok(Some((likes, toggled)))
      })
      .await?;

    let Some((likes, toggled)) = outcome else {
      return Ok(None);
    };

    if toggled == Toggled::AlreadyLiked {
      tracing::warn!(%user_id, %target, "like insert collided with an existing membership");
    }
    tracing::debug!(%user_id, %target, ?toggled, likes, "toggled like");

    Ok(Some(LikeState {
      likes: decode_count(likes)?,
      liked: toggled != Toggled::Unliked,
    }))
  }

  async fn like_state(
    &self,
    viewer: Option<Uuid>,
    target: LikeTarget,
  ) -> Result<Option<LikeState>> {
    let (items, members, id_col) = tables(target.kind);
    let viewer_str = viewer.map(encode_uuid);
    let item_str   = encode_uuid(target.id);

    let row: Option<(i64, bool)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT i.likes, EXISTS (
                 SELECT 1 FROM {members} m WHERE m.{id_col} = i.{id_col} AND m.user_id = ?2
               )
               FROM {items} i WHERE i.{id_col} = ?1"
            ),
            rusqlite::params![item_str, viewer_str],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?)
      })
      .await?;

    row
      .map(|(likes, liked)| Ok(LikeState { likes: decode_count(likes)?, liked }))
      .transpose()
  }
}
