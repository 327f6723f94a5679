//! An in-process [`ReactionStore`].
//!
//! Memberships and counters live behind one mutex, so every toggle is a
//! test-and-set under a single lock. Nothing survives a restart and nothing is
//! shared between processes; durable deployments use `agora-store-sqlite`.

use std::{
  collections::{HashMap, HashSet},
  sync::{Arc, Mutex, MutexGuard},
};

use uuid::Uuid;

use crate::{
  Error, Result,
  reaction::{LikeState, LikeTarget, Membership},
  store::ReactionStore,
};

#[derive(Debug, Default)]
struct Inner {
  counts:  HashMap<LikeTarget, u64>,
  members: HashSet<Membership>,
}

/// Reaction state held in memory. Cloning shares the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryReactionStore {
  inner: Arc<Mutex<Inner>>,
}

impl MemoryReactionStore {
  pub fn new() -> Self { Self::default() }

  /// Make `target` likeable and set its counter to `likes`. Existing
  /// memberships are kept.
  pub fn register(&self, target: LikeTarget, likes: u64) -> Result<()> {
    self.lock()?.counts.insert(target, likes);
    Ok(())
  }

  /// Remove `target` and every membership on it. Returns `false` if it was
  /// not registered.
  pub fn unregister(&self, target: LikeTarget) -> Result<bool> {
    let mut inner = self.lock()?;
    inner.members.retain(|m| m.target != target);
    Ok(inner.counts.remove(&target).is_some())
  }

  /// Number of memberships currently held on `target`.
  pub fn membership_count(&self, target: LikeTarget) -> Result<usize> {
    Ok(self.lock()?.members.iter().filter(|m| m.target == target).count())
  }

  fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
    self.inner.lock().map_err(|_| Error::LockPoisoned)
  }
}

impl ReactionStore for MemoryReactionStore {
  type Error = Error;

  async fn toggle_like(&self, user_id: Uuid, target: LikeTarget) -> Result<Option<LikeState>> {
    let mut guard = self.lock()?;
    let inner = &mut *guard;

    let Some(likes) = inner.counts.get_mut(&target) else {
      return Ok(None);
    };

    let membership = Membership { user_id, target };
    let liked = if inner.members.remove(&membership) {
      *likes = likes.saturating_sub(1);
      false
    } else {
      inner.members.insert(membership);
      *likes += 1;
      true
    };

    Ok(Some(LikeState { likes: *likes, liked }))
  }

  async fn like_state(
    &self,
    viewer: Option<Uuid>,
    target: LikeTarget,
  ) -> Result<Option<LikeState>> {
    let inner = self.lock()?;
    let Some(&likes) = inner.counts.get(&target) else {
      return Ok(None);
    };
    let liked = viewer
      .is_some_and(|user_id| inner.members.contains(&Membership { user_id, target }));
    Ok(Some(LikeState { likes, liked }))
  }
}
