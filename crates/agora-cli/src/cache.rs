//! Client-side mirror of like state.
//!
//! Each cached likeable is either [`ItemState::Settled`] on the last pair the
//! server confirmed, or [`ItemState::Optimistic`] while exactly one toggle is
//! in flight. Only a server response ever becomes a new settled pair; a
//! failed toggle restores the origin it started from.

use std::collections::HashMap;

use agora_core::reaction::{LikeState, LikeTarget};
use thiserror::Error;

use crate::sync::LikeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
  /// Matches the last confirmed server response.
  Settled(LikeState),
  /// A toggle is in flight. `origin` is the settled pair it started from.
  Optimistic { origin: LikeState, predicted: LikeState },
}

impl ItemState {
  pub fn is_in_flight(self) -> bool { matches!(self, Self::Optimistic { .. }) }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
  #[error("{0} has no cached like state")]
  NotCached(LikeTarget),

  #[error("a like toggle on {0} is already in flight")]
  InFlight(LikeTarget),
}

/// How [`ReactionCache::reconcile`] resolved an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
  /// The server's pair was stored.
  Settled(LikeState),
  /// The toggle failed; the pre-toggle pair was restored.
  Reverted(LikeState),
  /// The item no longer exists (or was never cached) and is not tracked.
  Dropped,
}

#[derive(Debug, Default)]
pub struct ReactionCache {
  items: HashMap<LikeTarget, ItemState>,
}

impl ReactionCache {
  pub fn new() -> Self { Self::default() }

  /// Record a pair read from the server. Ignored while a toggle on the item
  /// is in flight so a stale read cannot overwrite its origin; returns
  /// whether the pair was stored.
  pub fn seed(&mut self, target: LikeTarget, state: LikeState) -> bool {
    match self.items.get(&target) {
      Some(state) if state.is_in_flight() => false,
      _ => {
        self.items.insert(target, ItemState::Settled(state));
        true
      }
    }
  }

  pub fn get(&self, target: LikeTarget) -> Option<ItemState> { self.items.get(&target).copied() }

  /// Flip the item locally and mark it in flight. Returns the predicted pair.
  pub fn apply_optimistic_toggle(&mut self, target: LikeTarget) -> Result<LikeState, CacheError> {
    let entry = self.items.get_mut(&target).ok_or(CacheError::NotCached(target))?;
    let origin = match *entry {
      ItemState::Settled(state) => state,
      ItemState::Optimistic { .. } => return Err(CacheError::InFlight(target)),
    };
    let predicted = origin.toggled();
    *entry = ItemState::Optimistic { origin, predicted };
    Ok(predicted)
  }

  /// Give up on an in-flight toggle without an outcome, restoring its origin.
  /// Returns the restored pair, or `None` if nothing was in flight.
  pub fn abandon(&mut self, target: LikeTarget) -> Option<LikeState> {
    let entry = self.items.get_mut(&target)?;
    let ItemState::Optimistic { origin, .. } = *entry else {
      return None;
    };
    *entry = ItemState::Settled(origin);
    Some(origin)
  }

  /// Resolve the item with the outcome of its toggle request.
  ///
  /// A success replaces the cached pair outright. `NotFound` drops the item.
  /// Any other failure restores the optimistic origin.
  pub fn reconcile(
    &mut self,
    target: LikeTarget,
    outcome: &Result<LikeState, LikeError>,
  ) -> Reconciled {
    match outcome {
      Ok(server) => {
        self.items.insert(target, ItemState::Settled(*server));
        Reconciled::Settled(*server)
      }
      Err(LikeError::NotFound) => {
        self.items.remove(&target);
        Reconciled::Dropped
      }
      Err(_) => match self.items.get(&target).copied() {
        Some(ItemState::Optimistic { origin, .. }) => {
          self.items.insert(target, ItemState::Settled(origin));
          Reconciled::Reverted(origin)
        }
        Some(ItemState::Settled(state)) => Reconciled::Reverted(state),
        None => Reconciled::Dropped,
      },
    }
  }
}
