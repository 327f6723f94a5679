//! The toggle round trip: predict locally, ask the server, reconcile.
//!
//! [`LikeSync::toggle`] is the only writer of settled state. It applies the
//! optimistic flip, sends exactly one toggle request (plus a single retry when
//! the failure is [`LikeError::Transient`]), and hands the outcome to the
//! cache. The parent resource is never re-fetched; the toggle response is
//! trusted as is. A toggle dropped before it finishes (a timeout, a lost
//! `select!` branch) restores the origin it started from.

use std::{
  future::Future,
  sync::{Mutex, MutexGuard, PoisonError},
};

use agora_core::reaction::{LikeState, LikeTarget};
use thiserror::Error;
use crate::cache::{CacheError, ItemState, ReactionCache, Reconciled};

/// Why a toggle request did not produce a confirmed pair.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LikeError {
  /// Missing, invalid, or expired credential. Not retried.
  #[error("not signed in, or the session has expired")]
  Unauthorized,

  /// The likeable was deleted. Not retried.
  #[error("the item no longer exists")]
  NotFound,

  /// Network failure, timeout, or an unavailable server. Retried once.
  #[error("temporary failure: {0}")]
  Transient(String),

  /// Anything else the server said that we cannot interpret.
  #[error("unexpected response: {0}")]
  Protocol(String),
}

/// Sends one toggle request for a likeable.
pub trait LikeTransport: Send + Sync {
  fn send_toggle(
    &self,
    target: LikeTarget,
  ) -> impl Future<Output = Result<LikeState, LikeError>> + Send + '_;
}

#[derive(Debug, Error)]
pub enum SyncError {
  #[error(transparent)]
  Cache(#[from] CacheError),

  #[error("{source} (restored {restored:?})")]
  Like {
    #[source]
    source:   LikeError,
    /// The pair shown after the failure; `None` if the item was dropped.
    restored: Option<LikeState>,
  },
}

fn lock(cache: &Mutex<ReactionCache>) -> MutexGuard<'_, ReactionCache> {
  // Every cache method leaves the map consistent, so a poisoned lock is usable.
  cache.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An optimistic toggle awaiting its outcome. Dropped unresolved, it puts the
/// item back on its origin.
struct Pending<'a> {
  cache:    &'a Mutex<ReactionCache>,
  target:   LikeTarget,
  resolved: bool,
}

impl Pending<'_> {
  fn reconcile(mut self, outcome: &Result<LikeState, LikeError>) -> Reconciled {
    self.resolved = true;
    lock(self.cache).reconcile(self.target, outcome)
  }
}

impl Drop for Pending<'_> {
  fn drop(&mut self) {
    if self.resolved {
      return;
    }
    let target = self.target;
    if let Some(origin) = lock(self.cache).abandon(target) {
      tracing::debug!(%target, ?origin, "like toggle abandoned");
    }
  }
}

/// Owns a [`ReactionCache`] and the transport that confirms its toggles.
///
/// The cache lock is never held across an await.
pub struct LikeSync<T> {
  transport: T,
  cache:     Mutex<ReactionCache>,
}

impl<T: LikeTransport> LikeSync<T> {
  pub fn new(transport: T) -> Self { Self { transport, cache: Mutex::new(ReactionCache::new()) } }

  pub fn seed(&self, target: LikeTarget, state: LikeState) -> bool {
    lock(&self.cache).seed(target, state)
  }

  pub fn state(&self, target: LikeTarget) -> Option<ItemState> { lock(&self.cache).get(target) }

  /// Toggle `target` and return the pair the server confirmed.
  ///
  /// `on_predicted` is called with the optimistic pair before the request is
  /// sent so a caller can render it immediately.
  pub async fn toggle(
    &self,
    target: LikeTarget,
    on_predicted: impl FnOnce(LikeState),
  ) -> Result<LikeState, SyncError> {
    let predicted = lock(&self.cache).apply_optimistic_toggle(target)?;
    let pending = Pending { cache: &self.cache, target, resolved: false };
    tracing::debug!(%target, ?predicted, "optimistic toggle");
    on_predicted(predicted);

    let mut outcome = self.transport.send_toggle(target).await;
    if let Err(LikeError::Transient(reason)) = &outcome {
      tracing::warn!(%target, %reason, "like toggle failed, retrying once");
      outcome = self.transport.send_toggle(target).await;
    }

    let reconciled = pending.reconcile(&outcome);
    tracing::debug!(%target, ?reconciled, "reconciled like");

    outcome.map_err(|source| SyncError::Like {
      source,
      restored: match reconciled {
        Reconciled::Reverted(state) | Reconciled::Settled(state) => Some(state),
        Reconciled::Dropped => None,
      },
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use std::{
    collections::VecDeque,
    sync::{
      Arc,
      atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
  };

  use tokio::sync::Notify;
  use uuid::Uuid;

  /// Replays canned responses in order.
  #[derive(Default)]
  struct Scripted {
    responses: std::sync::Mutex<VecDeque<Result<LikeState, LikeError>>>,
    calls:     AtomicUsize,
  }

  impl Scripted {
    fn new(responses: impl IntoIterator<Item = Result<LikeState, LikeError>>) -> Self {
      Self {
        responses: std::sync::Mutex::new(responses.into_iter().collect()),
        calls:     AtomicUsize::new(0),
      }
    }

    fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
  }

  impl LikeTransport for Scripted {
    async fn send_toggle(&self, _target: LikeTarget) -> Result<LikeState, LikeError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      self
        .responses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(LikeError::Protocol("script exhausted".into())))
    }
  }

  fn seeded<T: LikeTransport>(transport: T, state: LikeState) -> (LikeSync<T>, LikeTarget) {
    let sync = LikeSync::new(transport);
    let target = LikeTarget::forum(Uuid::new_v4());
    sync.seed(target, state);
    (sync, target)
  }

  #[tokio::test]
  async fn five_six_five_scenario() {
    let transport = Scripted::new([Ok(LikeState::new(6, true)), Ok(LikeState::new(5, false))]);
    let (sync, target) = seeded(transport, LikeState::new(5, false));

    let mut shown = None;
    let settled = sync.toggle(target, |p| shown = Some(p)).await.unwrap();
    assert_eq!(shown, Some(LikeState::new(6, true)));
    assert_eq!(settled, LikeState::new(6, true));
    assert_eq!(sync.state(target), Some(ItemState::Settled(LikeState::new(6, true))));

    let settled = sync.toggle(target, |p| shown = Some(p)).await.unwrap();
    assert_eq!(shown, Some(LikeState::new(5, false)));
    assert_eq!(settled, LikeState::new(5, false));
    assert_eq!(sync.state(target), Some(ItemState::Settled(LikeState::new(5, false))));
  }

  #[tokio::test]
  async fn transient_failure_is_retried_once() {
    let transport = Scripted::new([
      Err(LikeError::Transient("timeout".into())),
      Ok(LikeState::new(1, true)),
    ]);
    let (sync, target) = seeded(transport, LikeState::new(0, false));

    assert_eq!(sync.toggle(target, |_| {}).await.unwrap(), LikeState::new(1, true));
    assert_eq!(sync.transport.calls(), 2);
  }

  #[tokio::test]
  async fn repeated_transient_failure_rolls_back() {
    let transport = Scripted::new([
      Err(LikeError::Transient("timeout".into())),
      Err(LikeError::Transient("timeout".into())),
    ]);
    let (sync, target) = seeded(transport, LikeState::new(4, true));

    let err = sync.toggle(target, |_| {}).await.unwrap_err();
    assert!(matches!(
      err,
      SyncError::Like { source: LikeError::Transient(_), restored: Some(s) } if s == LikeState::new(4, true)
    ));
    assert_eq!(sync.transport.calls(), 2);
    assert_eq!(sync.state(target), Some(ItemState::Settled(LikeState::new(4, true))));
  }

  #[tokio::test]
  async fn unauthorized_is_not_retried_and_rolls_back() {
    let transport = Scripted::new([Err(LikeError::Unauthorized)]);
    let (sync, target) = seeded(transport, LikeState::new(5, false));

    let err = sync.toggle(target, |_| {}).await.unwrap_err();
    assert!(matches!(err, SyncError::Like { source: LikeError::Unauthorized, .. }));
    assert_eq!(sync.transport.calls(), 1);
    assert_eq!(sync.state(target), Some(ItemState::Settled(LikeState::new(5, false))));
  }

  #[tokio::test]
  async fn not_found_drops_the_item() {
    let transport = Scripted::new([Err(LikeError::NotFound)]);
    let (sync, target) = seeded(transport, LikeState::new(5, false));

    let err = sync.toggle(target, |_| {}).await.unwrap_err();
    assert!(matches!(err, SyncError::Like { source: LikeError::NotFound, restored: None }));
    assert!(sync.state(target).is_none());

    // Nothing to toggle any more.
    let again = sync.toggle(target, |_| {}).await;
    assert!(matches!(again, Err(SyncError::Cache(CacheError::NotCached(_)))));
  }

  /// Holds every request until released.
  struct Gated {
    gate:     Arc<Notify>,
    response: LikeState,
    calls:    AtomicUsize,
  }

  impl LikeTransport for Gated {
    async fn send_toggle(&self, _target: LikeTarget) -> Result<LikeState, LikeError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      self.gate.notified().await;
      Ok(self.response)
    }
  }

  #[tokio::test]
  async fn toggle_while_in_flight_is_rejected() {
    let gate = Arc::new(Notify::new());
    let transport = Gated {
      gate:     gate.clone(),
      response: LikeState::new(1, true),
      calls:    AtomicUsize::new(0),
    };
    let (sync, target) = seeded(transport, LikeState::new(0, false));
    let sync = Arc::new(sync);

    let first = tokio::spawn({
      let sync = sync.clone();
      async move { sync.toggle(target, |_| {}).await }
    });
    while !sync.state(target).is_some_and(ItemState::is_in_flight) {
      tokio::task::yield_now().await;
    }

    let second = sync.toggle(target, |_| {}).await;
    assert!(matches!(second, Err(SyncError::Cache(CacheError::InFlight(_)))));
    assert!(matches!(
      sync.state(target),
      Some(ItemState::Optimistic { predicted, .. }) if predicted == LikeState::new(1, true)
    ));

    gate.notify_one();
    assert_eq!(first.await.unwrap().unwrap(), LikeState::new(1, true));
    assert_eq!(sync.transport.calls.load(Ordering::SeqCst), 1);
  }

  /// Never answers.
  struct Stalled;

  impl LikeTransport for Stalled {
    async fn send_toggle(&self, _target: LikeTarget) -> Result<LikeState, LikeError> {
      std::future::pending().await
    }
  }

  #[tokio::test]
  async fn cancelled_toggle_restores_the_origin() {
    let (sync, target) = seeded(Stalled, LikeState::new(5, false));

    let mut shown = None;
    let timed_out =
      tokio::time::timeout(Duration::from_millis(50), sync.toggle(target, |p| shown = Some(p))).await;
    assert!(timed_out.is_err());
    assert_eq!(shown, Some(LikeState::new(6, true)));
    assert_eq!(sync.state(target), Some(ItemState::Settled(LikeState::new(5, false))));

    // The item is usable again: reads are accepted and a new toggle starts.
    assert!(sync.seed(target, LikeState::new(7, true)));
    let again = tokio::time::timeout(Duration::from_millis(10), sync.toggle(target, |_| {})).await;
    assert!(again.is_err());
    assert_eq!(sync.state(target), Some(ItemState::Settled(LikeState::new(7, true))));
  }
}
