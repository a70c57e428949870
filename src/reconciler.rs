use crate::counters::{CounterDelta, CounterError, GameCounters};
use crate::dynamo::StoreError;
use crate::models::RatingType;
use crate::ratings::RatingStore;
use serde::Serialize;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum RatingError {
  #[error(transparent)]
  Store(#[from] StoreError),
  #[error(transparent)]
  Counter(#[from] CounterError),
}

/// Keeps the relational like/dislike counters in step with rating records.
///
/// Counters move by per-write deltas and are only as exact as those deltas;
/// `reconcile_game` and `sweep` recount from the rating index and overwrite
/// whatever drifted.
#[derive(Clone)]
pub struct CounterReconciler {
  ratings: RatingStore,
  counters: Arc<dyn GameCounters>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
  pub games: usize,
  pub corrected: usize,
  pub failed: usize,
}

impl CounterReconciler {
  pub fn new(ratings: RatingStore, counters: Arc<dyn GameCounters>) -> Self {
    Self { ratings, counters }
  }

  pub fn counters(&self) -> &Arc<dyn GameCounters> {
    &self.counters
  }

  pub async fn apply_change(
    &self,
    game_id: &str,
    prior: Option<RatingType>,
    next: Option<RatingType>,
  ) -> Result<CounterDelta, CounterError> {
    let delta = CounterDelta::between(prior, next);

    if !delta.is_zero() {
      self.counters.apply(game_id, delta).await?;
    }

    Ok(delta)
  }

  /// Returns `true` when the stored counters had drifted and were rewritten.
  pub async fn reconcile_game(&self, game_id: &str) -> Result<bool, RatingError> {
    let actual = self.ratings.counts_for_game(game_id).await?;
    let stored = self.counters.counts(game_id).await?;

    match stored {
      Some(stored) if stored == actual => Ok(false),
      Some(stored) => {
        tracing::warn!(
          game_id,
          stored_likes = stored.likes,
          stored_dislikes = stored.dislikes,
          likes = actual.likes,
          dislikes = actual.dislikes,
          "rating counters drifted"
        );
        self.counters.overwrite(game_id, actual).await?;
        Ok(true)
      }
      None => Ok(false),
    }
  }

  /// Reconciles every game; one game's failure does not stop the sweep.
  pub async fn sweep(&self) -> Result<SweepReport, RatingError> {
    let game_ids = self.counters.game_ids().await?;
    let mut report = SweepReport {
      games: game_ids.len(),
      ..Default::default()
    };

    for game_id in &game_ids {
      match self.reconcile_game(game_id).await {
        Ok(true) => report.corrected += 1,
        Ok(false) => {}
        Err(error) => {
          tracing::error!(game_id = %game_id, %error, "failed to reconcile counters");
          report.failed += 1;
        }
      }
    }

    tracing::info!(
      games = report.games,
      corrected = report.corrected,
      failed = report.failed,
      "counter sweep finished"
    );

    Ok(report)
  }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RatingOutcome {
  pub likes: i32,
  pub dislikes: i32,
  pub user_rating: Option<RatingType>,
}

/// The synchronous like/dislike/remove flow used by request handlers.
#[derive(Clone)]
pub struct RatingService {
  ratings: RatingStore,
  reconciler: CounterReconciler,
}

impl RatingService {
  pub fn new(ratings: RatingStore, reconciler: CounterReconciler) -> Self {
    Self {
      ratings,
      reconciler,
    }
  }

  pub async fn like(&self, user_id: &str, game_id: &str) -> Result<RatingOutcome, RatingError> {
    self.rate(user_id, game_id, RatingType::Like).await
  }

  pub async fn dislike(&self, user_id: &str, game_id: &str) -> Result<RatingOutcome, RatingError> {
    self.rate(user_id, game_id, RatingType::Dislike).await
  }

  pub async fn rate(
    &self,
    user_id: &str,
    game_id: &str,
    rating_type: RatingType,
  ) -> Result<RatingOutcome, RatingError> {
    let (_, prior) = self
      .ratings
      .upsert_rating(user_id, game_id, rating_type)
      .await?;

    self
      .reconciler
      .apply_change(game_id, prior.map(|rating| rating.rating_type), Some(rating_type))
      .await?;

    self.outcome(game_id, Some(rating_type)).await
  }

  pub async fn remove(&self, user_id: &str, game_id: &str) -> Result<RatingOutcome, RatingError> {
    let removed = self.ratings.remove_rating(user_id, game_id).await?;

    if let Some(removed) = removed {
      self
        .reconciler
        .apply_change(game_id, Some(removed.rating_type), None)
        .await?;
    }

    self.outcome(game_id, None).await
  }

  pub async fn user_rating(
    &self,
    user_id: &str,
    game_id: &str,
  ) -> Result<Option<RatingType>, RatingError> {
    Ok(
      self
        .ratings
        .get_rating(user_id, game_id)
        .await?
        .map(|rating| rating.rating_type),
    )
  }

  async fn outcome(
    &self,
    game_id: &str,
    user_rating: Option<RatingType>,
  ) -> Result<RatingOutcome, RatingError> {
    let counts = self
      .reconciler
      .counters()
      .counts(game_id)
      .await?
      .unwrap_or_default();

    Ok(RatingOutcome {
      likes: counts.likes,
      dislikes: counts.dislikes,
      user_rating,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::counters::{MemoryCounters, RatingCounts};
  use crate::dynamo::MemoryTable;

  fn service() -> (Arc<MemoryCounters>, RatingService, CounterReconciler) {
    let ratings = RatingStore::new(Arc::new(MemoryTable::new()), "GameRatings".to_owned());
    let counters = Arc::new(MemoryCounters::with_games(&["g1", "g2"]));
    let reconciler = CounterReconciler::new(ratings.clone(), counters.clone());
    (
      counters,
      RatingService::new(ratings, reconciler.clone()),
      reconciler,
    )
  }

  #[tokio::test]
  async fn like_dislike_remove_nets_out() {
    let (counters, service, _) = service();

    let outcome = service.like("u1", "g1").await.unwrap();
    assert_eq!((outcome.likes, outcome.dislikes), (1, 0));

    let outcome = service.dislike("u1", "g1").await.unwrap();
    assert_eq!((outcome.likes, outcome.dislikes), (0, 1));
    assert_eq!(outcome.user_rating, Some(RatingType::Dislike));

    let outcome = service.remove("u1", "g1").await.unwrap();
    assert_eq!((outcome.likes, outcome.dislikes), (0, 0));
    assert_eq!(outcome.user_rating, None);

    assert_eq!(counters.get("g1"), Some(RatingCounts::default()));
  }

  #[tokio::test]
  async fn repeated_like_is_idempotent() {
    let (_, service, _) = service();

    service.like("u1", "g1").await.unwrap();
    let outcome = service.like("u1", "g1").await.unwrap();

    assert_eq!((outcome.likes, outcome.dislikes), (1, 0));
  }

  #[tokio::test]
  async fn removing_a_missing_rating_leaves_counters() {
    let (_, service, _) = service();
    service.like("u2", "g1").await.unwrap();

    let outcome = service.remove("u1", "g1").await.unwrap();

    assert_eq!((outcome.likes, outcome.dislikes), (1, 0));
    assert_eq!(service.user_rating("u2", "g1").await.unwrap(), Some(RatingType::Like));
  }

  #[tokio::test]
  async fn sweep_rewrites_drifted_counters() {
    let (counters, service, reconciler) = service();
    service.like("u1", "g1").await.unwrap();
    service.dislike("u2", "g1").await.unwrap();
    counters.set("g1", RatingCounts { likes: 7, dislikes: 0 });

    let report = reconciler.sweep().await.unwrap();

    assert_eq!(
      report,
      SweepReport {
        games: 2,
        corrected: 1,
        failed: 0
      }
    );
    assert_eq!(counters.get("g1"), Some(RatingCounts { likes: 1, dislikes: 1 }));
  }
}
