use crate::db::DbConn;
use crate::models::{Game, RatingType};
use crate::schema::games;
use diesel::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RatingCounts {
  pub likes: i32,
  pub dislikes: i32,
}

impl RatingCounts {
  pub fn tally(ratings: impl IntoIterator<Item = RatingType>) -> Self {
    ratings
      .into_iter()
      .fold(RatingCounts::default(), |mut counts, rating_type| {
        match rating_type {
          RatingType::Like => counts.likes += 1,
          RatingType::Dislike => counts.dislikes += 1,
        }
        counts
      })
  }
}

/// How the like/dislike counters move for one rating change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterDelta {
  pub likes: i32,
  pub dislikes: i32,
}

impl CounterDelta {
  /// `next` is `None` when the rating was removed.
  pub fn between(prior: Option<RatingType>, next: Option<RatingType>) -> Self {
    if prior == next {
      return CounterDelta::default();
    }

    let mut delta = CounterDelta::default();

    match prior {
      Some(RatingType::Like) => delta.likes -= 1,
      Some(RatingType::Dislike) => delta.dislikes -= 1,
      None => {}
    }

    match next {
      Some(RatingType::Like) => delta.likes += 1,
      Some(RatingType::Dislike) => delta.dislikes += 1,
      None => {}
    }

    delta
  }

  pub fn is_zero(&self) -> bool {
    self.likes == 0 && self.dislikes == 0
  }
}

#[derive(thiserror::Error, Debug)]
pub enum CounterError {
  #[error("database error: {0}")]
  Database(#[from] diesel::result::Error),
}

/// The denormalized counters on the relational `games` row.
#[rocket::async_trait]
pub trait GameCounters: Send + Sync {
  /// Applies `delta` atomically. A counter that would drop below zero is
  /// left untouched.
  async fn apply(&self, game_id: &str, delta: CounterDelta) -> Result<(), CounterError>;
  async fn overwrite(&self, game_id: &str, counts: RatingCounts) -> Result<(), CounterError>;
  async fn counts(&self, game_id: &str) -> Result<Option<RatingCounts>, CounterError>;
  async fn game_ids(&self) -> Result<Vec<String>, CounterError>;
}

pub struct PgGameCounters {
  db_conn: Arc<DbConn>,
}

impl PgGameCounters {
  pub fn new(db_conn: Arc<DbConn>) -> Self {
    Self { db_conn }
  }
}

#[rocket::async_trait]
impl GameCounters for PgGameCounters {
  async fn apply(&self, game_id: &str, delta: CounterDelta) -> Result<(), CounterError> {
    if delta.is_zero() {
      return Ok(());
    }

    let id = game_id.to_owned();

    let (likes_updated, dislikes_updated) = self
      .db_conn
      .run(move |conn| {
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
          let mut likes_updated = 0;
          let mut dislikes_updated = 0;

          if delta.likes != 0 {
            likes_updated = diesel::update(
              games::table
                .filter(games::id.eq(&id))
                .filter(games::likes.ge(-delta.likes)),
            )
            .set((
              games::likes.eq(games::likes + delta.likes),
              games::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)?;
          }

          if delta.dislikes != 0 {
            dislikes_updated = diesel::update(
              games::table
                .filter(games::id.eq(&id))
                .filter(games::dislikes.ge(-delta.dislikes)),
            )
            .set((
              games::dislikes.eq(games::dislikes + delta.dislikes),
              games::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)?;
          }

          Ok((likes_updated, dislikes_updated))
        })
      })
      .await?;

    if (delta.likes != 0 && likes_updated == 0) || (delta.dislikes != 0 && dislikes_updated == 0) {
      tracing::warn!(
        game_id,
        likes = delta.likes,
        dislikes = delta.dislikes,
        "counter delta not fully applied"
      );
    }

    Ok(())
  }

  async fn overwrite(&self, game_id: &str, counts: RatingCounts) -> Result<(), CounterError> {
    let id = game_id.to_owned();

    self
      .db_conn
      .run(move |conn| {
        diesel::update(Game::find_by_id(&id))
          .set((
            games::likes.eq(counts.likes),
            games::dislikes.eq(counts.dislikes),
            games::updated_at.eq(diesel::dsl::now),
          ))
          .execute(conn)
      })
      .await?;

    Ok(())
  }

  async fn counts(&self, game_id: &str) -> Result<Option<RatingCounts>, CounterError> {
    let id = game_id.to_owned();

    let counts = self
      .db_conn
      .run(move |conn| {
        Game::find_by_id(&id)
          .select((games::likes, games::dislikes))
          .first::<(i32, i32)>(conn)
          .optional()
      })
      .await?;

    Ok(counts.map(|(likes, dislikes)| RatingCounts { likes, dislikes }))
  }

  async fn game_ids(&self) -> Result<Vec<String>, CounterError> {
    let ids = self
      .db_conn
      .run(|conn| games::table.select(games::id).load::<String>(conn))
      .await?;

    Ok(ids)
  }
}

/// In-process counters with the same clamping rule as the database.
#[derive(Default)]
pub struct MemoryCounters {
  games: Mutex<HashMap<String, RatingCounts>>,
}

impl MemoryCounters {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_games(ids: &[&str]) -> Self {
    let counters = Self::new();
    for id in ids {
      counters.set(id, RatingCounts::default());
    }
    counters
  }

  pub fn set(&self, game_id: &str, counts: RatingCounts) {
    self
      .games
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .insert(game_id.to_owned(), counts);
  }

  pub fn get(&self, game_id: &str) -> Option<RatingCounts> {
    self
      .games
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .get(game_id)
      .copied()
  }
}

#[rocket::async_trait]
impl GameCounters for MemoryCounters {
  async fn apply(&self, game_id: &str, delta: CounterDelta) -> Result<(), CounterError> {
    let mut games = self.games.lock().unwrap_or_else(|e| e.into_inner());

    if let Some(counts) = games.get_mut(game_id) {
      if counts.likes + delta.likes >= 0 {
        counts.likes += delta.likes;
      }
      if counts.dislikes + delta.dislikes >= 0 {
        counts.dislikes += delta.dislikes;
      }
    }

    Ok(())
  }

  async fn overwrite(&self, game_id: &str, counts: RatingCounts) -> Result<(), CounterError> {
    let mut games = self.games.lock().unwrap_or_else(|e| e.into_inner());

    if let Some(existing) = games.get_mut(game_id) {
      *existing = counts;
    }

    Ok(())
  }

  async fn counts(&self, game_id: &str) -> Result<Option<RatingCounts>, CounterError> {
    Ok(self.get(game_id))
  }

  async fn game_ids(&self) -> Result<Vec<String>, CounterError> {
    let mut ids = self
      .games
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .keys()
      .cloned()
      .collect::<Vec<_>>();
    ids.sort();
    Ok(ids)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use RatingType::{Dislike, Like};

  fn delta(likes: i32, dislikes: i32) -> CounterDelta {
    CounterDelta { likes, dislikes }
  }

  #[test]
  fn delta_follows_transition_table() {
    assert_eq!(CounterDelta::between(None, Some(Like)), delta(1, 0));
    assert_eq!(CounterDelta::between(None, Some(Dislike)), delta(0, 1));
    assert_eq!(CounterDelta::between(Some(Like), Some(Dislike)), delta(-1, 1));
    assert_eq!(CounterDelta::between(Some(Dislike), Some(Like)), delta(1, -1));
    assert_eq!(CounterDelta::between(Some(Like), Some(Like)), delta(0, 0));
    assert_eq!(CounterDelta::between(Some(Dislike), Some(Dislike)), delta(0, 0));
    assert_eq!(CounterDelta::between(Some(Like), None), delta(-1, 0));
    assert_eq!(CounterDelta::between(Some(Dislike), None), delta(0, -1));
    assert_eq!(CounterDelta::between(None, None), delta(0, 0));
  }

  #[test]
  fn tally_counts_each_type() {
    let counts = RatingCounts::tally(vec![Like, Dislike, Like]);
    assert_eq!(counts, RatingCounts { likes: 2, dislikes: 1 });
  }

  #[tokio::test]
  async fn memory_counters_never_go_negative() {
    let counters = MemoryCounters::with_games(&["g1"]);

    counters.apply("g1", delta(-1, 1)).await.unwrap();

    assert_eq!(counters.get("g1"), Some(RatingCounts { likes: 0, dislikes: 1 }));
  }
}
