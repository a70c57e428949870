use crate::counters::RatingCounts;
use crate::dynamo::{delete_in_batches, key_of, query_all, Index, Query, StoreError, TableStore};
use crate::models::{game_partition, Rating, RatingType};
use std::sync::Arc;

#[derive(Clone)]
pub struct RatingStore {
  store: Arc<dyn TableStore>,
  table: String,
}

impl RatingStore {
  pub fn new(store: Arc<dyn TableStore>, table: String) -> Self {
    Self { store, table }
  }

  pub async fn set_rating(
    &self,
    user_id: &str,
    game_id: &str,
    rating_type: RatingType,
  ) -> Result<Rating, StoreError> {
    let (rating, _) = self.upsert_rating(user_id, game_id, rating_type).await?;
    Ok(rating)
  }

  /// Writes the rating and returns it along with the record it replaced.
  /// The prior record comes back from the same write, so no other writer can
  /// slip in between reading it and overwriting it.
  pub async fn upsert_rating(
    &self,
    user_id: &str,
    game_id: &str,
    rating_type: RatingType,
  ) -> Result<(Rating, Option<Rating>), StoreError> {
    let rating = Rating::new(user_id, game_id, rating_type);
    let replaced = self.store.put_item(&self.table, rating.to_item()).await?;
    let prior = replaced.as_ref().map(Rating::from_item).transpose()?;

    Ok((rating, prior))
  }

  pub async fn get_rating(&self, user_id: &str, game_id: &str) -> Result<Option<Rating>, StoreError> {
    self
      .store
      .get_item(&self.table, Rating::key(user_id, game_id))
      .await?
      .as_ref()
      .map(Rating::from_item)
      .transpose()
  }

  pub async fn delete_rating(&self, user_id: &str, game_id: &str) -> Result<(), StoreError> {
    self.remove_rating(user_id, game_id).await?;
    Ok(())
  }

  /// Deletes the rating if present and returns what was removed.
  pub async fn remove_rating(
    &self,
    user_id: &str,
    game_id: &str,
  ) -> Result<Option<Rating>, StoreError> {
    self
      .store
      .delete_item(&self.table, Rating::key(user_id, game_id))
      .await?
      .as_ref()
      .map(Rating::from_item)
      .transpose()
  }

  pub async fn list_ratings_for_game(&self, game_id: &str) -> Result<Vec<Rating>, StoreError> {
    let items = query_all(self.store.as_ref(), self.game_query(game_id)).await?;
    items.iter().map(Rating::from_item).collect()
  }

  pub async fn counts_for_game(&self, game_id: &str) -> Result<RatingCounts, StoreError> {
    let ratings = self.list_ratings_for_game(game_id).await?;
    Ok(RatingCounts::tally(ratings.iter().map(|rating| rating.rating_type)))
  }

  pub async fn delete_all_ratings_for_game(&self, game_id: &str) -> Result<usize, StoreError> {
    let items = query_all(self.store.as_ref(), self.game_query(game_id)).await?;
    let keys = items.iter().map(key_of).collect::<Result<Vec<_>, _>>()?;
    let deleted = delete_in_batches(self.store.as_ref(), &self.table, keys).await?;

    tracing::info!(game_id, deleted, "deleted ratings for game");

    Ok(deleted)
  }

  fn game_query(&self, game_id: &str) -> Query {
    Query::new(&self.table, Index::Gsi1, game_partition(game_id))
  }
}
