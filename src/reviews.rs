use crate::dynamo::{
  delete_in_batches, get_string, key_of, query_all, Cursor, Index, Query, StoreError, TableStore,
  PK,
};
use crate::models::{game_partition, user_partition, Review};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPage {
  pub items: Vec<Review>,
  pub cursor: Option<Cursor>,
}

#[derive(Clone)]
pub struct ReviewStore {
  store: Arc<dyn TableStore>,
  table: String,
}

impl ReviewStore {
  pub fn new(store: Arc<dyn TableStore>, table: String) -> Self {
    Self { store, table }
  }

  /// Callers validate `comment` (non-empty, at most 500 characters).
  pub async fn create_review(
    &self,
    game_id: &str,
    user_id: &str,
    username: &str,
    comment: &str,
  ) -> Result<Review, StoreError> {
    let review = Review::new(game_id, user_id, username, comment);
    self.store.put_item(&self.table, review.to_item()).await?;

    Ok(review)
  }

  /// Newest first. `cursor` must be a token returned by a previous page of
  /// the same game.
  pub async fn list_reviews_for_game(
    &self,
    game_id: &str,
    limit: i64,
    cursor: Option<&Cursor>,
  ) -> Result<ReviewPage, StoreError> {
    let partition = game_partition(game_id);
    let start = match cursor {
      Some(cursor) => {
        let key = cursor.decode()?;
        if get_string(&key, PK).ok().as_deref() != Some(partition.as_str()) {
          return Err(StoreError::InvalidCursor);
        }
        Some(key)
      }
      None => None,
    };

    let page = self
      .store
      .query(
        Query::new(&self.table, Index::Primary, partition)
          .descending()
          .limit(limit.max(1))
          .start(start),
      )
      .await?;

    let items = page
      .items
      .iter()
      .map(Review::from_item)
      .collect::<Result<Vec<_>, _>>()?;
    let cursor = page.last_key.as_ref().map(Cursor::encode).transpose()?;

    Ok(ReviewPage { items, cursor })
  }

  pub async fn list_reviews_for_user(
    &self,
    user_id: &str,
    limit: i64,
  ) -> Result<Vec<Review>, StoreError> {
    let page = self
      .store
      .query(
        Query::new(&self.table, Index::Gsi1, user_partition(user_id))
          .descending()
          .limit(limit.max(1)),
      )
      .await?;

    page.items.iter().map(Review::from_item).collect()
  }

  pub async fn delete_review(&self, game_id: &str, ordering_key: &str) -> Result<(), StoreError> {
    self
      .store
      .delete_item(&self.table, Review::key(game_id, ordering_key))
      .await?;

    Ok(())
  }

  /// Pages through the whole partition, so no residue is left behind however
  /// many reviews the game has.
  pub async fn delete_all_reviews_for_game(&self, game_id: &str) -> Result<usize, StoreError> {
    let items = query_all(
      self.store.as_ref(),
      Query::new(&self.table, Index::Primary, game_partition(game_id)),
    )
    .await?;
    let keys = items.iter().map(key_of).collect::<Result<Vec<_>, _>>()?;
    let deleted = delete_in_batches(self.store.as_ref(), &self.table, keys).await?;

    tracing::info!(game_id, deleted, "deleted reviews for game");

    Ok(deleted)
  }
}
