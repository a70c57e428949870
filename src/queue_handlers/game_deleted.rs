use super::{Disposition, QueueHandler, QueueHandlerError};
use crate::events::EventType;
use crate::queue::ParsedEvent;
use crate::ratings::RatingStore;
use crate::reviews::ReviewStore;

/// Removes every rating and review that references a deleted game.
pub struct GameDeletedHandler {
  ratings: RatingStore,
  reviews: ReviewStore,
}

impl GameDeletedHandler {
  pub fn new(ratings: RatingStore, reviews: ReviewStore) -> Self {
    Self { ratings, reviews }
  }
}

#[rocket::async_trait]
impl QueueHandler for GameDeletedHandler {
  fn event_type(&self) -> EventType {
    EventType::GameDeleted
  }

  async fn handle(&self, event: &ParsedEvent) -> Result<Disposition, QueueHandlerError> {
    let game_id = event
      .game_id()
      .ok_or(QueueHandlerError::MissingField("gameId"))?;

    let (ratings, reviews) = rocket::tokio::try_join!(
      self.ratings.delete_all_ratings_for_game(game_id),
      self.reviews.delete_all_reviews_for_game(game_id),
    )?;

    tracing::info!(game_id, ratings, reviews, "deleted game data");

    Ok(Disposition::Processed)
  }
}
