use super::{Disposition, QueueHandler, QueueHandlerError};
use crate::events::EventType;
use crate::queue::ParsedEvent;

pub struct GameCreatedHandler;

#[rocket::async_trait]
impl QueueHandler for GameCreatedHandler {
  fn event_type(&self) -> EventType {
    EventType::GameCreated
  }

  async fn handle(&self, event: &ParsedEvent) -> Result<Disposition, QueueHandlerError> {
    tracing::info!(game_id = event.game_id().unwrap_or_default(), "game created");
    Ok(Disposition::Processed)
  }
}
