mod file_uploaded;
mod game_created;
mod game_deleted;

pub use file_uploaded::FileUploadedHandler;
pub use game_created::GameCreatedHandler;
pub use game_deleted::GameDeletedHandler;

use crate::dynamo::StoreError;
use crate::events::EventType;
use crate::images::ImageError;
use crate::queue::ParsedEvent;
use crate::storage::StorageError;

#[derive(thiserror::Error, Debug)]
pub enum QueueHandlerError {
  #[error(transparent)]
  Storage(#[from] StorageError),
  #[error(transparent)]
  Store(#[from] StoreError),
  #[error(transparent)]
  Image(#[from] ImageError),
  #[error("unrecognized message envelope: {0}")]
  UnrecognizedEnvelope(String),
  #[error("event is missing {0}")]
  MissingField(&'static str),
  #[error(transparent)]
  Other(#[from] anyhow::Error),
}

/// What a handler did with an event it accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
  Processed,
  Skipped,
}

#[rocket::async_trait]
pub trait QueueHandler: Send + Sync {
  fn event_type(&self) -> EventType;
  async fn handle(&self, event: &ParsedEvent) -> Result<Disposition, QueueHandlerError>;
}

/// Routes events to the handler registered for their type.
#[derive(Default)]
pub struct Dispatcher {
  handlers: Vec<Box<dyn QueueHandler>>,
}

impl Dispatcher {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(mut self, handler: impl QueueHandler + 'static) -> Self {
    self.handlers.push(Box::new(handler));
    self
  }

  /// Unknown event types are skipped. Envelopes that could not be parsed are
  /// errors so the message stays on the queue.
  pub async fn dispatch(&self, event: &ParsedEvent) -> Result<Disposition, QueueHandlerError> {
    if event.event_type == EventType::ParseError {
      let reason = event
        .data
        .get("reason")
        .and_then(|reason| reason.as_str())
        .unwrap_or("unknown")
        .to_owned();

      return Err(QueueHandlerError::UnrecognizedEnvelope(reason));
    }

    match self
      .handlers
      .iter()
      .find(|handler| handler.event_type() == event.event_type)
    {
      Some(handler) => handler.handle(event).await,
      None => {
        tracing::warn!(event_type = %event.event_type, "no handler for event type");
        Ok(Disposition::Skipped)
      }
    }
  }
}
