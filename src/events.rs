mod sns;
mod sqs;

pub use sns::SnsPublisher;
pub use sqs::QueuePublisher;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
  FileUploaded,
  GameCreated,
  GameDeleted,
  /// A queue message none of the known envelope shapes could read.
  ParseError,
  Other(String),
}

impl EventType {
  pub fn as_str(&self) -> &str {
    match self {
      EventType::FileUploaded => "FILE_UPLOADED",
      EventType::GameCreated => "GAME_CREATED",
      EventType::GameDeleted => "GAME_DELETED",
      EventType::ParseError => "PARSE_ERROR",
      EventType::Other(name) => name,
    }
  }
}

impl From<String> for EventType {
  fn from(name: String) -> Self {
    match name.as_str() {
      "FILE_UPLOADED" => EventType::FileUploaded,
      "GAME_CREATED" => EventType::GameCreated,
      "GAME_DELETED" => EventType::GameDeleted,
      "PARSE_ERROR" => EventType::ParseError,
      _ => EventType::Other(name),
    }
  }
}

impl From<EventType> for String {
  fn from(event_type: EventType) -> Self {
    event_type.as_str().to_owned()
  }
}

impl fmt::Display for EventType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// The body every publisher sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMessage {
  pub event_type: EventType,
  pub data: Value,
  pub timestamp: DateTime<Utc>,
}

impl EventMessage {
  pub fn new(event_type: EventType, data: Value) -> Self {
    Self {
      event_type,
      data,
      timestamp: Utc::now(),
    }
  }
}

#[derive(thiserror::Error, Debug)]
pub enum PublishError {
  #[error("failed to serialize event: {0}")]
  Serialize(#[from] serde_json::Error),
  #[error("failed to publish event: {0}")]
  Request(String),
}

#[rocket::async_trait]
pub trait EventPublisher: Send + Sync {
  async fn publish(&self, event_type: EventType, data: Value) -> Result<(), PublishError>;
}

/// Used outside production: events are logged and dropped.
pub struct NoopPublisher;

#[rocket::async_trait]
impl EventPublisher for NoopPublisher {
  async fn publish(&self, event_type: EventType, data: Value) -> Result<(), PublishError> {
    tracing::info!(event_type = %event_type, %data, "event publishing disabled, skipping");
    Ok(())
  }
}

#[derive(Default)]
pub struct RecordingPublisher {
  events: Mutex<Vec<EventMessage>>,
}

impl RecordingPublisher {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn events(&self) -> Vec<EventMessage> {
    self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
  }
}

#[rocket::async_trait]
impl EventPublisher for RecordingPublisher {
  async fn publish(&self, event_type: EventType, data: Value) -> Result<(), PublishError> {
    self
      .events
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .push(EventMessage::new(event_type, data));
    Ok(())
  }
}
