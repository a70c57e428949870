mod envelope;
mod memory;
mod sqs;

pub use envelope::{Envelope, ParsedEvent};
pub use memory::MemoryQueue;
pub use sqs::SqsQueue;

#[derive(Debug, Clone, PartialEq)]
pub struct QueueMessage {
  pub message_id: Option<String>,
  pub body: String,
  pub receipt_handle: String,
}

#[derive(thiserror::Error, Debug)]
pub enum QueueError {
  #[error("queue request failed: {0}")]
  Request(String),
}

/// Receive/delete pair against one queue. Messages that are received but not
/// deleted become visible again after the queue's visibility timeout.
#[rocket::async_trait]
pub trait Queue: Send + Sync {
  async fn receive(&self) -> Result<Vec<QueueMessage>, QueueError>;
  async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError>;
}
