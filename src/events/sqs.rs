use super::{EventMessage, EventPublisher, EventType, PublishError};
use crate::aws::Clients;
use rusoto_sqs::{SendMessageRequest, Sqs, SqsClient};
use serde_json::Value;

/// Sends events straight to the worker queue, for deployments without a topic.
pub struct QueuePublisher {
  client: SqsClient,
  queue_url: String,
}

impl QueuePublisher {
  pub fn new(clients: &Clients, queue_url: String) -> Self {
    Self {
      client: clients.sqs.clone(),
      queue_url,
    }
  }
}

#[rocket::async_trait]
impl EventPublisher for QueuePublisher {
  async fn publish(&self, event_type: EventType, data: Value) -> Result<(), PublishError> {
    let message_body = serde_json::to_string(&EventMessage::new(event_type, data))?;

    self
      .client
      .send_message(SendMessageRequest {
        queue_url: self.queue_url.clone(),
        message_body,
        ..Default::default()
      })
      .await
      .map_err(|e| PublishError::Request(e.to_string()))?;

    Ok(())
  }
}
