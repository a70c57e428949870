use super::{EventMessage, EventPublisher, EventType, PublishError};
use crate::aws::Clients;
use rusoto_sns::{PublishInput, Sns, SnsClient};
use serde_json::Value;

pub struct SnsPublisher {
  client: SnsClient,
  topic_arn: String,
}

impl SnsPublisher {
  pub fn new(clients: &Clients, topic_arn: String) -> Self {
    Self {
      client: clients.sns.clone(),
      topic_arn,
    }
  }
}

#[rocket::async_trait]
impl EventPublisher for SnsPublisher {
  async fn publish(&self, event_type: EventType, data: Value) -> Result<(), PublishError> {
    let subject = format!("Game Event: {}", event_type);
    let message = serde_json::to_string(&EventMessage::new(event_type, data))?;

    self
      .client
      .publish(PublishInput {
        topic_arn: Some(self.topic_arn.clone()),
        message,
        subject: Some(subject),
        ..Default::default()
      })
      .await
      .map_err(|e| PublishError::Request(e.to_string()))?;

    Ok(())
  }
}
