use super::{Queue, QueueError, QueueMessage};
use crate::aws::Clients;
use crate::config::Config;
use rusoto_sqs::{DeleteMessageRequest, ReceiveMessageRequest, Sqs, SqsClient};

const MAX_MESSAGES: i64 = 10;

pub struct SqsQueue {
  client: SqsClient,
  queue_url: String,
  wait_seconds: i64,
  visibility_seconds: i64,
}

impl SqsQueue {
  pub fn new(clients: &Clients, config: &Config) -> Self {
    Self {
      client: clients.sqs.clone(),
      queue_url: config.queue_url.clone(),
      wait_seconds: config.queue_wait_seconds,
      visibility_seconds: config.queue_visibility_seconds,
    }
  }
}

#[rocket::async_trait]
impl Queue for SqsQueue {
  async fn receive(&self) -> Result<Vec<QueueMessage>, QueueError> {
    let receive_request = ReceiveMessageRequest {
      queue_url: self.queue_url.clone(),
      max_number_of_messages: Some(MAX_MESSAGES),
      wait_time_seconds: Some(self.wait_seconds),
      visibility_timeout: Some(self.visibility_seconds),
      ..Default::default()
    };

    let response = self
      .client
      .receive_message(receive_request)
      .await
      .map_err(|e| QueueError::Request(e.to_string()))?;

    let messages = response
      .messages
      .unwrap_or_default()
      .into_iter()
      .filter_map(|message| match message.receipt_handle {
        Some(receipt_handle) => Some(QueueMessage {
          message_id: message.message_id,
          body: message.body.unwrap_or_default(),
          receipt_handle,
        }),
        None => {
          tracing::warn!(message_id = ?message.message_id, "message without receipt handle");
          None
        }
      })
      .collect();

    Ok(messages)
  }

  async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
    let delete_request = DeleteMessageRequest {
      queue_url: self.queue_url.clone(),
      receipt_handle: receipt_handle.to_owned(),
    };

    self
      .client
      .delete_message(delete_request)
      .await
      .map_err(|e| QueueError::Request(e.to_string()))?;

    Ok(())
  }
}
