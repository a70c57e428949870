use crate::audit::AuditLog;
use crate::queue::{Envelope, Queue, QueueError, QueueMessage};
use crate::queue_handlers::{Dispatcher, Disposition};
use rocket::tokio;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
  pub received: usize,
  pub handled: usize,
  pub failed: usize,
}

/// Polls one queue and hands each message to the dispatcher. A message is
/// deleted only after its handler succeeds; anything else is left for the
/// queue to redeliver once its visibility timeout lapses.
pub struct QueueWorker {
  queue: Arc<dyn Queue>,
  dispatcher: Dispatcher,
  audit: AuditLog,
  poll_interval: Duration,
}

impl QueueWorker {
  pub fn new(
    queue: Arc<dyn Queue>,
    dispatcher: Dispatcher,
    audit: AuditLog,
    poll_interval: Duration,
  ) -> Self {
    Self {
      queue,
      dispatcher,
      audit,
      poll_interval,
    }
  }

  pub async fn process_one_batch(&self) -> Result<BatchReport, QueueError> {
    let messages = self.queue.receive().await?;
    let mut report = BatchReport {
      received: messages.len(),
      ..Default::default()
    };

    for message in &messages {
      if self.process_message(message).await {
        report.handled += 1;
      } else {
        report.failed += 1;
      }
    }

    if report.received > 0 {
      tracing::info!(
        received = report.received,
        handled = report.handled,
        failed = report.failed,
        "processed batch"
      );
    }

    Ok(report)
  }

  async fn process_message(&self, message: &QueueMessage) -> bool {
    let message_id = message.message_id.as_deref().unwrap_or_default();
    let event = Envelope::parse(&message.body).into_event();
    let key = event.key.as_deref().unwrap_or_default();
    let game_id = event.game_id().unwrap_or_default();

    let disposition = match self.dispatcher.dispatch(&event).await {
      Ok(disposition) => disposition,
      Err(error) => {
        tracing::error!(
          message_id,
          event_type = %event.event_type,
          key,
          game_id,
          %error,
          "failed to handle message, leaving it for redelivery"
        );
        sentry::capture_error(&error);
        return false;
      }
    };

    if let Err(error) = self.queue.delete(&message.receipt_handle).await {
      tracing::error!(
        message_id,
        event_type = %event.event_type,
        key,
        game_id,
        %error,
        "failed to delete handled message"
      );
      return false;
    }

    let processed = disposition == Disposition::Processed;

    if let Err(error) = self
      .audit
      .record(&event.event_type, event.key.as_deref(), processed)
      .await
    {
      tracing::warn!(message_id, event_type = %event.event_type, %error, "failed to write audit record");
    }

    tracing::info!(
      message_id,
      event_type = %event.event_type,
      key,
      game_id,
      processed,
      "message handled"
    );

    true
  }

  /// Polls until `shutdown` resolves. Shutdown is only observed between
  /// batches; an empty or failed poll waits `poll_interval` first.
  pub async fn run<F>(&self, shutdown: F)
  where
    F: Future<Output = ()>,
  {
    tokio::pin!(shutdown);

    loop {
      let delay = match self.process_one_batch().await {
        Ok(report) if report.received > 0 => Duration::ZERO,
        Ok(_) => self.poll_interval,
        Err(error) => {
          tracing::error!(%error, "failed to receive messages");
          self.poll_interval
        }
      };

      tokio::select! {
        biased;
        _ = &mut shutdown => break,
        _ = tokio::time::sleep(delay) => {}
      }
    }

    tracing::info!("queue worker stopped");
  }
}
