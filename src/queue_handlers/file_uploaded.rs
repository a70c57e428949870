use super::{Disposition, QueueHandler, QueueHandlerError};
use crate::config::has_prefix;
use crate::events::EventType;
use crate::images::{ResizeOutcome, ResizePipeline};
use crate::queue::ParsedEvent;

pub struct FileUploadedHandler {
  pipeline: ResizePipeline,
  image_prefixes: Vec<String>,
}

impl FileUploadedHandler {
  pub fn new(pipeline: ResizePipeline, image_prefixes: Vec<String>) -> Self {
    Self {
      pipeline,
      image_prefixes,
    }
  }
}

#[rocket::async_trait]
impl QueueHandler for FileUploadedHandler {
  fn event_type(&self) -> EventType {
    EventType::FileUploaded
  }

  async fn handle(&self, event: &ParsedEvent) -> Result<Disposition, QueueHandlerError> {
    let key = match &event.key {
      Some(key) => key,
      None => {
        tracing::warn!("upload event without a key");
        return Ok(Disposition::Skipped);
      }
    };

    if !has_prefix(&self.image_prefixes, key) {
      tracing::info!(key = %key, "not an image upload, skipping");
      return Ok(Disposition::Skipped);
    }

    match self.pipeline.process(key).await? {
      ResizeOutcome::Resized { .. } => Ok(Disposition::Processed),
      ResizeOutcome::Skipped => Ok(Disposition::Skipped),
    }
  }
}
