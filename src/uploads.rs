use crate::config::has_prefix;
use crate::events::{EventPublisher, EventType};
use crate::storage::{NewObject, ObjectStore, StorageError};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(thiserror::Error, Debug)]
pub enum UploadError {
  #[error(transparent)]
  Storage(#[from] StorageError),
}

pub struct FileUpload {
  pub file_name: String,
  pub content_type: String,
  pub body: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UploadedFile {
  pub key: String,
  pub url: String,
}

fn object_key(folder: &str, file_name: &str) -> String {
  let folder = folder.trim_end_matches('/');
  let name = format!("{}-{}", Utc::now().timestamp_millis(), Uuid::new_v4());

  match file_name.rsplit_once('.') {
    Some((stem, extension)) if !stem.is_empty() && !extension.is_empty() => {
      format!("{}/{}.{}", folder, name, extension.to_lowercase())
    }
    _ => format!("{}/{}", folder, name),
  }
}

/// Stores caller-supplied files and announces the ones that need resizing.
#[derive(Clone)]
pub struct Uploader {
  objects: Arc<dyn ObjectStore>,
  publisher: Arc<dyn EventPublisher>,
  image_prefixes: Vec<String>,
}

impl Uploader {
  pub fn new(
    objects: Arc<dyn ObjectStore>,
    publisher: Arc<dyn EventPublisher>,
    image_prefixes: Vec<String>,
  ) -> Self {
    Self {
      objects,
      publisher,
      image_prefixes,
    }
  }

  pub async fn upload_file(
    &self,
    folder: &str,
    file_name: &str,
    content_type: &str,
    body: Vec<u8>,
  ) -> Result<UploadedFile, UploadError> {
    let key = object_key(folder, file_name);

    self
      .objects
      .put(
        &key,
        NewObject {
          body,
          content_type: content_type.to_owned(),
          ..Default::default()
        },
      )
      .await?;

    if has_prefix(&self.image_prefixes, &key) {
      let published = self
        .publisher
        .publish(
          EventType::FileUploaded,
          json!({ "s3Key": key, "fileName": file_name }),
        )
        .await;

      if let Err(error) = published {
        tracing::error!(key = %key, %error, "failed to publish upload event");
        sentry::capture_error(&error);
      }
    }

    tracing::info!(key = %key, content_type, "file uploaded");

    Ok(UploadedFile {
      url: self.objects.public_url(&key),
      key,
    })
  }

  /// Uploads in order and stops at the first storage failure.
  pub async fn upload_files(
    &self,
    folder: &str,
    files: Vec<FileUpload>,
  ) -> Result<Vec<UploadedFile>, UploadError> {
    let mut uploaded = Vec::with_capacity(files.len());

    for file in files {
      uploaded.push(
        self
          .upload_file(folder, &file.file_name, &file.content_type, file.body)
          .await?,
      );
    }

    Ok(uploaded)
  }

  pub fn signed_url(&self, key: &str, expires_in: Duration) -> String {
    self.objects.signed_url(key, expires_in)
  }

  pub async fn delete_file(&self, key: &str) -> Result<(), UploadError> {
    self.objects.delete(key).await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::events::{PublishError, RecordingPublisher};
  use crate::storage::MemoryObjectStore;
  use serde_json::Value;

  struct UnreachablePublisher;

  #[rocket::async_trait]
  impl EventPublisher for UnreachablePublisher {
    async fn publish(&self, _event_type: EventType, _data: Value) -> Result<(), PublishError> {
      Err(PublishError::Request("topic unreachable".to_owned()))
    }
  }

  fn uploader() -> (Arc<MemoryObjectStore>, Arc<RecordingPublisher>, Uploader) {
    let store = Arc::new(MemoryObjectStore::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let uploader = Uploader::new(
      store.clone(),
      publisher.clone(),
      vec!["game-images/".to_owned()],
    );
    (store, publisher, uploader)
  }

  #[test]
  fn keys_keep_the_extension() {
    let key = object_key("game-images/", "Cover.PNG");

    assert!(key.starts_with("game-images/"));
    assert!(key.ends_with(".png"));
    assert!(!key.contains("//"));
    assert!(object_key("docs", "README").starts_with("docs/"));
    assert!(!object_key("docs", "README").contains('.'));
  }

  #[tokio::test]
  async fn image_uploads_are_announced() {
    let (store, publisher, uploader) = uploader();

    let uploaded = uploader
      .upload_file("game-images", "cover.png", "image/png", vec![1, 2, 3])
      .await
      .unwrap();

    assert_eq!(store.object(&uploaded.key).unwrap().body, vec![1, 2, 3]);
    assert!(uploaded.url.ends_with(&uploaded.key));

    let events = publisher.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::FileUploaded);
    assert_eq!(events[0].data["s3Key"], uploaded.key.as_str());
    assert_eq!(events[0].data["fileName"], "cover.png");
  }

  #[tokio::test]
  async fn other_uploads_are_stored_silently() {
    let (store, publisher, uploader) = uploader();

    let uploaded = uploader
      .upload_file("attachments", "notes.txt", "text/plain", b"hi".to_vec())
      .await
      .unwrap();

    assert!(store.object(&uploaded.key).is_some());
    assert!(publisher.events().is_empty());

    uploader.delete_file(&uploaded.key).await.unwrap();
    assert!(store.object(&uploaded.key).is_none());
  }

  #[tokio::test]
  async fn publish_failures_do_not_fail_the_upload() {
    let store = Arc::new(MemoryObjectStore::new());
    let uploader = Uploader::new(
      store.clone(),
      Arc::new(UnreachablePublisher),
      vec!["game-images/".to_owned()],
    );

    let uploaded = uploader
      .upload_file("game-images", "cover.png", "image/png", vec![7])
      .await
      .unwrap();

    assert_eq!(store.keys(), vec![uploaded.key]);
  }

  #[tokio::test]
  async fn uploads_several_files() {
    let (store, publisher, uploader) = uploader();
    let files = vec![
      FileUpload {
        file_name: "a.png".to_owned(),
        content_type: "image/png".to_owned(),
        body: vec![1],
      },
      FileUpload {
        file_name: "b.jpg".to_owned(),
        content_type: "image/jpeg".to_owned(),
        body: vec![2],
      },
    ];

    let uploaded = uploader.upload_files("game-images", files).await.unwrap();

    assert_eq!(uploaded.len(), 2);
    assert!(uploaded[0].key.ends_with(".png"));
    assert!(uploaded[1].key.ends_with(".jpg"));
    assert_eq!(store.keys().len(), 2);
    assert_eq!(publisher.events().len(), 2);
  }
}
