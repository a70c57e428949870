mod memory;
mod s3;

pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

use std::collections::HashMap;
use std::time::Duration;

pub type Metadata = HashMap<String, String>;

/// User metadata key set on objects written by the resize pipeline.
pub const RESIZED_MARKER: &str = "resized";

#[derive(Debug, Clone, Default)]
pub struct ObjectHead {
  pub metadata: Metadata,
}

#[derive(Debug, Clone)]
pub struct StoredObject {
  pub body: Vec<u8>,
  pub content_type: Option<String>,
  pub metadata: Metadata,
  /// Canned ACL equivalent to the object's grants, `None` when private.
  pub acl: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewObject {
  pub body: Vec<u8>,
  pub content_type: String,
  pub metadata: Metadata,
  pub acl: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
  #[error("object not found: {0}")]
  NotFound(String),
  #[error("object store request failed: {0}")]
  Request(String),
  #[error("failed to read object body: {0}")]
  Body(#[from] std::io::Error),
}

#[rocket::async_trait]
pub trait ObjectStore: Send + Sync {
  async fn head(&self, key: &str) -> Result<ObjectHead, StorageError>;
  async fn get(&self, key: &str) -> Result<StoredObject, StorageError>;
  async fn put(&self, key: &str, object: NewObject) -> Result<(), StorageError>;
  /// Deleting a missing key succeeds.
  async fn delete(&self, key: &str) -> Result<(), StorageError>;
  fn public_url(&self, key: &str) -> String;
  fn signed_url(&self, key: &str, expires_in: Duration) -> String;
}
