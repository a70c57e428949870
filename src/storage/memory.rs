use super::{NewObject, ObjectHead, ObjectStore, StorageError, StoredObject};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// In-process object store. Writes are kept with their ACL so callers can
/// assert on what was uploaded.
#[derive(Default)]
pub struct MemoryObjectStore {
  objects: Mutex<HashMap<String, NewObject>>,
  puts: Mutex<Vec<String>>,
}

impl MemoryObjectStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&self, key: &str, object: NewObject) {
    self.lock_objects().insert(key.to_owned(), object);
  }

  pub fn object(&self, key: &str) -> Option<NewObject> {
    self.lock_objects().get(key).cloned()
  }

  pub fn keys(&self) -> Vec<String> {
    let mut keys = self.lock_objects().keys().cloned().collect::<Vec<_>>();
    keys.sort();
    keys
  }

  /// Keys written through `put`, in call order.
  pub fn puts(&self) -> Vec<String> {
    self.puts.lock().unwrap_or_else(|e| e.into_inner()).clone()
  }

  fn lock_objects(&self) -> std::sync::MutexGuard<'_, HashMap<String, NewObject>> {
    self.objects.lock().unwrap_or_else(|e| e.into_inner())
  }
}

#[rocket::async_trait]
impl ObjectStore for MemoryObjectStore {
  async fn head(&self, key: &str) -> Result<ObjectHead, StorageError> {
    self
      .lock_objects()
      .get(key)
      .map(|object| ObjectHead {
        metadata: object.metadata.clone(),
      })
      .ok_or_else(|| StorageError::NotFound(key.to_owned()))
  }

  async fn get(&self, key: &str) -> Result<StoredObject, StorageError> {
    self
      .lock_objects()
      .get(key)
      .map(|object| StoredObject {
        body: object.body.clone(),
        content_type: Some(object.content_type.clone()),
        metadata: object.metadata.clone(),
        acl: object.acl.clone(),
      })
      .ok_or_else(|| StorageError::NotFound(key.to_owned()))
  }

  async fn put(&self, key: &str, object: NewObject) -> Result<(), StorageError> {
    self.insert(key, object);
    self
      .puts
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .push(key.to_owned());
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<(), StorageError> {
    self.lock_objects().remove(key);
    Ok(())
  }

  fn public_url(&self, key: &str) -> String {
    format!("memory://{}", key)
  }

  fn signed_url(&self, key: &str, expires_in: Duration) -> String {
    format!("memory://{}?expires={}", key, expires_in.as_secs())
  }
}
