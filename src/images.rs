use crate::storage::{Metadata, NewObject, ObjectStore, StorageError, StoredObject, RESIZED_MARKER};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use std::io::Cursor;
use std::sync::Arc;

const JPEG_QUALITY: u8 = 85;
const RESIZED_SUFFIX: &str = "_resized";

#[derive(thiserror::Error, Debug)]
pub enum ImageError {
  #[error(transparent)]
  Storage(#[from] StorageError),
  #[error("failed to decode image: {0}")]
  Decode(image::ImageError),
  #[error("failed to encode image: {0}")]
  Encode(image::ImageError),
  #[error("resize task failed: {0}")]
  Task(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResizeOutcome {
  /// The object already carries the resized marker.
  Skipped,
  Resized {
    key: String,
    width: u32,
    height: u32,
  },
}

struct Resized {
  data: Vec<u8>,
  width: u32,
  height: u32,
}

pub fn is_resized(metadata: &Metadata) -> bool {
  metadata
    .get(RESIZED_MARKER)
    .map(|value| value == "true")
    .unwrap_or(false)
}

/// `game-images/cover.png` becomes `game-images/cover_resized.jpg`.
pub fn resized_key(key: &str) -> String {
  let (directory, file) = match key.rfind('/') {
    Some(index) => key.split_at(index + 1),
    None => ("", key),
  };
  let stem = match file.rfind('.') {
    Some(index) if index > 0 => &file[..index],
    _ => file,
  };

  format!("{}{}{}.jpg", directory, stem, RESIZED_SUFFIX)
}

fn resize(original: &[u8], max_dimension: u32) -> Result<Resized, ImageError> {
  let image = image::load_from_memory(original).map_err(ImageError::Decode)?;
  let (width, height) = image.dimensions();

  let image = if width > max_dimension || height > max_dimension {
    image.resize(max_dimension, max_dimension, FilterType::Triangle)
  } else {
    image
  };

  let image = DynamicImage::ImageRgb8(image.to_rgb8());
  let mut data = Vec::new();

  image
    .write_to(&mut Cursor::new(&mut data), ImageOutputFormat::Jpeg(JPEG_QUALITY))
    .map_err(ImageError::Encode)?;

  Ok(Resized {
    width: image.width(),
    height: image.height(),
    data,
  })
}

/// Downscales uploaded images to fit a square bound and stores the result
/// next to the original, tagged so it is never processed again. The copy
/// keeps the original's ACL unless one is forced with `with_acl`.
pub struct ResizePipeline {
  objects: Arc<dyn ObjectStore>,
  max_dimension: u32,
  acl: Option<String>,
}

impl ResizePipeline {
  pub fn new(objects: Arc<dyn ObjectStore>, max_dimension: u32) -> Self {
    Self {
      objects,
      max_dimension,
      acl: None,
    }
  }

  pub fn with_acl(mut self, acl: Option<String>) -> Self {
    self.acl = acl;
    self
  }

  pub async fn process(&self, key: &str) -> Result<ResizeOutcome, ImageError> {
    let head = self.objects.head(key).await?;

    if is_resized(&head.metadata) {
      tracing::info!(key, "object already resized, skipping");
      return Ok(ResizeOutcome::Skipped);
    }

    let original = self.objects.get(key).await?;
    self.resize_object(key, original).await
  }

  pub async fn resize_object(
    &self,
    key: &str,
    original: StoredObject,
  ) -> Result<ResizeOutcome, ImageError> {
    if is_resized(&original.metadata) {
      return Ok(ResizeOutcome::Skipped);
    }

    let max_dimension = self.max_dimension;
    let content_type = original.content_type;
    let acl = self.acl.clone().or(original.acl);
    let body = original.body;
    let resized = rocket::tokio::task::spawn_blocking(move || resize(&body, max_dimension))
      .await
      .map_err(|e| ImageError::Task(e.to_string()))??;

    let mut metadata = original.metadata;
    metadata.insert(RESIZED_MARKER.to_owned(), "true".to_owned());
    metadata.insert("original-key".to_owned(), key.to_owned());

    let target = resized_key(key);

    self
      .objects
      .put(
        &target,
        NewObject {
          body: resized.data,
          content_type: "image/jpeg".to_owned(),
          metadata,
          acl: acl.clone(),
        },
      )
      .await?;

    tracing::info!(
      key,
      resized_key = %target,
      original_type = ?content_type,
      acl = ?acl,
      width = resized.width,
      height = resized.height,
      "image resized"
    );

    Ok(ResizeOutcome::Resized {
      key: target,
      width: resized.width,
      height: resized.height,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::storage::MemoryObjectStore;
  use image::{Rgb, RgbImage};

  fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
    let mut data = Vec::new();
    DynamicImage::ImageRgb8(image)
      .write_to(&mut Cursor::new(&mut data), ImageOutputFormat::Png)
      .unwrap();
    data
  }

  fn upload(store: &MemoryObjectStore, key: &str, body: Vec<u8>) {
    upload_with_acl(store, key, body, None);
  }

  fn upload_with_acl(store: &MemoryObjectStore, key: &str, body: Vec<u8>, acl: Option<&str>) {
    let mut metadata = Metadata::new();
    metadata.insert("owner".to_owned(), "u1".to_owned());
    store.insert(
      key,
      NewObject {
        body,
        content_type: "image/png".to_owned(),
        metadata,
        acl: acl.map(str::to_owned),
      },
    );
  }

  #[test]
  fn derives_resized_keys() {
    assert_eq!(resized_key("game-images/cover.png"), "game-images/cover_resized.jpg");
    assert_eq!(resized_key("game-images/a.b.jpeg"), "game-images/a.b_resized.jpg");
    assert_eq!(resized_key("game-images/cover"), "game-images/cover_resized.jpg");
    assert_eq!(resized_key("cover.png"), "cover_resized.jpg");
  }

  #[tokio::test]
  async fn resizes_preserving_aspect_ratio() {
    let store = Arc::new(MemoryObjectStore::new());
    upload(&store, "game-images/cover.png", png(1600, 1200));
    let pipeline = ResizePipeline::new(store.clone(), 800);

    let outcome = pipeline.process("game-images/cover.png").await.unwrap();

    assert_eq!(
      outcome,
      ResizeOutcome::Resized {
        key: "game-images/cover_resized.jpg".to_owned(),
        width: 800,
        height: 600,
      }
    );

    let stored = store.object("game-images/cover_resized.jpg").unwrap();
    assert_eq!(stored.content_type, "image/jpeg");
    assert!(is_resized(&stored.metadata));
    assert_eq!(stored.metadata.get("owner").map(String::as_str), Some("u1"));

    let decoded = image::load_from_memory(&stored.body).unwrap();
    assert_eq!(decoded.dimensions(), (800, 600));
  }

  #[tokio::test]
  async fn private_originals_stay_private() {
    let store = Arc::new(MemoryObjectStore::new());
    upload(&store, "game-images/private.png", png(20, 20));
    let pipeline = ResizePipeline::new(store.clone(), 800);

    pipeline.process("game-images/private.png").await.unwrap();

    let stored = store.object("game-images/private_resized.jpg").unwrap();
    assert_eq!(stored.acl, None);
  }

  #[tokio::test]
  async fn public_originals_stay_public() {
    let store = Arc::new(MemoryObjectStore::new());
    upload_with_acl(&store, "game-images/public.png", png(20, 20), Some("public-read"));
    let pipeline = ResizePipeline::new(store.clone(), 800);

    pipeline.process("game-images/public.png").await.unwrap();

    let stored = store.object("game-images/public_resized.jpg").unwrap();
    assert_eq!(stored.acl.as_deref(), Some("public-read"));
  }

  #[tokio::test]
  async fn configured_acl_overrides_the_original() {
    let store = Arc::new(MemoryObjectStore::new());
    upload(&store, "game-images/cover.png", png(20, 20));
    let pipeline = ResizePipeline::new(store.clone(), 800)
      .with_acl(Some("bucket-owner-full-control".to_owned()));

    pipeline.process("game-images/cover.png").await.unwrap();

    let stored = store.object("game-images/cover_resized.jpg").unwrap();
    assert_eq!(stored.acl.as_deref(), Some("bucket-owner-full-control"));
  }

  #[tokio::test]
  async fn second_pass_over_resized_object_is_a_no_op() {
    let store = Arc::new(MemoryObjectStore::new());
    upload(&store, "game-images/cover.png", png(1000, 2000));
    let pipeline = ResizePipeline::new(store.clone(), 800);

    pipeline.process("game-images/cover.png").await.unwrap();
    let outcome = pipeline
      .process("game-images/cover_resized.jpg")
      .await
      .unwrap();

    assert_eq!(outcome, ResizeOutcome::Skipped);
    assert_eq!(store.puts(), vec!["game-images/cover_resized.jpg".to_owned()]);
  }

  #[tokio::test]
  async fn small_images_are_not_upscaled() {
    let store = Arc::new(MemoryObjectStore::new());
    upload(&store, "game-images/icon.png", png(64, 32));
    let pipeline = ResizePipeline::new(store.clone(), 800);

    let outcome = pipeline.process("game-images/icon.png").await.unwrap();

    assert!(matches!(
      outcome,
      ResizeOutcome::Resized {
        width: 64,
        height: 32,
        ..
      }
    ));
  }

  #[tokio::test]
  async fn undecodable_bytes_fail() {
    let store = Arc::new(MemoryObjectStore::new());
    upload(&store, "game-images/broken.png", b"not an image".to_vec());
    let pipeline = ResizePipeline::new(store.clone(), 800);

    let result = pipeline.process("game-images/broken.png").await;

    assert!(matches!(result, Err(ImageError::Decode(_))));
    assert!(store.puts().is_empty());
  }

  #[tokio::test]
  async fn missing_object_fails() {
    let pipeline = ResizePipeline::new(Arc::new(MemoryObjectStore::new()), 800);

    let result = pipeline.process("game-images/gone.png").await;

    assert!(matches!(
      result,
      Err(ImageError::Storage(StorageError::NotFound(_)))
    ));
  }
}
