//! Single-table access shared by the rating, review and audit stores.
//!
//! Every table uses the same layout: a `PK`/`SK` primary key and one global
//! secondary index, `GSI1`, keyed by `GSI1PK`/`GSI1SK`. Stores describe their
//! access patterns in terms of that layout and stay unaware of the backend.

mod cursor;
mod memory;
mod table;

pub use cursor::Cursor;
pub use memory::MemoryTable;
pub use table::DynamoTable;

use rusoto_core::RusotoError;
use rusoto_dynamodb::AttributeValue;
use std::collections::HashMap;

pub type Item = HashMap<String, AttributeValue>;

/// Per-request item ceiling of `BatchWriteItem`.
pub const BATCH_WRITE_LIMIT: usize = 25;

pub const PK: &str = "PK";
pub const SK: &str = "SK";
pub const GSI1: &str = "GSI1";
pub const GSI1PK: &str = "GSI1PK";
pub const GSI1SK: &str = "GSI1SK";

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
  #[error("table request failed: {0}")]
  Request(String),
  #[error("malformed item: {0}")]
  Malformed(String),
  #[error("invalid pagination cursor")]
  InvalidCursor,
  #[error("{0} items left unprocessed after retries")]
  Unprocessed(usize),
}

impl<E: std::error::Error + 'static> From<RusotoError<E>> for StoreError {
  fn from(error: RusotoError<E>) -> Self {
    StoreError::Request(error.to_string())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Index {
  Primary,
  Gsi1,
}

impl Index {
  pub fn name(&self) -> Option<&'static str> {
    match self {
      Index::Primary => None,
      Index::Gsi1 => Some(GSI1),
    }
  }

  pub fn partition_attribute(&self) -> &'static str {
    match self {
      Index::Primary => PK,
      Index::Gsi1 => GSI1PK,
    }
  }

  pub fn sort_attribute(&self) -> &'static str {
    match self {
      Index::Primary => SK,
      Index::Gsi1 => GSI1SK,
    }
  }
}

#[derive(Debug, Clone)]
pub struct Query {
  pub table: String,
  pub index: Index,
  pub partition: String,
  pub ascending: bool,
  pub limit: Option<i64>,
  pub start: Option<Item>,
}

impl Query {
  pub fn new(table: &str, index: Index, partition: String) -> Self {
    Self {
      table: table.to_owned(),
      index,
      partition,
      ascending: true,
      limit: None,
      start: None,
    }
  }

  pub fn descending(mut self) -> Self {
    self.ascending = false;
    self
  }

  pub fn limit(mut self, limit: i64) -> Self {
    self.limit = Some(limit);
    self
  }

  pub fn start(mut self, start: Option<Item>) -> Self {
    self.start = start;
    self
  }
}

#[derive(Debug, Default)]
pub struct Page {
  pub items: Vec<Item>,
  pub last_key: Option<Item>,
}

#[rocket::async_trait]
pub trait TableStore: Send + Sync {
  async fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>, StoreError>;
  /// Returns the item that was replaced, if any.
  async fn put_item(&self, table: &str, item: Item) -> Result<Option<Item>, StoreError>;
  /// Returns the item that was removed, if any.
  async fn delete_item(&self, table: &str, key: Item) -> Result<Option<Item>, StoreError>;
  async fn query(&self, query: Query) -> Result<Page, StoreError>;
  /// Deletes at most `BATCH_WRITE_LIMIT` keys in one request.
  async fn batch_delete(&self, table: &str, keys: Vec<Item>) -> Result<(), StoreError>;
}

pub fn string_value(value: impl Into<String>) -> AttributeValue {
  AttributeValue {
    s: Some(value.into()),
    ..Default::default()
  }
}

pub fn number_value(value: i64) -> AttributeValue {
  AttributeValue {
    n: Some(value.to_string()),
    ..Default::default()
  }
}

pub fn bool_value(value: bool) -> AttributeValue {
  AttributeValue {
    bool: Some(value),
    ..Default::default()
  }
}

pub fn primary_key(pk: String, sk: String) -> Item {
  let mut key = Item::new();
  key.insert(PK.to_owned(), string_value(pk));
  key.insert(SK.to_owned(), string_value(sk));
  key
}

pub fn get_string(item: &Item, name: &str) -> Result<String, StoreError> {
  item
    .get(name)
    .and_then(|value| value.s.clone())
    .ok_or_else(|| StoreError::Malformed(format!("missing string attribute {}", name)))
}

/// Keeps only the primary key attributes of `item`.
pub fn key_of(item: &Item) -> Result<Item, StoreError> {
  Ok(primary_key(get_string(item, PK)?, get_string(item, SK)?))
}

/// Follows `last_key` until the partition is exhausted.
pub async fn query_all(store: &dyn TableStore, query: Query) -> Result<Vec<Item>, StoreError> {
  let mut items = Vec::new();
  let mut start = query.start.clone();

  loop {
    let page = store.query(query.clone().start(start)).await?;
    items.extend(page.items);

    match page.last_key {
      Some(last_key) => start = Some(last_key),
      None => return Ok(items),
    }
  }
}

/// Deletes `keys` in chunks of `BATCH_WRITE_LIMIT` and returns how many were sent.
pub async fn delete_in_batches(
  store: &dyn TableStore,
  table: &str,
  keys: Vec<Item>,
) -> Result<usize, StoreError> {
  let total = keys.len();

  for chunk in keys.chunks(BATCH_WRITE_LIMIT) {
    store.batch_delete(table, chunk.to_vec()).await?;
  }

  Ok(total)
}
