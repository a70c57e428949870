use super::{
  get_string, Index, Item, Page, Query, StoreError, TableStore, BATCH_WRITE_LIMIT, GSI1PK, GSI1SK,
  PK, SK,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

type Rows = BTreeMap<(String, String), Item>;

/// In-process table store with the same key layout, `GSI1` projection and
/// last-evaluated-key shape as the real tables.
#[derive(Default)]
pub struct MemoryTable {
  tables: Mutex<HashMap<String, Rows>>,
  batches: Mutex<Vec<usize>>,
}

impl MemoryTable {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self, table: &str) -> usize {
    self.lock().get(table).map(|rows| rows.len()).unwrap_or(0)
  }

  pub fn is_empty(&self, table: &str) -> bool {
    self.len(table) == 0
  }

  pub fn items(&self, table: &str) -> Vec<Item> {
    self
      .lock()
      .get(table)
      .map(|rows| rows.values().cloned().collect())
      .unwrap_or_default()
  }

  /// Sizes of every `batch_delete` call, in order.
  pub fn batch_sizes(&self) -> Vec<usize> {
    self
      .batches
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .clone()
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, Rows>> {
    self.tables.lock().unwrap_or_else(|e| e.into_inner())
  }
}

fn row_key(key: &Item) -> Result<(String, String), StoreError> {
  Ok((get_string(key, PK)?, get_string(key, SK)?))
}

fn position(item: &Item, index: Index) -> Option<(String, String, String)> {
  let sort = item.get(index.sort_attribute())?.s.clone()?;
  let pk = item.get(PK)?.s.clone()?;
  let sk = item.get(SK)?.s.clone()?;
  Some((sort, pk, sk))
}

fn evaluated_key(item: &Item, index: Index) -> Item {
  let mut attributes = vec![PK, SK];

  if index == Index::Gsi1 {
    attributes.extend([GSI1PK, GSI1SK]);
  }

  attributes
    .into_iter()
    .filter_map(|name| {
      item
        .get(name)
        .map(|value| (name.to_owned(), value.clone()))
    })
    .collect()
}

#[rocket::async_trait]
impl TableStore for MemoryTable {
  async fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>, StoreError> {
    let row = row_key(&key)?;
    Ok(self.lock().get(table).and_then(|rows| rows.get(&row).cloned()))
  }

  async fn put_item(&self, table: &str, item: Item) -> Result<Option<Item>, StoreError> {
    let row = row_key(&item)?;
    Ok(
      self
        .lock()
        .entry(table.to_owned())
        .or_default()
        .insert(row, item),
    )
  }

  async fn delete_item(&self, table: &str, key: Item) -> Result<Option<Item>, StoreError> {
    let row = row_key(&key)?;
    Ok(self.lock().get_mut(table).and_then(|rows| rows.remove(&row)))
  }

  async fn query(&self, query: Query) -> Result<Page, StoreError> {
    let tables = self.lock();
    let partition_attribute = query.index.partition_attribute();

    let mut matches = tables
      .get(&query.table)
      .map(|rows| {
        rows
          .values()
          .filter(|item| {
            item
              .get(partition_attribute)
              .and_then(|value| value.s.as_deref())
              == Some(query.partition.as_str())
          })
          .filter_map(|item| position(item, query.index).map(|position| (position, item)))
          .collect::<Vec<_>>()
      })
      .unwrap_or_default();

    matches.sort_by(|(a, _), (b, _)| a.cmp(b));

    if !query.ascending {
      matches.reverse();
    }

    if let Some(start) = &query.start {
      let start = position(start, query.index).ok_or(StoreError::InvalidCursor)?;
      matches.retain(|(position, _)| {
        if query.ascending {
          *position > start
        } else {
          *position < start
        }
      });
    }

    let limit = query
      .limit
      .map(|limit| limit.max(0) as usize)
      .unwrap_or(usize::MAX);
    let has_more = matches.len() > limit;

    let items = matches
      .into_iter()
      .take(limit)
      .map(|(_, item)| item.clone())
      .collect::<Vec<_>>();

    let last_key = if has_more {
      items.last().map(|item| evaluated_key(item, query.index))
    } else {
      None
    };

    Ok(Page { items, last_key })
  }

  async fn batch_delete(&self, table: &str, keys: Vec<Item>) -> Result<(), StoreError> {
    if keys.len() > BATCH_WRITE_LIMIT {
      return Err(StoreError::Request(format!(
        "batch of {} exceeds {} items",
        keys.len(),
        BATCH_WRITE_LIMIT
      )));
    }

    self
      .batches
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .push(keys.len());

    let mut tables = self.lock();

    if let Some(rows) = tables.get_mut(table) {
      for key in &keys {
        rows.remove(&row_key(key)?);
      }
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dynamo::{primary_key, string_value};

  fn item(pk: &str, sk: &str, gsi_pk: &str) -> Item {
    let mut item = primary_key(pk.to_owned(), sk.to_owned());
    item.insert(GSI1PK.to_owned(), string_value(gsi_pk));
    item.insert(GSI1SK.to_owned(), string_value(pk));
    item
  }

  #[tokio::test]
  async fn put_returns_replaced_item() {
    let table = MemoryTable::new();

    assert!(table
      .put_item("t", item("USER#1", "GAME#1", "GAME#1"))
      .await
      .unwrap()
      .is_none());

    let replaced = table
      .put_item("t", item("USER#1", "GAME#1", "GAME#1"))
      .await
      .unwrap();

    assert!(replaced.is_some());
    assert_eq!(table.len("t"), 1);
  }

  #[tokio::test]
  async fn gsi_pages_resume_after_last_key() {
    let table = MemoryTable::new();

    for user in 0..5 {
      table
        .put_item("t", item(&format!("USER#{}", user), "GAME#1", "GAME#1"))
        .await
        .unwrap();
    }

    let first = table
      .query(Query::new("t", Index::Gsi1, "GAME#1".to_owned()).limit(3))
      .await
      .unwrap();
    let last_key = first.last_key.clone().unwrap();
    assert!(last_key.contains_key(GSI1PK));

    let second = table
      .query(Query::new("t", Index::Gsi1, "GAME#1".to_owned()).limit(3).start(Some(last_key)))
      .await
      .unwrap();

    assert_eq!(first.items.len(), 3);
    assert_eq!(second.items.len(), 2);
    assert!(second.last_key.is_none());
  }
}
