use crate::dynamo::{bool_value, number_value, string_value, Item, StoreError, TableStore, PK, SK};
use crate::events::EventType;
use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::Arc;

const RETENTION_DAYS: i64 = 30;
const ACTION: &str = "PROCESS";

/// Best-effort record of every handled queue event. Items expire through the
/// table's `ttl` attribute.
#[derive(Clone)]
pub struct AuditLog {
  store: Arc<dyn TableStore>,
  table: String,
}

fn operation_id(millis: i64) -> String {
  let suffix: String = rand::thread_rng()
    .sample_iter(&Alphanumeric)
    .take(9)
    .map(|c| char::from(c).to_ascii_lowercase())
    .collect();

  format!("{}-{}", millis, suffix)
}

impl AuditLog {
  pub fn new(store: Arc<dyn TableStore>, table: String) -> Self {
    Self { store, table }
  }

  pub async fn record(
    &self,
    event_type: &EventType,
    key: Option<&str>,
    processed: bool,
  ) -> Result<String, StoreError> {
    let now = Utc::now();
    let timestamp = now.to_rfc3339();
    let operation_id = operation_id(now.timestamp_millis());
    let expires_at = (now + Duration::days(RETENTION_DAYS)).timestamp();

    let mut item = Item::new();
    item.insert(PK.to_owned(), string_value(format!("AUDIT#{}", operation_id)));
    item.insert(SK.to_owned(), string_value(timestamp.clone()));
    item.insert("operation_id".to_owned(), string_value(operation_id.clone()));
    item.insert("action".to_owned(), string_value(ACTION));
    item.insert("eventType".to_owned(), string_value(event_type.as_str()));
    item.insert("processed".to_owned(), bool_value(processed));
    item.insert("timestamp".to_owned(), string_value(timestamp));
    item.insert("ttl".to_owned(), number_value(expires_at));

    if let Some(key) = key {
      item.insert("key".to_owned(), string_value(key));
    }

    self.store.put_item(&self.table, item).await?;

    Ok(operation_id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dynamo::{get_string, MemoryTable};

  #[tokio::test]
  async fn records_expire_after_thirty_days() {
    let table = Arc::new(MemoryTable::new());
    let audit = AuditLog::new(table.clone(), "crud_logs".to_owned());

    let id = audit
      .record(&EventType::FileUploaded, Some("game-images/a.png"), true)
      .await
      .unwrap();

    let items = table.items("crud_logs");
    assert_eq!(items.len(), 1);

    let item = &items[0];
    assert_eq!(get_string(item, "operation_id").unwrap(), id);
    assert_eq!(get_string(item, "action").unwrap(), "PROCESS");
    assert_eq!(get_string(item, "eventType").unwrap(), "FILE_UPLOADED");
    assert_eq!(get_string(item, "key").unwrap(), "game-images/a.png");
    assert_eq!(item["processed"].bool, Some(true));

    let ttl = item["ttl"].n.as_deref().unwrap().parse::<i64>().unwrap();
    let expected = (Utc::now() + Duration::days(30)).timestamp();
    assert!((expected - ttl).abs() < 60);
  }

  #[tokio::test]
  async fn key_is_optional() {
    let table = Arc::new(MemoryTable::new());
    let audit = AuditLog::new(table.clone(), "crud_logs".to_owned());

    audit
      .record(&EventType::Other("FILE_REMOVED".to_owned()), None, true)
      .await
      .unwrap();

    assert!(!table.items("crud_logs")[0].contains_key("key"));
  }
}
