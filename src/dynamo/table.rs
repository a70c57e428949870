use super::{string_value, Item, Page, Query, StoreError, TableStore};
use crate::aws::Clients;
use rusoto_dynamodb::{
  BatchWriteItemInput, DeleteItemInput, DeleteRequest, DynamoDb, DynamoDbClient, GetItemInput,
  PutItemInput, QueryInput, WriteRequest,
};
use std::collections::HashMap;

const UNPROCESSED_RETRIES: usize = 3;

pub struct DynamoTable {
  client: DynamoDbClient,
}

impl DynamoTable {
  pub fn new(clients: &Clients) -> Self {
    Self::with_client(clients.dynamo.clone())
  }

  pub fn with_client(client: DynamoDbClient) -> Self {
    Self { client }
  }
}

#[rocket::async_trait]
impl TableStore for DynamoTable {
  async fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>, StoreError> {
    let output = self
      .client
      .get_item(GetItemInput {
        table_name: table.to_owned(),
        key,
        ..Default::default()
      })
      .await?;

    Ok(output.item)
  }

  async fn put_item(&self, table: &str, item: Item) -> Result<Option<Item>, StoreError> {
    let output = self
      .client
      .put_item(PutItemInput {
        table_name: table.to_owned(),
        item,
        return_values: Some("ALL_OLD".to_owned()),
        ..Default::default()
      })
      .await?;

    Ok(output.attributes.filter(|attributes| !attributes.is_empty()))
  }

  async fn delete_item(&self, table: &str, key: Item) -> Result<Option<Item>, StoreError> {
    let output = self
      .client
      .delete_item(DeleteItemInput {
        table_name: table.to_owned(),
        key,
        return_values: Some("ALL_OLD".to_owned()),
        ..Default::default()
      })
      .await?;

    Ok(output.attributes.filter(|attributes| !attributes.is_empty()))
  }

  async fn query(&self, query: Query) -> Result<Page, StoreError> {
    let mut values = HashMap::new();
    values.insert(":pk".to_owned(), string_value(query.partition));

    let output = self
      .client
      .query(QueryInput {
        table_name: query.table,
        index_name: query.index.name().map(str::to_owned),
        key_condition_expression: Some(format!("{} = :pk", query.index.partition_attribute())),
        expression_attribute_values: Some(values),
        scan_index_forward: Some(query.ascending),
        limit: query.limit,
        exclusive_start_key: query.start,
        ..Default::default()
      })
      .await?;

    Ok(Page {
      items: output.items.unwrap_or_default(),
      last_key: output.last_evaluated_key,
    })
  }

  async fn batch_delete(&self, table: &str, keys: Vec<Item>) -> Result<(), StoreError> {
    let mut requests = keys
      .into_iter()
      .map(|key| WriteRequest {
        delete_request: Some(DeleteRequest { key }),
        put_request: None,
      })
      .collect::<Vec<_>>();

    for attempt in 0..=UNPROCESSED_RETRIES {
      if requests.is_empty() {
        return Ok(());
      }

      if attempt > 0 {
        tracing::warn!(table, attempt, remaining = requests.len(), "retrying unprocessed deletes");
      }

      let mut request_items = HashMap::new();
      request_items.insert(table.to_owned(), requests);

      let output = self
        .client
        .batch_write_item(BatchWriteItemInput {
          request_items,
          ..Default::default()
        })
        .await?;

      requests = output
        .unprocessed_items
        .and_then(|mut unprocessed| unprocessed.remove(table))
        .unwrap_or_default();
    }

    if requests.is_empty() {
      Ok(())
    } else {
      Err(StoreError::Unprocessed(requests.len()))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rusoto_core::Region;
  use rusoto_mock::{MockCredentialsProvider, MockRequestDispatcher, MultipleMockRequestDispatcher};

  const LEFT_OVER: &str =
    r#"{"UnprocessedItems":{"catalogue":[{"DeleteRequest":{"Key":{"PK":{"S":"GAME#g1"},"SK":{"S":"USER#u1"}}}}]}}"#;
  const ALL_DONE: &str = r#"{"UnprocessedItems":{}}"#;

  fn table(responses: Vec<&str>) -> DynamoTable {
    let dispatcher = MultipleMockRequestDispatcher::new(
      responses
        .into_iter()
        .map(|body| MockRequestDispatcher::with_status(200).with_body(body))
        .collect::<Vec<_>>(),
    );

    DynamoTable::with_client(DynamoDbClient::new_with(
      dispatcher,
      MockCredentialsProvider,
      Region::UsEast1,
    ))
  }

  fn keys() -> Vec<Item> {
    ["u1", "u2"]
      .iter()
      .map(|user| {
        let mut key = Item::new();
        key.insert("PK".to_owned(), string_value("GAME#g1"));
        key.insert("SK".to_owned(), string_value(format!("USER#{}", user)));
        key
      })
      .collect()
  }

  #[tokio::test]
  async fn unprocessed_deletes_are_retried() {
    let table = table(vec![LEFT_OVER, ALL_DONE]);

    let result = table.batch_delete("catalogue", keys()).await;

    assert!(result.is_ok());
  }

  #[tokio::test]
  async fn gives_up_after_the_retry_budget() {
    let table = table(vec![LEFT_OVER; UNPROCESSED_RETRIES + 1]);

    let result = table.batch_delete("catalogue", keys()).await;

    assert!(matches!(result, Err(StoreError::Unprocessed(1))));
  }

  #[tokio::test]
  async fn empty_batches_make_no_calls() {
    let table = table(vec![]);

    assert!(table.batch_delete("catalogue", vec![]).await.is_ok());
  }
}
