use super::rating::{game_partition, parse_timestamp, user_partition};
use crate::dynamo::{get_string, primary_key, string_value, Item, StoreError, GSI1PK, GSI1SK, SK};
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};

static LAST_TIMESTAMP: AtomicI64 = AtomicI64::new(0);

/// Milliseconds since the epoch, strictly increasing within this process.
fn next_timestamp() -> i64 {
  let now = Utc::now().timestamp_millis();
  let previous = LAST_TIMESTAMP
    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
      Some(now.max(last + 1))
    })
    .unwrap_or(now);

  now.max(previous + 1)
}

/// A review stored under `GAME#<game>` / `REVIEW#<millis>#<id>`, with the
/// author's history on `GSI1` under `USER#<user>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
  pub review_id: String,
  pub game_id: String,
  pub user_id: String,
  pub username: String,
  pub comment: String,
  pub created_at: DateTime<Utc>,
  #[serde(skip)]
  pub ordering_key: String,
}

impl Review {
  pub fn new(game_id: &str, user_id: &str, username: &str, comment: &str) -> Self {
    let timestamp = next_timestamp();
    let suffix = rand::thread_rng()
      .sample_iter(&Alphanumeric)
      .take(9)
      .map(|c| char::from(c).to_ascii_lowercase())
      .collect::<String>();
    let review_id = format!("{}-{}", timestamp, suffix);

    Self {
      ordering_key: format!("REVIEW#{:013}#{}", timestamp, review_id),
      review_id,
      game_id: game_id.to_owned(),
      user_id: user_id.to_owned(),
      username: username.to_owned(),
      comment: comment.to_owned(),
      created_at: DateTime::from_timestamp_millis(timestamp).unwrap_or_else(Utc::now),
    }
  }

  pub fn key(game_id: &str, ordering_key: &str) -> Item {
    primary_key(game_partition(game_id), ordering_key.to_owned())
  }

  pub fn to_item(&self) -> Item {
    let mut item = Self::key(&self.game_id, &self.ordering_key);
    item.insert("reviewId".to_owned(), string_value(self.review_id.clone()));
    item.insert("gameId".to_owned(), string_value(self.game_id.clone()));
    item.insert("userId".to_owned(), string_value(self.user_id.clone()));
    item.insert("username".to_owned(), string_value(self.username.clone()));
    item.insert("comment".to_owned(), string_value(self.comment.clone()));
    item.insert("createdAt".to_owned(), string_value(self.created_at.to_rfc3339()));
    item.insert(GSI1PK.to_owned(), string_value(user_partition(&self.user_id)));
    item.insert(GSI1SK.to_owned(), string_value(self.ordering_key.clone()));
    item
  }

  pub fn from_item(item: &Item) -> Result<Self, StoreError> {
    Ok(Self {
      review_id: get_string(item, "reviewId")?,
      game_id: get_string(item, "gameId")?,
      user_id: get_string(item, "userId")?,
      username: get_string(item, "username")?,
      comment: get_string(item, "comment")?,
      created_at: parse_timestamp(&get_string(item, "createdAt")?)?,
      ordering_key: get_string(item, SK)?,
    })
  }
}
