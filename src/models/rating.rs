use crate::dynamo::{
  get_string, primary_key, string_value, Item, StoreError, GSI1PK, GSI1SK,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RatingType {
  Like,
  Dislike,
}

impl RatingType {
  pub fn as_str(&self) -> &'static str {
    match self {
      RatingType::Like => "LIKE",
      RatingType::Dislike => "DISLIKE",
    }
  }
}

impl fmt::Display for RatingType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for RatingType {
  type Err = StoreError;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value {
      "LIKE" => Ok(RatingType::Like),
      "DISLIKE" => Ok(RatingType::Dislike),
      other => Err(StoreError::Malformed(format!("unknown rating type {}", other))),
    }
  }
}

/// One user's judgment on one game, keyed `USER#<user>` / `GAME#<game>` with
/// the reverse `GAME#<game>` / `USER#<user>` on `GSI1`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
  pub user_id: String,
  pub game_id: String,
  #[serde(rename = "type")]
  pub rating_type: RatingType,
  pub created_at: DateTime<Utc>,
}

pub fn user_partition(user_id: &str) -> String {
  format!("USER#{}", user_id)
}

pub fn game_partition(game_id: &str) -> String {
  format!("GAME#{}", game_id)
}

impl Rating {
  pub fn new(user_id: &str, game_id: &str, rating_type: RatingType) -> Self {
    Self {
      user_id: user_id.to_owned(),
      game_id: game_id.to_owned(),
      rating_type,
      created_at: Utc::now(),
    }
  }

  pub fn key(user_id: &str, game_id: &str) -> Item {
    primary_key(user_partition(user_id), game_partition(game_id))
  }

  pub fn to_item(&self) -> Item {
    let mut item = Self::key(&self.user_id, &self.game_id);
    item.insert("type".to_owned(), string_value(self.rating_type.as_str()));
    item.insert("userId".to_owned(), string_value(self.user_id.clone()));
    item.insert("gameId".to_owned(), string_value(self.game_id.clone()));
    item.insert("createdAt".to_owned(), string_value(self.created_at.to_rfc3339()));
    item.insert(GSI1PK.to_owned(), string_value(game_partition(&self.game_id)));
    item.insert(GSI1SK.to_owned(), string_value(user_partition(&self.user_id)));
    item
  }

  pub fn from_item(item: &Item) -> Result<Self, StoreError> {
    Ok(Self {
      user_id: get_string(item, "userId")?,
      game_id: get_string(item, "gameId")?,
      rating_type: get_string(item, "type")?.parse()?,
      created_at: parse_timestamp(&get_string(item, "createdAt")?)?,
    })
  }
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
  DateTime::parse_from_rfc3339(value)
    .map(|timestamp| timestamp.with_timezone(&Utc))
    .map_err(|e| StoreError::Malformed(format!("bad timestamp {}: {}", value, e)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dynamo::{PK, SK};

  #[test]
  fn item_layout_carries_reverse_index() {
    let rating = Rating::new("u1", "g1", RatingType::Like);
    let item = rating.to_item();

    assert_eq!(get_string(&item, PK).unwrap(), "USER#u1");
    assert_eq!(get_string(&item, SK).unwrap(), "GAME#g1");
    assert_eq!(get_string(&item, GSI1PK).unwrap(), "GAME#g1");
    assert_eq!(get_string(&item, GSI1SK).unwrap(), "USER#u1");
    assert_eq!(get_string(&item, "type").unwrap(), "LIKE");
  }

  #[test]
  fn unknown_rating_type_is_malformed() {
    let mut item = Rating::new("u1", "g1", RatingType::Dislike).to_item();
    item.insert("type".to_owned(), string_value("MEH"));

    assert!(matches!(Rating::from_item(&item), Err(StoreError::Malformed(_))));
  }
}
