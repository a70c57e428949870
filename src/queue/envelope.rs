use crate::events::EventType;
use serde::Deserialize;
use serde_json::{json, Value};

/// An event recovered from a queue message body, whatever wrapped it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEvent {
  pub event_type: EventType,
  pub key: Option<String>,
  pub file_name: Option<String>,
  pub data: Value,
}

impl ParsedEvent {
  pub fn game_id(&self) -> Option<&str> {
    self.data.get("gameId").and_then(Value::as_str)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
  Parsed(ParsedEvent),
  Unrecognized { reason: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
  event_type: String,
  s3_key: Option<String>,
  file_name: Option<String>,
  #[serde(default)]
  data: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PubSubNotification {
  message: String,
}

#[derive(Deserialize)]
struct S3EventObject {
  key: String,
}

#[derive(Deserialize)]
struct S3EventBucket {
  name: String,
}

#[derive(Deserialize)]
struct S3EventInfo {
  bucket: Option<S3EventBucket>,
  object: S3EventObject,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct S3EventRecord {
  event_name: Option<String>,
  s3: S3EventInfo,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct S3Event {
  records: Vec<S3EventRecord>,
}

fn string_field(data: &Value, name: &str) -> Option<String> {
  data.get(name).and_then(Value::as_str).map(str::to_owned)
}

/// Object keys in storage notifications are form-encoded.
fn decode_key(key: &str) -> String {
  let key = key.replace('+', " ");
  urlencoding::decode(&key)
    .map(|decoded| decoded.into_owned())
    .unwrap_or(key)
}

fn raw_event(value: &Value) -> Option<ParsedEvent> {
  let raw = RawEvent::deserialize(value).ok()?;
  let data = raw.data;
  let key = raw.s3_key.or_else(|| string_field(&data, "s3Key"));
  let file_name = raw.file_name.or_else(|| string_field(&data, "fileName"));

  Some(ParsedEvent {
    event_type: EventType::from(raw.event_type),
    key,
    file_name,
    data,
  })
}

fn storage_event(value: &Value) -> Option<ParsedEvent> {
  let event = S3Event::deserialize(value).ok()?;
  let record = event.records.into_iter().next()?;

  let key = decode_key(&record.s3.object.key);
  let file_name = key.rsplit('/').next().unwrap_or_default().to_owned();
  let event_name = record.event_name.unwrap_or_default();

  let event_type = if event_name.starts_with("ObjectRemoved") {
    EventType::Other("FILE_REMOVED".to_owned())
  } else {
    EventType::FileUploaded
  };

  Some(ParsedEvent {
    event_type,
    data: json!({
      "s3Key": key,
      "fileName": file_name,
      "eventName": event_name,
      "bucket": record.s3.bucket.map(|bucket| bucket.name),
    }),
    key: Some(key),
    file_name: Some(file_name),
  })
}

fn pubsub_event(value: &Value) -> Option<ParsedEvent> {
  let notification = PubSubNotification::deserialize(value).ok()?;
  let inner = serde_json::from_str::<Value>(&notification.message).ok()?;

  raw_event(&inner).or_else(|| storage_event(&inner))
}

impl Envelope {
  /// Tries a bare event, then a pub/sub wrapper, then a storage notification.
  pub fn parse(body: &str) -> Envelope {
    let value = match serde_json::from_str::<Value>(body) {
      Ok(value) => value,
      Err(error) => {
        return Envelope::Unrecognized {
          reason: format!("body is not json: {}", error),
        }
      }
    };

    raw_event(&value)
      .or_else(|| pubsub_event(&value))
      .or_else(|| storage_event(&value))
      .map(Envelope::Parsed)
      .unwrap_or_else(|| Envelope::Unrecognized {
        reason: "no known envelope shape matched".to_owned(),
      })
  }

  /// Unrecognized envelopes become a `PARSE_ERROR` event carrying the reason.
  pub fn into_event(self) -> ParsedEvent {
    match self {
      Envelope::Parsed(event) => event,
      Envelope::Unrecognized { reason } => ParsedEvent {
        event_type: EventType::ParseError,
        key: None,
        file_name: None,
        data: json!({ "reason": reason }),
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn raw_body() -> Value {
    json!({
      "eventType": "FILE_UPLOADED",
      "data": { "s3Key": "game-images/my pic.png", "fileName": "my pic.png" },
      "timestamp": "2024-05-01T10:00:00Z"
    })
  }

  fn parsed(body: &str) -> ParsedEvent {
    match Envelope::parse(body) {
      Envelope::Parsed(event) => event,
      Envelope::Unrecognized { reason } => panic!("unrecognized: {}", reason),
    }
  }

  #[test]
  fn all_shapes_resolve_to_the_same_event() {
    let raw = raw_body().to_string();
    let pubsub = json!({
      "Type": "Notification",
      "TopicArn": "arn:aws:sns:us-east-1:1:catalogue",
      "Message": raw,
    })
    .to_string();
    let storage = json!({
      "Records": [{
        "eventName": "ObjectCreated:Put",
        "s3": {
          "bucket": { "name": "catalogue" },
          "object": { "key": "game-images/my+pic.png", "size": 10 }
        }
      }]
    })
    .to_string();

    let events = [parsed(&raw), parsed(&pubsub), parsed(&storage)];

    for event in &events {
      assert_eq!(event.event_type, EventType::FileUploaded);
      assert_eq!(event.key.as_deref(), Some("game-images/my pic.png"));
      assert_eq!(event.file_name.as_deref(), Some("my pic.png"));
    }
  }

  #[test]
  fn top_level_key_wins_over_data() {
    let event = parsed(
      &json!({ "eventType": "FILE_UPLOADED", "s3Key": "game-images/a.png", "fileName": "a.png" })
        .to_string(),
    );

    assert_eq!(event.key.as_deref(), Some("game-images/a.png"));
    assert_eq!(event.data, Value::Null);
  }

  #[test]
  fn key_falls_back_to_data_and_data_is_kept() {
    let event = parsed(
      &json!({
        "eventType": "FILE_UPLOADED",
        "fileName": "top.png",
        "data": { "s3Key": "game-images/nested.png", "fileName": "nested.png", "size": 3 }
      })
      .to_string(),
    );

    assert_eq!(event.key.as_deref(), Some("game-images/nested.png"));
    assert_eq!(event.file_name.as_deref(), Some("top.png"));
    assert_eq!(event.data["size"], 3);
  }

  #[test]
  fn pubsub_can_wrap_a_storage_notification() {
    let storage = json!({
      "Records": [{ "s3": { "object": { "key": "game-images/b%2Bc.png" } } }]
    });
    let event = parsed(&json!({ "Message": storage.to_string() }).to_string());

    assert_eq!(event.event_type, EventType::FileUploaded);
    assert_eq!(event.key.as_deref(), Some("game-images/b+c.png"));
  }

  #[test]
  fn removals_are_not_uploads() {
    let event = parsed(
      &json!({
        "Records": [{ "eventName": "ObjectRemoved:Delete", "s3": { "object": { "key": "x/y.png" } } }]
      })
      .to_string(),
    );

    assert_eq!(event.event_type, EventType::Other("FILE_REMOVED".to_owned()));
  }

  #[test]
  fn unknown_shapes_degrade_to_parse_error() {
    for body in [
      "not json",
      "[]",
      r#"{"Event":"s3:TestEvent"}"#,
      r#"{"Records":[]}"#,
      r#"{"Message":"also not json"}"#,
    ] {
      let event = Envelope::parse(body).into_event();
      assert_eq!(event.event_type, EventType::ParseError, "{}", body);
      assert!(event.data["reason"].is_string());
    }
  }

  #[test]
  fn game_id_is_read_from_data() {
    let event = parsed(r#"{"eventType":"GAME_DELETED","data":{"gameId":"g1"}}"#);

    assert_eq!(event.event_type, EventType::GameDeleted);
    assert_eq!(event.game_id(), Some("g1"));
  }
}
