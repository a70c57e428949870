use rusoto_core::Region;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
  #[serde(default = "default_region")]
  pub aws_region: String,
  pub aws_access_key_id: String,
  pub aws_secret_key: String,
  pub s3_bucket: String,
  pub sns_topic_arn: Option<String>,
  pub queue_url: String,
  #[serde(default = "default_ratings_table")]
  pub ratings_table: String,
  #[serde(default = "default_reviews_table")]
  pub reviews_table: String,
  #[serde(default = "default_audit_table")]
  pub audit_table: String,
  #[serde(default = "default_image_prefixes")]
  pub image_prefixes: Vec<String>,
  #[serde(default = "default_image_max_dimension")]
  pub image_max_dimension: u32,
  /// Canned ACL forced onto resized images; otherwise they copy the original's.
  pub resized_acl: Option<String>,
  #[serde(default = "default_queue_wait_seconds")]
  pub queue_wait_seconds: i64,
  #[serde(default = "default_queue_visibility_seconds")]
  pub queue_visibility_seconds: i64,
  #[serde(default = "default_poll_interval_seconds")]
  pub poll_interval_seconds: u64,
  pub reconcile_interval_minutes: Option<u32>,
  pub sentry_dsn: Option<String>,
  pub events_enabled: Option<bool>,
}

fn default_region() -> String {
  "us-east-1".to_owned()
}

fn default_ratings_table() -> String {
  "GameRatings".to_owned()
}

fn default_reviews_table() -> String {
  "GameReviews".to_owned()
}

fn default_audit_table() -> String {
  "crud_logs".to_owned()
}

fn default_image_prefixes() -> Vec<String> {
  vec!["game-images/".to_owned()]
}

fn default_image_max_dimension() -> u32 {
  800
}

fn default_queue_wait_seconds() -> i64 {
  20
}

fn default_queue_visibility_seconds() -> i64 {
  300
}

fn default_poll_interval_seconds() -> u64 {
  5
}

#[derive(thiserror::Error, Debug)]
#[error("unknown aws region: {0}")]
pub struct InvalidRegion(String);

impl Config {
  pub fn region(&self) -> Result<Region, InvalidRegion> {
    Region::from_str(&self.aws_region).map_err(|_| InvalidRegion(self.aws_region.clone()))
  }

  /// Events leave the process only in the release profile unless overridden.
  pub fn events_enabled(&self, profile: &str) -> bool {
    self.events_enabled.unwrap_or(profile == "release")
  }

  pub fn is_image_key(&self, key: &str) -> bool {
    has_prefix(&self.image_prefixes, key)
  }
}

pub fn has_prefix(prefixes: &[String], key: &str) -> bool {
  prefixes
    .iter()
    .any(|prefix| key.starts_with(prefix.as_str()))
}
