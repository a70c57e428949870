use super::{string_value, Item, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque continuation token wrapping a query's last evaluated key.
///
/// Clients must hand it back unchanged; anything that does not decode to a
/// string-keyed item is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
  pub fn encode(key: &Item) -> Result<Self, StoreError> {
    let mut attributes = BTreeMap::new();

    for (name, value) in key {
      let value = value
        .s
        .clone()
        .ok_or_else(|| StoreError::Malformed(format!("non-string key attribute {}", name)))?;
      attributes.insert(name.clone(), value);
    }

    let json = serde_json::to_vec(&attributes).map_err(|e| StoreError::Malformed(e.to_string()))?;

    Ok(Cursor(hex::encode(json)))
  }

  pub fn decode(&self) -> Result<Item, StoreError> {
    let json = hex::decode(&self.0).map_err(|_| StoreError::InvalidCursor)?;
    let attributes: BTreeMap<String, String> =
      serde_json::from_slice(&json).map_err(|_| StoreError::InvalidCursor)?;

    if attributes.is_empty() {
      return Err(StoreError::InvalidCursor);
    }

    Ok(
      attributes
        .into_iter()
        .map(|(name, value)| (name, string_value(value)))
        .collect(),
    )
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<String> for Cursor {
  fn from(token: String) -> Self {
    Cursor(token)
  }
}

impl fmt::Display for Cursor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}
