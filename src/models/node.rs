//! Loosely typed node shapes shared by several repositories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Any node: its `id` plus every other property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeRecord {
    pub id: String,
    #[serde(flatten)]
    pub properties: Map<String, JsonValue>,
}

impl NodeRecord {
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(JsonValue::as_str)
    }
}

/// A node read through a batch lookup, paired with the id of the node it was
/// reached from (e.g. the contract for each of several organizations).
#[derive(Debug, Clone, PartialEq)]
pub struct Linked<T> {
    pub node: T,
    pub linked_id: String,
}

/// Link between a node and an external system (`IS_LINKED_WITH`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalSystemLink {
    pub external_system_id: String,
    pub external_id: String,
    pub external_url: Option<String>,
    pub external_source: Option<String>,
    pub sync_date: Option<DateTime<Utc>>,
}
