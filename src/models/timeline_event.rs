use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// A node shown on a contact or organization timeline (issue, interaction
/// event, log entry, action, ...). Its shape depends on its labels, so the
/// properties are kept as a map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineEvent {
    pub id: String,
    pub labels: Vec<String>,
    #[serde(flatten)]
    pub properties: Map<String, JsonValue>,
}

impl TimelineEvent {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}
