//! Outreach flows: a flow owns ordered actions and enrolls participants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SourceFields;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Flow {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub nodes: Option<String>,
    pub edges: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct FlowSave {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    /// Serialized editor graph.
    pub nodes: Option<String>,
    pub edges: Option<String>,
    pub source: SourceFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlowAction {
    pub id: String,
    pub external_id: Option<String>,
    pub action_type: Option<String>,
    pub action_data: Option<String>,
    pub index: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct FlowActionFields {
    pub external_id: String,
    pub action_type: String,
    pub action_data: String,
    pub index: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlowExecutionSettings {
    pub id: String,
    pub flow_id: Option<String>,
    pub entity_id: Option<String>,
    pub entity_type: Option<String>,
    pub mailbox: Option<String>,
    pub user_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct FlowExecutionSettingsFields {
    pub flow_id: String,
    pub entity_id: String,
    pub entity_type: String,
    pub mailbox: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlowParticipant {
    pub id: String,
    pub entity_id: Option<String>,
    pub entity_type: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
