use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SourceFields;

/// Support ticket. Issues are also timeline events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Issue {
    pub id: String,
    pub group_id: Option<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub source: Option<String>,
    pub source_of_truth: Option<String>,
    pub app_source: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct IssueCreate {
    pub group_id: String,
    pub subject: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub reported_by_organization_id: Option<String>,
    pub submitted_by_organization_id: Option<String>,
    pub submitted_by_user_id: Option<String>,
    pub source: SourceFields,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct IssuePatch {
    pub source: String,
    pub group_id: Option<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
}
