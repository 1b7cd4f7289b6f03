//! Master plans and the per-organization plans derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SourceFields;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrganizationPlan {
    pub id: String,
    pub name: Option<String>,
    pub master_plan_id: Option<String>,
    pub retired: Option<bool>,
    pub status: Option<String>,
    pub status_comments: Option<String>,
    pub status_updated_at: Option<DateTime<Utc>>,
    pub source: Option<String>,
    pub source_of_truth: Option<String>,
    pub app_source: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrganizationPlanMilestone {
    pub id: String,
    pub name: Option<String>,
    pub order: Option<i64>,
    pub duration_hours: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
    pub optional: Option<bool>,
    pub retired: Option<bool>,
    pub adhoc: Option<bool>,
    /// Items are stored as JSON strings on the node.
    pub items: Vec<String>,
    pub status: Option<String>,
    pub status_comments: Option<String>,
    pub status_updated_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One checklist entry of a milestone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneItem {
    pub text: String,
    pub status: String,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusDetails {
    pub status: String,
    pub comments: String,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct OrganizationPlanCreate {
    pub master_plan_id: String,
    pub name: String,
    pub status: StatusDetails,
    pub source: SourceFields,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct OrganizationPlanPatch {
    pub name: Option<String>,
    pub retired: Option<bool>,
    pub status: Option<StatusDetails>,
}

#[derive(Debug, Clone, Default)]
pub struct MilestoneCreate {
    pub name: String,
    pub order: i64,
    pub items: Vec<MilestoneItem>,
    pub optional: bool,
    pub adhoc: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub status: StatusDetails,
    pub source: SourceFields,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct MilestonePatch {
    pub name: Option<String>,
    pub order: Option<i64>,
    pub items: Option<Vec<MilestoneItem>>,
    pub optional: Option<bool>,
    pub retired: Option<bool>,
    pub adhoc: Option<bool>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<StatusDetails>,
}
