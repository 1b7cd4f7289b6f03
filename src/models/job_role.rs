//! Job roles link contacts (and users) to organizations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SourceFields;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobRole {
    pub id: String,
    pub job_title: Option<String>,
    pub description: Option<String>,
    pub company: Option<String>,
    pub primary: Option<bool>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub source: Option<String>,
    pub source_of_truth: Option<String>,
    pub app_source: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct JobRoleFields {
    pub job_title: String,
    pub description: String,
    pub company: String,
    pub primary: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub source: SourceFields,
    pub created_at: Option<DateTime<Utc>>,
}
