//! Contact nodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SourceFields;

/// A person tracked by a tenant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Contact {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub prefix: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub timezone: Option<String>,
    pub profile_photo_url: Option<String>,
    pub username: Option<String>,
    pub hide: Option<bool>,
    pub source: Option<String>,
    pub source_of_truth: Option<String>,
    pub app_source: Option<String>,
    pub aggregate_version: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields for creating a contact.
#[derive(Debug, Clone, Default)]
pub struct ContactCreate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub prefix: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub timezone: Option<String>,
    pub profile_photo_url: Option<String>,
    pub username: Option<String>,
    pub source: SourceFields,
    pub aggregate_version: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Sparse contact update. `None` fields are left untouched.
///
/// When `aggregate_version` is set, the update only applies if the stored
/// version is missing or strictly lower.
#[derive(Debug, Clone, Default)]
pub struct ContactPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub prefix: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub timezone: Option<String>,
    pub profile_photo_url: Option<String>,
    pub username: Option<String>,
    pub hide: Option<bool>,
    pub source: String,
    pub aggregate_version: Option<i64>,
}
