//! CRM users (tenant members, integrations and bots).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SourceFields;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub timezone: Option<String>,
    pub profile_photo_url: Option<String>,
    pub internal: Option<bool>,
    pub bot: Option<bool>,
    pub roles: Vec<String>,
    pub source: Option<String>,
    pub source_of_truth: Option<String>,
    pub app_source: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct UserCreate {
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub timezone: String,
    pub profile_photo_url: String,
    pub internal: bool,
    pub bot: bool,
    pub source: SourceFields,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub source: String,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub timezone: Option<String>,
    pub profile_photo_url: Option<String>,
}
