use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SourceFields;

/// Organization billing identity (legal name, tax id).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BillingProfile {
    pub id: String,
    pub legal_name: Option<String>,
    pub tax_id: Option<String>,
    pub source: Option<String>,
    pub source_of_truth: Option<String>,
    pub app_source: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct BillingProfileCreate {
    pub organization_id: String,
    pub legal_name: String,
    pub tax_id: String,
    pub source: SourceFields,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct BillingProfilePatch {
    pub organization_id: String,
    pub legal_name: Option<String>,
    pub tax_id: Option<String>,
}
