//! Contracts and their create/patch inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SourceFields;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Contract {
    pub id: String,
    pub name: Option<String>,
    pub contract_url: Option<String>,
    pub status: Option<String>,
    pub renewal_cycle: Option<String>,
    pub renewal_periods: Option<i64>,
    pub signed_at: Option<DateTime<Utc>>,
    pub service_started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub triggered_onboarding_status_change: Option<bool>,
    pub source: Option<String>,
    pub source_of_truth: Option<String>,
    pub app_source: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct ContractCreate {
    pub organization_id: String,
    pub name: String,
    pub contract_url: String,
    /// Linked through `CREATED_BY` when it names an existing user.
    pub created_by_user_id: Option<String>,
    pub service_started_at: Option<DateTime<Utc>>,
    pub signed_at: Option<DateTime<Utc>>,
    pub renewal_cycle: String,
    pub renewal_periods: Option<i64>,
    pub status: String,
    pub source: SourceFields,
    pub created_at: Option<DateTime<Utc>>,
}

/// Sparse contract update. Every present field is source-of-truth gated.
#[derive(Debug, Clone, Default)]
pub struct ContractPatch {
    pub source: String,
    pub name: Option<String>,
    pub contract_url: Option<String>,
    pub status: Option<String>,
    pub renewal_cycle: Option<String>,
    pub renewal_periods: Option<i64>,
    pub signed_at: Option<DateTime<Utc>>,
    pub service_started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}
