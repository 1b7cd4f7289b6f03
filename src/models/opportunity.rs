//! Opportunities, including renewal opportunities attached to contracts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SourceFields;

/// Lifecycle stage owned by the CRM, independent of any external pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InternalStage {
    Open,
    ClosedWon,
    ClosedLost,
    Suspended,
}

impl InternalStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            InternalStage::Open => "OPEN",
            InternalStage::ClosedWon => "CLOSED_WON",
            InternalStage::ClosedLost => "CLOSED_LOST",
            InternalStage::Suspended => "SUSPENDED",
        }
    }
}

impl std::fmt::Display for InternalStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Opportunity {
    pub id: String,
    pub name: Option<String>,
    pub amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub internal_type: Option<String>,
    pub external_type: Option<String>,
    pub internal_stage: Option<String>,
    pub external_stage: Option<String>,
    pub estimated_closed_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub general_notes: Option<String>,
    pub next_steps: Option<String>,
    pub comments: Option<String>,
    pub currency: Option<String>,
    pub likelihood_rate: Option<i64>,
    pub renewal_likelihood: Option<String>,
    pub renewal_approved: Option<bool>,
    pub renewed_at: Option<DateTime<Utc>>,
    pub renewal_adjusted_rate: Option<i64>,
    pub source: Option<String>,
    pub source_of_truth: Option<String>,
    pub app_source: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub stage_updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct OpportunityCreate {
    pub organization_id: String,
    pub name: String,
    pub max_amount: f64,
    pub internal_type: String,
    pub external_type: String,
    pub internal_stage: String,
    pub external_stage: String,
    pub estimated_closed_at: Option<DateTime<Utc>>,
    pub general_notes: String,
    pub next_steps: String,
    pub created_by_user_id: Option<String>,
    pub currency: String,
    pub likelihood_rate: i64,
    pub source: SourceFields,
    pub created_at: Option<DateTime<Utc>>,
}

/// Sparse opportunity update.
///
/// `internal_stage` and `internal_type` belong to the CRM and are written
/// unconditionally; every other field is source-of-truth gated.
#[derive(Debug, Clone, Default)]
pub struct OpportunityPatch {
    pub source: String,
    pub name: Option<String>,
    pub amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub external_type: Option<String>,
    pub external_stage: Option<String>,
    pub estimated_closed_at: Option<DateTime<Utc>>,
    pub internal_stage: Option<String>,
    pub internal_type: Option<String>,
    pub currency: Option<String>,
    pub next_steps: Option<String>,
    pub likelihood_rate: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct RenewalOpportunityCreate {
    pub contract_id: String,
    pub internal_type: String,
    pub internal_stage: String,
    pub renewal_likelihood: String,
    pub renewal_approved: bool,
    pub renewed_at: Option<DateTime<Utc>>,
    pub renewal_adjusted_rate: i64,
    pub source: SourceFields,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct RenewalPatch {
    pub source: String,
    /// Records who changed the renewal and when.
    pub updated_by_user_id: Option<String>,
    pub comments: Option<String>,
    pub amount: Option<f64>,
    pub renewal_likelihood: Option<String>,
    pub renewal_approved: Option<bool>,
    pub renewed_at: Option<DateTime<Utc>>,
    pub renewal_adjusted_rate: Option<i64>,
}
