//! Organization nodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SourceFields;

/// Onboarding status assigned to freshly created organizations.
pub const ONBOARDING_NOT_APPLICABLE: &str = "NOT_APPLICABLE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Organization {
    pub id: String,
    pub customer_os_id: Option<String>,
    pub reference_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub sub_industry: Option<String>,
    pub industry_group: Option<String>,
    pub target_audience: Option<String>,
    pub value_proposition: Option<String>,
    pub is_public: Option<bool>,
    pub is_customer: Option<bool>,
    pub hide: Option<bool>,
    pub employees: Option<i64>,
    pub market: Option<String>,
    pub last_funding_round: Option<String>,
    pub last_funding_amount: Option<String>,
    pub note: Option<String>,
    pub logo_url: Option<String>,
    pub headquarters: Option<String>,
    pub year_founded: Option<i64>,
    pub employee_growth_rate: Option<String>,
    pub slack_channel_id: Option<String>,
    pub relationship: Option<String>,
    pub stage: Option<String>,
    pub stage_updated_at: Option<DateTime<Utc>>,
    pub lead_source: Option<String>,
    pub onboarding_status: Option<String>,
    pub onboarding_status_order: Option<i64>,
    pub onboarding_comments: Option<String>,
    pub last_touchpoint_at: Option<DateTime<Utc>>,
    pub last_touchpoint_id: Option<String>,
    pub last_touchpoint_type: Option<String>,
    pub derived_renewal_likelihood: Option<String>,
    pub derived_renewal_likelihood_order: Option<i64>,
    pub derived_next_renewal_at: Option<DateTime<Utc>>,
    pub web_scrape_last_requested_url: Option<String>,
    pub web_scrape_attempts: Option<i64>,
    pub source: Option<String>,
    pub source_of_truth: Option<String>,
    pub app_source: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields for creating (or merging into) an organization.
#[derive(Debug, Clone, Default)]
pub struct OrganizationCreate {
    pub source: SourceFields,
    pub name: String,
    pub hide: bool,
    pub description: String,
    pub website: String,
    pub industry: String,
    pub sub_industry: String,
    pub industry_group: String,
    pub target_audience: String,
    pub value_proposition: String,
    pub is_public: bool,
    pub is_customer: bool,
    pub employees: i64,
    pub market: String,
    pub last_funding_round: String,
    pub last_funding_amount: String,
    pub reference_id: String,
    pub note: String,
    pub logo_url: String,
    pub headquarters: String,
    pub year_founded: Option<i64>,
    pub employee_growth_rate: String,
    pub slack_channel_id: String,
    pub relationship: String,
    pub stage: String,
    pub lead_source: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Sparse organization update. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct OrganizationPatch {
    pub source: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub hide: Option<bool>,
    pub is_customer: Option<bool>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub sub_industry: Option<String>,
    pub industry_group: Option<String>,
    pub target_audience: Option<String>,
    pub value_proposition: Option<String>,
    pub last_funding_round: Option<String>,
    pub last_funding_amount: Option<String>,
    pub reference_id: Option<String>,
    pub note: Option<String>,
    pub is_public: Option<bool>,
    pub employees: Option<i64>,
    pub market: Option<String>,
    pub year_founded: Option<i64>,
    pub headquarters: Option<String>,
    pub logo_url: Option<String>,
    pub employee_growth_rate: Option<String>,
    pub slack_channel_id: Option<String>,
    pub relationship: Option<String>,
    pub stage: Option<String>,
    pub web_scraped_url: Option<String>,
    /// Enrichment domain and source, recorded together.
    pub enrichment: Option<(String, String)>,
}

/// Derived renewal fields kept on the organization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenewalSummary {
    pub likelihood: Option<String>,
    pub likelihood_order: Option<i64>,
    pub next_renewal_at: Option<DateTime<Utc>>,
}
