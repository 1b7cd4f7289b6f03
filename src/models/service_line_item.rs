use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A billable line on a contract. Versions of the same line share `parentId`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceLineItem {
    pub id: String,
    pub parent_id: Option<String>,
    pub name: Option<String>,
    pub billed: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i64>,
    pub vat_rate: Option<f64>,
    pub comments: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub is_canceled: Option<bool>,
    pub source: Option<String>,
    pub source_of_truth: Option<String>,
    pub app_source: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
