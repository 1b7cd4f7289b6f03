//! Invoices and invoice lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Invoice {
    pub id: String,
    pub number: Option<String>,
    pub status: Option<String>,
    pub currency: Option<String>,
    pub dry_run: Option<bool>,
    pub off_cycle: Option<bool>,
    pub preview: Option<bool>,
    pub period_start_date: Option<DateTime<Utc>>,
    pub period_end_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub amount: Option<f64>,
    pub vat: Option<f64>,
    pub total_amount: Option<f64>,
    pub source: Option<String>,
    pub app_source: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceLine {
    pub id: String,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i64>,
    pub amount: Option<f64>,
    pub vat: Option<f64>,
    pub total_amount: Option<f64>,
    pub billed_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
