//! Tenant nodes, tenant settings and tenant billing profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SourceFields;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TenantNode {
    pub id: Option<String>,
    pub name: String,
    pub app_source: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TenantSettings {
    pub id: Option<String>,
    pub tenant: Option<String>,
    pub logo_repository_file_id: Option<String>,
    pub base_currency: Option<String>,
    pub invoicing_enabled: Option<bool>,
    pub invoicing_postpaid: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct TenantSettingsPatch {
    pub logo_repository_file_id: Option<String>,
    pub base_currency: Option<String>,
    pub invoicing_enabled: Option<bool>,
    pub invoicing_postpaid: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TenantBillingProfile {
    pub id: String,
    pub phone: Option<String>,
    pub legal_name: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub address_line3: Option<String>,
    pub locality: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub zip: Option<String>,
    pub vat_number: Option<String>,
    pub send_invoices_from: Option<String>,
    pub send_invoices_bcc: Option<String>,
    pub can_pay_with_pigeon: Option<bool>,
    pub can_pay_with_bank_transfer: Option<bool>,
    pub check: Option<bool>,
    pub source: Option<String>,
    pub source_of_truth: Option<String>,
    pub app_source: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Initial billing profile fields, written as camelCase node properties.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantBillingProfileCreate {
    pub phone: String,
    pub legal_name: String,
    pub address_line1: String,
    pub address_line2: String,
    pub address_line3: String,
    pub locality: String,
    pub country: String,
    pub region: String,
    pub zip: String,
    pub vat_number: String,
    pub send_invoices_from: String,
    pub send_invoices_bcc: String,
    pub can_pay_with_pigeon: bool,
    pub can_pay_with_bank_transfer: bool,
    pub check: bool,
    #[serde(skip)]
    pub source: SourceFields,
    #[serde(skip)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct TenantBillingProfilePatch {
    pub phone: Option<String>,
    pub legal_name: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub address_line3: Option<String>,
    pub locality: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub zip: Option<String>,
    pub vat_number: Option<String>,
    pub send_invoices_from: Option<String>,
    pub send_invoices_bcc: Option<String>,
    pub can_pay_with_pigeon: Option<bool>,
    pub can_pay_with_bank_transfer: Option<bool>,
    pub check: Option<bool>,
}
