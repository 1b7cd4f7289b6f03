//! Location nodes (postal addresses).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SourceFields;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    pub id: String,
    pub name: Option<String>,
    pub raw_address: Option<String>,
    pub country: Option<String>,
    pub country_code_a2: Option<String>,
    pub region: Option<String>,
    pub district: Option<String>,
    pub locality: Option<String>,
    pub street: Option<String>,
    pub address: Option<String>,
    pub address2: Option<String>,
    pub zip: Option<String>,
    pub postal_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub time_zone: Option<String>,
    pub utc_offset: Option<i64>,
    pub validated: Option<bool>,
    pub validation_error: Option<String>,
    pub source: Option<String>,
    pub source_of_truth: Option<String>,
    pub app_source: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Structured address fields, serialized as the node's camelCase properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressDetails {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub country: String,
    pub region: String,
    pub district: String,
    pub locality: String,
    pub street: String,
    pub address: String,
    pub address2: String,
    pub zip: String,
    pub address_type: String,
    pub house_number: String,
    pub postal_code: String,
    pub plus_four: String,
    pub commercial: bool,
    pub predirection: String,
    pub time_zone: String,
    pub utc_offset: i64,
}

#[derive(Debug, Clone, Default)]
pub struct LocationCreate {
    pub name: String,
    pub raw_address: String,
    pub address: AddressDetails,
    pub source: SourceFields,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct LocationUpdate {
    pub name: String,
    pub raw_address: String,
    pub address: AddressDetails,
    pub source: String,
}
