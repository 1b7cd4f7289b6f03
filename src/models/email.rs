//! Email address nodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SourceFields;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Email {
    pub id: String,
    pub email: Option<String>,
    pub raw_email: Option<String>,
    pub is_catch_all: Option<bool>,
    pub deliverable: Option<String>,
    pub is_valid_syntax: Option<bool>,
    pub username: Option<String>,
    pub is_role_account: Option<bool>,
    pub is_free_account: Option<bool>,
    pub provider: Option<String>,
    pub primary_domain: Option<String>,
    pub work: Option<bool>,
    pub source: Option<String>,
    pub source_of_truth: Option<String>,
    pub app_source: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct EmailCreate {
    pub raw_email: String,
    pub source: SourceFields,
    pub created_at: Option<DateTime<Utc>>,
}

/// Result of an external email verification.
#[derive(Debug, Clone, Default)]
pub struct EmailValidation {
    pub email_address: String,
    /// Merged as a `Domain` node when not empty.
    pub domain: String,
    pub is_catch_all: bool,
    pub deliverable: String,
    pub is_valid_syntax: bool,
    pub username: String,
    pub validated_at: Option<DateTime<Utc>>,
    pub is_role_account: bool,
    pub is_risky: bool,
    pub is_firewalled: bool,
    pub provider: String,
    pub firewall: String,
    pub is_mailbox_full: bool,
    pub is_free_account: bool,
    pub smtp_success: bool,
    pub response_code: String,
    pub error_code: String,
    pub description: String,
    pub is_primary_domain: bool,
    pub primary_domain: String,
    pub alternate_email: String,
}
