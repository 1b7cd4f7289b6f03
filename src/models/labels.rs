//! Node labels and the tenant label convention.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::tenant::Tenant;

/// Every node label the data-access layer reads or writes.
///
/// Tenant-scoped nodes carry both the generic label and the
/// tenant-suffixed one (`Contact` + `Contact_acme`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeLabel {
    Action,
    Attachment,
    BankAccount,
    BillingProfile,
    Comment,
    Contact,
    Contract,
    Country,
    CustomField,
    CustomFieldTemplate,
    Domain,
    Email,
    ExternalSystem,
    Flow,
    FlowAction,
    FlowExecutionSettings,
    FlowParticipant,
    FlowSequence,
    InteractionEvent,
    Invoice,
    InvoiceLine,
    Issue,
    JobRole,
    Location,
    LogEntry,
    MasterPlan,
    MasterPlanMilestone,
    Offering,
    Opportunity,
    Order,
    Organization,
    OrganizationPlan,
    OrganizationPlanMilestone,
    PhoneNumber,
    Player,
    Reminder,
    ServiceLineItem,
    Social,
    Tag,
    Tenant,
    TenantBillingProfile,
    TenantSettings,
    TimelineEvent,
    User,
    Workspace,
}

impl NodeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::Action => "Action",
            NodeLabel::Attachment => "Attachment",
            NodeLabel::BankAccount => "BankAccount",
            NodeLabel::BillingProfile => "BillingProfile",
            NodeLabel::Comment => "Comment",
            NodeLabel::Contact => "Contact",
            NodeLabel::Contract => "Contract",
            NodeLabel::Country => "Country",
            NodeLabel::CustomField => "CustomField",
            NodeLabel::CustomFieldTemplate => "CustomFieldTemplate",
            NodeLabel::Domain => "Domain",
            NodeLabel::Email => "Email",
            NodeLabel::ExternalSystem => "ExternalSystem",
            NodeLabel::Flow => "Flow",
            NodeLabel::FlowAction => "FlowAction",
            NodeLabel::FlowExecutionSettings => "FlowExecutionSettings",
            NodeLabel::FlowParticipant => "FlowParticipant",
            NodeLabel::FlowSequence => "FlowSequence",
            NodeLabel::InteractionEvent => "InteractionEvent",
            NodeLabel::Invoice => "Invoice",
            NodeLabel::InvoiceLine => "InvoiceLine",
            NodeLabel::Issue => "Issue",
            NodeLabel::JobRole => "JobRole",
            NodeLabel::Location => "Location",
            NodeLabel::LogEntry => "LogEntry",
            NodeLabel::MasterPlan => "MasterPlan",
            NodeLabel::MasterPlanMilestone => "MasterPlanMilestone",
            NodeLabel::Offering => "Offering",
            NodeLabel::Opportunity => "Opportunity",
            NodeLabel::Order => "Order",
            NodeLabel::Organization => "Organization",
            NodeLabel::OrganizationPlan => "OrganizationPlan",
            NodeLabel::OrganizationPlanMilestone => "OrganizationPlanMilestone",
            NodeLabel::PhoneNumber => "PhoneNumber",
            NodeLabel::Player => "Player",
            NodeLabel::Reminder => "Reminder",
            NodeLabel::ServiceLineItem => "ServiceLineItem",
            NodeLabel::Social => "Social",
            NodeLabel::Tag => "Tag",
            NodeLabel::Tenant => "Tenant",
            NodeLabel::TenantBillingProfile => "TenantBillingProfile",
            NodeLabel::TenantSettings => "TenantSettings",
            NodeLabel::TimelineEvent => "TimelineEvent",
            NodeLabel::User => "User",
            NodeLabel::Workspace => "Workspace",
        }
    }

    /// All labels, in declaration order.
    pub fn all() -> &'static [NodeLabel] {
        use NodeLabel::*;
        &[
            Action,
            Attachment,
            BankAccount,
            BillingProfile,
            Comment,
            Contact,
            Contract,
            Country,
            CustomField,
            CustomFieldTemplate,
            Domain,
            Email,
            ExternalSystem,
            Flow,
            FlowAction,
            FlowExecutionSettings,
            FlowParticipant,
            FlowSequence,
            InteractionEvent,
            Invoice,
            InvoiceLine,
            Issue,
            JobRole,
            Location,
            LogEntry,
            MasterPlan,
            MasterPlanMilestone,
            Offering,
            Opportunity,
            Order,
            Organization,
            OrganizationPlan,
            OrganizationPlanMilestone,
            PhoneNumber,
            Player,
            Reminder,
            ServiceLineItem,
            Social,
            Tag,
            Tenant,
            TenantBillingProfile,
            TenantSettings,
            TimelineEvent,
            User,
            Workspace,
        ]
    }

    /// Whether nodes with this label get a tenant-suffixed label.
    ///
    /// Global nodes (tenants, countries, domains, players, workspaces) do not.
    pub fn is_tenant_scoped(&self) -> bool {
        !matches!(
            self,
            NodeLabel::Tenant
                | NodeLabel::TenantSettings
                | NodeLabel::Country
                | NodeLabel::Domain
                | NodeLabel::Player
                | NodeLabel::Workspace
        )
    }

    /// Tenant-suffixed label, e.g. `Contact_acme`.
    pub fn tenant_label(&self, tenant: &Tenant) -> String {
        tenant.label(self.as_str())
    }

    /// Relationship linking a node to its `Tenant`, where the graph has one.
    pub fn belongs_to_tenant(&self) -> Option<&'static str> {
        match self {
            NodeLabel::Contact => Some("CONTACT_BELONGS_TO_TENANT"),
            NodeLabel::Contract => Some("CONTRACT_BELONGS_TO_TENANT"),
            NodeLabel::Email => Some("EMAIL_ADDRESS_BELONGS_TO_TENANT"),
            NodeLabel::ExternalSystem => Some("EXTERNAL_SYSTEM_BELONGS_TO_TENANT"),
            NodeLabel::Invoice => Some("INVOICE_BELONGS_TO_TENANT"),
            NodeLabel::Issue => Some("ISSUE_BELONGS_TO_TENANT"),
            NodeLabel::Location => Some("LOCATION_BELONGS_TO_TENANT"),
            NodeLabel::MasterPlan => Some("MASTER_PLAN_BELONGS_TO_TENANT"),
            NodeLabel::Opportunity => Some("OPPORTUNITY_BELONGS_TO_TENANT"),
            NodeLabel::Organization => Some("ORGANIZATION_BELONGS_TO_TENANT"),
            NodeLabel::OrganizationPlan => Some("ORGANIZATION_PLAN_BELONGS_TO_TENANT"),
            NodeLabel::PhoneNumber => Some("PHONE_NUMBER_BELONGS_TO_TENANT"),
            NodeLabel::Tag => Some("TAG_BELONGS_TO_TENANT"),
            NodeLabel::User => Some("USER_BELONGS_TO_TENANT"),
            _ => None,
        }
    }

    /// Label a soft-deleted node carries instead of its normal one.
    pub fn deleted_label(&self) -> String {
        format!("Deleted{}", self.as_str())
    }

    /// Tenant-suffixed soft-delete label, e.g. `DeletedContact_acme`.
    pub fn deleted_tenant_label(&self, tenant: &Tenant) -> String {
        tenant.label(&self.deleted_label())
    }
}

impl std::fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeLabel::all()
            .iter()
            .find(|label| label.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown node label '{}'", s))
    }
}
