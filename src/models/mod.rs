//! Entity models, write inputs and search filters.
//!
//! Read models mirror node properties (camelCase) and tolerate missing
//! properties. Write inputs are plain structs; `*Patch` structs hold one
//! `Option` per field and only `Some` fields are written.

mod billing_profile;
mod contact;
mod contract;
mod email;
mod filter;
mod flow;
mod invoice;
mod issue;
mod job_role;
mod labels;
mod location;
mod node;
mod opportunity;
mod organization;
mod plan;
mod service_line_item;
mod source;
mod tag;
mod tenant_records;
mod timeline_event;
mod user;

pub use billing_profile::{BillingProfile, BillingProfileCreate, BillingProfilePatch};
pub use contact::{Contact, ContactCreate, ContactPatch};
pub use contract::{Contract, ContractCreate, ContractPatch};
pub use email::{Email, EmailCreate, EmailValidation};
pub use filter::{ComparisonOperator, FilterItem, FilterValue, SearchFilter};
pub use flow::{
    Flow, FlowAction, FlowActionFields, FlowExecutionSettings, FlowExecutionSettingsFields,
    FlowParticipant, FlowSave,
};
pub use invoice::{Invoice, InvoiceLine};
pub use issue::{Issue, IssueCreate, IssuePatch};
pub use job_role::{JobRole, JobRoleFields};
pub use labels::NodeLabel;
pub use location::{AddressDetails, Location, LocationCreate, LocationUpdate};
pub use node::{ExternalSystemLink, Linked, NodeRecord};
pub use opportunity::{
    InternalStage, Opportunity, OpportunityCreate, OpportunityPatch, RenewalOpportunityCreate,
    RenewalPatch,
};
pub use organization::{
    Organization, OrganizationCreate, OrganizationPatch, RenewalSummary,
    ONBOARDING_NOT_APPLICABLE,
};
pub use plan::{
    MilestoneCreate, MilestoneItem, MilestonePatch, OrganizationPlan, OrganizationPlanCreate,
    OrganizationPlanMilestone, OrganizationPlanPatch, StatusDetails,
};
pub use service_line_item::ServiceLineItem;
pub use source::{
    is_organization_overwrite_source, is_overwrite_source, SourceFields, APP_SOURCE,
    SOURCE_OPENLINE, SOURCE_WEBSCRAPE,
};
pub use tag::Tag;
pub use tenant_records::{
    TenantBillingProfile, TenantBillingProfileCreate, TenantBillingProfilePatch, TenantNode,
    TenantSettings, TenantSettingsPatch,
};
pub use timeline_event::TimelineEvent;
pub use user::{User, UserCreate, UserPatch};
