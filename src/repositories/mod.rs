//! Data access layer for the CRM graph.
//!
//! Each repository wraps the Cypher of one entity (or one read model) and is
//! built from the [`Context`](crate::context::Context) with the
//! `FromContext` derive. [`Repositories`] bundles all of them for callers
//! that need more than a few.

mod billing_profile;
mod common;
mod contact;
mod contract;
mod email;
mod entity;
mod filters;
mod flow;
mod invoice;
mod issue;
mod job_role;
mod location;
mod opportunity;
mod organization;
mod organization_plan;
mod service_line_item;
mod tag;
mod tenant;
mod timeline_event;
mod user;

pub use billing_profile::BillingProfileRepository;
pub use common::CommonRepository;
pub use contact::{ContactReadRepository, ContactWriteRepository};
pub use contract::{ContractReadRepository, ContractWriteRepository};
pub use email::{EmailOwner, EmailRepository};
pub use entity::{
    kind, ActionRepository, BankAccountRepository, CommentRepository, CountryRepository,
    CustomFieldRepository, CustomFieldTemplateRepository, DomainRepository, EntityKind,
    EntityRepository, ExternalSystemRepository, InteractionEventRepository, InvoiceLineRepository,
    LogEntryRepository, MasterPlanRepository, OfferingRepository, OrderRepository,
    PhoneNumberRepository, PlayerRepository, ReminderRepository, SocialRepository,
    WorkspaceRepository,
};
pub use filters::{
    contact_filter_query, organization_filter_query, ContactSearchParam,
    ContactWithFiltersReadRepository, OrganizationSearchParam, OrganizationWithFiltersReadRepository,
};
pub use flow::{FlowRepository, FLOW_STATUS_INACTIVE, PARTICIPANT_STATUS_PENDING};
pub use invoice::InvoiceRepository;
pub use issue::IssueRepository;
pub use job_role::JobRoleRepository;
pub use location::LocationRepository;
pub use opportunity::{OpportunityReadRepository, OpportunityWriteRepository};
pub use organization::{OrganizationReadRepository, OrganizationWriteRepository};
pub use organization_plan::{OrganizationPlanReadRepository, OrganizationPlanWriteRepository};
pub use service_line_item::ServiceLineItemRepository;
pub use tag::TagRepository;
pub use tenant::{TenantReadRepository, TenantWriteRepository};
pub use timeline_event::TimelineEventRepository;
pub use user::UserRepository;

use crate::context::Context;
use crate::di::FromContext;

/// Every repository, resolved from one context.
///
/// ```ignore
/// let repos = Repositories::from_ref(&ctx);
/// let contact = repos.contact_read.get_contact(&tenant, "c1").await?;
/// ```
#[derive(FromContext, Clone)]
pub struct Repositories {
    pub common: CommonRepository,

    pub contact_read: ContactReadRepository,
    pub contact_write: ContactWriteRepository,
    pub contact_with_filters: ContactWithFiltersReadRepository,
    pub organization_read: OrganizationReadRepository,
    pub organization_write: OrganizationWriteRepository,
    pub organization_with_filters: OrganizationWithFiltersReadRepository,
    pub contract_read: ContractReadRepository,
    pub contract_write: ContractWriteRepository,
    pub opportunity_read: OpportunityReadRepository,
    pub opportunity_write: OpportunityWriteRepository,
    pub email: EmailRepository,
    pub location: LocationRepository,
    pub job_role: JobRoleRepository,
    pub tenant_read: TenantReadRepository,
    pub tenant_write: TenantWriteRepository,
    pub tag: TagRepository,
    pub invoice: InvoiceRepository,
    pub service_line_item: ServiceLineItemRepository,
    pub organization_plan_read: OrganizationPlanReadRepository,
    pub organization_plan_write: OrganizationPlanWriteRepository,
    pub timeline_event: TimelineEventRepository,
    pub issue: IssueRepository,
    pub billing_profile: BillingProfileRepository,
    pub user: UserRepository,
    pub flow: FlowRepository,

    pub action: ActionRepository,
    pub bank_account: BankAccountRepository,
    pub comment: CommentRepository,
    pub country: CountryRepository,
    pub custom_field: CustomFieldRepository,
    pub custom_field_template: CustomFieldTemplateRepository,
    pub domain: DomainRepository,
    pub external_system: ExternalSystemRepository,
    pub interaction_event: InteractionEventRepository,
    pub invoice_line: InvoiceLineRepository,
    pub log_entry: LogEntryRepository,
    pub master_plan: MasterPlanRepository,
    pub offering: OfferingRepository,
    pub order: OrderRepository,
    pub phone_number: PhoneNumberRepository,
    pub player: PlayerRepository,
    pub reminder: ReminderRepository,
    pub social: SocialRepository,
    pub workspace: WorkspaceRepository,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AppGraph;
    use crate::graph::mock::MockExecutor;
    use crate::models::{NodeLabel, SearchFilter};
    use crate::tenant::Tenant;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_reads_are_scoped_to_the_tenant() {
        let mock = Arc::new(MockExecutor::new());
        let graph: AppGraph = mock.clone();
        let tenant = Tenant::new("acme").unwrap();
        let filter = SearchFilter::default();

        let contacts = ContactReadRepository::new(graph.clone());
        contacts.get_contact(&tenant, "x").await.unwrap();
        contacts.get_contacts_with_email(&tenant, "a@b.c").await.unwrap();
        contacts.get_linked_org_domains(&tenant, "x").await.unwrap();

        let organizations = OrganizationReadRepository::new(graph.clone());
        organizations.get_organization(&tenant, "x").await.unwrap();
        organizations.count_by_tenant(&tenant).await.unwrap();

        let contracts = ContractReadRepository::new(graph.clone());
        contracts.get_contract(&tenant, "x").await.unwrap();
        contracts.count_contracts(&tenant).await.unwrap();

        OpportunityReadRepository::new(graph.clone())
            .get_opportunity(&tenant, "x")
            .await
            .unwrap();

        let tags = TagRepository::new(graph.clone());
        tags.get_all(&tenant).await.unwrap();
        tags.get_for_contact(&tenant, "x").await.unwrap();

        InvoiceRepository::new(graph.clone())
            .get_invoice_by_number(&tenant, "INV-1")
            .await
            .unwrap();

        let items = ServiceLineItemRepository::new(graph.clone());
        items.get_for_contract(&tenant, "x").await.unwrap();
        items.was_invoiced(&tenant, "x").await.unwrap();

        OrganizationPlanReadRepository::new(graph.clone())
            .get_plan(&tenant, "x")
            .await
            .unwrap();
        UserRepository::new(graph.clone())
            .get_user_by_email(&tenant, "a@b.c")
            .await
            .unwrap();

        let tenants = TenantReadRepository::new(graph.clone());
        tenants.get_tenant_settings(&tenant).await.unwrap();
        tenants.get_billing_profiles(&tenant).await.unwrap();

        let flows = FlowRepository::new(graph.clone());
        flows.get_flow(&tenant, "x").await.unwrap();
        flows.get_participants(&tenant, "x").await.unwrap();

        EmailRepository::new(graph.clone()).get_email(&tenant, "x").await.unwrap();
        LocationRepository::new(graph.clone()).get_location(&tenant, "x").await.unwrap();

        let timeline = TimelineEventRepository::new(graph.clone());
        timeline.get_timeline_event(&tenant, "x").await.unwrap();
        timeline.count_timeline_events_for_contact(&tenant, "x", &[]).await.unwrap();

        let common = CommonRepository::new(graph.clone());
        common.exists_by_id(&tenant, "x", NodeLabel::Contact).await.unwrap();
        common
            .exists_by_id_with_any_label(&tenant, "x", &[NodeLabel::Contact, NodeLabel::Organization])
            .await
            .unwrap();
        common.get_node_by_id(&tenant, "x", NodeLabel::Email).await.unwrap();

        let phones = PhoneNumberRepository::new(graph.clone());
        phones.get_by_id(&tenant, "x").await.unwrap();
        phones.list(&tenant, 0, 10).await.unwrap();
        phones.count(&tenant).await.unwrap();

        OrganizationWithFiltersReadRepository::new(graph.clone())
            .get_filtered_organization_ids(&tenant, Some(&filter))
            .await
            .unwrap();
        ContactWithFiltersReadRepository::new(graph.clone())
            .get_filtered_contact_ids(&tenant, None)
            .await
            .unwrap();

        let calls = mock.calls();
        assert!(calls.len() >= 30);
        for call in calls {
            let binds_tenant = call.params.get("tenant").and_then(|t| t.as_str()) == Some("acme");
            let uses_tenant_label = call.cypher.contains("_acme")
                || serde_json::to_string(&call.params).unwrap().contains("_acme");
            assert!(
                binds_tenant || uses_tenant_label,
                "query is not tenant-scoped: {}",
                call.cypher
            );
        }
    }
}
