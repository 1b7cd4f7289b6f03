//! Organization reads and writes.

use chrono::{DateTime, Utc};

use crate::context::{AppGraph, Context};
use crate::cypher::{self, gated_assignment, Blank, SetClause};
use crate::di::FromContext;
use crate::error::AppError;
use crate::graph::{CypherExecutor, QueryExt, Timestamp};
use crate::models::{
    is_organization_overwrite_source, Linked, NodeLabel, Organization, OrganizationCreate,
    OrganizationPatch, RenewalSummary, APP_SOURCE, ONBOARDING_NOT_APPLICABLE, SOURCE_OPENLINE,
};
use crate::tenant::Tenant;

#[derive(FromContext, Clone)]
pub struct OrganizationReadRepository {
    graph: AppGraph,
}

impl OrganizationReadRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    /// Number of visible organizations.
    pub async fn count_by_tenant(&self, tenant: &Tenant) -> Result<i64, AppError> {
        tracing::debug!(tenant = %tenant, "OrganizationReadRepository::count_by_tenant");

        let count = self
            .graph
            .query(
                "MATCH (org:Organization)-[:ORGANIZATION_BELONGS_TO_TENANT]->(:Tenant {name:$tenant})
                 WHERE org.hide = false
                 RETURN count(org) AS count",
            )
            .param("tenant", tenant.as_str())
            .fetch_value("count")
            .await?;
        Ok(count.unwrap_or(0))
    }

    pub async fn get_organization(
        &self,
        tenant: &Tenant,
        organization_id: &str,
    ) -> Result<Option<Organization>, AppError> {
        tracing::debug!(tenant = %tenant, organization_id, "OrganizationReadRepository::get_organization");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization {id:$id})
                 RETURN org {.*} AS org",
            )
            .param("tenant", tenant.as_str())
            .param("id", organization_id)
            .fetch_value("org")
            .await
    }

    /// Organization owning the opportunity, directly or through a contract.
    pub async fn get_organization_by_opportunity_id(
        &self,
        tenant: &Tenant,
        opportunity_id: &str,
    ) -> Result<Option<Organization>, AppError> {
        tracing::debug!(
            tenant = %tenant,
            opportunity_id,
            "OrganizationReadRepository::get_organization_by_opportunity_id"
        );

        self.graph
            .query(
                "MATCH (t:Tenant {name:$tenant})<-[:OPPORTUNITY_BELONGS_TO_TENANT]-(op:Opportunity {id:$id})
                 OPTIONAL MATCH (op)<-[:HAS_OPPORTUNITY]-(:Contract)<-[:HAS_CONTRACT]-(org:Organization)
                 OPTIONAL MATCH (op)<-[:HAS_OPPORTUNITY]-(directOrg:Organization)
                 WITH COALESCE(org, directOrg) AS organization
                 WHERE organization IS NOT NULL
                 RETURN organization {.*} AS org LIMIT 1",
            )
            .param("tenant", tenant.as_str())
            .param("id", opportunity_id)
            .fetch_value("org")
            .await
    }

    /// First organization the contact holds a job role in.
    pub async fn get_organization_by_contact_id(
        &self,
        tenant: &Tenant,
        contact_id: &str,
    ) -> Result<Option<Organization>, AppError> {
        tracing::debug!(tenant = %tenant, contact_id, "OrganizationReadRepository::get_organization_by_contact_id");

        self.graph
            .query(
                "MATCH (t:Tenant {name:$tenant})<-[:CONTACT_BELONGS_TO_TENANT]-(c:Contact {id:$id})
                       -[:WORKS_AS]->(:JobRole)-[:ROLE_IN]->(org:Organization)-[:ORGANIZATION_BELONGS_TO_TENANT]->(t)
                 RETURN org {.*} AS org LIMIT 1",
            )
            .param("tenant", tenant.as_str())
            .param("id", contact_id)
            .fetch_value("org")
            .await
    }

    pub async fn get_organization_by_contract_id(
        &self,
        tenant: &Tenant,
        contract_id: &str,
    ) -> Result<Option<Organization>, AppError> {
        tracing::debug!(tenant = %tenant, contract_id, "OrganizationReadRepository::get_organization_by_contract_id");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization)
                       -[:HAS_CONTRACT]->(:Contract {id:$id})
                 RETURN org {.*} AS org LIMIT 1",
            )
            .param("tenant", tenant.as_str())
            .param("id", contract_id)
            .fetch_value("org")
            .await
    }

    pub async fn get_organization_by_invoice_id(
        &self,
        tenant: &Tenant,
        invoice_id: &str,
    ) -> Result<Option<Organization>, AppError> {
        tracing::debug!(tenant = %tenant, invoice_id, "OrganizationReadRepository::get_organization_by_invoice_id");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:INVOICE_BELONGS_TO_TENANT]-(:Invoice {id:$id})
                       <-[:HAS_INVOICE]-(:Contract)<-[:HAS_CONTRACT]-(org:Organization)
                 RETURN org {.*} AS org LIMIT 1",
            )
            .param("tenant", tenant.as_str())
            .param("id", invoice_id)
            .fetch_value("org")
            .await
    }

    pub async fn get_organization_by_customer_os_id(
        &self,
        tenant: &Tenant,
        customer_os_id: &str,
    ) -> Result<Option<Organization>, AppError> {
        tracing::debug!(
            tenant = %tenant,
            customer_os_id,
            "OrganizationReadRepository::get_organization_by_customer_os_id"
        );

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization {customerOsId:$customerOsId})
                 RETURN org {.*} AS org LIMIT 1",
            )
            .param("tenant", tenant.as_str())
            .param("customerOsId", customer_os_id)
            .fetch_value("org")
            .await
    }

    pub async fn get_organization_by_reference_id(
        &self,
        tenant: &Tenant,
        reference_id: &str,
    ) -> Result<Option<Organization>, AppError> {
        tracing::debug!(
            tenant = %tenant,
            reference_id,
            "OrganizationReadRepository::get_organization_by_reference_id"
        );

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization {referenceId:$referenceId})
                 RETURN org {.*} AS org LIMIT 1",
            )
            .param("tenant", tenant.as_str())
            .param("referenceId", reference_id)
            .fetch_value("org")
            .await
    }

    /// Organization owning `domain`. Domains are matched lower-cased.
    pub async fn get_organization_by_domain(
        &self,
        tenant: &Tenant,
        domain: &str,
    ) -> Result<Option<Organization>, AppError> {
        tracing::debug!(tenant = %tenant, domain, "OrganizationReadRepository::get_organization_by_domain");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization)
                       -[:HAS_DOMAIN]->(:Domain {domain:$domain})
                 RETURN org {.*} AS org LIMIT 1",
            )
            .param("tenant", tenant.as_str())
            .param("domain", domain.to_lowercase())
            .fetch_value("org")
            .await
    }

    /// Organizations paired with each requested opportunity id they own.
    pub async fn get_all_for_opportunities(
        &self,
        tenant: &Tenant,
        opportunity_ids: &[String],
    ) -> Result<Vec<Linked<Organization>>, AppError> {
        tracing::debug!(
            tenant = %tenant,
            count = opportunity_ids.len(),
            "OrganizationReadRepository::get_all_for_opportunities"
        );

        let rows = self
            .graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization)
                       -[:HAS_OPPORTUNITY]->(op:Opportunity)
                 WHERE op.id IN $ids
                 RETURN org {.*} AS org, op.id AS linkedId",
            )
            .param("tenant", tenant.as_str())
            .param("ids", opportunity_ids)
            .fetch_all()
            .await?;

        rows.iter()
            .map(|row| -> Result<Linked<Organization>, AppError> {
                Ok(Linked {
                    node: row.get("org")?,
                    linked_id: row.get("linkedId")?,
                })
            })
            .collect()
    }

    /// Organizations paired with each requested invoice id billed to them.
    pub async fn get_all_for_invoices(
        &self,
        tenant: &Tenant,
        invoice_ids: &[String],
    ) -> Result<Vec<Linked<Organization>>, AppError> {
        tracing::debug!(
            tenant = %tenant,
            count = invoice_ids.len(),
            "OrganizationReadRepository::get_all_for_invoices"
        );

        let rows = self
            .graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization)
                       -[:HAS_CONTRACT]->(:Contract)-[:HAS_INVOICE]->(i:Invoice)
                 WHERE i.id IN $ids
                 RETURN org {.*} AS org, i.id AS linkedId",
            )
            .param("tenant", tenant.as_str())
            .param("ids", invoice_ids)
            .fetch_all()
            .await?;

        rows.iter()
            .map(|row| -> Result<Linked<Organization>, AppError> {
                Ok(Linked {
                    node: row.get("org")?,
                    linked_id: row.get("linkedId")?,
                })
            })
            .collect()
    }
}

#[derive(FromContext, Clone)]
pub struct OrganizationWriteRepository {
    graph: AppGraph,
}

impl OrganizationWriteRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    pub async fn create_organization(
        &self,
        tenant: &Tenant,
        organization_id: &str,
        data: &OrganizationCreate,
    ) -> Result<(), AppError> {
        self.create_organization_in_tx(self.graph.as_ref(), tenant, organization_id, data)
            .await
    }

    /// Merges the organization under its tenant.
    ///
    /// On a repeated create the existing node is updated with the same
    /// source-of-truth rules as [`update_organization`](Self::update_organization).
    pub async fn create_organization_in_tx<E: CypherExecutor + ?Sized>(
        &self,
        tx: &E,
        tenant: &Tenant,
        organization_id: &str,
        data: &OrganizationCreate,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, organization_id, "OrganizationWriteRepository::create_organization");

        let strings = [
            "name",
            "description",
            "website",
            "industry",
            "subIndustry",
            "industryGroup",
            "targetAudience",
            "valueProposition",
            "market",
            "lastFundingRound",
            "lastFundingAmount",
            "referenceId",
            "note",
            "logoUrl",
            "headquarters",
            "employeeGrowthRate",
            "slackChannelId",
            "relationship",
            "stage",
            "leadSource",
        ];

        let on_create = strings
            .iter()
            .map(|field| format!("org.{f} = ${f}", f = field))
            .collect::<Vec<_>>()
            .join(",\n                ");

        let mut on_match: Vec<String> = strings
            .iter()
            .map(|field| gated_assignment("org", field, "sourceOfTruth", Blank::NullOrEmpty))
            .collect();
        on_match.push(gated_assignment("org", "yearFounded", "sourceOfTruth", Blank::NullOrZero));
        on_match.push(gated_assignment("org", "isPublic", "sourceOfTruth", Blank::Null));
        on_match.push(gated_assignment("org", "employees", "sourceOfTruth", Blank::Null));
        on_match.push(
            "org.hide = CASE WHEN $overwrite=true OR (org.sourceOfTruth=$sourceOfTruth AND $hide = false) THEN $hide ELSE org.hide END"
                .to_string(),
        );
        on_match.push(
            "org.isCustomer = CASE WHEN $overwrite=true OR (org.sourceOfTruth=$sourceOfTruth AND $isCustomer = true) THEN $isCustomer ELSE org.isCustomer END"
                .to_string(),
        );
        on_match.push(
            "org.stageUpdatedAt = CASE WHEN (org.sourceOfTruth=$sourceOfTruth OR $overwrite=true OR org.stage IS NULL OR org.stage = '')
                AND (org.stage IS NULL OR org.stage <> $stage) THEN $now ELSE org.stageUpdatedAt END"
                .to_string(),
        );
        on_match.push("org.updatedAt = $now".to_string());

        let cypher = format!(
            "MATCH (t:Tenant {{name:$tenant}})
             MERGE (t)<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization:{label} {{id:$id}})
             ON CREATE SET {on_create},
                org.yearFounded = $yearFounded,
                org.isPublic = $isPublic,
                org.isCustomer = $isCustomer,
                org.employees = $employees,
                org.hide = $hide,
                org.onboardingStatus = $onboardingStatus,
                org.stageUpdatedAt = $now,
                org.source = $source,
                org.sourceOfTruth = $sourceOfTruth,
                org.appSource = $appSource,
                org.createdAt = $createdAt,
                org.updatedAt = $now
             ON MATCH SET {on_match}",
            label = NodeLabel::Organization.tenant_label(tenant),
            on_create = on_create,
            on_match = on_match.join(",\n                "),
        );

        let now = cypher::now();
        let created_at = cypher::timestamp(data.created_at).unwrap_or_else(|| now.clone());

        tx.query(cypher)
            .param("tenant", tenant.as_str())
            .param("id", organization_id)
            .param("name", &data.name)
            .param("description", &data.description)
            .param("website", &data.website)
            .param("industry", &data.industry)
            .param("subIndustry", &data.sub_industry)
            .param("industryGroup", &data.industry_group)
            .param("targetAudience", &data.target_audience)
            .param("valueProposition", &data.value_proposition)
            .param("market", &data.market)
            .param("lastFundingRound", &data.last_funding_round)
            .param("lastFundingAmount", &data.last_funding_amount)
            .param("referenceId", &data.reference_id)
            .param("note", &data.note)
            .param("logoUrl", &data.logo_url)
            .param("headquarters", &data.headquarters)
            .param("employeeGrowthRate", &data.employee_growth_rate)
            .param("slackChannelId", &data.slack_channel_id)
            .param("relationship", &data.relationship)
            .param("stage", &data.stage)
            .param("leadSource", &data.lead_source)
            .param("yearFounded", data.year_founded)
            .param("isPublic", data.is_public)
            .param("isCustomer", data.is_customer)
            .param("employees", data.employees)
            .param("hide", data.hide)
            .param("onboardingStatus", ONBOARDING_NOT_APPLICABLE)
            .param("source", &data.source.source)
            .param("sourceOfTruth", data.source.source_of_truth())
            .param("appSource", data.source.app_source())
            .param("overwrite", data.source.overwrite())
            .param("createdAt", &created_at)
            .param("now", &now)
            .run()
            .await
    }

    /// Applies the `Some` fields of `patch`. Web-scrape updates overwrite
    /// like CRM updates do.
    pub async fn update_organization(
        &self,
        tenant: &Tenant,
        organization_id: &str,
        patch: &OrganizationPatch,
    ) -> Result<(), AppError> {
        tracing::debug!(
            tenant = %tenant,
            organization_id,
            source = %patch.source,
            "OrganizationWriteRepository::update_organization"
        );

        let now = cypher::now();
        let mut set = SetClause::new("org").with_source_param("source");

        for (field, value) in [("name", &patch.name), ("description", &patch.description)] {
            if let Some(value) = value {
                set.raw(format!(
                    "org.{f} = CASE WHEN org.sourceOfTruth=$source OR $overwrite=true OR org.{f} = '' THEN ${f} ELSE org.{f} END",
                    f = field
                ))
                .param(field, value.as_str());
            }
        }
        if let Some(hide) = patch.hide {
            set.raw("org.hide = CASE WHEN $overwrite=true OR $hide = false THEN $hide ELSE org.hide END")
                .param("hide", hide);
        }
        if let Some(is_customer) = patch.is_customer {
            set.raw(
                "org.isCustomer = CASE WHEN $overwrite=true OR (org.sourceOfTruth=$source AND $isCustomer = true) THEN $isCustomer ELSE org.isCustomer END",
            )
            .param("isCustomer", is_customer);
        }

        set.set_gated("website", patch.website.clone())
            .set_gated("industry", patch.industry.clone())
            .set_gated("subIndustry", patch.sub_industry.clone())
            .set_gated("industryGroup", patch.industry_group.clone())
            .set_gated("targetAudience", patch.target_audience.clone())
            .set_gated("valueProposition", patch.value_proposition.clone())
            .set_gated("lastFundingRound", patch.last_funding_round.clone())
            .set_gated("lastFundingAmount", patch.last_funding_amount.clone())
            .set_gated("referenceId", patch.reference_id.clone())
            .set_gated("note", patch.note.clone())
            .set_gated_blank("isPublic", patch.is_public, Blank::Null)
            .set_gated_blank("employees", patch.employees, Blank::Null)
            .set_gated("market", patch.market.clone())
            .set_gated_blank("yearFounded", patch.year_founded, Blank::NullOrZero)
            .set_gated("headquarters", patch.headquarters.clone())
            .set_gated("logoUrl", patch.logo_url.clone())
            .set_gated("employeeGrowthRate", patch.employee_growth_rate.clone())
            .set_gated("slackChannelId", patch.slack_channel_id.clone())
            .set_gated("relationship", patch.relationship.clone());

        if let Some(stage) = &patch.stage {
            set.raw(
                "org.stageUpdatedAt = CASE WHEN org.stage IS NULL OR org.stage <> $stage THEN $now ELSE org.stageUpdatedAt END",
            )
            .set_gated("stage", Some(stage.as_str()))
            .param("now", now.clone());
        }
        if let Some(url) = &patch.web_scraped_url {
            set.raw("org.webScrapedUrl = $webScrapedUrl, org.webScrapedAt = $now")
                .param("webScrapedUrl", url.as_str())
                .param("now", now.clone());
        }
        if let Some((domain, source)) = &patch.enrichment {
            set.raw("org.enrichDomain = $enrichDomain, org.enrichSource = $enrichSource, org.enrichedAt = $now")
                .param("enrichDomain", domain.as_str())
                .param("enrichSource", source.as_str())
                .param("now", now.clone());
        }
        set.source_of_truth().updated_at(&now);
        let (assignments, params) = set.build();

        let cypher = format!(
            "MATCH (:Tenant {{name:$tenant}})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization {{id:$id}})
             WHERE org:{label}
             SET {assignments}",
            label = NodeLabel::Organization.tenant_label(tenant),
            assignments = assignments,
        );

        self.graph
            .query(cypher)
            .params(params)
            .param("tenant", tenant.as_str())
            .param("id", organization_id)
            .param("source", &patch.source)
            .param("overwrite", is_organization_overwrite_source(&patch.source))
            .run()
            .await
    }

    /// Links the organization with a (possibly new) domain node.
    pub async fn link_with_domain(&self, tenant: &Tenant, organization_id: &str, domain: &str) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, organization_id, domain, "OrganizationWriteRepository::link_with_domain");

        self.graph
            .query(
                "MERGE (d:Domain {domain:$domain})
                 ON CREATE SET d.id=randomUUID(),
                    d.createdAt=$now,
                    d.updatedAt=$now,
                    d.appSource=$appSource
                 WITH d
                 MATCH (t:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization {id:$organizationId})
                 MERGE (org)-[:HAS_DOMAIN]->(d)",
            )
            .param("tenant", tenant.as_str())
            .param("organizationId", organization_id)
            .param("domain", domain.to_lowercase())
            .param("appSource", APP_SOURCE)
            .param("now", cypher::now())
            .run()
            .await
    }

    pub async fn unlink_from_domain(&self, tenant: &Tenant, organization_id: &str, domain: &str) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, organization_id, domain, "OrganizationWriteRepository::unlink_from_domain");

        self.graph
            .query(
                "MATCH (t:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization {id:$organizationId})
                 MATCH (org)-[rel:HAS_DOMAIN]->(:Domain {domain:$domain})
                 DELETE rel",
            )
            .param("tenant", tenant.as_str())
            .param("organizationId", organization_id)
            .param("domain", domain.to_lowercase())
            .run()
            .await
    }

    /// Makes `user_id` the only owner. Internal and bot users are never
    /// linked, though the previous owner is still removed.
    pub async fn replace_owner(&self, tenant: &Tenant, organization_id: &str, user_id: &str) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, organization_id, user_id, "OrganizationWriteRepository::replace_owner");

        self.graph
            .query(
                "MATCH (t:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization {id:$organizationId})
                 OPTIONAL MATCH (:User)-[rel:OWNS]->(org)
                 DELETE rel
                 WITH org, t
                 MATCH (t)<-[:USER_BELONGS_TO_TENANT]-(u:User {id:$userId})
                 WHERE (u.internal=false OR u.internal IS NULL) AND (u.bot=false OR u.bot IS NULL)
                 MERGE (u)-[:OWNS]->(org)
                 SET org.updatedAt=$now, org.sourceOfTruth=$source",
            )
            .param("tenant", tenant.as_str())
            .param("organizationId", organization_id)
            .param("userId", user_id)
            .param("source", SOURCE_OPENLINE)
            .param("now", cypher::now())
            .run()
            .await
    }

    pub async fn set_visibility(&self, tenant: &Tenant, organization_id: &str, hide: bool) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, organization_id, hide, "OrganizationWriteRepository::set_visibility");

        let cypher = format!(
            "MATCH (:Tenant {{name:$tenant}})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization {{id:$id}})
             WHERE org:{label}
             SET org.hide = $hide, org.updatedAt = $now",
            label = NodeLabel::Organization.tenant_label(tenant),
        );
        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("id", organization_id)
            .param("hide", hide)
            .param("now", cypher::now())
            .run()
            .await
    }

    pub async fn update_last_touchpoint(
        &self,
        tenant: &Tenant,
        organization_id: &str,
        touchpoint_at: DateTime<Utc>,
        touchpoint_id: &str,
        touchpoint_type: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(
            tenant = %tenant,
            organization_id,
            touchpoint_id,
            "OrganizationWriteRepository::update_last_touchpoint"
        );

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization {id:$organizationId})
                 SET org.lastTouchpointAt=$touchpointAt,
                    org.lastTouchpointId=$touchpointId,
                    org.lastTouchpointType=$touchpointType",
            )
            .param("tenant", tenant.as_str())
            .param("organizationId", organization_id)
            .param("touchpointAt", Timestamp::from(touchpoint_at))
            .param("touchpointId", touchpoint_id)
            .param("touchpointType", touchpoint_type)
            .run()
            .await
    }

    /// Sets `customerOsId` only when the stored value is blank and the new
    /// one is not.
    pub async fn set_customer_os_id_if_missing(
        &self,
        tenant: &Tenant,
        organization_id: &str,
        customer_os_id: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(
            tenant = %tenant,
            organization_id,
            customer_os_id,
            "OrganizationWriteRepository::set_customer_os_id_if_missing"
        );

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization {id:$organizationId})
                 SET org.customerOsId = CASE WHEN (org.customerOsId IS NULL OR org.customerOsId = '') AND $customerOsId <> ''
                    THEN $customerOsId ELSE org.customerOsId END",
            )
            .param("tenant", tenant.as_str())
            .param("organizationId", organization_id)
            .param("customerOsId", customer_os_id)
            .run()
            .await
    }

    pub async fn link_with_parent_organization(
        &self,
        tenant: &Tenant,
        organization_id: &str,
        parent_organization_id: &str,
        sub_organization_type: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(
            tenant = %tenant,
            organization_id,
            parent_organization_id,
            "OrganizationWriteRepository::link_with_parent_organization"
        );

        self.graph
            .query(
                "MATCH (t:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(parent:Organization {id:$parentOrganizationId}),
                       (t)<-[:ORGANIZATION_BELONGS_TO_TENANT]-(sub:Organization {id:$subOrganizationId})
                 MERGE (sub)-[rel:SUBSIDIARY_OF]->(parent)
                 SET rel.type=$type",
            )
            .param("tenant", tenant.as_str())
            .param("subOrganizationId", organization_id)
            .param("parentOrganizationId", parent_organization_id)
            .param("type", sub_organization_type)
            .run()
            .await
    }

    pub async fn unlink_parent_organization(
        &self,
        tenant: &Tenant,
        organization_id: &str,
        parent_organization_id: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(
            tenant = %tenant,
            organization_id,
            parent_organization_id,
            "OrganizationWriteRepository::unlink_parent_organization"
        );

        self.graph
            .query(
                "MATCH (t:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(parent:Organization {id:$parentOrganizationId})
                       <-[rel:SUBSIDIARY_OF]-(:Organization {id:$subOrganizationId})-[:ORGANIZATION_BELONGS_TO_TENANT]->(t)
                 DELETE rel",
            )
            .param("tenant", tenant.as_str())
            .param("subOrganizationId", organization_id)
            .param("parentOrganizationId", parent_organization_id)
            .run()
            .await
    }

    /// Recomputes the renewal forecast from active renewal opportunities.
    pub async fn update_arr(&self, tenant: &Tenant, organization_id: &str) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, organization_id, "OrganizationWriteRepository::update_arr");

        self.graph
            .query(
                "MATCH (t:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization {id:$organizationId})
                 OPTIONAL MATCH (org)-[:HAS_CONTRACT]->(c:Contract)
                 OPTIONAL MATCH (c)-[:ACTIVE_RENEWAL]->(op:Opportunity)
                 WITH org, COALESCE(sum(op.amount), 0) AS arr, COALESCE(sum(op.maxAmount), 0) AS maxArr
                 SET org.renewalForecastArr = arr, org.renewalForecastMaxArr = maxArr, org.updatedAt = $now",
            )
            .param("tenant", tenant.as_str())
            .param("organizationId", organization_id)
            .param("now", cypher::now())
            .run()
            .await
    }

    /// Overwrites the derived renewal fields; `None` clears a field.
    pub async fn update_renewal_summary(
        &self,
        tenant: &Tenant,
        organization_id: &str,
        summary: &RenewalSummary,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, organization_id, "OrganizationWriteRepository::update_renewal_summary");

        self.graph
            .query(
                "MATCH (t:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization {id:$organizationId})
                 SET org.derivedRenewalLikelihood = $likelihood,
                    org.derivedRenewalLikelihoodOrder = $likelihoodOrder,
                    org.derivedNextRenewalAt = $nextRenewalAt,
                    org.updatedAt = $now",
            )
            .param("tenant", tenant.as_str())
            .param("organizationId", organization_id)
            .param("likelihood", &summary.likelihood)
            .param("likelihoodOrder", summary.likelihood_order)
            .param("nextRenewalAt", cypher::timestamp(summary.next_renewal_at))
            .param("now", cypher::now())
            .run()
            .await
    }

    pub async fn web_scrape_requested(
        &self,
        tenant: &Tenant,
        organization_id: &str,
        url: &str,
        attempt: i64,
        requested_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        tracing::debug!(
            tenant = %tenant,
            organization_id,
            url,
            attempt,
            "OrganizationWriteRepository::web_scrape_requested"
        );

        self.graph
            .query(
                "MATCH (t:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization {id:$organizationId})
                 SET org.webScrapeLastRequestedAt=$requestedAt,
                    org.webScrapeLastRequestedUrl=$url,
                    org.webScrapeAttempts=$attempt",
            )
            .param("tenant", tenant.as_str())
            .param("organizationId", organization_id)
            .param("url", url)
            .param("attempt", attempt)
            .param("requestedAt", Timestamp::from(requested_at))
            .run()
            .await
    }

    /// Records a new onboarding status. `onboardingUpdatedAt` moves only
    /// when the status changes.
    pub async fn update_onboarding_status(
        &self,
        tenant: &Tenant,
        organization_id: &str,
        status: &str,
        comments: &str,
        status_order: Option<i64>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        tracing::debug!(
            tenant = %tenant,
            organization_id,
            status,
            "OrganizationWriteRepository::update_onboarding_status"
        );

        self.graph
            .query(
                "MATCH (t:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization {id:$organizationId})
                 SET org.onboardingUpdatedAt = CASE WHEN org.onboardingStatus IS NULL OR org.onboardingStatus <> $status
                        THEN $updatedAt ELSE org.onboardingUpdatedAt END,
                    org.onboardingStatus=$status,
                    org.onboardingStatusOrder=$statusOrder,
                    org.onboardingComments=$comments,
                    org.updatedAt=$now",
            )
            .param("tenant", tenant.as_str())
            .param("organizationId", organization_id)
            .param("status", status)
            .param("statusOrder", status_order)
            .param("comments", comments)
            .param("updatedAt", Timestamp::from(updated_at))
            .param("now", cypher::now())
            .run()
            .await
    }
}
