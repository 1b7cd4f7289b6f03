//! Opportunity reads and writes, including contract renewals.

use chrono::{DateTime, Utc};

use crate::context::{AppGraph, Context};
use crate::cypher::{self, SetClause};
use crate::di::FromContext;
use crate::error::AppError;
use crate::graph::{QueryExt, Timestamp};
use crate::models::{
    is_overwrite_source, InternalStage, NodeLabel, Opportunity, OpportunityCreate, OpportunityPatch,
    RenewalOpportunityCreate, RenewalPatch,
};
use crate::tenant::Tenant;

#[derive(FromContext, Clone)]
pub struct OpportunityReadRepository {
    graph: AppGraph,
}

impl OpportunityReadRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    pub async fn get_opportunity(&self, tenant: &Tenant, opportunity_id: &str) -> Result<Option<Opportunity>, AppError> {
        tracing::debug!(tenant = %tenant, opportunity_id, "OpportunityReadRepository::get_opportunity");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:OPPORTUNITY_BELONGS_TO_TENANT]-(op:Opportunity {id:$id})
                 RETURN op {.*} AS op",
            )
            .param("tenant", tenant.as_str())
            .param("id", opportunity_id)
            .fetch_value("op")
            .await
    }

    pub async fn get_active_renewal_for_contract(
        &self,
        tenant: &Tenant,
        contract_id: &str,
    ) -> Result<Option<Opportunity>, AppError> {
        tracing::debug!(tenant = %tenant, contract_id, "OpportunityReadRepository::get_active_renewal_for_contract");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:CONTRACT_BELONGS_TO_TENANT]-(:Contract {id:$contractId})
                       -[:ACTIVE_RENEWAL]->(op:RenewalOpportunity)
                 RETURN op {.*} AS op LIMIT 1",
            )
            .param("tenant", tenant.as_str())
            .param("contractId", contract_id)
            .fetch_value("op")
            .await
    }
}

#[derive(FromContext, Clone)]
pub struct OpportunityWriteRepository {
    graph: AppGraph,
}

impl OpportunityWriteRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    pub async fn create_for_organization(
        &self,
        tenant: &Tenant,
        opportunity_id: &str,
        data: &OpportunityCreate,
    ) -> Result<(), AppError> {
        tracing::debug!(
            tenant = %tenant,
            opportunity_id,
            organization_id = %data.organization_id,
            "OpportunityWriteRepository::create_for_organization"
        );

        let cypher = format!(
            "MATCH (t:Tenant {{name:$tenant}})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization {{id:$organizationId}})
             MERGE (t)<-[:OPPORTUNITY_BELONGS_TO_TENANT]-(op:Opportunity {{id:$id}})<-[:HAS_OPPORTUNITY]-(org)
             ON CREATE SET op:{label},
                op.createdAt=$createdAt,
                op.updatedAt=$now,
                op.stageUpdatedAt=$now,
                op.source=$source,
                op.sourceOfTruth=$sourceOfTruth,
                op.appSource=$appSource,
                op.name=$name,
                op.maxAmount=$maxAmount,
                op.internalType=$internalType,
                op.externalType=$externalType,
                op.internalStage=$internalStage,
                op.externalStage=$externalStage,
                op.estimatedClosedAt=$estimatedClosedAt,
                op.generalNotes=$generalNotes,
                op.nextSteps=$nextSteps,
                op.currency=$currency,
                op.likelihoodRate=$likelihoodRate
             WITH op, t
             OPTIONAL MATCH (t)<-[:USER_BELONGS_TO_TENANT]-(u:User {{id:$createdByUserId}})
             WHERE $createdByUserId <> ''
             FOREACH (ignore IN CASE WHEN u IS NOT NULL THEN [1] ELSE [] END |
                MERGE (op)-[:CREATED_BY]->(u))",
            label = NodeLabel::Opportunity.tenant_label(tenant),
        );
        let now = cypher::now();

        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("id", opportunity_id)
            .param("organizationId", &data.organization_id)
            .param("createdAt", cypher::timestamp(data.created_at).unwrap_or_else(|| now.clone()))
            .param("now", &now)
            .param("source", &data.source.source)
            .param("sourceOfTruth", data.source.source_of_truth())
            .param("appSource", data.source.app_source())
            .param("name", &data.name)
            .param("maxAmount", data.max_amount)
            .param("internalType", &data.internal_type)
            .param("externalType", &data.external_type)
            .param("internalStage", &data.internal_stage)
            .param("externalStage", &data.external_stage)
            .param("estimatedClosedAt", cypher::timestamp(data.estimated_closed_at))
            .param("generalNotes", &data.general_notes)
            .param("nextSteps", &data.next_steps)
            .param("currency", &data.currency)
            .param("likelihoodRate", data.likelihood_rate)
            .param("createdByUserId", data.created_by_user_id.as_deref().unwrap_or(""))
            .run()
            .await
    }

    /// Applies the `Some` fields of `patch`.
    pub async fn update_opportunity(
        &self,
        tenant: &Tenant,
        opportunity_id: &str,
        patch: &OpportunityPatch,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, opportunity_id, "OpportunityWriteRepository::update_opportunity");

        let mut set = SetClause::new("op");
        if let Some(name) = &patch.name {
            set.raw("op.name = CASE WHEN op.sourceOfTruth=$sourceOfTruth OR $overwrite=true OR op.name = '' THEN $name ELSE op.name END")
                .param("name", name.as_str());
        }
        set.set_owned("amount", patch.amount)
            .set_owned("maxAmount", patch.max_amount)
            .set_owned("externalType", patch.external_type.clone())
            .set_owned("externalStage", patch.external_stage.clone())
            .set_owned("estimatedClosedAt", cypher::timestamp(patch.estimated_closed_at))
            .set("internalStage", patch.internal_stage.clone())
            .set("internalType", patch.internal_type.clone())
            .set_owned("currency", patch.currency.clone())
            .set_owned("nextSteps", patch.next_steps.clone())
            .set_owned("likelihoodRate", patch.likelihood_rate)
            .updated_at(&cypher::now())
            .source_of_truth();
        let (assignments, params) = set.build();

        let cypher = format!(
            "MATCH (op:Opportunity {{id:$id}}) WHERE op:{label}
             SET {assignments}",
            label = NodeLabel::Opportunity.tenant_label(tenant),
            assignments = assignments,
        );
        self.graph
            .query(cypher)
            .params(params)
            .param("id", opportunity_id)
            .param("sourceOfTruth", &patch.source)
            .param("overwrite", is_overwrite_source(&patch.source))
            .run()
            .await
    }

    /// Makes `user_id` the only owner, skipping internal and bot users.
    pub async fn replace_owner(&self, tenant: &Tenant, opportunity_id: &str, user_id: &str) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, opportunity_id, user_id, "OpportunityWriteRepository::replace_owner");

        let cypher = format!(
            "MATCH (t:Tenant {{name:$tenant}}), (op:Opportunity {{id:$id}}) WHERE op:{label}
             WITH op, t
             OPTIONAL MATCH (:User)-[rel:OWNS]->(op)
             DELETE rel
             WITH op, t
             MATCH (t)<-[:USER_BELONGS_TO_TENANT]-(u:User {{id:$userId}})
             WHERE (u.internal=false OR u.internal IS NULL) AND (u.bot=false OR u.bot IS NULL)
             MERGE (u)-[:OWNS]->(op)
             SET op.updatedAt=$now",
            label = NodeLabel::Opportunity.tenant_label(tenant),
        );
        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("id", opportunity_id)
            .param("userId", user_id)
            .param("now", cypher::now())
            .run()
            .await
    }

    pub async fn remove_owner(&self, tenant: &Tenant, opportunity_id: &str) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, opportunity_id, "OpportunityWriteRepository::remove_owner");

        let cypher = format!(
            "MATCH (op:Opportunity {{id:$id}})<-[rel:OWNS]-(:User)-[:USER_BELONGS_TO_TENANT]->(:Tenant {{name:$tenant}})
             WHERE op:{label}
             SET op.updatedAt=$now
             DELETE rel",
            label = NodeLabel::Opportunity.tenant_label(tenant),
        );
        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("id", opportunity_id)
            .param("now", cypher::now())
            .run()
            .await
    }

    /// Creates the contract's renewal opportunity unless it already has an
    /// active one. Returns whether a renewal was created.
    pub async fn create_renewal(
        &self,
        tenant: &Tenant,
        opportunity_id: &str,
        data: &RenewalOpportunityCreate,
    ) -> Result<bool, AppError> {
        tracing::debug!(
            tenant = %tenant,
            opportunity_id,
            contract_id = %data.contract_id,
            "OpportunityWriteRepository::create_renewal"
        );

        let cypher = format!(
            "MATCH (t:Tenant {{name:$tenant}})<-[:CONTRACT_BELONGS_TO_TENANT]-(c:Contract {{id:$contractId}})
             WHERE NOT (c)-[:ACTIVE_RENEWAL]->(:RenewalOpportunity)
             MERGE (c)-[:ACTIVE_RENEWAL]->(op:Opportunity {{id:$id}})
             ON CREATE SET op:{label},
                op:RenewalOpportunity,
                op.createdAt=$createdAt,
                op.updatedAt=$now,
                op.source=$source,
                op.sourceOfTruth=$sourceOfTruth,
                op.appSource=$appSource,
                op.internalType=$internalType,
                op.internalStage=$internalStage,
                op.renewalLikelihood=$renewalLikelihood,
                op.renewalApproved=$renewalApproved,
                op.renewedAt=$renewedAt,
                op.renewalAdjustedRate=$renewalAdjustedRate
             WITH c, op
             MERGE (c)-[:HAS_OPPORTUNITY]->(op)
             RETURN count(op) > 0 AS created",
            label = NodeLabel::Opportunity.tenant_label(tenant),
        );
        let now = cypher::now();

        let created = self
            .graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("id", opportunity_id)
            .param("contractId", &data.contract_id)
            .param("createdAt", cypher::timestamp(data.created_at).unwrap_or_else(|| now.clone()))
            .param("now", &now)
            .param("source", &data.source.source)
            .param("sourceOfTruth", data.source.source_of_truth())
            .param("appSource", data.source.app_source())
            .param("internalType", &data.internal_type)
            .param("internalStage", &data.internal_stage)
            .param("renewalLikelihood", &data.renewal_likelihood)
            .param("renewalApproved", data.renewal_approved)
            .param("renewedAt", cypher::timestamp(data.renewed_at))
            .param("renewalAdjustedRate", data.renewal_adjusted_rate)
            .fetch_value("created")
            .await?;
        Ok(created.unwrap_or(false))
    }

    /// Renewal fields are owned by the CRM and written unconditionally.
    pub async fn update_renewal(
        &self,
        tenant: &Tenant,
        opportunity_id: &str,
        patch: &RenewalPatch,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, opportunity_id, "OpportunityWriteRepository::update_renewal");

        let now = cypher::now();
        let mut set = SetClause::new("op");
        set.updated_at(&now).source_of_truth();
        if let Some(user_id) = &patch.updated_by_user_id {
            set.raw("op.renewalUpdatedByUserAt = $updatedAt, op.renewalUpdatedByUserId = $renewalUpdatedByUserId")
                .param("renewalUpdatedByUserId", user_id.as_str());
        }
        set.set("comments", patch.comments.clone())
            .set("amount", patch.amount)
            .set("renewalLikelihood", patch.renewal_likelihood.clone())
            .set("renewalApproved", patch.renewal_approved)
            .set("renewedAt", cypher::timestamp(patch.renewed_at))
            .set("renewalAdjustedRate", patch.renewal_adjusted_rate);
        let (assignments, params) = set.build();

        let cypher = format!(
            "MATCH (op:Opportunity {{id:$id}}) WHERE op:RenewalOpportunity AND op:{label}
             SET {assignments}",
            label = NodeLabel::Opportunity.tenant_label(tenant),
            assignments = assignments,
        );
        self.graph
            .query(cypher)
            .params(params)
            .param("id", opportunity_id)
            .param("sourceOfTruth", &patch.source)
            .param("overwrite", is_overwrite_source(&patch.source))
            .run()
            .await
    }

    /// Moves the renewal date of an open renewal opportunity.
    pub async fn update_next_renewal_date(
        &self,
        tenant: &Tenant,
        opportunity_id: &str,
        renewed_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, opportunity_id, "OpportunityWriteRepository::update_next_renewal_date");

        let cypher = format!(
            "MATCH (op:Opportunity {{id:$id}})
             WHERE op:RenewalOpportunity AND op:{label} AND op.internalStage=$internalStage
             SET op.updatedAt=$now, op.renewedAt=$renewedAt",
            label = NodeLabel::Opportunity.tenant_label(tenant),
        );
        self.graph
            .query(cypher)
            .param("id", opportunity_id)
            .param("internalStage", InternalStage::Open.as_str())
            .param("renewedAt", cypher::timestamp(renewed_at))
            .param("now", cypher::now())
            .run()
            .await
    }

    pub async fn close_won(&self, tenant: &Tenant, opportunity_id: &str, closed_at: DateTime<Utc>) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, opportunity_id, "OpportunityWriteRepository::close_won");
        self.close(tenant, opportunity_id, closed_at, InternalStage::ClosedWon)
            .await
    }

    pub async fn close_lost(&self, tenant: &Tenant, opportunity_id: &str, closed_at: DateTime<Utc>) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, opportunity_id, "OpportunityWriteRepository::close_lost");
        self.close(tenant, opportunity_id, closed_at, InternalStage::ClosedLost)
            .await
    }

    /// Closing detaches the opportunity from its contract's active renewal.
    /// Already closed opportunities are left untouched.
    async fn close(
        &self,
        tenant: &Tenant,
        opportunity_id: &str,
        closed_at: DateTime<Utc>,
        stage: InternalStage,
    ) -> Result<(), AppError> {
        let cypher = format!(
            "MATCH (op:Opportunity {{id:$id}})
             WHERE op:{label} AND op.internalStage <> $internalStage
             SET op.closedAt=$closedAt,
                op.internalStage=$internalStage,
                op.updatedAt=$now,
                op.stageUpdatedAt=$now
             WITH op
             OPTIONAL MATCH (op)<-[rel:ACTIVE_RENEWAL]-(:Contract)
             DELETE rel",
            label = NodeLabel::Opportunity.tenant_label(tenant),
        );
        self.graph
            .query(cypher)
            .param("id", opportunity_id)
            .param("closedAt", Timestamp::from(closed_at))
            .param("internalStage", stage.as_str())
            .param("now", cypher::now())
            .run()
            .await
    }

    pub async fn mark_renewal_requested(&self, tenant: &Tenant, opportunity_id: &str) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, opportunity_id, "OpportunityWriteRepository::mark_renewal_requested");

        let cypher = format!(
            "MATCH (op:Opportunity {{id:$id}}) WHERE op:{label}
             SET op.techRolloutRenewalRequestedAt=$now",
            label = NodeLabel::Opportunity.tenant_label(tenant),
        );
        self.graph
            .query(cypher)
            .param("id", opportunity_id)
            .param("now", cypher::now())
            .run()
            .await
    }

    /// Swaps the opportunity labels for `ArchivedOpportunity`.
    pub async fn archive(&self, tenant: &Tenant, opportunity_id: &str) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, opportunity_id, "OpportunityWriteRepository::archive");

        let label = NodeLabel::Opportunity;
        let cypher = format!(
            "MATCH (:Tenant {{name:$tenant}})<-[:OPPORTUNITY_BELONGS_TO_TENANT]-(op:Opportunity {{id:$id}})
             WHERE op:{active_tenant}
             SET op.updatedAt=$now, op:{archived}:{archived_tenant}
             REMOVE op:{active}:{active_tenant}",
            active = label,
            active_tenant = label.tenant_label(tenant),
            archived = "ArchivedOpportunity",
            archived_tenant = tenant.label("ArchivedOpportunity"),
        );
        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("id", opportunity_id)
            .param("now", cypher::now())
            .run()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::mock::MockExecutor;
    use crate::graph::Row;
    use crate::models::SourceFields;
    use serde_json::json;
    use std::sync::Arc;

    fn tenant() -> Tenant {
        Tenant::new("acme").unwrap()
    }

    #[tokio::test]
    async fn test_update_writes_internal_stage_unconditionally() {
        let mock = Arc::new(MockExecutor::new());
        let repo = OpportunityWriteRepository::new(mock.clone());
        let patch = OpportunityPatch {
            source: "hubspot".into(),
            name: Some("Expansion".into()),
            amount: Some(1200.0),
            internal_stage: Some("CLOSED_WON".into()),
            ..Default::default()
        };

        repo.update_opportunity(&tenant(), "op1", &patch).await.unwrap();

        let call = mock.last_call();
        assert!(call.cypher.contains("WHERE op:Opportunity_acme"));
        assert!(call.cypher.contains("OR op.name = '' THEN $name"));
        assert!(call.cypher.contains("op.internalStage = $internalStage"));
        assert!(call
            .cypher
            .contains("op.amount = CASE WHEN op.sourceOfTruth=$sourceOfTruth OR $overwrite=true THEN $amount"));
        assert!(!call.cypher.contains("op.currency"));
        assert_eq!(call.params["amount"], json!(1200.0));
    }

    #[tokio::test]
    async fn test_create_renewal_reports_skip() {
        let mock = Arc::new(MockExecutor::new().with_rows(vec![Row::from([("created", json!(false))])]));
        let repo = OpportunityWriteRepository::new(mock.clone());
        let data = RenewalOpportunityCreate {
            contract_id: "ct1".into(),
            internal_type: "RENEWAL".into(),
            internal_stage: "OPEN".into(),
            source: SourceFields::openline(),
            ..Default::default()
        };

        assert!(!repo.create_renewal(&tenant(), "op2", &data).await.unwrap());
        let cypher = mock.last_call().cypher;
        assert!(cypher.contains("WHERE NOT (c)-[:ACTIVE_RENEWAL]->(:RenewalOpportunity)"));
        assert!(cypher.contains("op:RenewalOpportunity"));
    }

    #[tokio::test]
    async fn test_close_won_detaches_active_renewal() {
        let mock = Arc::new(MockExecutor::new());
        let repo = OpportunityWriteRepository::new(mock.clone());

        repo.close_won(&tenant(), "op1", Utc::now()).await.unwrap();

        let call = mock.last_call();
        assert!(call.cypher.contains("op.internalStage <> $internalStage"));
        assert!(call.cypher.contains("OPTIONAL MATCH (op)<-[rel:ACTIVE_RENEWAL]-(:Contract)"));
        assert_eq!(call.params["internalStage"], json!("CLOSED_WON"));
    }

    #[tokio::test]
    async fn test_update_renewal_records_user() {
        let mock = Arc::new(MockExecutor::new());
        let repo = OpportunityWriteRepository::new(mock.clone());
        let patch = RenewalPatch {
            source: "openline".into(),
            updated_by_user_id: Some("u1".into()),
            renewal_likelihood: Some("LOW".into()),
            ..Default::default()
        };

        repo.update_renewal(&tenant(), "op1", &patch).await.unwrap();

        let call = mock.last_call();
        assert!(call.cypher.contains("op.renewalUpdatedByUserId = $renewalUpdatedByUserId"));
        assert!(call.cypher.contains("op.renewalLikelihood = $renewalLikelihood"));
        assert_eq!(call.params["overwrite"], json!(true));
    }

    #[tokio::test]
    async fn test_archive_swaps_labels() {
        let mock = Arc::new(MockExecutor::new());
        let repo = OpportunityWriteRepository::new(mock.clone());

        repo.archive(&tenant(), "op1").await.unwrap();

        let cypher = mock.last_call().cypher;
        assert!(cypher.contains("op:ArchivedOpportunity:ArchivedOpportunity_acme"));
        assert!(cypher.contains("REMOVE op:Opportunity:Opportunity_acme"));
    }
}
