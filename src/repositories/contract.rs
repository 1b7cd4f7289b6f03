//! Contract reads and writes.

use chrono::{DateTime, Utc};

use crate::context::{AppGraph, Context};
use crate::cypher::{self, SetClause};
use crate::di::FromContext;
use crate::error::AppError;
use crate::graph::QueryExt;
use crate::models::{is_overwrite_source, Contract, ContractCreate, ContractPatch, InternalStage, Linked, NodeLabel};
use crate::tenant::Tenant;

#[derive(FromContext, Clone)]
pub struct ContractReadRepository {
    graph: AppGraph,
}

impl ContractReadRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    pub async fn get_contract(&self, tenant: &Tenant, contract_id: &str) -> Result<Option<Contract>, AppError> {
        tracing::debug!(tenant = %tenant, contract_id, "ContractReadRepository::get_contract");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:CONTRACT_BELONGS_TO_TENANT]-(c:Contract {id:$id})
                 RETURN c {.*} AS c",
            )
            .param("tenant", tenant.as_str())
            .param("id", contract_id)
            .fetch_value("c")
            .await
    }

    pub async fn get_contract_by_service_line_item_id(
        &self,
        tenant: &Tenant,
        service_line_item_id: &str,
    ) -> Result<Option<Contract>, AppError> {
        tracing::debug!(
            tenant = %tenant,
            service_line_item_id,
            "ContractReadRepository::get_contract_by_service_line_item_id"
        );

        self.graph
            .query(
                "MATCH (:ServiceLineItem {id:$id})<-[:HAS_SERVICE]-(c:Contract)-[:CONTRACT_BELONGS_TO_TENANT]->(:Tenant {name:$tenant})
                 RETURN c {.*} AS c LIMIT 1",
            )
            .param("tenant", tenant.as_str())
            .param("id", service_line_item_id)
            .fetch_value("c")
            .await
    }

    pub async fn get_contract_by_opportunity_id(
        &self,
        tenant: &Tenant,
        opportunity_id: &str,
    ) -> Result<Option<Contract>, AppError> {
        tracing::debug!(tenant = %tenant, opportunity_id, "ContractReadRepository::get_contract_by_opportunity_id");

        let cypher = format!(
            "MATCH (:Opportunity {{id:$id}})<-[:HAS_OPPORTUNITY]-(c:Contract:{label})-[:CONTRACT_BELONGS_TO_TENANT]->(:Tenant {{name:$tenant}})
             RETURN c {{.*}} AS c LIMIT 1",
            label = NodeLabel::Contract.tenant_label(tenant),
        );
        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("id", opportunity_id)
            .fetch_value("c")
            .await
    }

    /// Contracts of the given organizations, newest first, each paired with
    /// its organization id.
    pub async fn get_contracts_for_organizations(
        &self,
        tenant: &Tenant,
        organization_ids: &[String],
    ) -> Result<Vec<Linked<Contract>>, AppError> {
        tracing::debug!(
            tenant = %tenant,
            count = organization_ids.len(),
            "ContractReadRepository::get_contracts_for_organizations"
        );

        let rows = self
            .graph
            .query(
                "MATCH (t:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(o:Organization)
                       -[:HAS_CONTRACT]->(c:Contract)-[:CONTRACT_BELONGS_TO_TENANT]->(t)
                 WHERE o.id IN $organizationIds
                 RETURN c {.*} AS c, o.id AS linkedId
                 ORDER BY c.createdAt DESC",
            )
            .param("tenant", tenant.as_str())
            .param("organizationIds", organization_ids)
            .fetch_all()
            .await?;

        rows.iter()
            .map(|row| -> Result<Linked<Contract>, AppError> {
                Ok(Linked {
                    node: row.get("c")?,
                    linked_id: row.get("linkedId")?,
                })
            })
            .collect()
    }

    pub async fn tenant_has_contract(&self, tenant: &Tenant) -> Result<bool, AppError> {
        tracing::debug!(tenant = %tenant, "ContractReadRepository::tenant_has_contract");

        let found = self
            .graph
            .query(
                "MATCH (c:Contract)-[:CONTRACT_BELONGS_TO_TENANT]->(:Tenant {name:$tenant})
                 RETURN count(c) > 0 AS found",
            )
            .param("tenant", tenant.as_str())
            .fetch_value("found")
            .await?;
        Ok(found.unwrap_or(false))
    }

    /// Number of contracts with an active renewal opportunity.
    pub async fn count_contracts(&self, tenant: &Tenant) -> Result<i64, AppError> {
        tracing::debug!(tenant = %tenant, "ContractReadRepository::count_contracts");

        let count = self
            .graph
            .query(
                "MATCH (c:Contract)-[:CONTRACT_BELONGS_TO_TENANT]->(:Tenant {name:$tenant})
                 MATCH (c)-[:ACTIVE_RENEWAL]->(:Opportunity)
                 RETURN count(c) AS count",
            )
            .param("tenant", tenant.as_str())
            .fetch_value("count")
            .await?;
        Ok(count.unwrap_or(0))
    }
}

#[derive(FromContext, Clone)]
pub struct ContractWriteRepository {
    graph: AppGraph,
}

impl ContractWriteRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    /// Merges the contract under its organization. The creating user is
    /// linked when it exists in the tenant.
    pub async fn create_for_organization(
        &self,
        tenant: &Tenant,
        contract_id: &str,
        data: &ContractCreate,
    ) -> Result<(), AppError> {
        tracing::debug!(
            tenant = %tenant,
            contract_id,
            organization_id = %data.organization_id,
            "ContractWriteRepository::create_for_organization"
        );

        let cypher = format!(
            "MATCH (t:Tenant {{name:$tenant}})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization {{id:$organizationId}})
             MERGE (t)<-[:CONTRACT_BELONGS_TO_TENANT]-(ct:Contract {{id:$id}})<-[:HAS_CONTRACT]-(org)
             ON CREATE SET ct:{label},
                ct.createdAt=$createdAt,
                ct.updatedAt=$now,
                ct.source=$source,
                ct.sourceOfTruth=$sourceOfTruth,
                ct.appSource=$appSource,
                ct.name=$name,
                ct.contractUrl=$contractUrl,
                ct.status=$status,
                ct.renewalCycle=$renewalCycle,
                ct.renewalPeriods=$renewalPeriods,
                ct.signedAt=$signedAt,
                ct.serviceStartedAt=$serviceStartedAt
             WITH ct, t
             OPTIONAL MATCH (t)<-[:USER_BELONGS_TO_TENANT]-(u:User {{id:$createdByUserId}})
             WHERE $createdByUserId <> ''
             FOREACH (ignore IN CASE WHEN u IS NOT NULL THEN [1] ELSE [] END |
                MERGE (ct)-[:CREATED_BY]->(u))",
            label = NodeLabel::Contract.tenant_label(tenant),
        );
        let now = cypher::now();

        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("id", contract_id)
            .param("organizationId", &data.organization_id)
            .param("createdAt", cypher::timestamp(data.created_at).unwrap_or_else(|| now.clone()))
            .param("now", &now)
            .param("source", &data.source.source)
            .param("sourceOfTruth", data.source.source_of_truth())
            .param("appSource", data.source.app_source())
            .param("name", &data.name)
            .param("contractUrl", &data.contract_url)
            .param("status", &data.status)
            .param("renewalCycle", &data.renewal_cycle)
            .param("renewalPeriods", data.renewal_periods)
            .param("signedAt", cypher::timestamp(data.signed_at))
            .param("serviceStartedAt", cypher::timestamp(data.service_started_at))
            .param("createdByUserId", data.created_by_user_id.as_deref().unwrap_or(""))
            .run()
            .await
    }

    /// Applies the `Some` fields of `patch` and returns the stored contract,
    /// or `None` when it does not exist.
    pub async fn update_and_return(
        &self,
        tenant: &Tenant,
        contract_id: &str,
        patch: &ContractPatch,
    ) -> Result<Option<Contract>, AppError> {
        tracing::debug!(tenant = %tenant, contract_id, "ContractWriteRepository::update_and_return");

        let mut set = SetClause::new("ct");
        set.set_gated("name", patch.name.clone())
            .set_gated("contractUrl", patch.contract_url.clone())
            .set_owned("signedAt", cypher::timestamp(patch.signed_at))
            .set_owned("endedAt", cypher::timestamp(patch.ended_at))
            .set_owned("serviceStartedAt", cypher::timestamp(patch.service_started_at))
            .set_owned("status", patch.status.clone())
            .set_owned("renewalCycle", patch.renewal_cycle.clone())
            .set_owned("renewalPeriods", patch.renewal_periods)
            .updated_at(&cypher::now())
            .source_of_truth();
        let (assignments, params) = set.build();

        let cypher = format!(
            "MATCH (:Tenant {{name:$tenant}})<-[:CONTRACT_BELONGS_TO_TENANT]-(ct:Contract {{id:$id}})
             SET {}
             RETURN ct {{.*}} AS ct",
            assignments
        );
        self.graph
            .query(cypher)
            .params(params)
            .param("tenant", tenant.as_str())
            .param("id", contract_id)
            .param("sourceOfTruth", &patch.source)
            .param("overwrite", is_overwrite_source(&patch.source))
            .fetch_value("ct")
            .await
    }

    /// Sets the status with its date range. Absent dates are cleared.
    pub async fn update_status(
        &self,
        tenant: &Tenant,
        contract_id: &str,
        status: &str,
        service_started_at: Option<DateTime<Utc>>,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, contract_id, status, "ContractWriteRepository::update_status");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:CONTRACT_BELONGS_TO_TENANT]-(ct:Contract {id:$id})
                 SET ct.status=$status,
                    ct.serviceStartedAt=$serviceStartedAt,
                    ct.endedAt=$endedAt,
                    ct.updatedAt=$now",
            )
            .param("tenant", tenant.as_str())
            .param("id", contract_id)
            .param("status", status)
            .param("serviceStartedAt", cypher::timestamp(service_started_at))
            .param("endedAt", cypher::timestamp(ended_at))
            .param("now", cypher::now())
            .run()
            .await
    }

    /// Moves the active renewal to `SUSPENDED_RENEWAL` and marks it suspended.
    pub async fn suspend_active_renewal_opportunity(&self, tenant: &Tenant, contract_id: &str) -> Result<(), AppError> {
        tracing::debug!(
            tenant = %tenant,
            contract_id,
            "ContractWriteRepository::suspend_active_renewal_opportunity"
        );

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:CONTRACT_BELONGS_TO_TENANT]-(ct:Contract {id:$id})
                       -[r:ACTIVE_RENEWAL]->(op:RenewalOpportunity)
                 SET op.internalStage=$internalStage, op.updatedAt=$now
                 MERGE (ct)-[:SUSPENDED_RENEWAL]->(op)
                 DELETE r",
            )
            .param("tenant", tenant.as_str())
            .param("id", contract_id)
            .param("internalStage", InternalStage::Suspended.as_str())
            .param("now", cypher::now())
            .run()
            .await
    }

    /// Reverse of [`suspend_active_renewal_opportunity`](Self::suspend_active_renewal_opportunity).
    pub async fn activate_suspended_renewal_opportunity(
        &self,
        tenant: &Tenant,
        contract_id: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(
            tenant = %tenant,
            contract_id,
            "ContractWriteRepository::activate_suspended_renewal_opportunity"
        );

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:CONTRACT_BELONGS_TO_TENANT]-(ct:Contract {id:$id})
                       -[r:SUSPENDED_RENEWAL]->(op:RenewalOpportunity)
                 SET op.internalStage=$internalStage, op.updatedAt=$now
                 MERGE (ct)-[:ACTIVE_RENEWAL]->(op)
                 DELETE r",
            )
            .param("tenant", tenant.as_str())
            .param("id", contract_id)
            .param("internalStage", InternalStage::Open.as_str())
            .param("now", cypher::now())
            .run()
            .await
    }

    pub async fn mark_onboarding_status_changed(&self, tenant: &Tenant, contract_id: &str) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, contract_id, "ContractWriteRepository::mark_onboarding_status_changed");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:CONTRACT_BELONGS_TO_TENANT]-(ct:Contract {id:$id})
                 SET ct.triggeredOnboardingStatusChange=true",
            )
            .param("tenant", tenant.as_str())
            .param("id", contract_id)
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
    async fn test_get_contract_by_opportunity_uses_tenant_label() {
        let mock = Arc::new(MockExecutor::new().with_rows(vec![Row::from([(
            "c",
            json!({"id": "ct1", "status": "LIVE", "renewalPeriods": 2}),
        )])]));
        let repo = ContractReadRepository::new(mock.clone());

        let contract = repo
            .get_contract_by_opportunity_id(&tenant(), "op1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(contract.status.as_deref(), Some("LIVE"));
        assert_eq!(contract.renewal_periods, Some(2));
        assert!(mock.last_call().cypher.contains("(c:Contract:Contract_acme)"));
    }

    #[tokio::test]
    async fn test_tenant_has_contract_without_rows() {
        let mock = Arc::new(MockExecutor::new());
        let repo = ContractReadRepository::new(mock);

        assert!(!repo.tenant_has_contract(&tenant()).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_for_organization() {
        let mock = Arc::new(MockExecutor::new());
        let repo = ContractWriteRepository::new(mock.clone());
        let data = ContractCreate {
            organization_id: "o1".into(),
            name: "MSA".into(),
            status: "DRAFT".into(),
            source: SourceFields::openline(),
            ..Default::default()
        };

        repo.create_for_organization(&tenant(), "ct1", &data).await.unwrap();

        let call = mock.last_call();
        assert!(call.cypher.contains("ON CREATE SET ct:Contract_acme"));
        assert!(call.cypher.contains("MERGE (ct)-[:CREATED_BY]->(u)"));
        assert_eq!(call.params["createdByUserId"], json!(""));
        assert_eq!(call.params["signedAt"], json!(null));
        assert_eq!(call.params["organizationId"], json!("o1"));
    }

    #[tokio::test]
    async fn test_update_and_return() {
        let mock = Arc::new(MockExecutor::new().with_rows(vec![Row::from([(
            "ct",
            json!({"id": "ct1", "status": "LIVE"}),
        )])]));
        let repo = ContractWriteRepository::new(mock.clone());
        let patch = ContractPatch {
            source: "hubspot".into(),
            status: Some("LIVE".into()),
            ..Default::default()
        };

        let contract = repo.update_and_return(&tenant(), "ct1", &patch).await.unwrap();
        assert_eq!(contract.unwrap().status.as_deref(), Some("LIVE"));

        let call = mock.last_call();
        assert!(call.cypher.contains(
            "ct.status = CASE WHEN ct.sourceOfTruth=$sourceOfTruth OR $overwrite=true THEN $status ELSE ct.status END"
        ));
        assert!(!call.cypher.contains("ct.name"));
        assert_eq!(call.params["overwrite"], json!(false));
    }

    #[tokio::test]
    async fn test_suspend_moves_relationship() {
        let mock = Arc::new(MockExecutor::new());
        let repo = ContractWriteRepository::new(mock.clone());

        repo.suspend_active_renewal_opportunity(&tenant(), "ct1").await.unwrap();

        let call = mock.last_call();
        assert!(call.cypher.contains("MERGE (ct)-[:SUSPENDED_RENEWAL]->(op)"));
        assert_eq!(call.params["internalStage"], json!("SUSPENDED"));
    }
}
