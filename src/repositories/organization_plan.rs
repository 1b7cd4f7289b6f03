//! Organization plans and their milestones.
//!
//! Milestone items are stored as a list of JSON strings on the milestone
//! node.

use crate::context::{AppGraph, Context};
use crate::cypher::{self, SetClause};
use crate::di::FromContext;
use crate::error::AppError;
use crate::graph::QueryExt;
use crate::models::{
    Linked, MilestoneCreate, MilestoneItem, MilestonePatch, NodeLabel, OrganizationPlan,
    OrganizationPlanCreate, OrganizationPlanMilestone, OrganizationPlanPatch, StatusDetails,
};
use crate::tenant::Tenant;

fn encode_items(items: &[MilestoneItem]) -> Result<Vec<String>, AppError> {
    items
        .iter()
        .map(|item| {
            serde_json::to_string(item)
                .map_err(|e| AppError::Internal(format!("failed to encode milestone item: {}", e)))
        })
        .collect()
}

fn set_status(set: &mut SetClause, status: Option<&StatusDetails>) {
    if let Some(status) = status {
        set.set("status", Some(status.status.clone()))
            .set("statusComments", Some(status.comments.clone()))
            .set(
                "statusUpdatedAt",
                Some(cypher::timestamp(status.updated_at).unwrap_or_else(cypher::now)),
            );
    }
}

#[derive(FromContext, Clone)]
pub struct OrganizationPlanReadRepository {
    graph: AppGraph,
}

impl OrganizationPlanReadRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    pub async fn get_plan(&self, tenant: &Tenant, plan_id: &str) -> Result<Option<OrganizationPlan>, AppError> {
        tracing::debug!(tenant = %tenant, plan_id, "OrganizationPlanReadRepository::get_plan");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:ORGANIZATION_PLAN_BELONGS_TO_TENANT]-(op:OrganizationPlan {id:$id})
                 RETURN op {.*} AS op",
            )
            .param("tenant", tenant.as_str())
            .param("id", plan_id)
            .fetch_value("op")
            .await
    }

    pub async fn get_milestone(
        &self,
        tenant: &Tenant,
        milestone_id: &str,
    ) -> Result<Option<OrganizationPlanMilestone>, AppError> {
        tracing::debug!(tenant = %tenant, milestone_id, "OrganizationPlanReadRepository::get_milestone");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:ORGANIZATION_PLAN_BELONGS_TO_TENANT]-(:OrganizationPlan)-[:HAS_MILESTONE]->(m:OrganizationPlanMilestone {id:$id})
                 RETURN m {.*} AS m",
            )
            .param("tenant", tenant.as_str())
            .param("id", milestone_id)
            .fetch_value("m")
            .await
    }

    /// Active milestones of a plan, required ones first, then by order.
    pub async fn get_milestones_for_plan(
        &self,
        tenant: &Tenant,
        plan_id: &str,
    ) -> Result<Vec<OrganizationPlanMilestone>, AppError> {
        tracing::debug!(tenant = %tenant, plan_id, "OrganizationPlanReadRepository::get_milestones_for_plan");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:ORGANIZATION_PLAN_BELONGS_TO_TENANT]-(:OrganizationPlan {id:$id})-[:HAS_MILESTONE]->(m:OrganizationPlanMilestone)
                 WHERE m.retired IS NULL OR m.retired = false
                 RETURN m {.*} AS m ORDER BY m.optional, m.order",
            )
            .param("tenant", tenant.as_str())
            .param("id", plan_id)
            .fetch_column("m")
            .await
    }

    /// Milestones of several plans, retired ones included.
    pub async fn get_milestones_for_plans(
        &self,
        tenant: &Tenant,
        plan_ids: &[String],
    ) -> Result<Vec<Linked<OrganizationPlanMilestone>>, AppError> {
        tracing::debug!(
            tenant = %tenant,
            count = plan_ids.len(),
            "OrganizationPlanReadRepository::get_milestones_for_plans"
        );

        let rows = self
            .graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:ORGANIZATION_PLAN_BELONGS_TO_TENANT]-(op:OrganizationPlan)-[:HAS_MILESTONE]->(m:OrganizationPlanMilestone)
                 WHERE op.id IN $ids
                 RETURN m {.*} AS m, op.id AS linkedId ORDER BY m.optional, m.order",
            )
            .param("tenant", tenant.as_str())
            .param("ids", plan_ids)
            .fetch_all()
            .await?;

        rows.iter()
            .map(|row| -> Result<Linked<OrganizationPlanMilestone>, AppError> {
                Ok(Linked {
                    node: row.get("m")?,
                    linked_id: row.get("linkedId")?,
                })
            })
            .collect()
    }

    pub async fn get_plans_for_organization(
        &self,
        tenant: &Tenant,
        organization_id: &str,
    ) -> Result<Vec<OrganizationPlan>, AppError> {
        tracing::debug!(tenant = %tenant, organization_id, "OrganizationPlanReadRepository::get_plans_for_organization");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:ORGANIZATION_PLAN_BELONGS_TO_TENANT]-(op:OrganizationPlan)-[:ORGANIZATION_PLAN_BELONGS_TO_ORGANIZATION]->(:Organization {id:$organizationId})
                 RETURN op {.*} AS op ORDER BY op.createdAt",
            )
            .param("tenant", tenant.as_str())
            .param("organizationId", organization_id)
            .fetch_column("op")
            .await
    }

    /// Highest order among active milestones, or -1 when there are none.
    pub async fn get_max_milestone_order(&self, tenant: &Tenant, plan_id: &str) -> Result<i64, AppError> {
        tracing::debug!(tenant = %tenant, plan_id, "OrganizationPlanReadRepository::get_max_milestone_order");

        let max = self
            .graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:ORGANIZATION_PLAN_BELONGS_TO_TENANT]-(:OrganizationPlan {id:$id})-[:HAS_MILESTONE]->(m:OrganizationPlanMilestone)
                 WHERE m.retired IS NULL OR m.retired = false
                 RETURN coalesce(max(m.order), -1) AS maxOrder",
            )
            .param("tenant", tenant.as_str())
            .param("id", plan_id)
            .fetch_value("maxOrder")
            .await?;
        Ok(max.unwrap_or(-1))
    }
}

#[derive(FromContext, Clone)]
pub struct OrganizationPlanWriteRepository {
    graph: AppGraph,
}

impl OrganizationPlanWriteRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    pub async fn create_plan(
        &self,
        tenant: &Tenant,
        plan_id: &str,
        data: &OrganizationPlanCreate,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, plan_id, "OrganizationPlanWriteRepository::create_plan");

        let cypher = format!(
            "MATCH (t:Tenant {{name:$tenant}})
             MERGE (t)<-[:ORGANIZATION_PLAN_BELONGS_TO_TENANT]-(op:OrganizationPlan {{id:$id}})
             ON CREATE SET op:{label},
                op.createdAt=$createdAt,
                op.updatedAt=$now,
                op.source=$source,
                op.sourceOfTruth=$sourceOfTruth,
                op.appSource=$appSource,
                op.name=$name,
                op.status=$status,
                op.statusComments=$statusComments,
                op.statusUpdatedAt=$statusUpdatedAt,
                op.masterPlanId=$masterPlanId",
            label = NodeLabel::OrganizationPlan.tenant_label(tenant),
        );
        let now = cypher::now();

        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("id", plan_id)
            .param("createdAt", cypher::timestamp(data.created_at).unwrap_or_else(|| now.clone()))
            .param("source", &data.source.source)
            .param("sourceOfTruth", data.source.source_of_truth())
            .param("appSource", data.source.app_source())
            .param("name", &data.name)
            .param("status", &data.status.status)
            .param("statusComments", &data.status.comments)
            .param(
                "statusUpdatedAt",
                cypher::timestamp(data.status.updated_at).unwrap_or_else(|| now.clone()),
            )
            .param("masterPlanId", &data.master_plan_id)
            .param("now", &now)
            .run()
            .await
    }

    pub async fn update_plan(
        &self,
        tenant: &Tenant,
        plan_id: &str,
        patch: &OrganizationPlanPatch,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, plan_id, "OrganizationPlanWriteRepository::update_plan");

        let mut set = SetClause::new("op");
        set.set("name", patch.name.clone()).set("retired", patch.retired);
        set_status(&mut set, patch.status.as_ref());
        set.updated_at(&cypher::now());
        let (assignments, params) = set.build();

        self.graph
            .query(format!(
                "MATCH (:Tenant {{name:$tenant}})<-[:ORGANIZATION_PLAN_BELONGS_TO_TENANT]-(op:OrganizationPlan {{id:$planId}})
                 SET {}",
                assignments
            ))
            .params(params)
            .param("tenant", tenant.as_str())
            .param("planId", plan_id)
            .run()
            .await
    }

    pub async fn create_milestone(
        &self,
        tenant: &Tenant,
        plan_id: &str,
        milestone_id: &str,
        data: &MilestoneCreate,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, plan_id, milestone_id, "OrganizationPlanWriteRepository::create_milestone");

        let cypher = format!(
            "MATCH (:Tenant {{name:$tenant}})<-[:ORGANIZATION_PLAN_BELONGS_TO_TENANT]-(op:OrganizationPlan {{id:$planId}})
             MERGE (op)-[:HAS_MILESTONE]->(m:OrganizationPlanMilestone {{id:$milestoneId}})
             ON CREATE SET m:{label},
                m.createdAt=$createdAt,
                m.updatedAt=$now,
                m.source=$source,
                m.sourceOfTruth=$sourceOfTruth,
                m.appSource=$appSource,
                m.name=$name,
                m.order=$order,
                m.optional=$optional,
                m.items=$items,
                m.status=$status,
                m.statusComments=$statusComments,
                m.statusUpdatedAt=$statusUpdatedAt,
                m.dueDate=$dueDate,
                m.adhoc=$adhoc",
            label = NodeLabel::OrganizationPlanMilestone.tenant_label(tenant),
        );
        let now = cypher::now();

        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("planId", plan_id)
            .param("milestoneId", milestone_id)
            .param("createdAt", cypher::timestamp(data.created_at).unwrap_or_else(|| now.clone()))
            .param("source", &data.source.source)
            .param("sourceOfTruth", data.source.source_of_truth())
            .param("appSource", data.source.app_source())
            .param("name", &data.name)
            .param("order", data.order)
            .param("optional", data.optional)
            .param("items", encode_items(&data.items)?)
            .param("status", &data.status.status)
            .param("statusComments", &data.status.comments)
            .param(
                "statusUpdatedAt",
                cypher::timestamp(data.status.updated_at).unwrap_or_else(|| now.clone()),
            )
            .param("dueDate", cypher::timestamp(data.due_date))
            .param("adhoc", data.adhoc)
            .param("now", &now)
            .run()
            .await
    }

    pub async fn update_milestone(
        &self,
        tenant: &Tenant,
        plan_id: &str,
        milestone_id: &str,
        patch: &MilestonePatch,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, plan_id, milestone_id, "OrganizationPlanWriteRepository::update_milestone");

        let items = patch.items.as_deref().map(encode_items).transpose()?;
        let mut set = SetClause::new("m");
        set.set("name", patch.name.clone())
            .set("order", patch.order)
            .set("items", items)
            .set("optional", patch.optional)
            .set("retired", patch.retired)
            .set("adhoc", patch.adhoc)
            .set("dueDate", cypher::timestamp(patch.due_date));
        set_status(&mut set, patch.status.as_ref());
        set.updated_at(&cypher::now());
        let (assignments, params) = set.build();

        self.graph
            .query(format!(
                "MATCH (:Tenant {{name:$tenant}})<-[:ORGANIZATION_PLAN_BELONGS_TO_TENANT]-(:OrganizationPlan {{id:$planId}})-[:HAS_MILESTONE]->(m:OrganizationPlanMilestone {{id:$milestoneId}})
                 SET {}",
                assignments
            ))
            .params(params)
            .param("tenant", tenant.as_str())
            .param("planId", plan_id)
            .param("milestoneId", milestone_id)
            .run()
            .await
    }

    pub async fn link_with_organization(
        &self,
        tenant: &Tenant,
        plan_id: &str,
        organization_id: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, plan_id, organization_id, "OrganizationPlanWriteRepository::link_with_organization");

        self.graph
            .query(
                "MATCH (t:Tenant {name:$tenant})<-[:ORGANIZATION_PLAN_BELONGS_TO_TENANT]-(op:OrganizationPlan {id:$planId})
                 MATCH (t)<-[:ORGANIZATION_BELONGS_TO_TENANT]-(o:Organization {id:$organizationId})
                 MERGE (op)-[:ORGANIZATION_PLAN_BELONGS_TO_ORGANIZATION]->(o)",
            )
            .param("tenant", tenant.as_str())
            .param("planId", plan_id)
            .param("organizationId", organization_id)
            .run()
            .await
    }

    pub async fn link_with_master_plan(
        &self,
        tenant: &Tenant,
        plan_id: &str,
        master_plan_id: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, plan_id, master_plan_id, "OrganizationPlanWriteRepository::link_with_master_plan");

        self.graph
            .query(
                "MATCH (t:Tenant {name:$tenant})<-[:ORGANIZATION_PLAN_BELONGS_TO_TENANT]-(op:OrganizationPlan {id:$planId})
                 MATCH (t)<-[:MASTER_PLAN_BELONGS_TO_TENANT]-(mp:MasterPlan {id:$masterPlanId})
                 MERGE (op)-[:ORGANIZATION_PLAN_BELONGS_TO_MASTER_PLAN]->(mp)",
            )
            .param("tenant", tenant.as_str())
            .param("planId", plan_id)
            .param("masterPlanId", master_plan_id)
            .run()
            .await
    }
}
