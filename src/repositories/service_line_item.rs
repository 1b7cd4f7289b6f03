//! Service line item reads.

use crate::context::{AppGraph, Context};
use crate::di::FromContext;
use crate::error::AppError;
use crate::graph::QueryExt;
use crate::models::{Linked, NodeLabel, ServiceLineItem};
use crate::tenant::Tenant;

#[derive(FromContext, Clone)]
pub struct ServiceLineItemRepository {
    graph: AppGraph,
}

impl ServiceLineItemRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    pub async fn get_service_line_item(
        &self,
        tenant: &Tenant,
        service_line_item_id: &str,
    ) -> Result<Option<ServiceLineItem>, AppError> {
        tracing::debug!(tenant = %tenant, service_line_item_id, "ServiceLineItemRepository::get_service_line_item");

        let cypher = format!(
            "MATCH (sli:ServiceLineItem:{label} {{id:$id}}) RETURN sli {{.*}} AS sli",
            label = NodeLabel::ServiceLineItem.tenant_label(tenant),
        );
        self.graph
            .query(cypher)
            .param("id", service_line_item_id)
            .fetch_value("sli")
            .await
    }

    /// Every version of a line, ordered by start date.
    pub async fn get_by_parent_id(&self, tenant: &Tenant, parent_id: &str) -> Result<Vec<ServiceLineItem>, AppError> {
        tracing::debug!(tenant = %tenant, parent_id, "ServiceLineItemRepository::get_by_parent_id");

        let cypher = format!(
            "MATCH (:Tenant {{name:$tenant}})<-[:CONTRACT_BELONGS_TO_TENANT]-(:Contract)-[:HAS_SERVICE]->(sli:ServiceLineItem {{parentId:$parentId}})
             WHERE sli:{label}
             RETURN sli {{.*}} AS sli ORDER BY sli.startedAt",
            label = NodeLabel::ServiceLineItem.tenant_label(tenant),
        );
        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("parentId", parent_id)
            .fetch_column("sli")
            .await
    }

    pub async fn get_for_contract(&self, tenant: &Tenant, contract_id: &str) -> Result<Vec<ServiceLineItem>, AppError> {
        tracing::debug!(tenant = %tenant, contract_id, "ServiceLineItemRepository::get_for_contract");

        let cypher = format!(
            "MATCH (:Tenant {{name:$tenant}})<-[:CONTRACT_BELONGS_TO_TENANT]-(:Contract {{id:$contractId}})-[:HAS_SERVICE]->(sli:ServiceLineItem)
             WHERE sli:{label}
             RETURN sli {{.*}} AS sli ORDER BY sli.createdAt ASC",
            label = NodeLabel::ServiceLineItem.tenant_label(tenant),
        );
        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("contractId", contract_id)
            .fetch_column("sli")
            .await
    }

    pub async fn get_for_contracts(
        &self,
        tenant: &Tenant,
        contract_ids: &[String],
    ) -> Result<Vec<Linked<ServiceLineItem>>, AppError> {
        tracing::debug!(
            tenant = %tenant,
            count = contract_ids.len(),
            "ServiceLineItemRepository::get_for_contracts"
        );

        let cypher = format!(
            "MATCH (:Tenant {{name:$tenant}})<-[:CONTRACT_BELONGS_TO_TENANT]-(c:Contract)-[:HAS_SERVICE]->(sli:ServiceLineItem)
             WHERE c.id IN $ids AND sli:{label}
             RETURN sli {{.*}} AS sli, c.id AS linkedId ORDER BY sli.createdAt ASC",
            label = NodeLabel::ServiceLineItem.tenant_label(tenant),
        );
        let rows = self
            .graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("ids", contract_ids)
            .fetch_all()
            .await?;

        rows.iter()
            .map(|row| -> Result<Linked<ServiceLineItem>, AppError> {
                Ok(Linked {
                    node: row.get("sli")?,
                    linked_id: row.get("linkedId")?,
                })
            })
            .collect()
    }

    /// True when a non-dry-run invoice has a line billing this item.
    pub async fn was_invoiced(&self, tenant: &Tenant, service_line_item_id: &str) -> Result<bool, AppError> {
        tracing::debug!(tenant = %tenant, service_line_item_id, "ServiceLineItemRepository::was_invoiced");

        let cypher = format!(
            "MATCH (sli:ServiceLineItem:{label} {{id:$id}})<-[:INVOICED]-(:InvoiceLine)--(:Invoice {{dryRun:false}})
             RETURN count(sli) > 0 AS invoiced",
            label = NodeLabel::ServiceLineItem.tenant_label(tenant),
        );
        let invoiced = self
            .graph
            .query(cypher)
            .param("id", service_line_item_id)
            .fetch_value("invoiced")
            .await?;
        Ok(invoiced.unwrap_or(false))
    }
}
