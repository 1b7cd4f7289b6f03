//! Invoice reads.

use crate::context::{AppGraph, Context};
use crate::di::FromContext;
use crate::error::AppError;
use crate::graph::QueryExt;
use crate::models::{Invoice, Linked};
use crate::tenant::Tenant;

#[derive(FromContext, Clone)]
pub struct InvoiceRepository {
    graph: AppGraph,
}

impl InvoiceRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    pub async fn get_invoice(&self, tenant: &Tenant, invoice_id: &str) -> Result<Option<Invoice>, AppError> {
        tracing::debug!(tenant = %tenant, invoice_id, "InvoiceRepository::get_invoice");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:INVOICE_BELONGS_TO_TENANT]-(i:Invoice {id:$id})
                 RETURN i {.*} AS i",
            )
            .param("tenant", tenant.as_str())
            .param("id", invoice_id)
            .fetch_value("i")
            .await
    }

    pub async fn get_invoice_by_number(&self, tenant: &Tenant, number: &str) -> Result<Option<Invoice>, AppError> {
        tracing::debug!(tenant = %tenant, number, "InvoiceRepository::get_invoice_by_number");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:INVOICE_BELONGS_TO_TENANT]-(i:Invoice {number:$number})
                 RETURN i {.*} AS i LIMIT 1",
            )
            .param("tenant", tenant.as_str())
            .param("number", number)
            .fetch_value("i")
            .await
    }

    pub async fn get_for_contracts(
        &self,
        tenant: &Tenant,
        contract_ids: &[String],
    ) -> Result<Vec<Linked<Invoice>>, AppError> {
        tracing::debug!(tenant = %tenant, count = contract_ids.len(), "InvoiceRepository::get_for_contracts");

        let rows = self
            .graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:INVOICE_BELONGS_TO_TENANT]-(i:Invoice)<-[:HAS_INVOICE]-(c:Contract)
                 WHERE c.id IN $ids
                 RETURN i {.*} AS i, c.id AS linkedId",
            )
            .param("tenant", tenant.as_str())
            .param("ids", contract_ids)
            .fetch_all()
            .await?;

        rows.iter()
            .map(|row| -> Result<Linked<Invoice>, AppError> {
                Ok(Linked {
                    node: row.get("i")?,
                    linked_id: row.get("linkedId")?,
                })
            })
            .collect()
    }

    /// Most recent issued invoice of the contract, skipping dry runs and
    /// off-cycle invoices.
    pub async fn get_last_issued_for_contract(
        &self,
        tenant: &Tenant,
        contract_id: &str,
    ) -> Result<Option<Invoice>, AppError> {
        tracing::debug!(tenant = %tenant, contract_id, "InvoiceRepository::get_last_issued_for_contract");

        self.graph
            .query(
                "MATCH (:Contract {id:$contractId})-[:HAS_INVOICE]->(i:Invoice)-[:INVOICE_BELONGS_TO_TENANT]->(:Tenant {name:$tenant})
                 WHERE i.dryRun = false AND i.offCycle = false
                 RETURN i {.*} AS i ORDER BY i.periodEndDate DESC LIMIT 1",
            )
            .param("tenant", tenant.as_str())
            .param("contractId", contract_id)
            .fetch_value("i")
            .await
    }

    pub async fn count_non_dry_run_for_contract(&self, tenant: &Tenant, contract_id: &str) -> Result<i64, AppError> {
        tracing::debug!(tenant = %tenant, contract_id, "InvoiceRepository::count_non_dry_run_for_contract");

        let count = self
            .graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(:Organization)-[:HAS_CONTRACT]->(:Contract {id:$contractId})-[:HAS_INVOICE]->(i:Invoice {dryRun:false})
                 RETURN count(i) AS count",
            )
            .param("tenant", tenant.as_str())
            .param("contractId", contract_id)
            .fetch_value("count")
            .await?;
        Ok(count.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::mock::MockExecutor;
    use crate::graph::Row;
    use serde_json::json;
    use std::sync::Arc;

    fn tenant() -> Tenant {
        Tenant::new("acme").unwrap()
    }

    #[tokio::test]
    async fn test_last_issued_for_contract() {
        let mock = Arc::new(MockExecutor::new().with_rows(vec![Row::from([(
            "i",
            json!({"id": "i9", "number": "INV-009", "dryRun": false, "totalAmount": 120.5}),
        )])]));
        let repo = InvoiceRepository::new(mock.clone());

        let invoice = repo
            .get_last_issued_for_contract(&tenant(), "ct1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(invoice.number.as_deref(), Some("INV-009"));
        assert_eq!(invoice.total_amount, Some(120.5));
        assert!(mock.last_call().cypher.contains("i.offCycle = false"));
    }

    #[tokio::test]
    async fn test_count_defaults_to_zero() {
        let repo = InvoiceRepository::new(Arc::new(MockExecutor::new()));
        assert_eq!(repo.count_non_dry_run_for_contract(&tenant(), "ct1").await.unwrap(), 0);
    }
}
