//! Tenant nodes, their settings and billing profiles, and tenant removal.

use crate::context::{AppGraph, Context};
use crate::cypher::{self, SetClause};
use crate::di::FromContext;
use crate::error::AppError;
use crate::graph::{Params, QueryExt};
use crate::models::{
    NodeLabel, TenantBillingProfile, TenantBillingProfileCreate, TenantBillingProfilePatch,
    TenantNode, TenantSettings, TenantSettingsPatch,
};
use crate::tenant::Tenant;

#[derive(FromContext, Clone)]
pub struct TenantReadRepository {
    graph: AppGraph,
}

impl TenantReadRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    pub async fn get_all(&self) -> Result<Vec<TenantNode>, AppError> {
        tracing::debug!("TenantReadRepository::get_all");

        self.graph
            .query("MATCH (t:Tenant) RETURN t {.*} AS t ORDER BY t.name")
            .fetch_column("t")
            .await
    }

    pub async fn tenant_exists(&self, name: &str) -> Result<bool, AppError> {
        tracing::debug!(name, "TenantReadRepository::tenant_exists");

        let found = self
            .graph
            .query("MATCH (t:Tenant {name:$name}) RETURN count(t) > 0 AS found")
            .param("name", name)
            .fetch_value("found")
            .await?;
        Ok(found.unwrap_or(false))
    }

    pub async fn get_tenant_by_name(&self, tenant: &Tenant) -> Result<Option<TenantNode>, AppError> {
        tracing::debug!(tenant = %tenant, "TenantReadRepository::get_tenant_by_name");

        self.graph
            .query("MATCH (t:Tenant {name:$tenant}) RETURN t {.*} AS t")
            .param("tenant", tenant.as_str())
            .fetch_value("t")
            .await
    }

    pub async fn get_tenant_settings(&self, tenant: &Tenant) -> Result<Option<TenantSettings>, AppError> {
        tracing::debug!(tenant = %tenant, "TenantReadRepository::get_tenant_settings");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})-[:HAS_SETTINGS]->(ts:TenantSettings)
                 RETURN ts {.*} AS ts",
            )
            .param("tenant", tenant.as_str())
            .fetch_value("ts")
            .await
    }

    /// Billing profiles, oldest first.
    pub async fn get_billing_profiles(&self, tenant: &Tenant) -> Result<Vec<TenantBillingProfile>, AppError> {
        tracing::debug!(tenant = %tenant, "TenantReadRepository::get_billing_profiles");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})-[:HAS_BILLING_PROFILE]->(tbp:TenantBillingProfile)
                 RETURN tbp {.*} AS tbp ORDER BY tbp.createdAt ASC",
            )
            .param("tenant", tenant.as_str())
            .fetch_column("tbp")
            .await
    }

    pub async fn get_billing_profile(
        &self,
        tenant: &Tenant,
        billing_profile_id: &str,
    ) -> Result<Option<TenantBillingProfile>, AppError> {
        tracing::debug!(tenant = %tenant, billing_profile_id, "TenantReadRepository::get_billing_profile");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})-[:HAS_BILLING_PROFILE]->(tbp:TenantBillingProfile {id:$id})
                 RETURN tbp {.*} AS tbp",
            )
            .param("tenant", tenant.as_str())
            .param("id", billing_profile_id)
            .fetch_value("tbp")
            .await
    }
}

#[derive(FromContext, Clone)]
pub struct TenantWriteRepository {
    graph: AppGraph,
}

impl TenantWriteRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    pub async fn create_billing_profile(
        &self,
        tenant: &Tenant,
        billing_profile_id: &str,
        data: &TenantBillingProfileCreate,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, billing_profile_id, "TenantWriteRepository::create_billing_profile");

        let cypher = format!(
            "MATCH (t:Tenant {{name:$tenant}})
             MERGE (t)-[:HAS_BILLING_PROFILE]->(tbp:TenantBillingProfile {{id:$id}})
             ON CREATE SET tbp:{label},
                tbp += $props,
                tbp.source = $source,
                tbp.sourceOfTruth = $sourceOfTruth,
                tbp.appSource = $appSource,
                tbp.createdAt = $createdAt,
                tbp.updatedAt = $createdAt",
            label = NodeLabel::TenantBillingProfile.tenant_label(tenant),
        );

        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("id", billing_profile_id)
            .param("props", data)
            .param("source", &data.source.source)
            .param("sourceOfTruth", data.source.source_of_truth())
            .param("appSource", data.source.app_source())
            .param(
                "createdAt",
                cypher::timestamp(data.created_at).unwrap_or_else(cypher::now),
            )
            .run()
            .await
    }

    /// Writes the present fields. `updatedAt` is always refreshed.
    pub async fn update_billing_profile(
        &self,
        tenant: &Tenant,
        billing_profile_id: &str,
        patch: &TenantBillingProfilePatch,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, billing_profile_id, "TenantWriteRepository::update_billing_profile");

        let mut set = SetClause::new("tbp");
        set.set("phone", patch.phone.clone())
            .set("legalName", patch.legal_name.clone())
            .set("addressLine1", patch.address_line1.clone())
            .set("addressLine2", patch.address_line2.clone())
            .set("addressLine3", patch.address_line3.clone())
            .set("locality", patch.locality.clone())
            .set("country", patch.country.clone())
            .set("region", patch.region.clone())
            .set("zip", patch.zip.clone())
            .set("vatNumber", patch.vat_number.clone())
            .set("sendInvoicesFrom", patch.send_invoices_from.clone())
            .set("sendInvoicesBcc", patch.send_invoices_bcc.clone())
            .set("canPayWithPigeon", patch.can_pay_with_pigeon)
            .set("canPayWithBankTransfer", patch.can_pay_with_bank_transfer)
            .set("check", patch.check)
            .updated_at(&cypher::now());
        let (assignments, params) = set.build();

        self.graph
            .query(format!(
                "MATCH (:Tenant {{name:$tenant}})-[:HAS_BILLING_PROFILE]->(tbp:TenantBillingProfile {{id:$id}})
                 SET {}",
                assignments
            ))
            .params(params)
            .param("tenant", tenant.as_str())
            .param("id", billing_profile_id)
            .run()
            .await
    }

    /// Merges the settings node and writes the present fields.
    pub async fn update_settings(&self, tenant: &Tenant, patch: &TenantSettingsPatch) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, "TenantWriteRepository::update_settings");

        let now = cypher::now();
        let mut set = SetClause::new("ts");
        set.set("invoicingEnabled", patch.invoicing_enabled)
            .set("invoicingPostpaid", patch.invoicing_postpaid)
            .set("baseCurrency", patch.base_currency.clone())
            .set("logoRepositoryFileId", patch.logo_repository_file_id.clone())
            .updated_at(&now);
        let (assignments, params) = set.build();

        self.graph
            .query(format!(
                "MATCH (t:Tenant {{name:$tenant}})
                 MERGE (t)-[:HAS_SETTINGS]->(ts:TenantSettings {{tenant:$tenant}})
                 ON CREATE SET ts.id = $id, ts.createdAt = $now
                 SET {}",
                assignments
            ))
            .params(params)
            .param("tenant", tenant.as_str())
            .param("id", ulid::Ulid::new().to_string())
            .param("now", &now)
            .run()
            .await
    }

    /// Removes every node of the tenant, then its settings, workspaces and
    /// the tenant node itself. Not transactional; a failure leaves the
    /// tenant partially deleted and the call can be repeated.
    pub async fn hard_delete_tenant(&self, tenant: &Tenant) -> Result<(), AppError> {
        tracing::warn!(tenant = %tenant, "TenantWriteRepository::hard_delete_tenant");

        for label in NodeLabel::all().iter().filter(|l| l.is_tenant_scoped()) {
            let cypher = format!(
                "MATCH (n) WHERE n:{live} OR n:{deleted} DETACH DELETE n",
                live = label.tenant_label(tenant),
                deleted = label.deleted_tenant_label(tenant),
            );
            self.graph.query(cypher).run().await?;
        }
        self.graph
            .query(format!(
                "MATCH (n:{}) DETACH DELETE n",
                tenant.label("ArchivedOpportunity")
            ))
            .run()
            .await?;

        let params: Params = [("tenant".to_string(), tenant.as_str().into())].into_iter().collect();
        for cypher in [
            "MATCH (ts:TenantSettings {tenant:$tenant}) DETACH DELETE ts",
            "MATCH (:Tenant {name:$tenant})-[r:HAS_WORKSPACE]->(w:Workspace) DELETE r, w",
            "MATCH (t:Tenant {name:$tenant}) DETACH DELETE t",
        ] {
            self.graph.query(cypher).params(params.clone()).run().await?;
        }

        tracing::info!(tenant = %tenant, "Tenant deleted");
        Ok(())
    }
}
