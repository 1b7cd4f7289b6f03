//! Organization billing profiles.

use crate::context::{AppGraph, Context};
use crate::cypher::{self, SetClause};
use crate::di::FromContext;
use crate::error::AppError;
use crate::graph::QueryExt;
use crate::models::{BillingProfileCreate, BillingProfilePatch, NodeLabel};
use crate::tenant::Tenant;

const PROFILE_MATCH: &str = "MATCH (t:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(:Organization {id:$organizationId})-[:HAS_BILLING_PROFILE]->(bp:BillingProfile {id:$billingProfileId})";

#[derive(FromContext, Clone)]
pub struct BillingProfileRepository {
    graph: AppGraph,
}

impl BillingProfileRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    pub async fn create_billing_profile(
        &self,
        tenant: &Tenant,
        billing_profile_id: &str,
        data: &BillingProfileCreate,
    ) -> Result<(), AppError> {
        tracing::debug!(
            tenant = %tenant,
            billing_profile_id,
            organization_id = %data.organization_id,
            "BillingProfileRepository::create_billing_profile"
        );

        let cypher = format!(
            "MATCH (:Tenant {{name:$tenant}})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization {{id:$organizationId}})
             MERGE (bp:BillingProfile {{id:$billingProfileId}})<-[:HAS_BILLING_PROFILE]-(org)
             ON CREATE SET bp:{label},
                bp.createdAt=$createdAt,
                bp.updatedAt=$now,
                bp.source=$source,
                bp.sourceOfTruth=$sourceOfTruth,
                bp.appSource=$appSource,
                bp.legalName=$legalName,
                bp.taxId=$taxId",
            label = NodeLabel::BillingProfile.tenant_label(tenant),
        );
        let now = cypher::now();

        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("organizationId", &data.organization_id)
            .param("billingProfileId", billing_profile_id)
            .param("createdAt", cypher::timestamp(data.created_at).unwrap_or_else(|| now.clone()))
            .param("now", &now)
            .param("source", &data.source.source)
            .param("sourceOfTruth", data.source.source_of_truth())
            .param("appSource", data.source.app_source())
            .param("legalName", &data.legal_name)
            .param("taxId", &data.tax_id)
            .run()
            .await
    }

    pub async fn update_billing_profile(
        &self,
        tenant: &Tenant,
        billing_profile_id: &str,
        patch: &BillingProfilePatch,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, billing_profile_id, "BillingProfileRepository::update_billing_profile");

        let mut set = SetClause::new("bp");
        set.set("legalName", patch.legal_name.clone())
            .set("taxId", patch.tax_id.clone())
            .updated_at(&cypher::now());
        let (assignments, params) = set.build();

        self.graph
            .query(format!("{} SET {}", PROFILE_MATCH, assignments))
            .params(params)
            .param("tenant", tenant.as_str())
            .param("organizationId", &patch.organization_id)
            .param("billingProfileId", billing_profile_id)
            .run()
            .await
    }

    /// Links the email. Linking as primary clears `primary` on the
    /// profile's other email links.
    pub async fn link_email(
        &self,
        tenant: &Tenant,
        organization_id: &str,
        billing_profile_id: &str,
        email_id: &str,
        primary: bool,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, billing_profile_id, email_id, primary, "BillingProfileRepository::link_email");

        self.graph
            .query(format!(
                "{},
                       (t)<-[:EMAIL_ADDRESS_BELONGS_TO_TENANT]-(e:Email {{id:$emailId}})
                 MERGE (e)<-[rel:HAS]-(bp)
                 SET bp.updatedAt = $now, rel.primary = $primary
                 WITH bp
                 OPTIONAL MATCH (bp)-[other:HAS]->(oe:Email)
                 WHERE oe.id <> $emailId AND $primary = true
                 SET other.primary = false",
                PROFILE_MATCH
            ))
            .param("tenant", tenant.as_str())
            .param("organizationId", organization_id)
            .param("billingProfileId", billing_profile_id)
            .param("emailId", email_id)
            .param("primary", primary)
            .param("now", cypher::now())
            .run()
            .await
    }

    pub async fn unlink_email(
        &self,
        tenant: &Tenant,
        organization_id: &str,
        billing_profile_id: &str,
        email_id: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, billing_profile_id, email_id, "BillingProfileRepository::unlink_email");

        self.graph
            .query(format!(
                "{}-[rel:HAS]->(:Email {{id:$emailId}})
                 SET bp.updatedAt = $now
                 DELETE rel",
                PROFILE_MATCH
            ))
            .param("tenant", tenant.as_str())
            .param("organizationId", organization_id)
            .param("billingProfileId", billing_profile_id)
            .param("emailId", email_id)
            .param("now", cypher::now())
            .run()
            .await
    }

    pub async fn link_location(
        &self,
        tenant: &Tenant,
        organization_id: &str,
        billing_profile_id: &str,
        location_id: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, billing_profile_id, location_id, "BillingProfileRepository::link_location");

        self.graph
            .query(format!(
                "{},
                       (t)<-[:LOCATION_BELONGS_TO_TENANT]-(loc:Location {{id:$locationId}})
                 MERGE (loc)<-[:HAS]-(bp)
                 SET bp.updatedAt = $now",
                PROFILE_MATCH
            ))
            .param("tenant", tenant.as_str())
            .param("organizationId", organization_id)
            .param("billingProfileId", billing_profile_id)
            .param("locationId", location_id)
            .param("now", cypher::now())
            .run()
            .await
    }

    pub async fn unlink_location(
        &self,
        tenant: &Tenant,
        organization_id: &str,
        billing_profile_id: &str,
        location_id: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, billing_profile_id, location_id, "BillingProfileRepository::unlink_location");

        self.graph
            .query(format!(
                "{}-[rel:HAS]->(:Location {{id:$locationId}})
                 SET bp.updatedAt = $now
                 DELETE rel",
                PROFILE_MATCH
            ))
            .param("tenant", tenant.as_str())
            .param("organizationId", organization_id)
            .param("billingProfileId", billing_profile_id)
            .param("locationId", location_id)
            .param("now", cypher::now())
            .run()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::mock::MockExecutor;
    use crate::models::SourceFields;
    use serde_json::json;
    use std::sync::Arc;

    fn tenant() -> Tenant {
        Tenant::new("acme").unwrap()
    }

    #[tokio::test]
    async fn test_create_under_organization() {
        let mock = Arc::new(MockExecutor::new());
        let repo = BillingProfileRepository::new(mock.clone());
        let data = BillingProfileCreate {
            organization_id: "o1".into(),
            legal_name: "Acme GmbH".into(),
            tax_id: "DE123".into(),
            source: SourceFields::openline(),
            created_at: None,
        };

        repo.create_billing_profile(&tenant(), "bp1", &data).await.unwrap();

        let call = mock.last_call();
        assert!(call.cypher.contains("ON CREATE SET bp:BillingProfile_acme"));
        assert_eq!(call.params["organizationId"], json!("o1"));
        assert_eq!(call.params["taxId"], json!("DE123"));
    }

    #[tokio::test]
    async fn test_primary_email_demotes_others() {
        let mock = Arc::new(MockExecutor::new());
        let repo = BillingProfileRepository::new(mock.clone());

        repo.link_email(&tenant(), "o1", "bp1", "e1", true).await.unwrap();

        let call = mock.last_call();
        assert!(call.cypher.starts_with(PROFILE_MATCH));
        assert!(call.cypher.contains("SET other.primary = false"));
        assert_eq!(call.params["primary"], json!(true));
    }

    #[tokio::test]
    async fn test_update_writes_only_present_fields() {
        let mock = Arc::new(MockExecutor::new());
        let repo = BillingProfileRepository::new(mock.clone());
        let patch = BillingProfilePatch {
            organization_id: "o1".into(),
            tax_id: Some("DE999".into()),
            ..Default::default()
        };

        repo.update_billing_profile(&tenant(), "bp1", &patch).await.unwrap();

        let call = mock.last_call();
        assert!(call.cypher.contains("bp.taxId = $taxId"));
        assert!(!call.cypher.contains("legalName"));
    }
}
