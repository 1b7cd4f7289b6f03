//! Job role writes. Most operations also come in a `*_in_tx` form so a
//! contact and its roles can be changed in one transaction.

use crate::context::{AppGraph, Context};
use crate::cypher;
use crate::di::FromContext;
use crate::error::AppError;
use crate::graph::{CypherExecutor, QueryExt};
use crate::models::{JobRole, JobRoleFields, NodeLabel};
use crate::tenant::Tenant;

#[derive(FromContext, Clone)]
pub struct JobRoleRepository {
    graph: AppGraph,
}

impl JobRoleRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    pub async fn create_job_role(&self, tenant: &Tenant, job_role_id: &str, data: &JobRoleFields) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, job_role_id, "JobRoleRepository::create_job_role");

        let cypher = format!(
            "MATCH (t:Tenant {{name:$tenant}})
             MERGE (jr:JobRole:{label} {{id:$id}})
             SET jr.jobTitle = $jobTitle,
                jr.description = $description,
                jr.createdAt = $createdAt,
                jr.updatedAt = $now,
                jr.startedAt = $startedAt,
                jr.endedAt = $endedAt,
                jr.source = $source,
                jr.sourceOfTruth = $sourceOfTruth,
                jr.appSource = $appSource",
            label = NodeLabel::JobRole.tenant_label(tenant),
        );
        let now = cypher::now();

        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("id", job_role_id)
            .param("jobTitle", &data.job_title)
            .param("description", &data.description)
            .param("createdAt", cypher::timestamp(data.created_at).unwrap_or_else(|| now.clone()))
            .param("now", &now)
            .param("startedAt", cypher::timestamp(data.started_at))
            .param("endedAt", cypher::timestamp(data.ended_at))
            .param("source", &data.source.source)
            .param("sourceOfTruth", data.source.source_of_truth())
            .param("appSource", data.source.app_source())
            .run()
            .await
    }

    /// Creates a new role for the contact with a fresh id and returns it.
    /// A missing start date defaults to now.
    pub async fn create_job_role_in_tx<E: CypherExecutor + ?Sized>(
        &self,
        tx: &E,
        tenant: &Tenant,
        contact_id: &str,
        data: &JobRoleFields,
    ) -> Result<Option<JobRole>, AppError> {
        let job_role_id = ulid::Ulid::new().to_string();
        tracing::debug!(tenant = %tenant, contact_id, job_role_id = %job_role_id, "JobRoleRepository::create_job_role_in_tx");

        let cypher = format!(
            "MATCH (c:Contact {{id:$contactId}})-[:CONTACT_BELONGS_TO_TENANT]->(:Tenant {{name:$tenant}})
             MERGE (c)-[:WORKS_AS]->(r:JobRole {{id:$id}})
             ON CREATE SET r:{label},
                r.jobTitle=$jobTitle,
                r.primary=$primary,
                r.description=$description,
                r.company=$company,
                r.source=$source,
                r.sourceOfTruth=$sourceOfTruth,
                r.appSource=$appSource,
                r.createdAt=$now,
                r.updatedAt=$now,
                r.startedAt=$startedAt,
                r.endedAt=$endedAt
             RETURN r {{.*}} AS r",
            label = NodeLabel::JobRole.tenant_label(tenant),
        );
        let now = cypher::now();

        tx.query(cypher)
            .param("tenant", tenant.as_str())
            .param("contactId", contact_id)
            .param("id", &job_role_id)
            .param("jobTitle", &data.job_title)
            .param("primary", data.primary)
            .param("description", &data.description)
            .param("company", &data.company)
            .param("source", &data.source.source)
            .param("sourceOfTruth", data.source.source_of_truth())
            .param("appSource", data.source.app_source())
            .param("startedAt", cypher::timestamp(data.started_at).unwrap_or_else(|| now.clone()))
            .param("endedAt", cypher::timestamp(data.ended_at))
            .param("now", &now)
            .fetch_value("r")
            .await
    }

    pub async fn link_with_user(&self, tenant: &Tenant, user_id: &str, job_role_id: &str) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, user_id, job_role_id, "JobRoleRepository::link_with_user");

        let cypher = format!(
            "MATCH (u:{user} {{id:$userId}})
             MERGE (jr:JobRole:{job_role} {{id:$jobRoleId}})
             MERGE (u)-[:WORKS_AS]->(jr)
             SET u.updatedAt = $now",
            user = NodeLabel::User.tenant_label(tenant),
            job_role = NodeLabel::JobRole.tenant_label(tenant),
        );
        self.graph
            .query(cypher)
            .param("userId", user_id)
            .param("jobRoleId", job_role_id)
            .param("now", cypher::now())
            .run()
            .await
    }

    /// Merges the contact's role in the organization. An existing role is
    /// updated under source-of-truth rules.
    pub async fn link_contact_with_organization(
        &self,
        tenant: &Tenant,
        contact_id: &str,
        organization_id: &str,
        data: &JobRoleFields,
    ) -> Result<(), AppError> {
        tracing::debug!(
            tenant = %tenant,
            contact_id,
            organization_id,
            "JobRoleRepository::link_contact_with_organization"
        );

        let cypher = format!(
            "MATCH (c:Contact {{id:$contactId}})-[:CONTACT_BELONGS_TO_TENANT]->(t:Tenant {{name:$tenant}}),
                   (t)<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization {{id:$organizationId}})
             MERGE (c)-[:WORKS_AS]->(jr:JobRole)-[:ROLE_IN]->(org)
             ON CREATE SET jr.id=$id,
                jr:{label},
                jr.source=$source,
                jr.sourceOfTruth=$sourceOfTruth,
                jr.appSource=$appSource,
                jr.jobTitle=$jobTitle,
                jr.description=$description,
                jr.startedAt=$startedAt,
                jr.endedAt=$endedAt,
                jr.primary=$primary,
                jr.createdAt=$createdAt,
                jr.updatedAt=$now,
                c.updatedAt=$now
             ON MATCH SET jr.jobTitle = CASE WHEN jr.sourceOfTruth=$source OR $overwrite=true OR jr.jobTitle IS NULL OR jr.jobTitle = '' THEN $jobTitle ELSE jr.jobTitle END,
                jr.description = CASE WHEN jr.sourceOfTruth=$source OR $overwrite=true OR jr.description IS NULL OR jr.description = '' THEN $description ELSE jr.description END,
                jr.primary = CASE WHEN jr.sourceOfTruth=$source OR $overwrite=true THEN $primary ELSE jr.primary END,
                jr.startedAt = CASE WHEN jr.sourceOfTruth=$source OR $overwrite=true THEN $startedAt ELSE jr.startedAt END,
                jr.endedAt = CASE WHEN jr.sourceOfTruth=$source OR $overwrite=true THEN $endedAt ELSE jr.endedAt END,
                jr.sourceOfTruth = CASE WHEN $overwrite=true THEN $source ELSE jr.sourceOfTruth END,
                jr.updatedAt=$now,
                c.updatedAt=$now",
            label = NodeLabel::JobRole.tenant_label(tenant),
        );
        let now = cypher::now();

        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("contactId", contact_id)
            .param("organizationId", organization_id)
            .param("id", ulid::Ulid::new().to_string())
            .param("source", &data.source.source)
            .param("sourceOfTruth", data.source.source_of_truth())
            .param("appSource", data.source.app_source())
            .param("jobTitle", &data.job_title)
            .param("description", &data.description)
            .param("startedAt", cypher::timestamp(data.started_at))
            .param("endedAt", cypher::timestamp(data.ended_at))
            .param("primary", data.primary)
            .param("overwrite", data.source.overwrite())
            .param("createdAt", cypher::timestamp(data.created_at).unwrap_or_else(|| now.clone()))
            .param("now", &now)
            .run()
            .await
    }

    /// Replaces the role's details and returns the stored role.
    pub async fn update_job_role_details_in_tx<E: CypherExecutor + ?Sized>(
        &self,
        tx: &E,
        tenant: &Tenant,
        contact_id: &str,
        role_id: &str,
        data: &JobRoleFields,
    ) -> Result<Option<JobRole>, AppError> {
        tracing::debug!(tenant = %tenant, contact_id, role_id, "JobRoleRepository::update_job_role_details_in_tx");

        tx.query(
            "MATCH (c:Contact {id:$contactId})-[:CONTACT_BELONGS_TO_TENANT]->(:Tenant {name:$tenant}),
                   (c)-[:WORKS_AS]->(r:JobRole {id:$roleId})
             SET r.jobTitle=$jobTitle,
                r.primary=$primary,
                r.description=$description,
                r.company=$company,
                r.sourceOfTruth=$sourceOfTruth,
                r.startedAt=$startedAt,
                r.endedAt=$endedAt,
                r.updatedAt=$now
             RETURN r {.*} AS r",
        )
        .param("tenant", tenant.as_str())
        .param("contactId", contact_id)
        .param("roleId", role_id)
        .param("jobTitle", &data.job_title)
        .param("primary", data.primary)
        .param("description", &data.description)
        .param("company", &data.company)
        .param("sourceOfTruth", data.source.source_of_truth())
        .param("startedAt", cypher::timestamp(data.started_at))
        .param("endedAt", cypher::timestamp(data.ended_at))
        .param("now", cypher::now())
        .fetch_value("r")
        .await
    }

    pub async fn delete_job_role_in_tx<E: CypherExecutor + ?Sized>(
        &self,
        tx: &E,
        tenant: &Tenant,
        contact_id: &str,
        role_id: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, contact_id, role_id, "JobRoleRepository::delete_job_role_in_tx");

        tx.query(
            "MATCH (c:Contact {id:$contactId})-[:CONTACT_BELONGS_TO_TENANT]->(:Tenant {name:$tenant}),
                   (c)-[:WORKS_AS]->(r:JobRole {id:$roleId})
             DETACH DELETE r",
        )
        .param("tenant", tenant.as_str())
        .param("contactId", contact_id)
        .param("roleId", role_id)
        .run()
        .await
    }

    /// Clears `primary` on every role of the contact except `skip_role_id`.
    pub async fn set_other_job_roles_non_primary_in_tx<E: CypherExecutor + ?Sized>(
        &self,
        tx: &E,
        tenant: &Tenant,
        contact_id: &str,
        skip_role_id: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(
            tenant = %tenant,
            contact_id,
            skip_role_id,
            "JobRoleRepository::set_other_job_roles_non_primary_in_tx"
        );

        tx.query(
            "MATCH (c:Contact {id:$contactId})-[:CONTACT_BELONGS_TO_TENANT]->(:Tenant {name:$tenant}),
                   (c)-[:WORKS_AS]->(r:JobRole)
             WHERE r.id <> $skipRoleId
             SET r.primary=false, r.updatedAt=$now",
        )
        .param("tenant", tenant.as_str())
        .param("contactId", contact_id)
        .param("skipRoleId", skip_role_id)
        .param("now", cypher::now())
        .run()
        .await
    }

    /// Points the role at `organization_id`, dropping any other `ROLE_IN`.
    pub async fn link_with_organization_in_tx<E: CypherExecutor + ?Sized>(
        &self,
        tx: &E,
        tenant: &Tenant,
        role_id: &str,
        organization_id: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, role_id, organization_id, "JobRoleRepository::link_with_organization_in_tx");

        tx.query(
            "MATCH (org:Organization {id:$organizationId})-[:ORGANIZATION_BELONGS_TO_TENANT]->(:Tenant {name:$tenant}),
                   (r:JobRole {id:$roleId})<-[:WORKS_AS]-(:Contact)-[:CONTACT_BELONGS_TO_TENANT]->(:Tenant {name:$tenant})
             OPTIONAL MATCH (r)-[rel:ROLE_IN]->(other:Organization)
             WHERE other.id <> org.id
             DELETE rel
             WITH r, org
             MERGE (r)-[:ROLE_IN]->(org)",
        )
        .param("tenant", tenant.as_str())
        .param("roleId", role_id)
        .param("organizationId", organization_id)
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

    fn fields() -> JobRoleFields {
        JobRoleFields {
            job_title: "CTO".into(),
            primary: true,
            source: SourceFields::new("hubspot", "sync"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_in_tx_generates_id_and_defaults_start() {
        let tx = MockExecutor::new().with_rows(vec![Row::from([(
            "r",
            json!({"id": "r1", "jobTitle": "CTO", "primary": true}),
        )])]);
        let repo = JobRoleRepository::new(Arc::new(MockExecutor::new()));

        let role = repo
            .create_job_role_in_tx(&tx, &tenant(), "c1", &fields())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(role.job_title.as_deref(), Some("CTO"));

        let call = tx.last_call();
        assert!(call.cypher.contains("ON CREATE SET r:JobRole_acme"));
        assert_eq!(call.params["id"].as_str().map(str::len), Some(26));
        assert!(crate::graph::datetime_param(&call.params["startedAt"]).is_some());
    }

    #[tokio::test]
    async fn test_link_contact_with_organization_gates_on_match() {
        let mock = Arc::new(MockExecutor::new());
        let repo = JobRoleRepository::new(mock.clone());

        repo.link_contact_with_organization(&tenant(), "c1", "o1", &fields())
            .await
            .unwrap();

        let call = mock.last_call();
        assert!(call.cypher.contains("MERGE (c)-[:WORKS_AS]->(jr:JobRole)-[:ROLE_IN]->(org)"));
        assert!(call
            .cypher
            .contains("jr.primary = CASE WHEN jr.sourceOfTruth=$source OR $overwrite=true THEN $primary"));
        assert_eq!(call.params["overwrite"], json!(false));
    }

    #[tokio::test]
    async fn test_in_tx_operations_share_executor() {
        let tx = MockExecutor::new();
        let repo = JobRoleRepository::new(Arc::new(MockExecutor::new()));

        repo.set_other_job_roles_non_primary_in_tx(&tx, &tenant(), "c1", "r1")
            .await
            .unwrap();
        repo.link_with_organization_in_tx(&tx, &tenant(), "r1", "o1")
            .await
            .unwrap();
        repo.delete_job_role_in_tx(&tx, &tenant(), "c1", "r2").await.unwrap();

        let calls = tx.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].params["skipRoleId"], json!("r1"));
        assert!(calls[1].cypher.contains("MERGE (r)-[:ROLE_IN]->(org)"));
        assert!(calls[2].cypher.contains("DETACH DELETE r"));
    }
}
