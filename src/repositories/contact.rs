//! Contact reads and writes.

use std::collections::HashMap;

use crate::context::{AppGraph, Context};
use crate::cypher::{self, SetClause};
use crate::di::FromContext;
use crate::error::AppError;
use crate::graph::{CypherExecutor, QueryExt};
use crate::models::{is_overwrite_source, Contact, ContactCreate, ContactPatch, NodeLabel};
use crate::tenant::Tenant;

#[derive(FromContext, Clone)]
pub struct ContactReadRepository {
    graph: AppGraph,
}

impl ContactReadRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    pub async fn get_contact(&self, tenant: &Tenant, contact_id: &str) -> Result<Option<Contact>, AppError> {
        tracing::debug!(tenant = %tenant, contact_id, "ContactReadRepository::get_contact");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:CONTACT_BELONGS_TO_TENANT]-(c:Contact {id:$id})
                 RETURN c {.*} AS c",
            )
            .param("tenant", tenant.as_str())
            .param("id", contact_id)
            .fetch_value("c")
            .await
    }

    /// Contacts holding `email` as normalized or raw address.
    pub async fn get_contacts_with_email(&self, tenant: &Tenant, email: &str) -> Result<Vec<Contact>, AppError> {
        tracing::debug!(tenant = %tenant, email, "ContactReadRepository::get_contacts_with_email");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:CONTACT_BELONGS_TO_TENANT]-(c:Contact)-[:HAS]->(e:Email)
                 WHERE e.email=$email OR e.rawEmail=$email
                 RETURN DISTINCT c {.*} AS c",
            )
            .param("tenant", tenant.as_str())
            .param("email", email)
            .fetch_column("c")
            .await
    }

    pub async fn get_contacts_with_social_url(
        &self,
        tenant: &Tenant,
        social_url: &str,
    ) -> Result<Vec<Contact>, AppError> {
        tracing::debug!(tenant = %tenant, social_url, "ContactReadRepository::get_contacts_with_social_url");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:CONTACT_BELONGS_TO_TENANT]-(c:Contact)-[:HAS]->(s:Social)
                 WHERE s.url=$socialUrl
                 RETURN DISTINCT c {.*} AS c",
            )
            .param("tenant", tenant.as_str())
            .param("socialUrl", social_url)
            .fetch_column("c")
            .await
    }

    /// Contact working at the organization with the given raw email.
    pub async fn get_contact_in_organization_by_email(
        &self,
        tenant: &Tenant,
        organization_id: &str,
        email: &str,
    ) -> Result<Option<Contact>, AppError> {
        tracing::debug!(
            tenant = %tenant,
            organization_id,
            email,
            "ContactReadRepository::get_contact_in_organization_by_email"
        );

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(o:Organization {id:$organizationId})
                       <-[:ROLE_IN]-(:JobRole)<-[:WORKS_AS]-(c:Contact)-[:HAS]->(:Email {rawEmail:$email})
                 RETURN c {.*} AS c LIMIT 1",
            )
            .param("tenant", tenant.as_str())
            .param("organizationId", organization_id)
            .param("email", email)
            .fetch_value("c")
            .await
    }

    /// Visible contact count per organization id. Every requested
    /// organization that exists is present, with zero when it has no contacts.
    pub async fn get_contact_count_by_organizations(
        &self,
        tenant: &Tenant,
        organization_ids: &[String],
    ) -> Result<HashMap<String, i64>, AppError> {
        tracing::debug!(
            tenant = %tenant,
            count = organization_ids.len(),
            "ContactReadRepository::get_contact_count_by_organizations"
        );

        let rows = self
            .graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(o:Organization)
                 WHERE o.id IN $ids
                 WITH o
                 OPTIONAL MATCH (o)--(:JobRole)--(c:Contact) WHERE c.hide IS NULL OR c.hide = false
                 RETURN o.id AS id, count(c) AS count",
            )
            .param("tenant", tenant.as_str())
            .param("ids", organization_ids)
            .fetch_all()
            .await?;

        rows.iter()
            .map(|row| -> Result<(String, i64), AppError> { Ok((row.get("id")?, row.get("count")?)) })
            .collect()
    }

    /// Domains of the organizations the contact has a job role in.
    pub async fn get_linked_org_domains(&self, tenant: &Tenant, contact_id: &str) -> Result<Vec<String>, AppError> {
        tracing::debug!(tenant = %tenant, contact_id, "ContactReadRepository::get_linked_org_domains");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:CONTACT_BELONGS_TO_TENANT]-(c:Contact {id:$id})
                       --(:JobRole)--(:Organization)--(d:Domain)
                 RETURN DISTINCT d.domain AS domain",
            )
            .param("tenant", tenant.as_str())
            .param("id", contact_id)
            .fetch_column("domain")
            .await
    }
}

#[derive(FromContext, Clone)]
pub struct ContactWriteRepository {
    graph: AppGraph,
}

impl ContactWriteRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    pub async fn create_contact(&self, tenant: &Tenant, contact_id: &str, data: &ContactCreate) -> Result<(), AppError> {
        self.create_contact_in_tx(self.graph.as_ref(), tenant, contact_id, data)
            .await
    }

    /// Merges the contact under its tenant. Re-running with the same id
    /// leaves the existing contact untouched.
    pub async fn create_contact_in_tx<E: CypherExecutor + ?Sized>(
        &self,
        tx: &E,
        tenant: &Tenant,
        contact_id: &str,
        data: &ContactCreate,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, contact_id, "ContactWriteRepository::create_contact");

        let cypher = format!(
            "MATCH (t:Tenant {{name:$tenant}})
             MERGE (t)<-[:CONTACT_BELONGS_TO_TENANT]-(c:Contact {{id:$id}})
             ON CREATE SET c:{label},
                c.firstName=$firstName,
                c.lastName=$lastName,
                c.prefix=$prefix,
                c.name=$name,
                c.description=$description,
                c.timezone=$timezone,
                c.profilePhotoUrl=$profilePhotoUrl,
                c.username=$username,
                c.hide=false,
                c.source=$source,
                c.sourceOfTruth=$sourceOfTruth,
                c.appSource=$appSource,
                c.aggregateVersion=$aggregateVersion,
                c.createdAt=$createdAt,
                c.updatedAt=$updatedAt",
            label = NodeLabel::Contact.tenant_label(tenant)
        );
        let now = cypher::now();
        let created_at = cypher::timestamp(data.created_at).unwrap_or_else(|| now.clone());

        tx.query(cypher)
            .param("tenant", tenant.as_str())
            .param("id", contact_id)
            .param("firstName", &data.first_name)
            .param("lastName", &data.last_name)
            .param("prefix", &data.prefix)
            .param("name", &data.name)
            .param("description", &data.description)
            .param("timezone", &data.timezone)
            .param("profilePhotoUrl", &data.profile_photo_url)
            .param("username", &data.username)
            .param("source", &data.source.source)
            .param("sourceOfTruth", data.source.source_of_truth())
            .param("appSource", data.source.app_source())
            .param("aggregateVersion", data.aggregate_version)
            .param("createdAt", &created_at)
            .param("updatedAt", &now)
            .run()
            .await
    }

    pub async fn update_contact(&self, tenant: &Tenant, contact_id: &str, patch: &ContactPatch) -> Result<bool, AppError> {
        self.update_contact_in_tx(self.graph.as_ref(), tenant, contact_id, patch)
            .await
    }

    /// Applies the `Some` fields of `patch`.
    ///
    /// With an aggregate version, the update is skipped when the stored
    /// version is equal or newer. Returns whether the contact was updated.
    pub async fn update_contact_in_tx<E: CypherExecutor + ?Sized>(
        &self,
        tx: &E,
        tenant: &Tenant,
        contact_id: &str,
        patch: &ContactPatch,
    ) -> Result<bool, AppError> {
        tracing::debug!(
            tenant = %tenant,
            contact_id,
            aggregate_version = ?patch.aggregate_version,
            "ContactWriteRepository::update_contact"
        );

        let mut set = SetClause::new("c");
        set.set_gated("firstName", patch.first_name.clone())
            .set_gated("lastName", patch.last_name.clone())
            .set_gated("prefix", patch.prefix.clone())
            .set_gated("name", patch.name.clone())
            .set_gated("description", patch.description.clone())
            .set_gated("timezone", patch.timezone.clone())
            .set_gated("profilePhotoUrl", patch.profile_photo_url.clone())
            .set_gated("username", patch.username.clone())
            .set("hide", patch.hide)
            .source_of_truth()
            .updated_at(&cypher::now());

        let mut version_gate = "";
        if let Some(version) = patch.aggregate_version {
            set.raw("c.aggregateVersion = $aggregateVersion")
                .param("aggregateVersion", version);
            version_gate = "WHERE c.aggregateVersion IS NULL OR c.aggregateVersion < $aggregateVersion";
        }
        let (assignments, params) = set.build();

        let cypher = format!(
            "MATCH (:Tenant {{name:$tenant}})<-[:CONTACT_BELONGS_TO_TENANT]-(c:Contact {{id:$id}})
             {version_gate}
             SET {assignments}
             RETURN count(c) > 0 AS updated",
            version_gate = version_gate,
            assignments = assignments,
        );

        let updated = tx
            .query(cypher)
            .params(params)
            .param("tenant", tenant.as_str())
            .param("id", contact_id)
            .param("sourceOfTruth", &patch.source)
            .param("overwrite", is_overwrite_source(&patch.source))
            .fetch_value("updated")
            .await?;
        Ok(updated.unwrap_or(false))
    }

    /// Swaps the contact's labels for `DeletedContact`. Returns whether the
    /// contact was found.
    pub async fn soft_delete_contact(&self, tenant: &Tenant, contact_id: &str) -> Result<bool, AppError> {
        tracing::debug!(tenant = %tenant, contact_id, "ContactWriteRepository::soft_delete_contact");

        let label = NodeLabel::Contact;
        let cypher = format!(
            "MATCH (:Tenant {{name:$tenant}})<-[:CONTACT_BELONGS_TO_TENANT]-(c:Contact {{id:$id}})
             SET c:{deleted}:{deleted_tenant}, c.updatedAt=$now
             REMOVE c:{active}:{active_tenant}
             RETURN count(c) > 0 AS deleted",
            deleted = label.deleted_label(),
            deleted_tenant = label.deleted_tenant_label(tenant),
            active = label,
            active_tenant = label.tenant_label(tenant),
        );
        let deleted = self
            .graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("id", contact_id)
            .param("now", cypher::now())
            .fetch_value("deleted")
            .await?;
        Ok(deleted.unwrap_or(false))
    }

    pub async fn link_with_location(
        &self,
        tenant: &Tenant,
        contact_id: &str,
        location_id: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, contact_id, location_id, "ContactWriteRepository::link_with_location");

        self.graph
            .query(
                "MATCH (t:Tenant {name:$tenant})<-[:CONTACT_BELONGS_TO_TENANT]-(c:Contact {id:$contactId}),
                       (t)<-[:LOCATION_BELONGS_TO_TENANT]-(l:Location {id:$locationId})
                 MERGE (c)-[:ASSOCIATED_WITH]->(l)
                 SET c.updatedAt=$now",
            )
            .param("tenant", tenant.as_str())
            .param("contactId", contact_id)
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
    use crate::graph::Row;
    use crate::models::SourceFields;
    use serde_json::json;
    use std::sync::Arc;

    fn tenant() -> Tenant {
        Tenant::new("acme").unwrap()
    }

    #[tokio::test]
    async fn test_get_contact_found_and_missing() {
        let mock = Arc::new(MockExecutor::new().with_rows(vec![Row::from([(
            "c",
            json!({"id": "c1", "firstName": "Ann", "aggregateVersion": 2}),
        )])]));
        let repo = ContactReadRepository::new(mock.clone());

        let contact = repo.get_contact(&tenant(), "c1").await.unwrap().unwrap();
        assert_eq!(contact.first_name.as_deref(), Some("Ann"));
        assert_eq!(contact.aggregate_version, Some(2));
        assert_eq!(mock.last_call().params["tenant"], json!("acme"));

        assert!(repo.get_contact(&tenant(), "c2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_contact_count_by_organizations() {
        let mock = Arc::new(MockExecutor::new().with_rows(vec![
            Row::from([("id", json!("o1")), ("count", json!(3))]),
            Row::from([("id", json!("o2")), ("count", json!(0))]),
        ]));
        let repo = ContactReadRepository::new(mock);

        let counts = repo
            .get_contact_count_by_organizations(&tenant(), &["o1".to_string(), "o2".to_string()])
            .await
            .unwrap();
        assert_eq!(counts["o1"], 3);
        assert_eq!(counts["o2"], 0);
    }

    #[tokio::test]
    async fn test_create_contact_is_merge_with_tenant_label() {
        let mock = MockExecutor::new();
        let repo = ContactWriteRepository::new(Arc::new(MockExecutor::new()));
        let data = ContactCreate {
            first_name: Some("Ann".into()),
            source: SourceFields::new("hubspot", "sync"),
            aggregate_version: Some(1),
            ..Default::default()
        };

        repo.create_contact_in_tx(&mock, &tenant(), "c1", &data).await.unwrap();

        let call = mock.last_call();
        assert!(call.cypher.contains("MERGE (t)<-[:CONTACT_BELONGS_TO_TENANT]-(c:Contact {id:$id})"));
        assert!(call.cypher.contains("ON CREATE SET c:Contact_acme"));
        assert_eq!(call.params["firstName"], json!("Ann"));
        assert_eq!(call.params["lastName"], json!(null));
        assert_eq!(call.params["sourceOfTruth"], json!("hubspot"));
        assert_eq!(call.params["aggregateVersion"], json!(1));
    }

    #[tokio::test]
    async fn test_update_with_version_gate() {
        let mock = Arc::new(MockExecutor::new().with_rows(vec![Row::from([("updated", json!(true))])]));
        let repo = ContactWriteRepository::new(mock.clone());
        let patch = ContactPatch {
            first_name: Some("Anna".into()),
            source: "hubspot".into(),
            aggregate_version: Some(2),
            ..Default::default()
        };

        assert!(repo.update_contact(&tenant(), "c1", &patch).await.unwrap());

        let call = mock.last_call();
        assert!(call
            .cypher
            .contains("WHERE c.aggregateVersion IS NULL OR c.aggregateVersion < $aggregateVersion"));
        assert!(call.cypher.contains("c.aggregateVersion = $aggregateVersion"));
        assert!(call.cypher.contains(
            "c.firstName = CASE WHEN c.sourceOfTruth=$sourceOfTruth OR $overwrite=true OR c.firstName IS NULL OR c.firstName = '' THEN $firstName ELSE c.firstName END"
        ));
        assert!(!call.cypher.contains("c.lastName"));
        assert_eq!(call.params["overwrite"], json!(false));
        assert_eq!(call.params["aggregateVersion"], json!(2));
    }

    #[tokio::test]
    async fn test_stale_update_reports_not_applied() {
        let mock = Arc::new(MockExecutor::new().with_rows(vec![Row::from([("updated", json!(false))])]));
        let repo = ContactWriteRepository::new(mock);
        let patch = ContactPatch {
            first_name: Some("Old".into()),
            source: "openline".into(),
            aggregate_version: Some(1),
            ..Default::default()
        };

        assert!(!repo.update_contact(&tenant(), "c1", &patch).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_without_version_and_explicit_false() {
        let mock = Arc::new(MockExecutor::new());
        let repo = ContactWriteRepository::new(mock.clone());
        let patch = ContactPatch {
            hide: Some(false),
            source: "openline".into(),
            ..Default::default()
        };

        repo.update_contact(&tenant(), "c1", &patch).await.unwrap();

        let call = mock.last_call();
        assert!(!call.cypher.contains("WHERE"));
        assert!(call.cypher.contains("c.hide = $hide"));
        assert_eq!(call.params["hide"], json!(false));
        assert_eq!(call.params["overwrite"], json!(true));
    }

    #[tokio::test]
    async fn test_soft_delete_contact() {
        let mock = Arc::new(MockExecutor::new().with_rows(vec![Row::from([("deleted", json!(true))])]));
        let repo = ContactWriteRepository::new(mock.clone());

        assert!(repo.soft_delete_contact(&tenant(), "c1").await.unwrap());
        let cypher = mock.last_call().cypher;
        assert!(cypher.contains("SET c:DeletedContact:DeletedContact_acme"));
        assert!(cypher.contains("REMOVE c:Contact:Contact_acme"));
    }
}
