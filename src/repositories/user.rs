//! User reads and writes.

use crate::context::{AppGraph, Context};
use crate::cypher::{self, gated_assignment, Blank, SetClause};
use crate::di::FromContext;
use crate::error::AppError;
use crate::graph::{CypherExecutor, QueryExt};
use crate::models::{is_overwrite_source, NodeLabel, User, UserCreate, UserPatch};
use crate::tenant::Tenant;

const GATED_FIELDS: &[&str] = &["name", "firstName", "lastName", "timezone", "profilePhotoUrl"];

#[derive(FromContext, Clone)]
pub struct UserRepository {
    graph: AppGraph,
}

impl UserRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    pub async fn get_user(&self, tenant: &Tenant, user_id: &str) -> Result<Option<User>, AppError> {
        tracing::debug!(tenant = %tenant, user_id, "UserRepository::get_user");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:USER_BELONGS_TO_TENANT]-(u:User {id:$id})
                 RETURN u {.*} AS u",
            )
            .param("tenant", tenant.as_str())
            .param("id", user_id)
            .fetch_value("u")
            .await
    }

    /// First user (oldest) owning the email address, matched on either the
    /// raw or the validated address.
    pub async fn get_user_by_email(&self, tenant: &Tenant, email: &str) -> Result<Option<User>, AppError> {
        tracing::debug!(tenant = %tenant, email, "UserRepository::get_user_by_email");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:USER_BELONGS_TO_TENANT]-(u:User)-[:HAS]->(e:Email)
                 WHERE toLower(e.email) = toLower($email) OR toLower(e.rawEmail) = toLower($email)
                 RETURN u {.*} AS u ORDER BY u.createdAt ASC LIMIT 1",
            )
            .param("tenant", tenant.as_str())
            .param("email", email)
            .fetch_value("u")
            .await
    }

    pub async fn create_user(&self, tenant: &Tenant, user_id: &str, data: &UserCreate) -> Result<(), AppError> {
        self.create_user_in_tx(self.graph.as_ref(), tenant, user_id, data).await
    }

    /// Merges the user. An existing user keeps fields owned by another
    /// source unless they are blank.
    pub async fn create_user_in_tx<E: CypherExecutor + ?Sized>(
        &self,
        tx: &E,
        tenant: &Tenant,
        user_id: &str,
        data: &UserCreate,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, user_id, "UserRepository::create_user");

        let on_match = GATED_FIELDS
            .iter()
            .map(|field| gated_assignment("u", field, "sourceOfTruth", Blank::NullOrEmpty))
            .collect::<Vec<_>>()
            .join(",\n                ");
        let cypher = format!(
            "MATCH (t:Tenant {{name:$tenant}})
             MERGE (t)<-[:USER_BELONGS_TO_TENANT]-(u:User:{label} {{id:$id}})
             ON CREATE SET u.name=$name,
                u.firstName=$firstName,
                u.lastName=$lastName,
                u.source=$source,
                u.sourceOfTruth=$sourceOfTruth,
                u.appSource=$appSource,
                u.createdAt=$createdAt,
                u.updatedAt=$now,
                u.internal=$internal,
                u.bot=$bot,
                u.profilePhotoUrl=$profilePhotoUrl,
                u.timezone=$timezone
             ON MATCH SET {on_match},
                u.internal=$internal,
                u.bot=$bot,
                u.updatedAt=$now,
                u.sourceOfTruth = CASE WHEN $overwrite=true THEN $sourceOfTruth ELSE u.sourceOfTruth END",
            label = NodeLabel::User.tenant_label(tenant),
            on_match = on_match,
        );
        let now = cypher::now();

        tx.query(cypher)
            .param("tenant", tenant.as_str())
            .param("id", user_id)
            .param("name", &data.name)
            .param("firstName", &data.first_name)
            .param("lastName", &data.last_name)
            .param("internal", data.internal)
            .param("bot", data.bot)
            .param("profilePhotoUrl", &data.profile_photo_url)
            .param("timezone", &data.timezone)
            .param("source", &data.source.source)
            .param("sourceOfTruth", data.source.source_of_truth())
            .param("appSource", data.source.app_source())
            .param("createdAt", cypher::timestamp(data.created_at).unwrap_or_else(|| now.clone()))
            .param("now", &now)
            .param("overwrite", is_overwrite_source(data.source.source_of_truth()))
            .run()
            .await
    }

    pub async fn update_user(&self, tenant: &Tenant, user_id: &str, patch: &UserPatch) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, user_id, "UserRepository::update_user");

        let mut set = SetClause::new("u");
        set.set_gated("name", patch.name.clone())
            .set_gated("firstName", patch.first_name.clone())
            .set_gated("lastName", patch.last_name.clone())
            .set_gated("timezone", patch.timezone.clone())
            .set_gated("profilePhotoUrl", patch.profile_photo_url.clone())
            .source_of_truth()
            .updated_at(&cypher::now());
        let (assignments, params) = set.build();

        self.graph
            .query(format!(
                "MATCH (:Tenant {{name:$tenant}})<-[:USER_BELONGS_TO_TENANT]-(u:User:{label} {{id:$id}})
                 SET {assignments}",
                label = NodeLabel::User.tenant_label(tenant),
                assignments = assignments,
            ))
            .params(params)
            .param("tenant", tenant.as_str())
            .param("id", user_id)
            .param("sourceOfTruth", &patch.source)
            .param("overwrite", is_overwrite_source(&patch.source))
            .run()
            .await
    }

    /// Adds the role once; repeated calls leave `roles` unchanged.
    pub async fn add_role(&self, tenant: &Tenant, user_id: &str, role: &str) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, user_id, role, "UserRepository::add_role");

        self.graph
            .query(
                "MATCH (u:User {id:$id})-[:USER_BELONGS_TO_TENANT]->(:Tenant {name:$tenant})
                 SET u.roles = CASE
                        WHEN u.roles IS NULL THEN [$role]
                        WHEN NOT $role IN u.roles THEN u.roles + $role
                        ELSE u.roles
                    END,
                    u.updatedAt = $now",
            )
            .param("tenant", tenant.as_str())
            .param("id", user_id)
            .param("role", role)
            .param("now", cypher::now())
            .run()
            .await
    }

    pub async fn remove_role(&self, tenant: &Tenant, user_id: &str, role: &str) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, user_id, role, "UserRepository::remove_role");

        self.graph
            .query(
                "MATCH (u:User {id:$id})-[:USER_BELONGS_TO_TENANT]->(:Tenant {name:$tenant})
                 SET u.roles = [item IN coalesce(u.roles, []) WHERE item <> $role],
                    u.updatedAt = $now",
            )
            .param("tenant", tenant.as_str())
            .param("id", user_id)
            .param("role", role)
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
    async fn test_create_in_tx_uses_given_executor() {
        let graph = Arc::new(MockExecutor::new());
        let tx = MockExecutor::new();
        let repo = UserRepository::new(graph.clone());
        let data = UserCreate {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            source: SourceFields::new("slack", "sync"),
            ..Default::default()
        };

        repo.create_user_in_tx(&tx, &tenant(), "u1", &data).await.unwrap();

        assert_eq!(graph.call_count(), 0);
        let call = tx.last_call();
        assert!(call.cypher.contains("MERGE (t)<-[:USER_BELONGS_TO_TENANT]-(u:User:User_acme {id:$id})"));
        assert!(call.cypher.contains("u.firstName = CASE WHEN u.sourceOfTruth=$sourceOfTruth"));
        assert_eq!(call.params["overwrite"], json!(false));
    }

    #[tokio::test]
    async fn test_get_user_decodes_roles() {
        let mock = Arc::new(MockExecutor::new().with_rows(vec![Row::from([(
            "u",
            json!({"id": "u1", "firstName": "Ada", "roles": ["ADMIN", "USER"]}),
        )])]));
        let repo = UserRepository::new(mock);

        let user = repo.get_user(&tenant(), "u1").await.unwrap().unwrap();
        assert_eq!(user.roles, vec!["ADMIN".to_string(), "USER".to_string()]);
        assert_eq!(user.first_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_update_user_skips_absent_fields() {
        let mock = Arc::new(MockExecutor::new());
        let repo = UserRepository::new(mock.clone());
        let patch = UserPatch {
            source: "openline".into(),
            timezone: Some("Europe/Berlin".into()),
            ..Default::default()
        };

        repo.update_user(&tenant(), "u1", &patch).await.unwrap();

        let call = mock.last_call();
        assert!(call.cypher.contains("u.timezone = CASE WHEN"));
        assert!(!call.cypher.contains("u.name ="));
        assert!(call.cypher.contains("u.sourceOfTruth = CASE WHEN $overwrite=true"));
    }
}
