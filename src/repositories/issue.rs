//! Issue writes. Issues are timeline events and carry both label sets.

use crate::context::{AppGraph, Context};
use crate::cypher::{self, gated_assignment, Blank, SetClause};
use crate::di::FromContext;
use crate::error::AppError;
use crate::graph::QueryExt;
use crate::models::{is_overwrite_source, IssueCreate, IssuePatch, NodeLabel};
use crate::tenant::Tenant;

const TEXT_FIELDS: &[&str] = &["groupId", "subject", "description", "status", "priority"];

#[derive(FromContext, Clone)]
pub struct IssueRepository {
    graph: AppGraph,
}

impl IssueRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    /// Merges the issue. An existing issue is updated under source-of-truth
    /// rules. Reporter and submitter links are added when those nodes exist
    /// in the tenant.
    pub async fn create_issue(&self, tenant: &Tenant, issue_id: &str, data: &IssueCreate) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, issue_id, "IssueRepository::create_issue");

        let on_match = TEXT_FIELDS
            .iter()
            .map(|field| gated_assignment("i", field, "sourceOfTruth", Blank::NullOrEmpty))
            .collect::<Vec<_>>()
            .join(",\n                ");
        let cypher = format!(
            "MATCH (t:Tenant {{name:$tenant}})
             MERGE (t)<-[:ISSUE_BELONGS_TO_TENANT]-(i:Issue {{id:$id}})
             ON CREATE SET i:{issue},
                i:TimelineEvent,
                i:{timeline},
                i.createdAt=$createdAt,
                i.updatedAt=$now,
                i.source=$source,
                i.sourceOfTruth=$sourceOfTruth,
                i.appSource=$appSource,
                i.groupId=$groupId,
                i.subject=$subject,
                i.description=$description,
                i.status=$status,
                i.priority=$priority
             ON MATCH SET {on_match},
                i.sourceOfTruth = CASE WHEN $overwrite=true THEN $sourceOfTruth ELSE i.sourceOfTruth END,
                i.updatedAt=$now
             WITH i, t
             OPTIONAL MATCH (t)<-[:ORGANIZATION_BELONGS_TO_TENANT]-(reporter:Organization {{id:$reportedByOrganizationId}})
             FOREACH (ignore IN CASE WHEN reporter IS NOT NULL THEN [1] ELSE [] END |
                MERGE (i)-[:REPORTED_BY]->(reporter))
             WITH i, t
             OPTIONAL MATCH (t)<-[:ORGANIZATION_BELONGS_TO_TENANT]-(submitter:Organization {{id:$submittedByOrganizationId}})
             FOREACH (ignore IN CASE WHEN submitter IS NOT NULL THEN [1] ELSE [] END |
                MERGE (i)-[:SUBMITTED_BY]->(submitter))
             WITH i, t
             OPTIONAL MATCH (t)<-[:USER_BELONGS_TO_TENANT]-(u:User {{id:$submittedByUserId}})
             FOREACH (ignore IN CASE WHEN u IS NOT NULL THEN [1] ELSE [] END |
                MERGE (i)-[:SUBMITTED_BY]->(u))",
            issue = NodeLabel::Issue.tenant_label(tenant),
            timeline = NodeLabel::TimelineEvent.tenant_label(tenant),
            on_match = on_match,
        );
        let now = cypher::now();

        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("id", issue_id)
            .param("createdAt", cypher::timestamp(data.created_at).unwrap_or_else(|| now.clone()))
            .param("now", &now)
            .param("source", &data.source.source)
            .param("sourceOfTruth", data.source.source_of_truth())
            .param("appSource", data.source.app_source())
            .param("groupId", &data.group_id)
            .param("subject", &data.subject)
            .param("description", &data.description)
            .param("status", &data.status)
            .param("priority", &data.priority)
            .param("reportedByOrganizationId", data.reported_by_organization_id.as_deref().unwrap_or(""))
            .param("submittedByOrganizationId", data.submitted_by_organization_id.as_deref().unwrap_or(""))
            .param("submittedByUserId", data.submitted_by_user_id.as_deref().unwrap_or(""))
            .param("overwrite", data.source.overwrite())
            .run()
            .await
    }

    pub async fn update_issue(&self, tenant: &Tenant, issue_id: &str, patch: &IssuePatch) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, issue_id, "IssueRepository::update_issue");

        let mut set = SetClause::new("i");
        set.set_gated("groupId", patch.group_id.clone())
            .set_gated("subject", patch.subject.clone())
            .set_gated("description", patch.description.clone())
            .set_gated("status", patch.status.clone())
            .set_gated("priority", patch.priority.clone())
            .source_of_truth()
            .updated_at(&cypher::now());
        let (assignments, params) = set.build();

        self.graph
            .query(format!(
                "MATCH (:Tenant {{name:$tenant}})<-[:ISSUE_BELONGS_TO_TENANT]-(i:Issue {{id:$id}})
                 SET {}",
                assignments
            ))
            .params(params)
            .param("tenant", tenant.as_str())
            .param("id", issue_id)
            .param("sourceOfTruth", &patch.source)
            .param("overwrite", is_overwrite_source(&patch.source))
            .run()
            .await
    }

    pub async fn add_user_assignee(&self, tenant: &Tenant, issue_id: &str, user_id: &str) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, issue_id, user_id, "IssueRepository::add_user_assignee");
        self.link_user(tenant, issue_id, user_id, "ASSIGNED_TO").await
    }

    pub async fn remove_user_assignee(&self, tenant: &Tenant, issue_id: &str, user_id: &str) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, issue_id, user_id, "IssueRepository::remove_user_assignee");
        self.unlink_user(tenant, issue_id, user_id, "ASSIGNED_TO").await
    }

    pub async fn add_user_follower(&self, tenant: &Tenant, issue_id: &str, user_id: &str) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, issue_id, user_id, "IssueRepository::add_user_follower");
        self.link_user(tenant, issue_id, user_id, "FOLLOWED_BY").await
    }

    pub async fn remove_user_follower(&self, tenant: &Tenant, issue_id: &str, user_id: &str) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, issue_id, user_id, "IssueRepository::remove_user_follower");
        self.unlink_user(tenant, issue_id, user_id, "FOLLOWED_BY").await
    }

    /// Marks every issue of the group as reported by the organization.
    pub async fn reported_by_organization_with_group_id(
        &self,
        tenant: &Tenant,
        organization_id: &str,
        group_id: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(
            tenant = %tenant,
            organization_id,
            group_id,
            "IssueRepository::reported_by_organization_with_group_id"
        );

        self.graph
            .query(
                "MATCH (t:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(o:Organization {id:$organizationId})
                 MATCH (t)<-[:ISSUE_BELONGS_TO_TENANT]-(i:Issue {groupId:$groupId})
                 MERGE (i)-[:REPORTED_BY]->(o)",
            )
            .param("tenant", tenant.as_str())
            .param("organizationId", organization_id)
            .param("groupId", group_id)
            .run()
            .await
    }

    pub async fn remove_reported_by_organization_with_group_id(
        &self,
        tenant: &Tenant,
        organization_id: &str,
        group_id: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(
            tenant = %tenant,
            organization_id,
            group_id,
            "IssueRepository::remove_reported_by_organization_with_group_id"
        );

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(:Organization {id:$organizationId})<-[r:REPORTED_BY]-(:Issue {groupId:$groupId})
                 DELETE r",
            )
            .param("tenant", tenant.as_str())
            .param("organizationId", organization_id)
            .param("groupId", group_id)
            .run()
            .await
    }

    async fn link_user(&self, tenant: &Tenant, issue_id: &str, user_id: &str, rel: &str) -> Result<(), AppError> {
        let cypher = format!(
            "MATCH (t:Tenant {{name:$tenant}})<-[:ISSUE_BELONGS_TO_TENANT]-(i:Issue {{id:$issueId}}),
                   (t)<-[:USER_BELONGS_TO_TENANT]-(u:User {{id:$userId}})
             MERGE (i)-[:{rel}]->(u)
             ON CREATE SET i.updatedAt = $now",
            rel = rel,
        );
        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("issueId", issue_id)
            .param("userId", user_id)
            .param("now", cypher::now())
            .run()
            .await
    }

    async fn unlink_user(&self, tenant: &Tenant, issue_id: &str, user_id: &str, rel: &str) -> Result<(), AppError> {
        let cypher = format!(
            "MATCH (t:Tenant {{name:$tenant}})<-[:ISSUE_BELONGS_TO_TENANT]-(i:Issue {{id:$issueId}}),
                   (t)<-[:USER_BELONGS_TO_TENANT]-(u:User {{id:$userId}}),
                   (i)-[r:{rel}]->(u)
             SET i.updatedAt = $now
             DELETE r",
            rel = rel,
        );
        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("issueId", issue_id)
            .param("userId", user_id)
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
    async fn test_create_issue_labels_and_links() {
        let mock = Arc::new(MockExecutor::new());
        let repo = IssueRepository::new(mock.clone());
        let data = IssueCreate {
            subject: "Login broken".into(),
            status: "open".into(),
            reported_by_organization_id: Some("o1".into()),
            source: SourceFields::new("zendesk", "sync"),
            ..Default::default()
        };

        repo.create_issue(&tenant(), "i1", &data).await.unwrap();

        let call = mock.last_call();
        assert!(call.cypher.contains("ON CREATE SET i:Issue_acme,"));
        assert!(call.cypher.contains("i:TimelineEvent_acme"));
        assert!(call.cypher.contains(
            "i.subject = CASE WHEN i.sourceOfTruth=$sourceOfTruth OR $overwrite=true OR i.subject IS NULL OR i.subject = '' THEN $subject ELSE i.subject END"
        ));
        assert_eq!(call.params["reportedByOrganizationId"], json!("o1"));
        assert_eq!(call.params["submittedByUserId"], json!(""));
        assert_eq!(call.params["overwrite"], json!(false));
    }

    #[tokio::test]
    async fn test_update_issue_gates_present_fields() {
        let mock = Arc::new(MockExecutor::new());
        let repo = IssueRepository::new(mock.clone());
        let patch = IssuePatch {
            source: "openline".into(),
            status: Some("closed".into()),
            ..Default::default()
        };

        repo.update_issue(&tenant(), "i1", &patch).await.unwrap();

        let call = mock.last_call();
        assert!(call.cypher.contains("i.status = CASE WHEN"));
        assert!(!call.cypher.contains("i.subject"));
        assert_eq!(call.params["overwrite"], json!(true));
    }

    #[tokio::test]
    async fn test_assignee_and_follower_relationships() {
        let mock = Arc::new(MockExecutor::new());
        let repo = IssueRepository::new(mock.clone());

        repo.add_user_assignee(&tenant(), "i1", "u1").await.unwrap();
        repo.remove_user_follower(&tenant(), "i1", "u2").await.unwrap();

        let calls = mock.calls();
        assert!(calls[0].cypher.contains("MERGE (i)-[:ASSIGNED_TO]->(u)"));
        assert!(calls[1].cypher.contains("(i)-[r:FOLLOWED_BY]->(u)"));
        assert!(calls[1].cypher.contains("DELETE r"));
    }
}
