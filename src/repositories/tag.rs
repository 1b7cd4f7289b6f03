//! Tag reads. Tags reached through a `TAGGED` relationship carry its
//! `taggedAt` and are ordered by it, then by name.

use crate::context::{AppGraph, Context};
use crate::di::FromContext;
use crate::error::AppError;
use crate::graph::{QueryExt, Row};
use crate::models::{Linked, Tag};
use crate::tenant::Tenant;

fn linked_tags(rows: Vec<Row>) -> Result<Vec<Linked<Tag>>, AppError> {
    rows.iter()
        .map(|row| -> Result<Linked<Tag>, AppError> {
            Ok(Linked {
                node: row.get("tag")?,
                linked_id: row.get("linkedId")?,
            })
        })
        .collect()
}

#[derive(FromContext, Clone)]
pub struct TagRepository {
    graph: AppGraph,
}

impl TagRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    pub async fn get_tag(&self, tenant: &Tenant, tag_id: &str) -> Result<Option<Tag>, AppError> {
        tracing::debug!(tenant = %tenant, tag_id, "TagRepository::get_tag");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:TAG_BELONGS_TO_TENANT]-(tag:Tag {id:$id})
                 RETURN tag {.*} AS tag",
            )
            .param("tenant", tenant.as_str())
            .param("id", tag_id)
            .fetch_value("tag")
            .await
    }

    pub async fn get_all(&self, tenant: &Tenant) -> Result<Vec<Tag>, AppError> {
        tracing::debug!(tenant = %tenant, "TagRepository::get_all");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:TAG_BELONGS_TO_TENANT]-(tag:Tag)
                 RETURN tag {.*} AS tag ORDER BY tag.name",
            )
            .param("tenant", tenant.as_str())
            .fetch_column("tag")
            .await
    }

    pub async fn get_by_name(&self, tenant: &Tenant, name: &str) -> Result<Option<Tag>, AppError> {
        tracing::debug!(tenant = %tenant, name, "TagRepository::get_by_name");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:TAG_BELONGS_TO_TENANT]-(tag:Tag {name:$name})
                 RETURN tag {.*} AS tag LIMIT 1",
            )
            .param("tenant", tenant.as_str())
            .param("name", name)
            .fetch_value("tag")
            .await
    }

    pub async fn get_for_contact(&self, tenant: &Tenant, contact_id: &str) -> Result<Vec<Tag>, AppError> {
        tracing::debug!(tenant = %tenant, contact_id, "TagRepository::get_for_contact");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:CONTACT_BELONGS_TO_TENANT]-(:Contact {id:$contactId})-[rel:TAGGED]->(tag:Tag)
                 RETURN tag {.*, taggedAt: rel.taggedAt} AS tag
                 ORDER BY rel.taggedAt, tag.name",
            )
            .param("tenant", tenant.as_str())
            .param("contactId", contact_id)
            .fetch_column("tag")
            .await
    }

    pub async fn get_for_contacts(
        &self,
        tenant: &Tenant,
        contact_ids: &[String],
    ) -> Result<Vec<Linked<Tag>>, AppError> {
        tracing::debug!(tenant = %tenant, count = contact_ids.len(), "TagRepository::get_for_contacts");

        let rows = self
            .graph
            .query(
                "MATCH (t:Tenant {name:$tenant})<-[:CONTACT_BELONGS_TO_TENANT]-(c:Contact)-[rel:TAGGED]->(tag:Tag)-[:TAG_BELONGS_TO_TENANT]->(t)
                 WHERE c.id IN $ids
                 RETURN tag {.*, taggedAt: rel.taggedAt} AS tag, c.id AS linkedId
                 ORDER BY rel.taggedAt, tag.name",
            )
            .param("tenant", tenant.as_str())
            .param("ids", contact_ids)
            .fetch_all()
            .await?;
        linked_tags(rows)
    }

    pub async fn get_for_organizations(
        &self,
        tenant: &Tenant,
        organization_ids: &[String],
    ) -> Result<Vec<Linked<Tag>>, AppError> {
        tracing::debug!(
            tenant = %tenant,
            count = organization_ids.len(),
            "TagRepository::get_for_organizations"
        );

        let rows = self
            .graph
            .query(
                "MATCH (t:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(o:Organization)-[rel:TAGGED]->(tag:Tag)-[:TAG_BELONGS_TO_TENANT]->(t)
                 WHERE o.id IN $ids
                 RETURN tag {.*, taggedAt: rel.taggedAt} AS tag, o.id AS linkedId
                 ORDER BY rel.taggedAt, tag.name",
            )
            .param("tenant", tenant.as_str())
            .param("ids", organization_ids)
            .fetch_all()
            .await?;
        linked_tags(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::mock::MockExecutor;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_tags_for_organizations_are_linked() {
        let mock = Arc::new(MockExecutor::new().with_rows(vec![
            Row::from([
                ("tag", json!({"id": "t1", "name": "vip", "taggedAt": "2024-03-01T10:00:00Z"})),
                ("linkedId", json!("o1")),
            ]),
            Row::from([("tag", json!({"id": "t2", "name": "churn"})), ("linkedId", json!("o2"))]),
        ]));
        let repo = TagRepository::new(mock.clone());
        let tenant = Tenant::new("acme").unwrap();

        let tags = repo
            .get_for_organizations(&tenant, &["o1".to_string(), "o2".to_string()])
            .await
            .unwrap();

        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].linked_id, "o1");
        assert!(tags[0].node.tagged_at.is_some());
        assert_eq!(tags[1].node.name.as_deref(), Some("churn"));
        assert_eq!(mock.last_call().params["ids"], json!(["o1", "o2"]));
    }

    #[tokio::test]
    async fn test_missing_tag_is_none() {
        let repo = TagRepository::new(Arc::new(MockExecutor::new()));
        let tenant = Tenant::new("acme").unwrap();

        assert!(repo.get_by_name(&tenant, "vip").await.unwrap().is_none());
    }
}
