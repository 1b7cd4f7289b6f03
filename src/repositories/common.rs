//! Label-agnostic lookups and external system links.

use crate::context::{AppGraph, Context};
use crate::cypher;
use crate::di::FromContext;
use crate::error::AppError;
use crate::graph::{CypherExecutor, QueryExt};
use crate::models::{ExternalSystemLink, NodeLabel, NodeRecord};
use crate::tenant::Tenant;

/// Label used to match `label` nodes of `tenant`: the tenant-suffixed label
/// for tenant-scoped nodes, the plain label for global ones.
pub(crate) fn match_label(label: NodeLabel, tenant: &Tenant) -> String {
    if label.is_tenant_scoped() {
        label.tenant_label(tenant)
    } else {
        label.as_str().to_string()
    }
}

/// Repository for queries that work on any node label.
#[derive(FromContext, Clone)]
pub struct CommonRepository {
    graph: AppGraph,
}

impl CommonRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    /// Whether a `label` node with `id` exists for `tenant`.
    pub async fn exists_by_id(
        &self,
        tenant: &Tenant,
        id: &str,
        label: NodeLabel,
    ) -> Result<bool, AppError> {
        tracing::trace!(tenant = %tenant, id, label = %label, "CommonRepository::exists_by_id");

        let cypher = format!(
            "MATCH (n:{} {{id:$id}}) RETURN count(n) > 0 AS exists",
            match_label(label, tenant)
        );
        let exists = self
            .graph
            .query(cypher)
            .param("id", id)
            .fetch_value("exists")
            .await?;
        Ok(exists.unwrap_or(false))
    }

    /// Whether a node with `id` exists for `tenant` under any of `labels`.
    pub async fn exists_by_id_with_any_label(
        &self,
        tenant: &Tenant,
        id: &str,
        labels: &[NodeLabel],
    ) -> Result<bool, AppError> {
        tracing::trace!(tenant = %tenant, id, "CommonRepository::exists_by_id_with_any_label");

        let labels: Vec<String> = labels.iter().map(|l| match_label(*l, tenant)).collect();
        let exists = self
            .graph
            .query(
                "MATCH (n {id:$id})
                 WHERE any(label IN labels(n) WHERE label IN $labels)
                 RETURN count(n) > 0 AS exists",
            )
            .param("id", id)
            .param("labels", labels)
            .fetch_value("exists")
            .await?;
        Ok(exists.unwrap_or(false))
    }

    /// All properties of a `label` node.
    pub async fn get_node_by_id(
        &self,
        tenant: &Tenant,
        id: &str,
        label: NodeLabel,
    ) -> Result<Option<NodeRecord>, AppError> {
        tracing::debug!(tenant = %tenant, id, label = %label, "CommonRepository::get_node_by_id");

        let cypher = format!(
            "MATCH (n:{} {{id:$id}}) RETURN n {{.*}} AS n LIMIT 1",
            match_label(label, tenant)
        );
        self.graph
            .query(cypher)
            .param("id", id)
            .fetch_value("n")
            .await
    }

    pub async fn link_with_external_system(
        &self,
        tenant: &Tenant,
        label: NodeLabel,
        entity_id: &str,
        link: &ExternalSystemLink,
    ) -> Result<(), AppError> {
        self.link_with_external_system_in_tx(self.graph.as_ref(), tenant, label, entity_id, link)
            .await
    }

    /// Merges an `IS_LINKED_WITH` relationship from the node to the tenant's
    /// external system, keyed by the external id.
    pub async fn link_with_external_system_in_tx<E: CypherExecutor + ?Sized>(
        &self,
        tx: &E,
        tenant: &Tenant,
        label: NodeLabel,
        entity_id: &str,
        link: &ExternalSystemLink,
    ) -> Result<(), AppError> {
        link_external_system(tx, tenant, label, entity_id, link).await
    }
}

pub(crate) async fn link_external_system<E: CypherExecutor + ?Sized>(
    tx: &E,
    tenant: &Tenant,
    label: NodeLabel,
    entity_id: &str,
    link: &ExternalSystemLink,
) -> Result<(), AppError> {
    tracing::debug!(
        tenant = %tenant,
        entity_id,
        label = %label,
        external_system = %link.external_system_id,
        "link_with_external_system"
    );

    let cypher = format!(
        "MATCH (t:Tenant {{name:$tenant}})<-[:EXTERNAL_SYSTEM_BELONGS_TO_TENANT]-(e:ExternalSystem {{id:$externalSystemId}})
         MATCH (n:{} {{id:$entityId}})
         MERGE (n)-[r:IS_LINKED_WITH {{externalId:$externalId}}]->(e)
         ON CREATE SET r.syncDate=$syncDate, r.externalUrl=$externalUrl, r.externalSource=$externalSource
         ON MATCH SET r.syncDate=$syncDate",
        match_label(label, tenant)
    );
    tx.query(cypher)
        .param("tenant", tenant.as_str())
        .param("externalSystemId", &link.external_system_id)
        .param("entityId", entity_id)
        .param("externalId", &link.external_id)
        .param("externalUrl", &link.external_url)
        .param("externalSource", &link.external_source)
        .param("syncDate", cypher::timestamp(link.sync_date))
        .run()
        .await
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
    async fn test_exists_uses_tenant_label() {
        let mock = Arc::new(MockExecutor::new().with_rows(vec![Row::from([("exists", json!(true))])]));
        let repo = CommonRepository::new(mock.clone());

        assert!(repo.exists_by_id(&tenant(), "c1", NodeLabel::Contact).await.unwrap());
        assert_eq!(
            mock.last_call().cypher,
            "MATCH (n:Contact_acme {id:$id}) RETURN count(n) > 0 AS exists"
        );
    }

    #[tokio::test]
    async fn test_exists_global_label_and_no_rows() {
        let mock = Arc::new(MockExecutor::new());
        let repo = CommonRepository::new(mock.clone());

        assert!(!repo.exists_by_id(&tenant(), "d1", NodeLabel::Domain).await.unwrap());
        assert!(mock.last_call().cypher.starts_with("MATCH (n:Domain {id:$id})"));
    }

    #[tokio::test]
    async fn test_exists_with_any_label() {
        let mock = Arc::new(MockExecutor::new());
        let repo = CommonRepository::new(mock.clone());

        repo.exists_by_id_with_any_label(&tenant(), "x", &[NodeLabel::Contact, NodeLabel::Organization])
            .await
            .unwrap();
        assert_eq!(
            mock.last_call().params["labels"],
            json!(["Contact_acme", "Organization_acme"])
        );
    }

    #[tokio::test]
    async fn test_get_node_by_id() {
        let mock = Arc::new(MockExecutor::new().with_rows(vec![Row::from([(
            "n",
            json!({"id": "c1", "firstName": "Ann"}),
        )])]));
        let repo = CommonRepository::new(mock.clone());

        let node = repo
            .get_node_by_id(&tenant(), "c1", NodeLabel::Contact)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(node.id, "c1");
        assert_eq!(node.get_str("firstName"), Some("Ann"));

        assert!(repo
            .get_node_by_id(&tenant(), "c2", NodeLabel::Contact)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_link_with_external_system() {
        let mock = MockExecutor::new();
        let repo = CommonRepository::new(Arc::new(MockExecutor::new()));
        let link = ExternalSystemLink {
            external_system_id: "hubspot".into(),
            external_id: "123".into(),
            ..Default::default()
        };

        repo.link_with_external_system_in_tx(&mock, &tenant(), NodeLabel::Organization, "o1", &link)
            .await
            .unwrap();

        let call = mock.last_call();
        assert!(call.cypher.contains("MATCH (n:Organization_acme {id:$entityId})"));
        assert!(call.cypher.contains("MERGE (n)-[r:IS_LINKED_WITH {externalId:$externalId}]->(e)"));
        assert_eq!(call.params["externalId"], json!("123"));
        assert_eq!(call.params["syncDate"], json!(null));
    }
}
