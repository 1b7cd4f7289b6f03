//! Generic tenant-scoped repository.
//!
//! Most CRM entities share one storage shape: a node with a generic and a
//! tenant-suffixed label, keyed by a business `id`, optionally linked to its
//! `Tenant` node, written with source-of-truth gating and soft-deleted by a
//! label swap. [`EntityRepository`] implements that shape once, parameterized
//! by an [`EntityKind`].
//!
//! ```ignore
//! let phones: PhoneNumberRepository = PhoneNumberRepository::from_ref(&ctx);
//! phones.create(&tenant, "p1", &json!({"rawPhoneNumber": "+1 555"}), &source).await?;
//! phones.patch(&tenant, "p1", "hubspot", |set| {
//!     set.set_gated("rawPhoneNumber", Some("+1 556"));
//! }).await?;
//! ```

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::context::{AppGraph, Context};
use crate::cypher::{self, SetClause};
use crate::di::FromContext;
use crate::error::AppError;
use crate::graph::{CypherExecutor, QueryExt};
use crate::models::{is_overwrite_source, ExternalSystemLink, NodeLabel, SourceFields};
use crate::repositories::common::{link_external_system, match_label};
use crate::tenant::Tenant;

/// Metadata of an entity stored through [`EntityRepository`].
pub trait EntityKind: Clone + Send + Sync + 'static {
    const LABEL: NodeLabel;
    type Model: DeserializeOwned + Send;
}

macro_rules! entity_kinds {
    ($($kind:ident => $model:ty),* $(,)?) => {
        /// Marker types for entities without a dedicated repository.
        pub mod kind {
            use super::*;

            $(
                #[derive(Debug, Clone, Copy)]
                pub struct $kind;

                impl EntityKind for $kind {
                    const LABEL: NodeLabel = NodeLabel::$kind;
                    type Model = $model;
                }
            )*
        }
    };
}

entity_kinds! {
    Action => crate::models::NodeRecord,
    BankAccount => crate::models::NodeRecord,
    Comment => crate::models::NodeRecord,
    Country => crate::models::NodeRecord,
    CustomField => crate::models::NodeRecord,
    CustomFieldTemplate => crate::models::NodeRecord,
    Domain => crate::models::NodeRecord,
    ExternalSystem => crate::models::NodeRecord,
    InteractionEvent => crate::models::NodeRecord,
    InvoiceLine => crate::models::InvoiceLine,
    LogEntry => crate::models::NodeRecord,
    MasterPlan => crate::models::NodeRecord,
    Offering => crate::models::NodeRecord,
    Order => crate::models::NodeRecord,
    PhoneNumber => crate::models::NodeRecord,
    Player => crate::models::NodeRecord,
    Reminder => crate::models::NodeRecord,
    Social => crate::models::NodeRecord,
    Workspace => crate::models::NodeRecord,
}

pub type ActionRepository = EntityRepository<kind::Action>;
pub type BankAccountRepository = EntityRepository<kind::BankAccount>;
pub type CommentRepository = EntityRepository<kind::Comment>;
pub type CountryRepository = EntityRepository<kind::Country>;
pub type CustomFieldRepository = EntityRepository<kind::CustomField>;
pub type CustomFieldTemplateRepository = EntityRepository<kind::CustomFieldTemplate>;
pub type DomainRepository = EntityRepository<kind::Domain>;
pub type ExternalSystemRepository = EntityRepository<kind::ExternalSystem>;
pub type InteractionEventRepository = EntityRepository<kind::InteractionEvent>;
pub type InvoiceLineRepository = EntityRepository<kind::InvoiceLine>;
pub type LogEntryRepository = EntityRepository<kind::LogEntry>;
pub type MasterPlanRepository = EntityRepository<kind::MasterPlan>;
pub type OfferingRepository = EntityRepository<kind::Offering>;
pub type OrderRepository = EntityRepository<kind::Order>;
pub type PhoneNumberRepository = EntityRepository<kind::PhoneNumber>;
pub type PlayerRepository = EntityRepository<kind::Player>;
pub type ReminderRepository = EntityRepository<kind::Reminder>;
pub type SocialRepository = EntityRepository<kind::Social>;
pub type WorkspaceRepository = EntityRepository<kind::Workspace>;

/// CRUD over one entity kind.
#[derive(FromContext, Clone)]
pub struct EntityRepository<K: EntityKind> {
    graph: AppGraph,
    #[from_context(default)]
    kind: PhantomData<K>,
}

impl<K: EntityKind> EntityRepository<K> {
    pub fn new(graph: AppGraph) -> Self {
        Self {
            graph,
            kind: PhantomData,
        }
    }

    pub fn label(&self) -> NodeLabel {
        K::LABEL
    }

    fn node_label(tenant: &Tenant) -> String {
        match_label(K::LABEL, tenant)
    }

    pub async fn get_by_id(&self, tenant: &Tenant, id: &str) -> Result<Option<K::Model>, AppError> {
        tracing::debug!(tenant = %tenant, id, label = K::LABEL.as_str(), "EntityRepository::get_by_id");

        let cypher = format!(
            "MATCH (n:{} {{id:$id}}) RETURN n {{.*}} AS n LIMIT 1",
            Self::node_label(tenant)
        );
        self.graph
            .query(cypher)
            .param("id", id)
            .fetch_value("n")
            .await
    }

    /// Nodes for the ids that exist; unknown ids are skipped.
    pub async fn get_by_ids(&self, tenant: &Tenant, ids: &[String]) -> Result<Vec<K::Model>, AppError> {
        tracing::debug!(tenant = %tenant, count = ids.len(), label = K::LABEL.as_str(), "EntityRepository::get_by_ids");

        let cypher = format!(
            "MATCH (n:{}) WHERE n.id IN $ids RETURN n {{.*}} AS n",
            Self::node_label(tenant)
        );
        self.graph
            .query(cypher)
            .param("ids", ids)
            .fetch_column("n")
            .await
    }

    pub async fn exists(&self, tenant: &Tenant, id: &str) -> Result<bool, AppError> {
        let cypher = format!(
            "MATCH (n:{} {{id:$id}}) RETURN count(n) > 0 AS exists",
            Self::node_label(tenant)
        );
        let exists = self
            .graph
            .query(cypher)
            .param("id", id)
            .fetch_value("exists")
            .await?;
        Ok(exists.unwrap_or(false))
    }

    pub async fn count(&self, tenant: &Tenant) -> Result<i64, AppError> {
        let cypher = format!("MATCH (n:{}) RETURN count(n) AS count", Self::node_label(tenant));
        let count = self.graph.query(cypher).fetch_value("count").await?;
        Ok(count.unwrap_or(0))
    }

    /// A page of nodes, oldest first.
    pub async fn list(&self, tenant: &Tenant, skip: i64, limit: i64) -> Result<Vec<K::Model>, AppError> {
        tracing::debug!(tenant = %tenant, skip, limit, label = K::LABEL.as_str(), "EntityRepository::list");

        let cypher = format!(
            "MATCH (n:{}) RETURN n {{.*}} AS n ORDER BY n.createdAt, n.id SKIP $skip LIMIT $limit",
            Self::node_label(tenant)
        );
        self.graph
            .query(cypher)
            .param("skip", skip.max(0))
            .param("limit", limit.max(0))
            .fetch_column("n")
            .await
    }

    pub async fn create<P: Serialize>(
        &self,
        tenant: &Tenant,
        id: &str,
        props: &P,
        source: &SourceFields,
    ) -> Result<K::Model, AppError> {
        self.create_in_tx(self.graph.as_ref(), tenant, id, props, source)
            .await
    }

    /// Merges the node by `id`. `props` and the source triple are only
    /// written when the node is created; merging an existing id returns it
    /// unchanged.
    pub async fn create_in_tx<E: CypherExecutor + ?Sized, P: Serialize>(
        &self,
        tx: &E,
        tenant: &Tenant,
        id: &str,
        props: &P,
        source: &SourceFields,
    ) -> Result<K::Model, AppError> {
        tracing::debug!(tenant = %tenant, id, label = K::LABEL.as_str(), "EntityRepository::create");

        let props = match serde_json::to_value(props) {
            Ok(JsonValue::Object(map)) => map,
            Ok(JsonValue::Null) => serde_json::Map::new(),
            Ok(other) => {
                return Err(AppError::Validation(format!(
                    "{} properties must be an object, got {}",
                    K::LABEL,
                    other
                )))
            }
            Err(e) => return Err(AppError::Internal(format!("failed to serialize properties: {}", e))),
        };

        let label = K::LABEL.as_str();
        let on_create = "n += $props, n.id = $id, n.source = $source, n.sourceOfTruth = $sourceOfTruth, \
                         n.appSource = $appSource, n.createdAt = $now, n.updatedAt = $now";
        let cypher = match (K::LABEL.is_tenant_scoped(), K::LABEL.belongs_to_tenant()) {
            (true, Some(rel)) => format!(
                "MATCH (t:Tenant {{name:$tenant}})
                 MERGE (t)<-[:{rel}]-(n:{label} {{id:$id}})
                 ON CREATE SET n:{tenant_label}, {on_create}
                 RETURN n {{.*}} AS n",
                rel = rel,
                label = label,
                tenant_label = K::LABEL.tenant_label(tenant),
                on_create = on_create,
            ),
            (true, None) => format!(
                "MERGE (n:{label}:{tenant_label} {{id:$id}})
                 ON CREATE SET {on_create}
                 RETURN n {{.*}} AS n",
                label = label,
                tenant_label = K::LABEL.tenant_label(tenant),
                on_create = on_create,
            ),
            (false, _) => format!(
                "MERGE (n:{label} {{id:$id}})
                 ON CREATE SET {on_create}
                 RETURN n {{.*}} AS n",
                label = label,
                on_create = on_create,
            ),
        };

        let node = tx
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("id", id)
            .param_raw("props", JsonValue::Object(props))
            .param("source", &source.source)
            .param("sourceOfTruth", source.source_of_truth())
            .param("appSource", source.app_source())
            .param("now", cypher::now())
            .fetch_value("n")
            .await?;
        node.ok_or_else(|| AppError::not_found("Tenant", tenant.as_str()))
    }

    /// Applies a sparse update built by `build` on alias `n`.
    ///
    /// `source` is the writing system: gated assignments only replace values
    /// it owns (or blank ones) unless it is an overwrite source. Returns the
    /// updated node, or `None` when it does not exist.
    pub async fn patch<F>(
        &self,
        tenant: &Tenant,
        id: &str,
        source: &str,
        build: F,
    ) -> Result<Option<K::Model>, AppError>
    where
        F: FnOnce(&mut SetClause),
    {
        tracing::debug!(tenant = %tenant, id, source, label = K::LABEL.as_str(), "EntityRepository::patch");

        let mut set = SetClause::new("n");
        build(&mut set);
        if set.is_empty() {
            return self.get_by_id(tenant, id).await;
        }
        set.source_of_truth().updated_at(&cypher::now());
        let (assignments, params) = set.build();

        let cypher = format!(
            "MATCH (n:{} {{id:$id}}) SET {} RETURN n {{.*}} AS n",
            Self::node_label(tenant),
            assignments
        );
        self.graph
            .query(cypher)
            .params(params)
            .param("id", id)
            .param("sourceOfTruth", source)
            .param("overwrite", is_overwrite_source(source))
            .fetch_value("n")
            .await
    }

    /// Replaces the node's labels with their `Deleted*` counterparts.
    /// Returns whether a node was found.
    pub async fn soft_delete(&self, tenant: &Tenant, id: &str) -> Result<bool, AppError> {
        tracing::debug!(tenant = %tenant, id, label = K::LABEL.as_str(), "EntityRepository::soft_delete");

        let (active, deleted) = if K::LABEL.is_tenant_scoped() {
            (
                format!("{}:{}", K::LABEL, K::LABEL.tenant_label(tenant)),
                format!("{}:{}", K::LABEL.deleted_label(), K::LABEL.deleted_tenant_label(tenant)),
            )
        } else {
            (K::LABEL.to_string(), K::LABEL.deleted_label())
        };
        let cypher = format!(
            "MATCH (n:{label} {{id:$id}})
             SET n:{deleted}, n.updatedAt = $now
             REMOVE n:{active}
             RETURN count(n) > 0 AS deleted",
            label = Self::node_label(tenant),
            deleted = deleted,
            active = active,
        );
        let found = self
            .graph
            .query(cypher)
            .param("id", id)
            .param("now", cypher::now())
            .fetch_value("deleted")
            .await?;
        Ok(found.unwrap_or(false))
    }

    /// Removes the node and its relationships.
    pub async fn hard_delete(&self, tenant: &Tenant, id: &str) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, id, label = K::LABEL.as_str(), "EntityRepository::hard_delete");

        let cypher = format!("MATCH (n:{} {{id:$id}}) DETACH DELETE n", Self::node_label(tenant));
        self.graph.query(cypher).param("id", id).run().await
    }

    pub async fn link_external_system(
        &self,
        tenant: &Tenant,
        id: &str,
        link: &ExternalSystemLink,
    ) -> Result<(), AppError> {
        link_external_system(self.graph.as_ref(), tenant, K::LABEL, id, link).await
    }

    pub async fn link_external_system_in_tx<E: CypherExecutor + ?Sized>(
        &self,
        tx: &E,
        tenant: &Tenant,
        id: &str,
        link: &ExternalSystemLink,
    ) -> Result<(), AppError> {
        link_external_system(tx, tenant, K::LABEL, id, link).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::mock::MockExecutor;
    use crate::graph::Row;
    use crate::cypher::Blank;
    use serde_json::json;
    use std::sync::Arc;

    fn tenant() -> Tenant {
        Tenant::new("acme").unwrap()
    }

    fn node(props: JsonValue) -> Vec<Row> {
        vec![Row::from([("n", props)])]
    }

    #[tokio::test]
    async fn test_get_by_id_found_and_missing() {
        let mock = Arc::new(MockExecutor::new().with_rows(node(json!({"id": "p1", "e164": "+1555"}))));
        let phones = PhoneNumberRepository::new(mock.clone());

        let found = phones.get_by_id(&tenant(), "p1").await.unwrap().unwrap();
        assert_eq!(found.get_str("e164"), Some("+1555"));
        assert_eq!(
            mock.last_call().cypher,
            "MATCH (n:PhoneNumber_acme {id:$id}) RETURN n {.*} AS n LIMIT 1"
        );

        assert!(phones.get_by_id(&tenant(), "p2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_typed_model() {
        let mock = Arc::new(MockExecutor::new().with_rows(node(json!({"id": "l1", "quantity": 3}))));
        let lines = InvoiceLineRepository::new(mock);

        let line = lines.get_by_id(&tenant(), "l1").await.unwrap().unwrap();
        assert_eq!(line.quantity, Some(3));
    }

    #[tokio::test]
    async fn test_create_with_tenant_relationship() {
        let mock = Arc::new(MockExecutor::new().with_rows(node(json!({"id": "p1"}))));
        let phones = PhoneNumberRepository::new(mock.clone());

        phones
            .create(&tenant(), "p1", &json!({"rawPhoneNumber": "+1 555"}), &SourceFields::new("hubspot", "sync"))
            .await
            .unwrap();

        let call = mock.last_call();
        assert!(call.cypher.contains(
            "MERGE (t)<-[:PHONE_NUMBER_BELONGS_TO_TENANT]-(n:PhoneNumber {id:$id})"
        ));
        assert!(call.cypher.contains("ON CREATE SET n:PhoneNumber_acme, n += $props"));
        assert_eq!(call.params["props"], json!({"rawPhoneNumber": "+1 555"}));
        assert_eq!(call.params["sourceOfTruth"], json!("hubspot"));
        assert_eq!(call.params["appSource"], json!("sync"));
    }

    #[tokio::test]
    async fn test_create_without_tenant_relationship_and_global() {
        let mock = Arc::new(MockExecutor::new().with_rows(node(json!({"id": "r1"}))).with_rows(node(json!({"id": "d1"}))));

        ReminderRepository::new(mock.clone())
            .create(&tenant(), "r1", &json!({}), &SourceFields::openline())
            .await
            .unwrap();
        assert!(mock.last_call().cypher.contains("MERGE (n:Reminder:Reminder_acme {id:$id})"));

        DomainRepository::new(mock.clone())
            .create(&tenant(), "d1", &json!({"domain": "acme.com"}), &SourceFields::openline())
            .await
            .unwrap();
        assert!(mock.last_call().cypher.starts_with("MERGE (n:Domain {id:$id})"));
    }

    #[tokio::test]
    async fn test_create_missing_tenant_is_not_found() {
        let mock = Arc::new(MockExecutor::new());
        let result = SocialRepository::new(mock)
            .create(&tenant(), "s1", &json!({}), &SourceFields::openline())
            .await;
        assert!(matches!(result, Err(AppError::NotFound { entity: "Tenant", .. })));
    }

    #[tokio::test]
    async fn test_create_rejects_non_object_props() {
        let mock = Arc::new(MockExecutor::new());
        let result = CommentRepository::new(mock.clone())
            .create(&tenant(), "c1", &json!([1, 2]), &SourceFields::openline())
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_patch_is_gated() {
        let mock = Arc::new(MockExecutor::new().with_rows(node(json!({"id": "s1"}))));
        let socials = SocialRepository::new(mock.clone());

        socials
            .patch(&tenant(), "s1", "hubspot", |set| {
                set.set_gated("url", Some("https://linkedin.com/in/ann"))
                    .set_gated_blank("followersCount", Some(10), Blank::NullOrZero);
            })
            .await
            .unwrap();

        let call = mock.last_call();
        assert!(call.cypher.starts_with("MATCH (n:Social_acme {id:$id}) SET n.url = CASE WHEN n.sourceOfTruth=$sourceOfTruth"));
        assert!(call.cypher.contains("n.sourceOfTruth = CASE WHEN $overwrite=true"));
        assert_eq!(call.params["overwrite"], json!(false));
        assert_eq!(call.params["followersCount"], json!(10));
    }

    #[tokio::test]
    async fn test_empty_patch_reads_instead_of_writing() {
        let mock = Arc::new(MockExecutor::new());
        let socials = SocialRepository::new(mock.clone());

        let result = socials.patch(&tenant(), "s1", "openline", |_| {}).await.unwrap();
        assert!(result.is_none());
        assert!(!mock.last_call().cypher.contains("SET"));
    }

    #[tokio::test]
    async fn test_soft_delete_swaps_labels() {
        let mock = Arc::new(MockExecutor::new().with_rows(vec![Row::from([("deleted", json!(true))])]));
        let actions = ActionRepository::new(mock.clone());

        assert!(actions.soft_delete(&tenant(), "a1").await.unwrap());
        let cypher = mock.last_call().cypher;
        assert!(cypher.contains("SET n:DeletedAction:DeletedAction_acme"));
        assert!(cypher.contains("REMOVE n:Action:Action_acme"));
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let mock = Arc::new(
            MockExecutor::new()
                .with_rows(vec![Row::from([("count", json!(2))])])
                .with_rows(vec![Row::from([("n", json!({"id": "o1"}))]), Row::from([("n", json!({"id": "o2"}))])]),
        );
        let offerings = OfferingRepository::new(mock.clone());

        assert_eq!(offerings.count(&tenant()).await.unwrap(), 2);
        let page = offerings.list(&tenant(), -5, 10).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(mock.last_call().params["skip"], json!(0));
    }
}
