//! Outreach flows, their actions, execution settings and participants.

use crate::context::{AppGraph, Context};
use crate::cypher::{self, SetClause};
use crate::di::FromContext;
use crate::error::AppError;
use crate::graph::{CypherExecutor, QueryExt};
use crate::models::{
    Flow, FlowAction, FlowActionFields, FlowExecutionSettings, FlowExecutionSettingsFields,
    FlowParticipant, FlowSave, NodeLabel,
};
use crate::tenant::Tenant;

/// Status a flow starts in when none is given.
pub const FLOW_STATUS_INACTIVE: &str = "INACTIVE";
/// Status of a freshly enrolled participant.
pub const PARTICIPANT_STATUS_PENDING: &str = "PENDING";

#[derive(FromContext, Clone)]
pub struct FlowRepository {
    graph: AppGraph,
}

impl FlowRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    pub async fn get_flow(&self, tenant: &Tenant, flow_id: &str) -> Result<Option<Flow>, AppError> {
        tracing::debug!(tenant = %tenant, flow_id, "FlowRepository::get_flow");

        self.graph
            .query(format!(
                "MATCH (f:{label} {{id:$id}}) RETURN f {{.*}} AS f",
                label = NodeLabel::Flow.tenant_label(tenant),
            ))
            .param("id", flow_id)
            .fetch_value("f")
            .await
    }

    /// Actions of the flow ordered by their position.
    pub async fn get_flow_actions(&self, tenant: &Tenant, flow_id: &str) -> Result<Vec<FlowAction>, AppError> {
        tracing::debug!(tenant = %tenant, flow_id, "FlowRepository::get_flow_actions");

        self.graph
            .query(format!(
                "MATCH (:{flow} {{id:$id}})-[:HAS]->(a:{action})
                 RETURN a {{.*}} AS a ORDER BY a.index ASC",
                flow = NodeLabel::Flow.tenant_label(tenant),
                action = NodeLabel::FlowAction.tenant_label(tenant),
            ))
            .param("id", flow_id)
            .fetch_column("a")
            .await
    }

    /// Creates the flow or updates the fields present in `data`.
    /// A new flow without a status is `INACTIVE`.
    pub async fn merge_flow(&self, tenant: &Tenant, flow_id: &str, data: &FlowSave) -> Result<Option<Flow>, AppError> {
        tracing::debug!(tenant = %tenant, flow_id, "FlowRepository::merge_flow");

        let now = cypher::now();
        let mut set = SetClause::new("f");
        set.set("name", data.name.clone())
            .set("description", data.description.clone())
            .set("status", data.status.clone())
            .set("nodes", data.nodes.clone())
            .set("edges", data.edges.clone())
            .updated_at(&now);
        let (assignments, params) = set.build();

        self.graph
            .query(format!(
                "MATCH (t:Tenant {{name:$tenant}})
                 MERGE (t)<-[:BELONGS_TO_TENANT]-(f:Flow:{label} {{id:$id}})
                 ON CREATE SET f.createdAt=$now,
                    f.status=$initialStatus,
                    f.source=$source,
                    f.sourceOfTruth=$sourceOfTruth,
                    f.appSource=$appSource
                 SET {assignments}
                 RETURN f {{.*}} AS f",
                label = NodeLabel::Flow.tenant_label(tenant),
                assignments = assignments,
            ))
            .params(params)
            .param("tenant", tenant.as_str())
            .param("id", flow_id)
            .param("now", &now)
            .param("initialStatus", FLOW_STATUS_INACTIVE)
            .param("source", &data.source.source)
            .param("sourceOfTruth", data.source.source_of_truth())
            .param("appSource", data.source.app_source())
            .fetch_value("f")
            .await
    }

    /// Merges the action and attaches it to the flow with `HAS`.
    pub async fn merge_flow_action_in_tx<E: CypherExecutor + ?Sized>(
        &self,
        tx: &E,
        tenant: &Tenant,
        flow_id: &str,
        action_id: &str,
        data: &FlowActionFields,
    ) -> Result<Option<FlowAction>, AppError> {
        tracing::debug!(tenant = %tenant, flow_id, action_id, "FlowRepository::merge_flow_action");

        let now = cypher::now();
        tx.query(format!(
            "MATCH (f:{flow} {{id:$flowId}})
             MERGE (a:FlowAction:{action} {{id:$id}})
             ON CREATE SET a.createdAt=$now
             SET a.externalId=$externalId,
                a.actionType=$actionType,
                a.actionData=$actionData,
                a.index=$index,
                a.updatedAt=$now
             MERGE (f)-[:HAS]->(a)
             RETURN a {{.*}} AS a",
            flow = NodeLabel::Flow.tenant_label(tenant),
            action = NodeLabel::FlowAction.tenant_label(tenant),
        ))
        .param("flowId", flow_id)
        .param("id", action_id)
        .param("externalId", &data.external_id)
        .param("actionType", &data.action_type)
        .param("actionData", &data.action_data)
        .param("index", data.index)
        .param("now", &now)
        .fetch_value("a")
        .await
    }

    /// Rewrites the action payload and position; `None` when it is missing.
    pub async fn update_flow_action_in_tx<E: CypherExecutor + ?Sized>(
        &self,
        tx: &E,
        tenant: &Tenant,
        action_id: &str,
        data: &FlowActionFields,
    ) -> Result<Option<FlowAction>, AppError> {
        tracing::debug!(tenant = %tenant, action_id, "FlowRepository::update_flow_action");

        tx.query(format!(
            "MATCH (a:{action} {{id:$id}})
             SET a.actionType=$actionType,
                a.actionData=$actionData,
                a.index=$index,
                a.updatedAt=$now
             RETURN a {{.*}} AS a",
            action = NodeLabel::FlowAction.tenant_label(tenant),
        ))
        .param("id", action_id)
        .param("actionType", &data.action_type)
        .param("actionData", &data.action_data)
        .param("index", data.index)
        .param("now", cypher::now())
        .fetch_value("a")
        .await
    }

    /// Links two actions of the same flow in execution order.
    pub async fn link_next_action_in_tx<E: CypherExecutor + ?Sized>(
        &self,
        tx: &E,
        tenant: &Tenant,
        from_action_id: &str,
        to_action_id: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, from_action_id, to_action_id, "FlowRepository::link_next_action");

        let label = NodeLabel::FlowAction.tenant_label(tenant);
        tx.query(format!(
            "MATCH (a:{label} {{id:$fromId}}), (b:{label} {{id:$toId}})
             MERGE (a)-[:NEXT]->(b)",
            label = label,
        ))
        .param("fromId", from_action_id)
        .param("toId", to_action_id)
        .run()
        .await
    }

    /// Settings are keyed by flow, entity and entity type; only the mailbox
    /// and user change on a repeated merge.
    pub async fn merge_flow_execution_settings_in_tx<E: CypherExecutor + ?Sized>(
        &self,
        tx: &E,
        tenant: &Tenant,
        settings_id: &str,
        data: &FlowExecutionSettingsFields,
    ) -> Result<Option<FlowExecutionSettings>, AppError> {
        tracing::debug!(
            tenant = %tenant,
            settings_id,
            flow_id = %data.flow_id,
            entity_id = %data.entity_id,
            "FlowRepository::merge_flow_execution_settings"
        );

        let now = cypher::now();
        tx.query(format!(
            "MERGE (s:FlowExecutionSettings:{label} {{flowId:$flowId, entityId:$entityId, entityType:$entityType}})
             ON CREATE SET s.id=$id,
                s.createdAt=$now
             SET s.mailbox=$mailbox,
                s.userId=$userId,
                s.updatedAt=$now
             RETURN s {{.*}} AS s",
            label = NodeLabel::FlowExecutionSettings.tenant_label(tenant),
        ))
        .param("id", settings_id)
        .param("flowId", &data.flow_id)
        .param("entityId", &data.entity_id)
        .param("entityType", &data.entity_type)
        .param("mailbox", &data.mailbox)
        .param("userId", &data.user_id)
        .param("now", &now)
        .fetch_value("s")
        .await
    }

    pub async fn get_flow_execution_settings(
        &self,
        tenant: &Tenant,
        flow_id: &str,
        entity_id: &str,
        entity_type: &str,
    ) -> Result<Option<FlowExecutionSettings>, AppError> {
        tracing::debug!(tenant = %tenant, flow_id, entity_id, "FlowRepository::get_flow_execution_settings");

        self.graph
            .query(format!(
                "MATCH (s:{label} {{flowId:$flowId, entityId:$entityId, entityType:$entityType}})
                 RETURN s {{.*}} AS s LIMIT 1",
                label = NodeLabel::FlowExecutionSettings.tenant_label(tenant),
            ))
            .param("flowId", flow_id)
            .param("entityId", entity_id)
            .param("entityType", entity_type)
            .fetch_value("s")
            .await
    }

    /// Enrolls an entity in the flow. An entity already enrolled keeps its
    /// participant node; the returned participant is the existing one.
    pub async fn add_participant(
        &self,
        tenant: &Tenant,
        flow_id: &str,
        participant_id: &str,
        entity_id: &str,
        entity_label: NodeLabel,
    ) -> Result<Option<FlowParticipant>, AppError> {
        tracing::debug!(tenant = %tenant, flow_id, entity_id, entity = %entity_label, "FlowRepository::add_participant");

        let now = cypher::now();
        self.graph
            .query(format!(
                "MATCH (f:{flow} {{id:$flowId}}), (e:{entity} {{id:$entityId}})
                 MERGE (f)-[:HAS]->(p:FlowParticipant:{participant})-[:HAS]->(e)
                 ON CREATE SET p.id=$id,
                    p.entityId=$entityId,
                    p.entityType=$entityType,
                    p.status=$status,
                    p.createdAt=$now,
                    p.updatedAt=$now
                 RETURN p {{.*}} AS p",
                flow = NodeLabel::Flow.tenant_label(tenant),
                entity = entity_label.tenant_label(tenant),
                participant = NodeLabel::FlowParticipant.tenant_label(tenant),
            ))
            .param("flowId", flow_id)
            .param("id", participant_id)
            .param("entityId", entity_id)
            .param("entityType", entity_label.as_str())
            .param("status", PARTICIPANT_STATUS_PENDING)
            .param("now", &now)
            .fetch_value("p")
            .await
    }

    /// Detaches and removes the participant node of the entity, if enrolled.
    pub async fn remove_participant(
        &self,
        tenant: &Tenant,
        flow_id: &str,
        entity_id: &str,
        entity_label: NodeLabel,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, flow_id, entity_id, entity = %entity_label, "FlowRepository::remove_participant");

        self.graph
            .query(format!(
                "MATCH (:{flow} {{id:$flowId}})-[:HAS]->(p:{participant})-[:HAS]->(:{entity} {{id:$entityId}})
                 DETACH DELETE p",
                flow = NodeLabel::Flow.tenant_label(tenant),
                participant = NodeLabel::FlowParticipant.tenant_label(tenant),
                entity = entity_label.tenant_label(tenant),
            ))
            .param("flowId", flow_id)
            .param("entityId", entity_id)
            .run()
            .await
    }

    pub async fn get_participants(&self, tenant: &Tenant, flow_id: &str) -> Result<Vec<FlowParticipant>, AppError> {
        tracing::debug!(tenant = %tenant, flow_id, "FlowRepository::get_participants");

        self.graph
            .query(format!(
                "MATCH (:{flow} {{id:$flowId}})-[:HAS]->(p:{participant})
                 RETURN p {{.*}} AS p ORDER BY p.createdAt ASC",
                flow = NodeLabel::Flow.tenant_label(tenant),
                participant = NodeLabel::FlowParticipant.tenant_label(tenant),
            ))
            .param("flowId", flow_id)
            .fetch_column("p")
            .await
    }
}
