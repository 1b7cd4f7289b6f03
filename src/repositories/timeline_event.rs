//! Timeline reads.
//!
//! A contact's timeline is every event reachable from the contact or its
//! emails and phone numbers through a fixed set of relationship types. An
//! organization's timeline also collects its contacts' events and the
//! events on its contracts and invoices. Hidden events are skipped
//! everywhere; events with status `deleted` are skipped on direct paths.

use chrono::{DateTime, Utc};

use crate::context::{AppGraph, Context};
use crate::di::FromContext;
use crate::error::AppError;
use crate::graph::{Params, QueryExt, Timestamp};
use crate::models::{NodeLabel, TimelineEvent};
use crate::tenant::Tenant;

const CONTACT_DIRECT: &[&str] = &[
    "WORKS_AS",
    "HAS_ACTION",
    "PARTICIPATES",
    "SENT_TO",
    "SENT_BY",
    "PART_OF",
    "REPORTED_BY",
    "DESCRIBES",
    "ATTENDED_BY",
    "CREATED_BY",
];
const WITH_CONTACT: &[&str] = &[
    "HAS_ACTION",
    "PARTICIPATES",
    "SENT_TO",
    "SENT_BY",
    "PART_OF",
    "REPORTED_BY",
    "DESCRIBES",
    "ATTENDED_BY",
    "CREATED_BY",
];
const WITH_ORGANIZATION: &[&str] = &["LOGGED", "REPORTED_BY", "SENT_TO", "SENT_BY", "ACTION_ON"];
const WITH_PROPERTIES: &[&str] = &["SENT_TO", "SENT_BY", "PART_OF", "DESCRIBES", "ATTENDED_BY", "CREATED_BY"];
const WITH_BILLING: &[&str] = &["ACTION_ON"];

const DELETED_STATUS: &str = "deleted";

/// One `UNION` arm: how events are reached from the anchor node.
struct Branch {
    pattern: &'static str,
    relationships: &'static str,
    skip_deleted: bool,
}

const CONTACT_BRANCHES: &[Branch] = &[
    Branch {
        pattern: "(c), p = (c)-[*1..2]-(a:TimelineEvent)",
        relationships: "contactDirect",
        skip_deleted: true,
    },
    Branch {
        pattern: "(c)-[:HAS]->(e:Email|PhoneNumber), p = (e)-[*1..2]-(a:TimelineEvent)",
        relationships: "withProperties",
        skip_deleted: false,
    },
];

const ORGANIZATION_BRANCHES: &[Branch] = &[
    Branch {
        pattern: "(o)<-[:ROLE_IN]-(:JobRole)<-[:WORKS_AS]-(c:Contact), p = (c)-[*1..2]-(a:TimelineEvent)",
        relationships: "withContact",
        skip_deleted: true,
    },
    Branch {
        pattern: "(o), p = (o)-[*1]-(a:TimelineEvent)",
        relationships: "withOrganization",
        skip_deleted: true,
    },
    Branch {
        pattern: "(o)<-[:ROLE_IN]-(:JobRole)<-[:WORKS_AS]-(:Contact)-[:HAS]->(e:Email|PhoneNumber), p = (e)-[*1..2]-(a:TimelineEvent)",
        relationships: "withProperties",
        skip_deleted: false,
    },
    Branch {
        pattern: "(o)-[:HAS|ROLE_IN]-(e:Email|PhoneNumber|JobRole), p = (e)-[*1..2]-(a:TimelineEvent)",
        relationships: "withProperties",
        skip_deleted: false,
    },
    Branch {
        pattern: "(o)-[:HAS_CONTRACT]-(n:Contract), p = (n)--(a:TimelineEvent)",
        relationships: "withBilling",
        skip_deleted: false,
    },
    Branch {
        pattern: "(o)-[:HAS_CONTRACT]-(:Contract)-[:HAS_INVOICE]->(n:Invoice), p = (n)--(a:TimelineEvent)",
        relationships: "withBilling",
        skip_deleted: false,
    },
];

/// Renders `CALL { ... }` collecting `timelineEvent` from every branch.
fn union_of(anchor: &str, branches: &[Branch], before: bool, labels: &[String]) -> String {
    let arms: Vec<String> = branches
        .iter()
        .map(|branch| {
            let mut conditions = vec![format!(
                "all(r IN relationships(p) WHERE type(r) IN ${})",
                branch.relationships
            )];
            if before {
                conditions.push(format!("{} < $before", event_time("a")));
            }
            conditions.push("(a.hide IS NULL OR a.hide = false)".to_string());
            if branch.skip_deleted {
                conditions.push("(a.status IS NULL OR a.status <> $skipStatus)".to_string());
            }
            if !labels.is_empty() {
                conditions.push("size([label IN labels(a) WHERE label IN $nodeLabels | 1]) > 0".to_string());
            }
            format!(
                "WITH {} MATCH {} WHERE {} RETURN a AS timelineEvent",
                anchor,
                branch.pattern,
                conditions.join(" AND ")
            )
        })
        .collect();
    format!("CALL {{ {} }}", arms.join(" UNION "))
}

fn timeline_params(labels: &[String]) -> Params {
    let mut params = Params::new();
    for (name, relationships) in [
        ("contactDirect", CONTACT_DIRECT),
        ("withContact", WITH_CONTACT),
        ("withOrganization", WITH_ORGANIZATION),
        ("withProperties", WITH_PROPERTIES),
        ("withBilling", WITH_BILLING),
    ] {
        params.insert(name.to_string(), relationships.into());
    }
    params.insert("skipStatus".to_string(), DELETED_STATUS.into());
    if !labels.is_empty() {
        params.insert("nodeLabels".to_string(), labels.into());
    }
    params
}

/// When an event happened: its start, else its last update, else creation.
fn event_time(alias: &str) -> String {
    format!("coalesce({a}.startedAt, {a}.updatedAt, {a}.createdAt)", a = alias)
}

fn page_return() -> String {
    format!(
        "RETURN DISTINCT timelineEvent {{.*, labels: labels(timelineEvent)}} AS event
     ORDER BY {} DESC
     LIMIT $size",
        event_time("timelineEvent")
    )
}
const COUNT_RETURN: &str = "RETURN count(DISTINCT timelineEvent) AS total";

#[derive(FromContext, Clone)]
pub struct TimelineEventRepository {
    graph: AppGraph,
}

impl TimelineEventRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    pub async fn get_timeline_event(&self, tenant: &Tenant, id: &str) -> Result<Option<TimelineEvent>, AppError> {
        tracing::debug!(tenant = %tenant, id, "TimelineEventRepository::get_timeline_event");

        let cypher = format!(
            "MATCH (a:TimelineEvent {{id:$id}}) WHERE a:{label}
             RETURN a {{.*, labels: labels(a)}} AS event",
            label = NodeLabel::TimelineEvent.tenant_label(tenant),
        );
        self.graph
            .query(cypher)
            .param("id", id)
            .fetch_value("event")
            .await
    }

    pub async fn get_timeline_events_by_ids(
        &self,
        tenant: &Tenant,
        ids: &[String],
    ) -> Result<Vec<TimelineEvent>, AppError> {
        tracing::debug!(tenant = %tenant, count = ids.len(), "TimelineEventRepository::get_timeline_events_by_ids");

        let cypher = format!(
            "MATCH (a:TimelineEvent) WHERE a.id IN $ids AND a:{label}
             RETURN a {{.*, labels: labels(a)}} AS event",
            label = NodeLabel::TimelineEvent.tenant_label(tenant),
        );
        self.graph
            .query(cypher)
            .param("ids", ids)
            .fetch_column("event")
            .await
    }

    /// Up to `size` events that started before `before`, newest first.
    /// A non-empty `labels` keeps only events carrying one of them.
    pub async fn get_timeline_events_for_contact(
        &self,
        tenant: &Tenant,
        contact_id: &str,
        before: DateTime<Utc>,
        size: i64,
        labels: &[String],
    ) -> Result<Vec<TimelineEvent>, AppError> {
        tracing::debug!(tenant = %tenant, contact_id, size, "TimelineEventRepository::get_timeline_events_for_contact");

        let cypher = format!(
            "MATCH (c:Contact {{id:$contactId}})-[:CONTACT_BELONGS_TO_TENANT]->(:Tenant {{name:$tenant}})
             {}
             {}",
            union_of("c", CONTACT_BRANCHES, true, labels),
            page_return(),
        );
        self.graph
            .query(cypher)
            .params(timeline_params(labels))
            .param("tenant", tenant.as_str())
            .param("contactId", contact_id)
            .param("before", Timestamp::from(before))
            .param("size", size)
            .fetch_column("event")
            .await
    }

    pub async fn get_timeline_events_for_organization(
        &self,
        tenant: &Tenant,
        organization_id: &str,
        before: DateTime<Utc>,
        size: i64,
        labels: &[String],
    ) -> Result<Vec<TimelineEvent>, AppError> {
        tracing::debug!(
            tenant = %tenant,
            organization_id,
            size,
            "TimelineEventRepository::get_timeline_events_for_organization"
        );

        let cypher = format!(
            "MATCH (o:Organization {{id:$organizationId}})-[:ORGANIZATION_BELONGS_TO_TENANT]->(:Tenant {{name:$tenant}})
             {}
             {}",
            union_of("o", ORGANIZATION_BRANCHES, true, labels),
            page_return(),
        );
        self.graph
            .query(cypher)
            .params(timeline_params(labels))
            .param("tenant", tenant.as_str())
            .param("organizationId", organization_id)
            .param("before", Timestamp::from(before))
            .param("size", size)
            .fetch_column("event")
            .await
    }

    pub async fn count_timeline_events_for_contact(
        &self,
        tenant: &Tenant,
        contact_id: &str,
        labels: &[String],
    ) -> Result<i64, AppError> {
        tracing::debug!(tenant = %tenant, contact_id, "TimelineEventRepository::count_timeline_events_for_contact");

        let cypher = format!(
            "MATCH (c:Contact {{id:$contactId}})-[:CONTACT_BELONGS_TO_TENANT]->(:Tenant {{name:$tenant}})
             {}
             {}",
            union_of("c", CONTACT_BRANCHES, false, labels),
            COUNT_RETURN,
        );
        let total = self
            .graph
            .query(cypher)
            .params(timeline_params(labels))
            .param("tenant", tenant.as_str())
            .param("contactId", contact_id)
            .fetch_value("total")
            .await?;
        Ok(total.unwrap_or(0))
    }

    pub async fn count_timeline_events_for_organization(
        &self,
        tenant: &Tenant,
        organization_id: &str,
        labels: &[String],
    ) -> Result<i64, AppError> {
        tracing::debug!(
            tenant = %tenant,
            organization_id,
            "TimelineEventRepository::count_timeline_events_for_organization"
        );

        let cypher = format!(
            "MATCH (o:Organization {{id:$organizationId}})-[:ORGANIZATION_BELONGS_TO_TENANT]->(:Tenant {{name:$tenant}})
             {}
             {}",
            union_of("o", ORGANIZATION_BRANCHES, false, labels),
            COUNT_RETURN,
        );
        let total = self
            .graph
            .query(cypher)
            .params(timeline_params(labels))
            .param("tenant", tenant.as_str())
            .param("organizationId", organization_id)
            .fetch_value("total")
            .await?;
        Ok(total.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::mock::MockExecutor;
    use crate::graph::Row;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::Arc;

    fn tenant() -> Tenant {
        Tenant::new("acme").unwrap()
    }

    #[test]
    fn test_union_has_one_arm_per_branch() {
        let cypher = union_of("o", ORGANIZATION_BRANCHES, false, &[]);
        assert_eq!(cypher.matches("RETURN a AS timelineEvent").count(), 6);
        assert_eq!(cypher.matches(" UNION ").count(), 5);
        assert!(!cypher.contains("$before"));
        assert!(!cypher.contains("$nodeLabels"));
    }

    #[test]
    fn test_deleted_status_only_on_direct_paths() {
        let cypher = union_of("c", CONTACT_BRANCHES, true, &["Issue".to_string()]);
        assert_eq!(cypher.matches("$skipStatus").count(), 1);
        assert_eq!(cypher.matches("$nodeLabels").count(), 2);
        assert_eq!(
            cypher
                .matches("coalesce(a.startedAt, a.updatedAt, a.createdAt) < $before")
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_contact_page_decodes_labels() {
        let mock = Arc::new(MockExecutor::new().with_rows(vec![Row::from([(
            "event",
            json!({"id": "e1", "labels": ["Issue", "TimelineEvent"], "subject": "Login broken"}),
        )])]));
        let repo = TimelineEventRepository::new(mock.clone());
        let before = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();

        let events = repo
            .get_timeline_events_for_contact(&tenant(), "c1", before, 20, &[])
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert!(events[0].has_label("Issue"));
        assert_eq!(events[0].properties["subject"], json!("Login broken"));

        let call = mock.last_call();
        assert_eq!(call.params["size"], json!(20));
        assert_eq!(call.params["skipStatus"], json!("deleted"));
        assert!(!call.params.contains_key("nodeLabels"));
        assert!(call.cypher.contains(
            "ORDER BY coalesce(timelineEvent.startedAt, timelineEvent.updatedAt, timelineEvent.createdAt) DESC"
        ));
    }

    #[tokio::test]
    async fn test_before_is_compared_as_datetime_like_stored_events() {
        let mock = Arc::new(MockExecutor::new());
        let issues = crate::repositories::IssueRepository::new(mock.clone());
        let timeline = TimelineEventRepository::new(mock.clone());
        let created_at = Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();

        issues
            .create_issue(
                &tenant(),
                "i1",
                &crate::models::IssueCreate {
                    subject: "Login broken".into(),
                    reported_by_organization_id: Some("o1".into()),
                    created_at: Some(created_at),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        timeline
            .get_timeline_events_for_organization(&tenant(), "o1", before, 10, &[])
            .await
            .unwrap();

        let calls = mock.calls();
        let stored = crate::graph::datetime_param(&calls[0].params["createdAt"]).unwrap();
        let bound = crate::graph::datetime_param(&calls[1].params["before"]).unwrap();
        assert!(stored < bound);
        assert!(!calls[1].cypher.contains("datetime("));
    }

    #[tokio::test]
    async fn test_organization_count() {
        let mock = Arc::new(MockExecutor::new().with_rows(vec![Row::from([("total", json!(42))])]));
        let repo = TimelineEventRepository::new(mock.clone());

        let total = repo
            .count_timeline_events_for_organization(&tenant(), "o1", &["Issue".to_string()])
            .await
            .unwrap();

        assert_eq!(total, 42);
        assert_eq!(mock.last_call().params["nodeLabels"], json!(["Issue"]));
    }
}
