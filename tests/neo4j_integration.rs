//! Integration tests against a live Neo4j.
//!
//! Run with: `cargo test --features integration --test neo4j_integration`
//! Connection settings come from `CRM_GRAPH_TEST_NEO4J_URI`,
//! `CRM_GRAPH_TEST_NEO4J_USER` and `CRM_GRAPH_TEST_NEO4J_PASSWORD`.

#![cfg(feature = "integration")]

use std::time::Duration;

use crm_graph::config::{Config, Neo4jConfig};
use crm_graph::consistency::{wait_for_node_created_with_max_wait, wait_for_node_deleted};
use crm_graph::context::Context;
use crm_graph::graph::{GraphClient, QueryExt, Transaction};
use crm_graph::migrations::{latest_version, run_migrations, schema_version};
use crm_graph::models::{
    ComparisonOperator, ContactCreate, ContactPatch, FilterItem, FilterValue, IssueCreate, NodeLabel,
    OrganizationCreate, SearchFilter, SourceFields,
};
use crm_graph::repositories::Repositories;
use crm_graph::tenant::Tenant;
use crm_graph::FromRef;
use serde_json::json;
use serial_test::serial;

const TEST_TENANT: &str = "crm_graph_it";
const OTHER_TENANT: &str = "crm_graph_it_other";

fn test_config() -> Config {
    let env = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.to_string());
    Config {
        neo4j: Neo4jConfig {
            uri: env("CRM_GRAPH_TEST_NEO4J_URI", "bolt://localhost:7687"),
            user: env("CRM_GRAPH_TEST_NEO4J_USER", "neo4j"),
            password: env("CRM_GRAPH_TEST_NEO4J_PASSWORD", "password"),
            ..Neo4jConfig::default()
        },
        ..Config::default()
    }
}

async fn reset_tenant(ctx: &Context, repos: &Repositories, name: &str) -> Tenant {
    let tenant = Tenant::new(name).unwrap();
    repos
        .tenant_write
        .hard_delete_tenant(&tenant)
        .await
        .expect("Failed to clean tenant");
    ctx.graph
        .query("MERGE (:Tenant {name: $tenant})")
        .param("tenant", name)
        .run()
        .await
        .expect("Failed to create tenant");
    tenant
}

async fn setup() -> (Context, Repositories, Tenant) {
    let ctx = Context::connect(test_config())
        .await
        .expect("Failed to connect to test database");
    let repos = Repositories::from_ref(&ctx);
    let tenant = reset_tenant(&ctx, &repos, TEST_TENANT).await;

    (ctx, repos, tenant)
}

async fn teardown(repos: &Repositories, tenant: &Tenant) {
    let _ = repos.tenant_write.hard_delete_tenant(tenant).await;
}

fn contact(first_name: &str, source: &str) -> ContactCreate {
    ContactCreate {
        first_name: Some(first_name.to_string()),
        source: SourceFields::new(source, "integration"),
        ..Default::default()
    }
}

#[serial]
mod neo4j_tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let ctx = Context::connect(test_config()).await.unwrap();

        run_migrations(ctx.graph.as_ref()).await.expect("First run failed");
        let second = run_migrations(ctx.graph.as_ref()).await.expect("Second run failed");

        assert!(second.applied_migrations.is_empty());
        assert_eq!(schema_version(ctx.graph.as_ref()).await.unwrap(), latest_version());
    }

    #[tokio::test]
    async fn test_create_contact_is_idempotent() {
        let (ctx, repos, tenant) = setup().await;

        repos.contact_write.create_contact(&tenant, "c1", &contact("Ada", "hubspot")).await.unwrap();
        repos.contact_write.create_contact(&tenant, "c1", &contact("Grace", "hubspot")).await.unwrap();

        let stored = repos.contact_read.get_contact(&tenant, "c1").await.unwrap().unwrap();
        assert_eq!(stored.first_name.as_deref(), Some("Ada"));
        let count: Option<i64> = ctx
            .graph
            .query(format!("MATCH (c:{}) RETURN count(c) AS count", NodeLabel::Contact.tenant_label(&tenant)))
            .fetch_value("count")
            .await
            .unwrap();
        assert_eq!(count, Some(1));

        teardown(&repos, &tenant).await;
    }

    #[tokio::test]
    async fn test_source_of_truth_gates_updates() {
        let (_ctx, repos, tenant) = setup().await;
        repos.contact_write.create_contact(&tenant, "c1", &contact("Ada", "hubspot")).await.unwrap();

        let foreign = ContactPatch {
            first_name: Some("Grace".into()),
            timezone: Some("Europe/London".into()),
            source: "salesforce".into(),
            ..Default::default()
        };
        repos.contact_write.update_contact(&tenant, "c1", &foreign).await.unwrap();

        let stored = repos.contact_read.get_contact(&tenant, "c1").await.unwrap().unwrap();
        assert_eq!(stored.first_name.as_deref(), Some("Ada"));
        assert_eq!(stored.timezone.as_deref(), Some("Europe/London"));

        let openline = ContactPatch {
            first_name: Some("Grace".into()),
            source: "openline".into(),
            ..Default::default()
        };
        repos.contact_write.update_contact(&tenant, "c1", &openline).await.unwrap();

        let stored = repos.contact_read.get_contact(&tenant, "c1").await.unwrap().unwrap();
        assert_eq!(stored.first_name.as_deref(), Some("Grace"));
        assert_eq!(stored.source_of_truth.as_deref(), Some("openline"));

        teardown(&repos, &tenant).await;
    }

    #[tokio::test]
    async fn test_stale_aggregate_version_is_skipped() {
        let (_ctx, repos, tenant) = setup().await;
        repos.contact_write.create_contact(&tenant, "c1", &contact("Ada", "openline")).await.unwrap();

        let newer = ContactPatch {
            name: Some("v5".into()),
            source: "openline".into(),
            aggregate_version: Some(5),
            ..Default::default()
        };
        assert!(repos.contact_write.update_contact(&tenant, "c1", &newer).await.unwrap());

        let stale = ContactPatch {
            name: Some("v3".into()),
            aggregate_version: Some(3),
            ..newer.clone()
        };
        assert!(!repos.contact_write.update_contact(&tenant, "c1", &stale).await.unwrap());

        let stored = repos.contact_read.get_contact(&tenant, "c1").await.unwrap().unwrap();
        assert_eq!(stored.name.as_deref(), Some("v5"));
        assert_eq!(stored.aggregate_version, Some(5));

        teardown(&repos, &tenant).await;
    }

    #[tokio::test]
    async fn test_soft_delete_hides_contact() {
        let (_ctx, repos, tenant) = setup().await;
        repos.contact_write.create_contact(&tenant, "c1", &contact("Ada", "openline")).await.unwrap();

        assert!(repos.contact_write.soft_delete_contact(&tenant, "c1").await.unwrap());

        let outcome = wait_for_node_deleted(&repos.common, &tenant, "c1", NodeLabel::Contact).await;
        assert!(outcome.is_confirmed());
        assert!(repos.contact_read.get_contact(&tenant, "c1").await.unwrap().is_none());

        teardown(&repos, &tenant).await;
    }

    #[tokio::test]
    async fn test_transaction_rollback_discards_contact() {
        let (ctx, repos, tenant) = setup().await;

        let txn = ctx.client.client().begin().await.unwrap();
        repos
            .contact_write
            .create_contact_in_tx(&txn, &tenant, "c-tx", &contact("Ada", "openline"))
            .await
            .unwrap();
        txn.rollback().await.unwrap();

        let outcome = wait_for_node_created_with_max_wait(
            &repos.common,
            &tenant,
            "c-tx",
            NodeLabel::Contact,
            Duration::from_millis(300),
        )
        .await;
        assert!(!outcome.is_confirmed());

        teardown(&repos, &tenant).await;
    }

    #[tokio::test]
    async fn test_organization_filter_returns_matching_ids() {
        let (_ctx, repos, tenant) = setup().await;
        let public = OrganizationCreate {
            name: "Acme".into(),
            is_public: true,
            source: SourceFields::openline(),
            ..Default::default()
        };
        let private = OrganizationCreate {
            name: "Globex".into(),
            is_public: false,
            ..public.clone()
        };
        repos.organization_write.create_organization(&tenant, "o1", &public).await.unwrap();
        repos.organization_write.create_organization(&tenant, "o2", &private).await.unwrap();

        let filter = SearchFilter::new(vec![FilterItem::new(
            "IS_PUBLIC",
            ComparisonOperator::Eq,
            FilterValue::bool(true),
        )]);
        let ids = repos
            .organization_with_filters
            .get_filtered_organization_ids(&tenant, Some(&filter))
            .await
            .unwrap();

        assert_eq!(ids, vec!["o1".to_string()]);

        teardown(&repos, &tenant).await;
    }

    #[tokio::test]
    async fn test_same_id_stays_isolated_per_tenant() {
        let (ctx, repos, tenant) = setup().await;
        let other = reset_tenant(&ctx, &repos, OTHER_TENANT).await;

        repos.contact_write.create_contact(&tenant, "shared", &contact("Ada", "openline")).await.unwrap();
        repos.contact_write.create_contact(&other, "shared", &contact("Grace", "openline")).await.unwrap();

        let phone = |raw: &str| json!({"rawPhoneNumber": raw});
        repos.phone_number.create(&tenant, "shared", &phone("+1 555"), &SourceFields::openline()).await.unwrap();
        repos.phone_number.create(&other, "shared", &phone("+44 20"), &SourceFields::openline()).await.unwrap();

        let public_elsewhere = OrganizationCreate {
            name: "Globex".into(),
            is_public: true,
            source: SourceFields::openline(),
            ..Default::default()
        };
        repos.organization_write.create_organization(&other, "shared", &public_elsewhere).await.unwrap();

        let stored = repos.contact_read.get_contact(&tenant, "shared").await.unwrap().unwrap();
        assert_eq!(stored.first_name.as_deref(), Some("Ada"));

        let phone = repos.phone_number.get_by_id(&tenant, "shared").await.unwrap().unwrap();
        assert_eq!(phone.get_str("rawPhoneNumber"), Some("+1 555"));
        assert_eq!(repos.phone_number.count(&tenant).await.unwrap(), 1);

        let filter = SearchFilter::new(vec![FilterItem::new(
            "IS_PUBLIC",
            ComparisonOperator::Eq,
            FilterValue::bool(true),
        )]);
        let ids = repos
            .organization_with_filters
            .get_filtered_organization_ids(&tenant, Some(&filter))
            .await
            .unwrap();
        assert!(ids.is_empty());

        teardown(&repos, &other).await;
        teardown(&repos, &tenant).await;
    }

    #[tokio::test]
    async fn test_hidden_organizations_are_not_returned_by_filters() {
        let (_ctx, repos, tenant) = setup().await;
        let visible = OrganizationCreate {
            name: "Acme".into(),
            source: SourceFields::openline(),
            ..Default::default()
        };
        let hidden = OrganizationCreate {
            name: "Initech".into(),
            hide: true,
            ..visible.clone()
        };
        repos.organization_write.create_organization(&tenant, "o1", &visible).await.unwrap();
        repos.organization_write.create_organization(&tenant, "o2", &hidden).await.unwrap();

        let ids = repos
            .organization_with_filters
            .get_filtered_organization_ids(&tenant, None)
            .await
            .unwrap();

        assert_eq!(ids, vec!["o1".to_string()]);

        teardown(&repos, &tenant).await;
    }

    #[tokio::test]
    async fn test_created_issue_appears_on_organization_timeline() {
        let (_ctx, repos, tenant) = setup().await;
        let org = OrganizationCreate {
            name: "Acme".into(),
            source: SourceFields::openline(),
            ..Default::default()
        };
        repos.organization_write.create_organization(&tenant, "o1", &org).await.unwrap();
        let created_at = chrono::Utc::now() - chrono::Duration::hours(1);
        repos
            .issue
            .create_issue(
                &tenant,
                "i1",
                &IssueCreate {
                    subject: "Login broken".into(),
                    reported_by_organization_id: Some("o1".into()),
                    source: SourceFields::openline(),
                    created_at: Some(created_at),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let later = repos
            .timeline_event
            .get_timeline_events_for_organization(&tenant, "o1", chrono::Utc::now() + chrono::Duration::minutes(1), 10, &[])
            .await
            .unwrap();
        assert_eq!(later.len(), 1);
        assert!(later[0].has_label("Issue"));

        let earlier = repos
            .timeline_event
            .get_timeline_events_for_organization(&tenant, "o1", created_at - chrono::Duration::hours(1), 10, &[])
            .await
            .unwrap();
        assert!(earlier.is_empty());

        let stored = repos.common.get_node_by_id(&tenant, "i1", NodeLabel::Issue).await.unwrap().unwrap();
        let stored_at: chrono::DateTime<chrono::Utc> =
            serde_json::from_value(stored.properties["createdAt"].clone()).unwrap();
        assert_eq!(stored_at.timestamp(), created_at.timestamp());

        teardown(&repos, &tenant).await;
    }

    #[tokio::test]
    async fn test_hard_delete_removes_tenant() {
        let (_ctx, repos, tenant) = setup().await;
        repos.contact_write.create_contact(&tenant, "c1", &contact("Ada", "openline")).await.unwrap();

        repos.tenant_write.hard_delete_tenant(&tenant).await.unwrap();

        assert!(!repos.tenant_read.tenant_exists(TEST_TENANT).await.unwrap());
        assert!(!repos.common.exists_by_id(&tenant, "c1", NodeLabel::Contact).await.unwrap());
    }
}
