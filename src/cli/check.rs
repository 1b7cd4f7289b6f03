//! Check command handler.

use color_eyre::eyre::{bail, eyre};
use color_eyre::Result;

use crate::config::Config;
use crate::context::Context;
use crate::di::FromRef;
use crate::migrations::{latest_version, schema_version};
use crate::repositories::TenantReadRepository;
use crate::tenant::Tenant;

use super::App;

impl App {
    /// Verifies that the database answers, that the schema is current and,
    /// when given, that `tenant` exists.
    pub async fn run_check(&self, tenant: Option<&str>) -> Result<()> {
        let config = Config::load()?;

        let ctx = Context::connect(config)
            .await
            .map_err(|e| eyre!("Failed to connect: {}", e))?;
        ctx.client
            .client()
            .ping()
            .await
            .map_err(|e| eyre!("Neo4j at {} is not answering: {}", ctx.config.neo4j.uri, e))?;
        tracing::info!(uri = %ctx.config.neo4j.uri, "Neo4j reachable");

        let current = schema_version(ctx.graph.as_ref()).await?;
        let latest = latest_version();
        if current < latest {
            bail!("Schema is at v{}, v{} available; run `crm-graph init`", current, latest);
        }
        tracing::info!(version = current, "Schema up to date");

        if let Some(name) = tenant {
            let tenant = Tenant::new(name)?;
            let tenants = TenantReadRepository::from_ref(&ctx);
            if !tenants.tenant_exists(tenant.as_str()).await? {
                bail!("Tenant '{}' does not exist", tenant);
            }
            tracing::info!(tenant = %tenant, "Tenant exists");
        }

        Ok(())
    }
}
