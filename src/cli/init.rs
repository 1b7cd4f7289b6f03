//! Init command handler.

use color_eyre::eyre::eyre;
use color_eyre::Result;

use crate::config::Config;
use crate::context::Context;
use crate::migrations::run_migrations;

use super::App;

impl App {
    /// Connects to Neo4j and applies pending migrations.
    pub async fn run_init(&self) -> Result<()> {
        let config = Config::load()?;

        tracing::info!("Connecting to Neo4j at {}", config.neo4j.uri);
        let ctx = Context::connect(config)
            .await
            .map_err(|e| eyre!("Failed to connect: {}", e))?;
        tracing::info!(database = %ctx.config.neo4j.database, "Connected to Neo4j");

        let result = run_migrations(ctx.graph.as_ref())
            .await
            .map_err(|e| eyre!("Migration failed: {}", e))?;

        if result.applied_migrations.is_empty() {
            tracing::info!("Schema already at v{}, no migrations needed", result.current_version);
        } else {
            tracing::info!(
                "Migrations complete: v{} -> v{}, applied: {:?}",
                result.previous_version,
                result.current_version,
                result.applied_migrations
            );
        }

        Ok(())
    }
}
