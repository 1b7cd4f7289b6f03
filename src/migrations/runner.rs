//! Schema version bookkeeping.

use crate::cypher;
use crate::error::AppError;
use crate::graph::{CypherExecutor, QueryExt};
use crate::migrations::{create_register, MigrationResult};

/// Current schema version, 0 on a fresh database.
pub async fn schema_version(graph: &dyn CypherExecutor) -> Result<u32, AppError> {
    let version: Option<i64> = graph
        .query("MATCH (v:SchemaVersion {id: 1}) RETURN v.version AS version")
        .fetch_value("version")
        .await?;

    Ok(version.unwrap_or(0).max(0) as u32)
}

/// Records `version` as applied.
pub(super) async fn update_schema_version(
    graph: &dyn CypherExecutor,
    version: u32,
    migration_id: &str,
) -> Result<(), AppError> {
    graph
        .query(
            "MERGE (v:SchemaVersion {id: 1})
             SET v.version = $version,
                 v.appliedMigrations = coalesce(v.appliedMigrations, []) + $migrationId,
                 v.lastAppliedAt = $now",
        )
        .param("version", version as i64)
        .param("migrationId", migration_id)
        .param("now", cypher::now())
        .run()
        .await
}

/// Runs all pending migrations.
///
/// Migrations are applied in version order; only those above the stored
/// version run. The version node is updated after each one, so a failure
/// leaves the database at the last migration that completed.
pub async fn run_migrations(graph: &dyn CypherExecutor) -> Result<MigrationResult, AppError> {
    let register = create_register();
    let previous_version = schema_version(graph).await?;

    let (current_version, applied_migrations) = register.run_pending(graph, previous_version).await?;

    if applied_migrations.is_empty() {
        tracing::info!(version = current_version, "Schema is up to date");
    } else {
        tracing::info!(
            from = previous_version,
            to = current_version,
            applied = applied_migrations.len(),
            "Migrations applied"
        );
    }

    Ok(MigrationResult {
        previous_version,
        current_version,
        applied_migrations,
    })
}
