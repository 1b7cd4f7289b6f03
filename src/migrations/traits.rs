//! Migration trait and registry.

use futures::future::BoxFuture;

use crate::error::AppError;
use crate::graph::{CypherExecutor, QueryExt};
use crate::migrations::runner::update_schema_version;

/// One forward-only schema step.
///
/// `up` must be idempotent: a migration interrupted after some statements
/// ran is applied again from the start.
pub trait Migration: Send + Sync {
    fn id(&self) -> &'static str;
    fn version(&self) -> u32;
    fn description(&self) -> &'static str;
    fn up<'a>(&'a self, graph: &'a dyn CypherExecutor) -> BoxFuture<'a, Result<(), AppError>>;
}

/// A schema statement and whether a failure aborts the migration.
#[derive(Debug, Clone, Copy)]
pub struct Ddl {
    pub name: &'static str,
    pub cypher: &'static str,
    pub required: bool,
}

/// Runs each statement in its own auto-commit transaction.
///
/// Neo4j rejects schema and data changes in the same transaction, so DDL is
/// never run inside the caller's transaction. A failed optional statement
/// (typically a uniqueness constraint over existing duplicates) is logged and
/// skipped.
pub async fn apply_ddl(graph: &dyn CypherExecutor, statements: &[Ddl]) -> Result<(), AppError> {
    for ddl in statements {
        tracing::debug!(name = ddl.name, "Applying schema statement");
        match graph.query(ddl.cypher).run().await {
            Ok(()) => {}
            Err(err) if !ddl.required => {
                tracing::warn!(name = ddl.name, error = %err, "Optional schema statement failed, skipping");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// Ordered set of migrations.
pub struct Register {
    migrations: Vec<Box<dyn Migration>>,
}

impl Register {
    pub fn new() -> Self {
        Self {
            migrations: Vec::new(),
        }
    }

    pub fn register(mut self, migration: impl Migration + 'static) -> Self {
        self.migrations.push(Box::new(migration));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Migration> {
        self.migrations.iter().map(|m| m.as_ref())
    }

    /// Highest version in the register, 0 when empty.
    pub fn latest_version(&self) -> u32 {
        self.migrations.iter().map(|m| m.version()).max().unwrap_or(0)
    }

    /// Applies the migrations above `current_version` in order, recording
    /// the schema version after each one. Returns the new version and the
    /// ids that ran.
    pub async fn run_pending(
        &self,
        graph: &dyn CypherExecutor,
        current_version: u32,
    ) -> Result<(u32, Vec<String>), AppError> {
        let mut applied = vec![];
        let mut new_version = current_version;

        for migration in &self.migrations {
            if migration.version() <= current_version {
                continue;
            }

            tracing::info!(
                "Applying migration {} (v{}): {}",
                migration.id(),
                migration.version(),
                migration.description()
            );

            if let Err(e) = migration.up(graph).await {
                tracing::error!("Migration {} failed: {}", migration.id(), e);
                return Err(e);
            }
            update_schema_version(graph, migration.version(), migration.id()).await?;

            new_version = migration.version();
            applied.push(migration.id().to_string());
        }

        Ok((new_version, applied))
    }
}

impl Default for Register {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::mock::MockExecutor;

    const OPTIONAL: Ddl = Ddl {
        name: "optional",
        cypher: "CREATE CONSTRAINT a IF NOT EXISTS FOR (n:A) REQUIRE n.id IS UNIQUE",
        required: false,
    };
    const REQUIRED: Ddl = Ddl {
        name: "required",
        cypher: "CREATE INDEX b IF NOT EXISTS FOR (n:B) ON (n.name)",
        required: true,
    };

    #[tokio::test]
    async fn test_optional_ddl_failure_is_skipped() {
        let mock = MockExecutor::new().with_error("duplicate ids");

        apply_ddl(&mock, &[OPTIONAL, REQUIRED]).await.unwrap();

        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_required_ddl_failure_aborts() {
        let mock = MockExecutor::new().with_error("unsupported");

        let err = apply_ddl(&mock, &[REQUIRED, OPTIONAL]).await.unwrap_err();

        assert_eq!(err.code(), "QUERY_ERROR");
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn test_latest_version() {
        assert_eq!(crate::migrations::latest_version(), 2);
        assert_eq!(Register::new().latest_version(), 0);
    }
}
