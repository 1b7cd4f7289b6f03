//! Neo4j schema migrations with version tracking.
//!
//! Migrations are:
//! - **Idempotent**: every statement uses `IF NOT EXISTS` or `MERGE`
//! - **Forward-only**: no rollback; fix mistakes with a later migration
//! - **Version-tracked**: the version lives on a `(:SchemaVersion {id: 1})` node
//!
//! Schema statements run in auto-commit mode, one per transaction.

mod m001_constraints;
mod m002_indexes;
mod runner;
mod traits;

pub use m001_constraints::M001Constraints;
pub use m002_indexes::M002Indexes;
pub use runner::{run_migrations, schema_version};
pub use traits::{apply_ddl, Ddl, Migration, Register};

/// Result of running migrations.
#[derive(Debug, Clone)]
pub struct MigrationResult {
    /// Schema version before migrations ran.
    pub previous_version: u32,
    /// Schema version after migrations ran.
    pub current_version: u32,
    /// Ids of the migrations that were applied.
    pub applied_migrations: Vec<String>,
}

/// All migrations in version order.
pub fn create_register() -> Register {
    Register::new().register(M001Constraints).register(M002Indexes)
}

/// Version a fully migrated database reports.
pub fn latest_version() -> u32 {
    create_register().latest_version()
}
