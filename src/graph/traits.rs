//! Core traits for graph database access.
//!
//! - [`CypherExecutor`] - run Cypher against a session or a transaction
//! - [`Transaction`] - commit/rollback of an explicit transaction
//! - [`GraphClient`] - connection pool that hands out transactions

use async_trait::async_trait;

use crate::error::AppError;
use crate::graph::row::{Params, RowStream};

/// Executes Cypher queries against a graph database.
///
/// Implemented by the pooled client (auto-commit, one implicit transaction per
/// query) and by explicit transactions. Repository methods that must compose
/// into a caller-owned unit of work take `&E where E: CypherExecutor + ?Sized`.
#[async_trait]
pub trait CypherExecutor: Send + Sync {
    /// Executes a Cypher query and returns a stream of result rows.
    async fn execute_cypher(&self, cypher: &str, params: Params)
        -> Result<RowStream<'_>, AppError>;

    /// Executes a Cypher query, discarding any result rows.
    async fn run_cypher(&self, cypher: &str, params: Params) -> Result<(), AppError>;
}

/// Transaction lifecycle management.
#[async_trait]
pub trait Transaction: Send + Sync {
    /// Commits the transaction. Consumes it.
    async fn commit(self) -> Result<(), AppError>;

    /// Rolls back the transaction. Consumes it.
    async fn rollback(self) -> Result<(), AppError>;
}

/// A graph database client that can begin transactions.
#[async_trait]
pub trait GraphClient: CypherExecutor {
    /// The transaction type returned by this client.
    type Tx<'a>: Transaction + CypherExecutor
    where
        Self: 'a;

    /// Begins a new transaction.
    ///
    /// ```ignore
    /// let txn = client.begin().await?;
    /// contacts.create_contact_in_tx(&txn, &tenant, "c1", &fields).await?;
    /// job_roles.create_job_role_in_tx(&txn, &tenant, "c1", &role).await?;
    /// txn.commit().await?;
    /// ```
    async fn begin(&self) -> Result<Self::Tx<'_>, AppError>;
}
