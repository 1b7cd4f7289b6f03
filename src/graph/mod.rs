//! Graph access layer over Neo4j.
//!
//! - [`CypherExecutor`] - execute Cypher (pooled client or transaction)
//! - [`Transaction`] - commit/rollback
//! - [`GraphClient`] - connection pool that begins transactions
//!
//! Repositories hold an [`AppGraph`] (`Arc<dyn CypherExecutor>`) for
//! auto-commit work, and accept any `&E: CypherExecutor` in their `*_in_tx`
//! variants so several writes can share one caller-owned transaction.
//!
//! ```ignore
//! use crm_graph::graph::{Graph, QueryExt};
//!
//! let graph = Graph::new(Neo4jClient::connect(&config.neo4j).await?);
//!
//! let rows = graph
//!     .query("MATCH (t:Tenant {name:$tenant}) RETURN t {.*} AS t")
//!     .param("tenant", "acme")
//!     .fetch_all()
//!     .await?;
//! ```

mod query;
mod row;
mod temporal;
mod traits;

pub mod backends;
#[cfg(test)]
pub mod mock;

use std::sync::Arc;

use futures::future::BoxFuture;

pub use query::{Query, QueryExt};
pub use row::{Params, Row, RowStream};
pub use temporal::Timestamp;
pub(crate) use temporal::datetime_param;
pub use traits::{CypherExecutor, GraphClient, Transaction};

#[doc(inline)]
pub use crate::cypher;

use crate::error::AppError;

/// Shared handle used by repositories for auto-commit queries.
pub type AppGraph = Arc<dyn CypherExecutor>;

/// Wrapper over a [`GraphClient`] adding transaction closures.
pub struct Graph<C: GraphClient> {
    client: C,
}

impl<C: GraphClient> Graph<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    /// Creates a query builder for a direct (auto-commit) query.
    pub fn query(&self, cypher: &str) -> Query<'_, C> {
        Query::new(&self.client, cypher)
    }

    /// Runs `f` inside a transaction, committing when it returns `Ok` and
    /// rolling back when it returns `Err`.
    ///
    /// ```ignore
    /// graph.transaction(|txn| Box::pin(async move {
    ///     contacts.create_contact_in_tx(txn, &tenant, &fields).await?;
    ///     job_roles.link_with_organization_in_tx(txn, &tenant, &role_id, &org_id).await?;
    ///     Ok(())
    /// })).await?;
    /// ```
    pub async fn transaction<'a, F, R>(&'a self, f: F) -> Result<R, AppError>
    where
        F: for<'t> FnOnce(&'t C::Tx<'a>) -> BoxFuture<'t, Result<R, AppError>>,
    {
        let txn = self.client.begin().await?;
        match f(&txn).await {
            Ok(value) => {
                txn.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::warn!(error = %rollback_err, "Graph::transaction rollback failed");
                }
                Err(err)
            }
        }
    }
}

#[async_trait::async_trait]
impl<C: GraphClient> CypherExecutor for Graph<C> {
    async fn execute_cypher(
        &self,
        cypher: &str,
        params: Params,
    ) -> Result<RowStream<'_>, AppError> {
        self.client.execute_cypher(cypher, params).await
    }

    async fn run_cypher(&self, cypher: &str, params: Params) -> Result<(), AppError> {
        self.client.run_cypher(cypher, params).await
    }
}
