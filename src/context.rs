//! Dependency injection root.

use std::sync::Arc;

use crate::config::Config;
use crate::di::Context as ContextDerive;
use crate::error::AppError;
use crate::graph::backends::neo4j::Neo4jClient;
use crate::graph::Graph;

pub use crate::graph::AppGraph;

/// Root application context.
///
/// `#[derive(Context)]` exposes each field through `FromRef`, so
/// repositories and the `Repositories` aggregate are built with
/// `FromRef::from_ref(&ctx)`.
#[derive(ContextDerive, Clone)]
pub struct Context {
    /// Executor for auto-commit queries.
    pub graph: AppGraph,
    /// Client that begins explicit transactions for `*_in_tx` calls.
    pub client: Arc<Graph<Neo4jClient>>,
    pub config: Arc<Config>,
}

impl Context {
    pub fn new(client: Neo4jClient, config: Config) -> Self {
        let client = Arc::new(Graph::new(client));
        let graph: AppGraph = client.clone();
        Self {
            graph,
            client,
            config: Arc::new(config),
        }
    }

    /// Connects to Neo4j with the `[neo4j]` section of `config`.
    pub async fn connect(config: Config) -> Result<Self, AppError> {
        let client = Neo4jClient::connect(&config.neo4j).await?;
        Ok(Self::new(client, config))
    }
}
