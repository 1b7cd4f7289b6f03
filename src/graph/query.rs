//! Query builder for fluent Cypher query construction.

use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::graph::row::{Params, Row, RowStream};
use crate::graph::traits::CypherExecutor;

/// A builder for constructing and executing Cypher queries.
///
/// ```ignore
/// let rows = graph
///     .query("MATCH (c:Contact_acme {id:$id}) RETURN c {.*} AS c")
///     .param("id", "c1")
///     .fetch_all()
///     .await?;
/// ```
pub struct Query<'a, E: CypherExecutor + ?Sized> {
    executor: &'a E,
    cypher: String,
    params: Params,
    error: Option<AppError>,
}

impl<'a, E: CypherExecutor + ?Sized> Query<'a, E> {
    pub fn new(executor: &'a E, cypher: impl Into<String>) -> Self {
        Self {
            executor,
            cypher: cypher.into(),
            params: Params::new(),
            error: None,
        }
    }

    /// Adds a parameter, referenced in Cypher as `$name`.
    ///
    /// A value that fails to serialize is reported when the query runs.
    pub fn param<T: Serialize>(mut self, name: &str, value: T) -> Self {
        match serde_json::to_value(value) {
            Ok(json_value) => {
                self.params.insert(name.to_string(), json_value);
            }
            Err(e) => {
                self.error.get_or_insert_with(|| {
                    AppError::Internal(format!("failed to serialize parameter '{}': {}", name, e))
                });
            }
        }
        self
    }

    /// Adds a parameter that's already a JSON value.
    pub fn param_raw(mut self, name: &str, value: JsonValue) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }

    /// Merges a whole parameter map, e.g. the output of a filter builder.
    pub fn params(mut self, params: Params) -> Self {
        self.params.extend(params);
        self
    }

    /// The Cypher text this query will run.
    pub fn cypher(&self) -> &str {
        &self.cypher
    }

    /// Executes the query and returns a stream of rows.
    pub async fn execute(self) -> Result<RowStream<'a>, AppError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.executor
            .execute_cypher(&self.cypher, self.params)
            .await
    }

    /// Executes the query and collects all rows into a vector.
    pub async fn fetch_all(self) -> Result<Vec<Row>, AppError> {
        self.execute().await?.try_collect().await
    }

    /// Executes the query and returns the first row, if any.
    pub async fn fetch_one(self) -> Result<Option<Row>, AppError> {
        let mut stream = self.execute().await?;
        stream.next().await.transpose()
    }

    /// Executes the query and deserializes `column` of every row.
    pub async fn fetch_column<T: serde::de::DeserializeOwned>(
        self,
        column: &str,
    ) -> Result<Vec<T>, AppError> {
        self.fetch_all()
            .await?
            .iter()
            .map(|row| row.get(column))
            .collect()
    }

    /// Executes the query and deserializes `column` of the first row.
    pub async fn fetch_value<T: serde::de::DeserializeOwned>(
        self,
        column: &str,
    ) -> Result<Option<T>, AppError> {
        match self.fetch_one().await? {
            Some(row) => row.get_opt(column),
            None => Ok(None),
        }
    }

    /// Executes the query without returning results.
    pub async fn run(self) -> Result<(), AppError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.executor.run_cypher(&self.cypher, self.params).await
    }
}

/// Extension trait providing `executor.query("...")`.
///
/// Implemented for every [`CypherExecutor`], including `dyn CypherExecutor`
/// and transactions.
pub trait QueryExt: CypherExecutor {
    fn query(&self, cypher: impl Into<String>) -> Query<'_, Self> {
        Query::new(self, cypher)
    }
}

impl<E: CypherExecutor + ?Sized> QueryExt for E {}
