//! Neo4j backend over the Bolt protocol (neo4rs).
//!
//! ```ignore
//! use crm_graph::graph::backends::neo4j::Neo4jClient;
//! use crm_graph::graph::{Graph, QueryExt};
//!
//! let client = Neo4jClient::connect(&config.neo4j).await?;
//! let graph = Graph::new(client);
//!
//! let rows = graph.query("MATCH (t:Tenant) RETURN t.name AS name")
//!     .fetch_all()
//!     .await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use neo4rs::{BoltType, ConfigBuilder};
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;

use crate::config::Neo4jConfig;
use crate::error::AppError;
use crate::graph::row::{Params, Row, RowStream};
use crate::graph::temporal::datetime_param;
use crate::graph::traits::{CypherExecutor, GraphClient, Transaction};

/// Pooled Neo4j client.
///
/// Cheap to clone; the driver's connection pool is shared.
#[derive(Clone)]
pub struct Neo4jClient {
    graph: Arc<neo4rs::Graph>,
    database: Arc<str>,
}

impl Neo4jClient {
    /// Connects using the `[neo4j]` config section.
    pub async fn connect(config: &Neo4jConfig) -> Result<Self, AppError> {
        let driver_config = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.user.as_str())
            .password(config.password.as_str())
            .db(config.database.as_str())
            .max_connections(config.max_connections)
            .fetch_size(config.fetch_size)
            .build()?;
        let graph = neo4rs::Graph::connect(driver_config).await?;

        tracing::debug!(uri = %config.uri, database = %config.database, "Neo4jClient::connect");

        Ok(Self {
            graph: Arc::new(graph),
            database: Arc::from(config.database.as_str()),
        })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Round-trips a trivial query to verify connectivity.
    pub async fn ping(&self) -> Result<(), AppError> {
        self.run_cypher("RETURN 1", Params::new()).await
    }
}

#[async_trait]
impl CypherExecutor for Neo4jClient {
    async fn execute_cypher(
        &self,
        cypher: &str,
        params: Params,
    ) -> Result<RowStream<'_>, AppError> {
        use async_stream::try_stream;

        let query = build_query(cypher, &params)?;
        let graph = self.graph.clone();
        let cypher = cypher.to_string();

        Ok(Box::pin(try_stream! {
            let mut stream = graph
                .execute(query)
                .await
                .map_err(|e| query_error(&cypher, e))?;

            while let Some(row) = stream.next().await.map_err(|e| query_error(&cypher, e))? {
                yield decode_row(&row)?;
            }
        }))
    }

    async fn run_cypher(&self, cypher: &str, params: Params) -> Result<(), AppError> {
        let query = build_query(cypher, &params)?;
        self.graph
            .run(query)
            .await
            .map_err(|e| query_error(cypher, e))
    }
}

#[async_trait]
impl GraphClient for Neo4jClient {
    type Tx<'a> = Neo4jTransaction;

    async fn begin(&self) -> Result<Self::Tx<'_>, AppError> {
        let txn = self.graph.start_txn().await?;
        Ok(Neo4jTransaction {
            txn: Mutex::new(Some(txn)),
        })
    }
}

/// Explicit Neo4j transaction.
///
/// Queries inside a transaction are serialized on the underlying Bolt
/// connection, so rows are collected before the stream is handed back.
/// Dropping without commit or rollback leaves rollback to the server.
pub struct Neo4jTransaction {
    txn: Mutex<Option<neo4rs::Txn>>,
}

impl Neo4jTransaction {
    async fn take(&self) -> Result<neo4rs::Txn, AppError> {
        self.txn
            .lock()
            .await
            .take()
            .ok_or_else(|| AppError::Internal("transaction already finished".into()))
    }
}

#[async_trait]
impl CypherExecutor for Neo4jTransaction {
    async fn execute_cypher(
        &self,
        cypher: &str,
        params: Params,
    ) -> Result<RowStream<'_>, AppError> {
        let query = build_query(cypher, &params)?;
        let mut guard = self.txn.lock().await;
        let txn = guard
            .as_mut()
            .ok_or_else(|| AppError::Internal("transaction already finished".into()))?;

        let mut stream = txn.execute(query).await.map_err(|e| query_error(cypher, e))?;
        let mut rows = Vec::new();
        while let Some(row) = stream
            .next(txn.handle())
            .await
            .map_err(|e| query_error(cypher, e))?
        {
            rows.push(decode_row(&row));
        }

        Ok(Box::pin(futures::stream::iter(rows)))
    }

    async fn run_cypher(&self, cypher: &str, params: Params) -> Result<(), AppError> {
        let query = build_query(cypher, &params)?;
        let mut guard = self.txn.lock().await;
        let txn = guard
            .as_mut()
            .ok_or_else(|| AppError::Internal("transaction already finished".into()))?;
        txn.run(query).await.map_err(|e| query_error(cypher, e))
    }
}

#[async_trait]
impl Transaction for Neo4jTransaction {
    async fn commit(self) -> Result<(), AppError> {
        let txn = self.take().await?;
        txn.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), AppError> {
        let txn = self.take().await?;
        txn.rollback().await?;
        Ok(())
    }
}

impl Drop for Neo4jTransaction {
    fn drop(&mut self) {
        if self.txn.get_mut().is_some() {
            tracing::warn!("Neo4jTransaction dropped without commit or rollback");
        }
    }
}

fn query_error(cypher: &str, err: neo4rs::Error) -> AppError {
    match err {
        neo4rs::Error::ConnectionError | neo4rs::Error::IOError { .. } => {
            AppError::Connection(err)
        }
        other => AppError::Query {
            message: other.to_string(),
            query: cypher.to_string(),
        },
    }
}

fn build_query(cypher: &str, params: &Params) -> Result<neo4rs::Query, AppError> {
    let mut query = neo4rs::query(cypher);
    for (name, value) in params {
        query = query.param(name.as_str(), json_to_bolt(value)?);
    }
    Ok(query)
}

/// Converts a JSON parameter into its Bolt representation.
///
/// Encoded [`Timestamp`](crate::graph::Timestamp)s become native `DATETIME`s.
pub(crate) fn json_to_bolt(value: &JsonValue) -> Result<BoltType, AppError> {
    if let Some(datetime) = datetime_param(value) {
        return Ok(BoltType::from(datetime));
    }
    let bolt = match value {
        JsonValue::Null => BoltType::Null(neo4rs::BoltNull),
        JsonValue::Bool(v) => BoltType::Boolean(neo4rs::BoltBoolean::new(*v)),
        JsonValue::Number(v) => {
            if let Some(i) = v.as_i64() {
                BoltType::Integer(neo4rs::BoltInteger::new(i))
            } else if let Some(f) = v.as_f64() {
                BoltType::Float(neo4rs::BoltFloat::new(f))
            } else {
                return Err(AppError::Validation(format!("unsupported number: {}", v)));
            }
        }
        JsonValue::String(v) => BoltType::String(neo4rs::BoltString::new(v)),
        JsonValue::Array(v) => BoltType::List(neo4rs::BoltList {
            value: v.iter().map(json_to_bolt).collect::<Result<_, _>>()?,
        }),
        JsonValue::Object(v) => BoltType::Map(neo4rs::BoltMap {
            value: v
                .iter()
                .map(|(k, v)| Ok((neo4rs::BoltString::new(k), json_to_bolt(v)?)))
                .collect::<Result<_, AppError>>()?,
        }),
    };
    Ok(bolt)
}

/// Converts a Bolt value from a result row into JSON.
///
/// Nodes and relationships become their property maps. Instants become
/// RFC 3339 UTC strings (a `DATE` is midnight UTC, a local datetime is read
/// as UTC) so they deserialize into `DateTime<Utc>` fields.
pub(crate) fn bolt_to_json(value: BoltType) -> JsonValue {
    match value {
        BoltType::Null(_) => JsonValue::Null,
        BoltType::Boolean(b) => JsonValue::Bool(b.value),
        BoltType::Integer(i) => JsonValue::from(i.value),
        BoltType::Float(f) => serde_json::Number::from_f64(f.value)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        BoltType::String(s) => JsonValue::String(s.value),
        BoltType::List(l) => JsonValue::Array(l.value.into_iter().map(bolt_to_json).collect()),
        BoltType::Map(m) => bolt_map_to_json(m),
        BoltType::Node(n) => bolt_map_to_json(n.properties),
        BoltType::Relation(r) => bolt_map_to_json(r.properties),
        BoltType::DateTime(ref dt) => {
            instant_to_json(DateTime::<FixedOffset>::try_from(dt).ok(), &value)
        }
        BoltType::DateTimeZoneId(ref dt) => {
            instant_to_json(DateTime::<FixedOffset>::try_from(dt).ok(), &value)
        }
        BoltType::LocalDateTime(ref dt) => {
            let utc = NaiveDateTime::try_from(dt).ok().map(|n| n.and_utc().fixed_offset());
            instant_to_json(utc, &value)
        }
        BoltType::Date(ref d) => {
            let utc = NaiveDate::try_from(d)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|n| n.and_utc().fixed_offset());
            instant_to_json(utc, &value)
        }
        other => JsonValue::String(format!("{:?}", other)),
    }
}

fn instant_to_json(instant: Option<DateTime<FixedOffset>>, raw: &BoltType) -> JsonValue {
    match instant {
        Some(instant) => JsonValue::String(instant.with_timezone(&Utc).to_rfc3339()),
        None => JsonValue::String(format!("{:?}", raw)),
    }
}

fn bolt_map_to_json(map: neo4rs::BoltMap) -> JsonValue {
    JsonValue::Object(
        map.value
            .into_iter()
            .map(|(k, v)| (k.value, bolt_to_json(v)))
            .collect(),
    )
}

fn decode_row(row: &neo4rs::Row) -> Result<Row, AppError> {
    let columns: HashMap<String, BoltType> = row
        .to()
        .map_err(|e| AppError::Internal(format!("failed to decode row: {}", e)))?;
    Ok(Row::new(
        columns
            .into_iter()
            .map(|(name, value)| (name, bolt_to_json(value)))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Timestamp;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_json_to_bolt_scalars() {
        assert!(matches!(json_to_bolt(&json!(null)).unwrap(), BoltType::Null(_)));
        assert!(matches!(json_to_bolt(&json!(true)).unwrap(), BoltType::Boolean(_)));
        assert!(matches!(json_to_bolt(&json!(7)).unwrap(), BoltType::Integer(_)));
        assert!(matches!(json_to_bolt(&json!(1.5)).unwrap(), BoltType::Float(_)));
        assert!(matches!(json_to_bolt(&json!("x")).unwrap(), BoltType::String(_)));
    }

    #[test]
    fn test_json_to_bolt_nested() {
        let bolt = json_to_bolt(&json!({"ids": ["a", "b"], "n": 1})).unwrap();
        let BoltType::Map(map) = bolt else {
            panic!("expected map");
        };
        assert_eq!(map.value.len(), 2);
    }

    #[test]
    fn test_bolt_to_json_inverts_params() {
        let value = json!({"name": "acme", "tags": ["x"], "count": 3, "active": false});
        let bolt = json_to_bolt(&value).unwrap();
        assert_eq!(bolt_to_json(bolt), value);
    }

    #[test]
    fn test_timestamp_param_binds_native_datetime() {
        let ts = Timestamp::from(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());

        let bolt = json_to_bolt(&json!({"createdAt": ts.clone(), "name": "acme"})).unwrap();

        let BoltType::Map(map) = bolt else {
            panic!("expected map");
        };
        let created_at = map.value.get(&neo4rs::BoltString::new("createdAt")).unwrap();
        assert!(matches!(created_at, BoltType::DateTime(_)));
        assert!(matches!(json_to_bolt(&json!("2024-05-01T10:00:00+00:00")).unwrap(), BoltType::String(_)));
    }

    #[test]
    fn test_stored_datetimes_decode_into_chrono() {
        let stored = DateTime::parse_from_rfc3339("2024-05-01T12:00:00+02:00").unwrap();

        let json = bolt_to_json(BoltType::from(stored));

        assert_eq!(json, json!("2024-05-01T10:00:00+00:00"));
        let decoded: DateTime<Utc> = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, stored.with_timezone(&Utc));
    }

    #[test]
    fn test_dates_and_local_datetimes_decode_as_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(bolt_to_json(BoltType::from(date)), json!("2024-05-01T00:00:00+00:00"));

        let local = date.and_hms_opt(8, 30, 0).unwrap();
        assert_eq!(bolt_to_json(BoltType::from(local)), json!("2024-05-01T08:30:00+00:00"));

        let zoned = bolt_to_json(BoltType::from((local, "Europe/Paris")));
        assert!(serde_json::from_value::<DateTime<Utc>>(zoned).is_ok());
    }

    #[test]
    fn test_node_properties_with_datetimes_decode_into_models() {
        let created_at = DateTime::parse_from_rfc3339("2024-05-01T10:00:00+00:00").unwrap();
        let props = neo4rs::BoltMap {
            value: [
                (neo4rs::BoltString::new("id"), BoltType::from("c1")),
                (neo4rs::BoltString::new("createdAt"), BoltType::from(created_at)),
            ]
            .into_iter()
            .collect(),
        };

        let contact: crate::models::Contact =
            serde_json::from_value(bolt_to_json(BoltType::Map(props))).unwrap();

        assert_eq!(contact.id, "c1");
        assert_eq!(contact.created_at, Some(created_at.with_timezone(&Utc)));
    }

    #[test]
    fn test_connection_failure_is_transient() {
        let err = query_error("RETURN 1", neo4rs::Error::ConnectionError);
        assert!(matches!(err, AppError::Connection(_)));
        assert!(err.is_transient());
    }
}
