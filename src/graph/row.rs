//! Result rows and parameter maps.

use crate::error::AppError;
use futures::Stream;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::pin::Pin;

/// Query parameters, keyed by name without the `$` prefix.
pub type Params = HashMap<String, JsonValue>;

/// A stream of rows from a query result.
pub type RowStream<'a> = Pin<Box<dyn Stream<Item = Result<Row, AppError>> + Send + 'a>>;

/// A single result row, one JSON value per returned column.
///
/// Nodes are returned as map projections (`RETURN c {.*} AS c`), so a column
/// deserializes straight into the matching model struct.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    data: HashMap<String, JsonValue>,
}

impl Row {
    pub fn new(data: HashMap<String, JsonValue>) -> Self {
        Self { data }
    }

    /// Deserializes a column. Missing columns are an error.
    ///
    /// ```ignore
    /// let contact: Contact = row.get("c")?;
    /// let count: i64 = row.get("count")?;
    /// ```
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, AppError> {
        let value = self
            .data
            .get(key)
            .ok_or_else(|| AppError::Internal(format!("column not found: {}", key)))?;
        decode(key, value.clone())
    }

    /// Deserializes a column, mapping a missing column or `null` to `None`.
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        match self.data.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(v) => decode(key, v.clone()).map(Some),
        }
    }

    /// Deserializes a list column, mapping a missing column or `null` to an
    /// empty vector.
    pub fn get_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, AppError> {
        Ok(self.get_opt::<Vec<T>>(key)?.unwrap_or_default())
    }

    /// Returns the raw JSON value for a column, if it exists.
    pub fn get_raw(&self, key: &str) -> Option<&JsonValue> {
        self.data.get(key)
    }

    /// Returns all column names in this row.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_inner(self) -> HashMap<String, JsonValue> {
        self.data
    }
}

fn decode<T: DeserializeOwned>(key: &str, value: JsonValue) -> Result<T, AppError> {
    serde_json::from_value(value)
        .map_err(|e| AppError::Internal(format!("failed to deserialize '{}': {}", key, e)))
}

impl From<HashMap<String, JsonValue>> for Row {
    fn from(data: HashMap<String, JsonValue>) -> Self {
        Self::new(data)
    }
}

impl<const N: usize> From<[(&str, JsonValue); N]> for Row {
    fn from(columns: [(&str, JsonValue); N]) -> Self {
        Self::new(
            columns
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Projection {
        id: String,
        first_name: Option<String>,
    }

    #[test]
    fn test_get_projection() {
        let row = Row::from([("c", json!({"id": "c1", "firstName": "Ann", "extra": 1}))]);

        let c: Projection = row.get("c").unwrap();
        assert_eq!(
            c,
            Projection {
                id: "c1".into(),
                first_name: Some("Ann".into())
            }
        );
    }

    #[test]
    fn test_get_number() {
        let row = Row::from([("count", json!(42))]);
        let count: i64 = row.get("count").unwrap();
        assert_eq!(count, 42);
    }

    #[test]
    fn test_get_missing_key() {
        let row = Row::default();
        let result: Result<String, _> = row.get("missing");
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn test_get_wrong_type_is_error_not_panic() {
        let row = Row::from([("count", json!("many"))]);
        let result: Result<i64, _> = row.get("count");
        assert!(result.is_err());
    }

    #[test]
    fn test_get_opt_null_and_missing() {
        let row = Row::from([("name", JsonValue::Null)]);
        assert_eq!(row.get_opt::<String>("name").unwrap(), None);
        assert_eq!(row.get_opt::<String>("missing").unwrap(), None);
    }

    #[test]
    fn test_get_list_defaults_to_empty() {
        let row = Row::from([("ids", json!(["a", "b"])), ("none", JsonValue::Null)]);
        assert_eq!(row.get_list::<String>("ids").unwrap(), vec!["a", "b"]);
        assert!(row.get_list::<String>("none").unwrap().is_empty());
        assert!(row.get_list::<String>("missing").unwrap().is_empty());
    }

    #[test]
    fn test_columns() {
        let row = Row::from([("a", json!(1)), ("b", json!(2))]);
        let mut columns: Vec<_> = row.columns().collect();
        columns.sort();
        assert_eq!(columns, vec!["a", "b"]);
        assert_eq!(row.len(), 2);
    }
}
