//! Native temporal parameters.
//!
//! Parameters travel as JSON until the backend converts them to Bolt. A
//! [`Timestamp`] is encoded as a single-key object that the backend binds
//! as a Neo4j `DATETIME`, so stored times compare and sort as datetimes.
//!
//! ```ignore
//! graph.query("MATCH (n:Issue {id:$id}) SET n.updatedAt = $now")
//!     .param("id", "i1")
//!     .param("now", Timestamp::now())
//!     .run()
//!     .await?;
//! ```

use chrono::{DateTime, FixedOffset, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value as JsonValue;

const DATETIME_KEY: &str = "$datetime";

/// A UTC instant bound as a native Neo4j `DATETIME`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl From<Timestamp> for JsonValue {
    fn from(value: Timestamp) -> Self {
        let mut map = serde_json::Map::with_capacity(1);
        map.insert(DATETIME_KEY.to_string(), JsonValue::String(value.to_rfc3339()));
        JsonValue::Object(map)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(DATETIME_KEY, &self.to_rfc3339())?;
        map.end()
    }
}

/// The instant carried by an encoded [`Timestamp`], if `value` is one.
pub(crate) fn datetime_param(value: &JsonValue) -> Option<DateTime<FixedOffset>> {
    let JsonValue::Object(map) = value else {
        return None;
    };
    if map.len() != 1 {
        return None;
    }
    let encoded = map.get(DATETIME_KEY)?.as_str()?;
    DateTime::parse_from_rfc3339(encoded).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_serialized_and_converted_forms_agree() {
        let ts = Timestamp::from(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());

        let serialized = serde_json::to_value(&ts).unwrap();

        assert_eq!(serialized, JsonValue::from(ts.clone()));
        assert_eq!(serialized, json!({"$datetime": "2024-05-01T10:00:00+00:00"}));
    }

    #[test]
    fn test_datetime_param_recognizes_only_encoded_timestamps() {
        let ts = Timestamp::from(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());

        let decoded = datetime_param(&JsonValue::from(ts.clone())).unwrap();
        assert_eq!(decoded.with_timezone(&Utc), ts.as_datetime());

        assert!(datetime_param(&json!("2024-05-01T10:00:00+00:00")).is_none());
        assert!(datetime_param(&json!({"$datetime": "not a date"})).is_none());
        assert!(datetime_param(&json!({"$datetime": "2024-05-01T10:00:00Z", "x": 1})).is_none());
    }
}
