//! Search filter input accepted by the filtered-id repositories.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Comparison requested by a filter item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonOperator {
    Eq,
    In,
    Between,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    StartsWith,
}

impl ComparisonOperator {
    /// Cypher operator text for the binary operators.
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "=",
            ComparisonOperator::In => "IN",
            ComparisonOperator::Between => "BETWEEN",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Lte => "<=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Gte => ">=",
            ComparisonOperator::Contains => "CONTAINS",
            ComparisonOperator::StartsWith => "STARTS WITH",
        }
    }
}

/// Value of a filter item. Exactly one field is expected to be set,
/// matching the property being filtered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub str: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub int: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bool: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_str: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_int: Option<Vec<i64>>,
}

impl FilterValue {
    pub fn str(value: impl Into<String>) -> Self {
        Self {
            str: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn bool(value: bool) -> Self {
        Self {
            bool: Some(value),
            ..Default::default()
        }
    }

    pub fn array_str<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self {
            array_str: Some(values.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn array_int(values: impl IntoIterator<Item = i64>) -> Self {
        Self {
            array_int: Some(values.into_iter().collect()),
            ..Default::default()
        }
    }
}

/// One `property <operation> value` predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterItem {
    pub property: String,
    #[serde(default = "default_operation")]
    pub operation: ComparisonOperator,
    pub value: FilterValue,
}

fn default_operation() -> ComparisonOperator {
    ComparisonOperator::Eq
}

impl FilterItem {
    pub fn new(property: impl Into<String>, operation: ComparisonOperator, value: FilterValue) -> Self {
        Self {
            property: property.into(),
            operation,
            value,
        }
    }

    pub fn str_value(&self) -> Result<&str, AppError> {
        self.value
            .str
            .as_deref()
            .ok_or_else(|| self.missing("string"))
    }

    pub fn bool_value(&self) -> Result<bool, AppError> {
        self.value.bool.ok_or_else(|| self.missing("boolean"))
    }

    pub fn str_list(&self) -> Result<&[String], AppError> {
        self.value
            .array_str
            .as_deref()
            .ok_or_else(|| self.missing("string list"))
    }

    pub fn int_list(&self) -> Result<&[i64], AppError> {
        match self.value.array_int.as_deref() {
            Some(values) if !values.is_empty() => Ok(values),
            _ => Err(self.missing("non-empty integer list")),
        }
    }

    fn missing(&self, kind: &str) -> AppError {
        AppError::Validation(format!(
            "filter on '{}' requires a {} value",
            self.property, kind
        ))
    }
}

/// Conjunction of filter items, applied with implicit AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    #[serde(default)]
    pub and: Vec<FilterItem>,
}

impl SearchFilter {
    pub fn new(items: Vec<FilterItem>) -> Self {
        Self { and: items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_filter() {
        let filter: SearchFilter = serde_json::from_str(
            r#"{"and": [
                {"property": "EMPLOYEE_COUNT", "operation": "BETWEEN", "value": {"arrayInt": [10, 50]}},
                {"property": "STAGE", "value": {"str": "LEAD"}}
            ]}"#,
        )
        .unwrap();

        assert_eq!(filter.and.len(), 2);
        assert_eq!(filter.and[0].operation, ComparisonOperator::Between);
        assert_eq!(filter.and[0].int_list().unwrap(), &[10, 50]);
        assert_eq!(filter.and[1].operation, ComparisonOperator::Eq);
        assert_eq!(filter.and[1].str_value().unwrap(), "LEAD");
    }

    #[test]
    fn test_missing_value_is_validation_error() {
        let item = FilterItem::new("INDUSTRY", ComparisonOperator::In, FilterValue::str("x"));
        assert!(matches!(item.str_list(), Err(AppError::Validation(_))));

        let empty = FilterItem::new("EMPLOYEE_COUNT", ComparisonOperator::Gt, FilterValue::array_int([]));
        assert!(empty.int_list().is_err());
    }
}
