//! Dynamic `WHERE` fragment builder.
//!
//! A [`CypherFilter`] is a tree: leaves compare one node property against a
//! value, inner nodes combine children with AND/OR and may be negated.
//! [`CypherFilter::build_fragment`] renders the tree against a node alias and
//! binds every value as a parameter named `<prefix><n>`, numbered in
//! traversal order, so fragments built with distinct prefixes can be joined
//! into one statement without name collisions.
//!
//! ```ignore
//! let filter = CypherFilter::and()
//!     .with(CypherFilter::eq("stage", "LEAD"))
//!     .with(CypherFilter::compare("employees", json!([10, 50]), ComparisonOperator::Between));
//!
//! let (fragment, params) = filter.build_fragment("o", "o_param_")?;
//! // (o.stage = $o_param_1 AND (o.employees >= $o_param_2 AND o.employees <= $o_param_3))
//! ```

use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::graph::Params;
use crate::models::ComparisonOperator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl LogicalOperator {
    fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => " AND ",
            LogicalOperator::Or => " OR ",
        }
    }
}

/// A single property comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterDetails {
    pub property: String,
    pub value: JsonValue,
    pub operator: ComparisonOperator,
    pub case_sensitive: bool,
}

/// Composable filter tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CypherFilter {
    details: Option<FilterDetails>,
    filters: Vec<CypherFilter>,
    logical_operator: LogicalOperator,
    negate: bool,
}

impl CypherFilter {
    /// Empty conjunction.
    pub fn and() -> Self {
        Self::default()
    }

    /// Empty disjunction.
    pub fn or() -> Self {
        Self {
            logical_operator: LogicalOperator::Or,
            ..Self::default()
        }
    }

    /// Leaf comparing `property` with `value`.
    pub fn compare(
        property: impl Into<String>,
        value: impl Into<JsonValue>,
        operator: ComparisonOperator,
    ) -> Self {
        Self {
            details: Some(FilterDetails {
                property: property.into(),
                value: value.into(),
                operator,
                case_sensitive: true,
            }),
            ..Self::default()
        }
    }

    pub fn eq(property: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::compare(property, value, ComparisonOperator::Eq)
    }

    pub fn in_list<T: Into<JsonValue>>(
        property: impl Into<String>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        let values: Vec<JsonValue> = values.into_iter().map(Into::into).collect();
        Self::compare(property, values, ComparisonOperator::In)
    }

    pub fn contains(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self::compare(property, value.into(), ComparisonOperator::Contains)
    }

    /// Wraps the filter in `NOT (...)`.
    pub fn negate(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    /// Compares strings lower-cased on both sides.
    pub fn case_insensitive(mut self) -> Self {
        if let Some(details) = self.details.as_mut() {
            details.case_sensitive = false;
        }
        self
    }

    pub fn with(mut self, filter: CypherFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn push(&mut self, filter: CypherFilter) {
        self.filters.push(filter);
    }

    pub fn details(&self) -> Option<&FilterDetails> {
        self.details.as_ref()
    }

    pub fn filters(&self) -> &[CypherFilter] {
        &self.filters
    }

    /// True when the tree holds no leaf predicate.
    pub fn is_empty(&self) -> bool {
        self.details.is_none() && self.filters.iter().all(CypherFilter::is_empty)
    }

    /// Renders the filter against `alias`, naming parameters
    /// `<param_prefix>1`, `<param_prefix>2`, ...
    ///
    /// An empty filter renders as an empty string with no parameters.
    pub fn build_fragment(
        &self,
        alias: &str,
        param_prefix: &str,
    ) -> Result<(String, Params), AppError> {
        let mut builder = FragmentBuilder {
            alias,
            param_prefix,
            params: Params::new(),
            counter: 0,
        };
        let fragment = builder.render(self)?.unwrap_or_default();
        Ok((fragment, builder.params))
    }
}

struct FragmentBuilder<'a> {
    alias: &'a str,
    param_prefix: &'a str,
    params: Params,
    counter: usize,
}

impl FragmentBuilder<'_> {
    fn bind(&mut self, value: JsonValue) -> String {
        self.counter += 1;
        let name = format!("{}{}", self.param_prefix, self.counter);
        self.params.insert(name.clone(), value);
        format!("${}", name)
    }

    fn render(&mut self, filter: &CypherFilter) -> Result<Option<String>, AppError> {
        let mut parts = Vec::new();
        if let Some(details) = &filter.details {
            parts.push(self.render_details(details)?);
        }
        for child in &filter.filters {
            if let Some(part) = self.render(child)? {
                parts.push(part);
            }
        }

        let fragment = match parts.len() {
            0 => return Ok(None),
            1 => parts.remove(0),
            _ => format!("({})", parts.join(filter.logical_operator.as_str())),
        };

        if filter.negate {
            Ok(Some(format!("NOT ({})", fragment)))
        } else {
            Ok(Some(fragment))
        }
    }

    fn render_details(&mut self, details: &FilterDetails) -> Result<String, AppError> {
        let property = format!("{}.{}", self.alias, details.property);
        let lower = !details.case_sensitive && details.value.is_string();

        match details.operator {
            ComparisonOperator::Between => {
                let bounds = match &details.value {
                    JsonValue::Array(values) if values.len() == 2 => values.clone(),
                    other => {
                        return Err(AppError::Validation(format!(
                            "BETWEEN on '{}' requires exactly two values, got {}",
                            details.property, other
                        )))
                    }
                };
                let low = self.bind(bounds[0].clone());
                let high = self.bind(bounds[1].clone());
                Ok(format!(
                    "({p} >= {low} AND {p} <= {high})",
                    p = property,
                    low = low,
                    high = high
                ))
            }
            ComparisonOperator::In => {
                if !details.value.is_array() {
                    return Err(AppError::Validation(format!(
                        "IN on '{}' requires a list value",
                        details.property
                    )));
                }
                let param = self.bind(details.value.clone());
                Ok(format!("{} IN {}", property, param))
            }
            op => {
                let param = self.bind(details.value.clone());
                if lower {
                    Ok(format!(
                        "toLower({}) {} toLower({})",
                        property,
                        op.symbol(),
                        param
                    ))
                } else {
                    Ok(format!("{} {} {}", property, op.symbol(), param))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_filter() {
        let (fragment, params) = CypherFilter::and().build_fragment("o", "o_param_").unwrap();
        assert_eq!(fragment, "");
        assert!(params.is_empty());
        assert!(CypherFilter::or().with(CypherFilter::and()).is_empty());
    }

    #[test]
    fn test_single_eq() {
        let filter = CypherFilter::and().with(CypherFilter::eq("stage", "LEAD"));
        let (fragment, params) = filter.build_fragment("o", "o_param_").unwrap();

        assert_eq!(fragment, "o.stage = $o_param_1");
        assert_eq!(params["o_param_1"], json!("LEAD"));
    }

    #[test]
    fn test_and_with_in_and_between() {
        let filter = CypherFilter::and()
            .with(CypherFilter::in_list("industry", ["Software", "Fintech"]))
            .with(CypherFilter::compare(
                "employees",
                json!([10, 50]),
                ComparisonOperator::Between,
            ));
        let (fragment, params) = filter.build_fragment("o", "o_param_").unwrap();

        assert_eq!(
            fragment,
            "(o.industry IN $o_param_1 AND (o.employees >= $o_param_2 AND o.employees <= $o_param_3))"
        );
        assert_eq!(params.len(), 3);
        assert_eq!(params["o_param_1"], json!(["Software", "Fintech"]));
        assert_eq!(params["o_param_2"], json!(10));
        assert_eq!(params["o_param_3"], json!(50));
    }

    #[test]
    fn test_or_and_negate() {
        let filter = CypherFilter::or()
            .with(CypherFilter::compare("yearFounded", 2000, ComparisonOperator::Lt))
            .with(CypherFilter::eq("isPublic", true))
            .negate();
        let (fragment, _) = filter.build_fragment("o", "p_").unwrap();

        assert_eq!(fragment, "NOT ((o.yearFounded < $p_1 OR o.isPublic = $p_2))");
    }

    #[test]
    fn test_nested_numbering_is_traversal_order() {
        let filter = CypherFilter::and()
            .with(CypherFilter::eq("a", 1))
            .with(
                CypherFilter::or()
                    .with(CypherFilter::eq("b", 2))
                    .with(CypherFilter::eq("c", 3)),
            )
            .with(CypherFilter::eq("d", 4));
        let (fragment, params) = filter.build_fragment("n", "x").unwrap();

        assert_eq!(
            fragment,
            "(n.a = $x1 AND (n.b = $x2 OR n.c = $x3) AND n.d = $x4)"
        );
        assert_eq!(params["x4"], json!(4));
    }

    #[test]
    fn test_case_insensitive_contains() {
        let filter = CypherFilter::contains("name", "Acme").case_insensitive();
        let (fragment, _) = filter.build_fragment("o", "o_param_").unwrap();
        assert_eq!(fragment, "toLower(o.name) CONTAINS toLower($o_param_1)");

        let sensitive = CypherFilter::contains("url", "linkedin.");
        let (fragment, _) = sensitive.build_fragment("s", "s_param_").unwrap();
        assert_eq!(fragment, "s.url CONTAINS $s_param_1");
    }

    #[test]
    fn test_starts_with() {
        let filter = CypherFilter::compare("name", "Ac", ComparisonOperator::StartsWith);
        let (fragment, _) = filter.build_fragment("o", "o_param_").unwrap();
        assert_eq!(fragment, "o.name STARTS WITH $o_param_1");
    }

    #[test]
    fn test_between_requires_two_values() {
        let filter = CypherFilter::compare("employees", json!([10]), ComparisonOperator::Between);
        let result = filter.build_fragment("o", "o_param_");
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_distinct_prefixes_never_collide() {
        let org = CypherFilter::and().with(CypherFilter::eq("stage", "LEAD"));
        let tag = CypherFilter::and().with(CypherFilter::in_list("id", ["t1"]));
        let (_, org_params) = org.build_fragment("o", "o_param_").unwrap();
        let (_, tag_params) = tag.build_fragment("t", "t_param_").unwrap();

        assert!(org_params.keys().all(|k| !tag_params.contains_key(k)));
    }
}
