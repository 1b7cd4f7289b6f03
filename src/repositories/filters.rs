//! Filtered id searches over contacts and organizations.
//!
//! A [`SearchFilter`] is split into groups, one per node the predicates
//! apply to (organization `o`, tag `t`, location `l`, social `s`). Each group
//! renders with its own alias and parameter prefix, and its `MATCH` is only
//! added when the group has at least one predicate. Groups are joined with
//! `AND`.

use serde_json::json;

use crate::context::{AppGraph, Context};
use crate::cypher::CypherFilter;
use crate::di::FromContext;
use crate::error::AppError;
use crate::graph::{Params, QueryExt};
use crate::models::{ComparisonOperator, FilterItem, SearchFilter};
use crate::tenant::Tenant;

/// Properties accepted by the organization search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizationSearchParam {
    Stage,
    Industry,
    EmployeeCount,
    CountryA2,
    Tags,
    LinkedInFollowerCount,
    IsPublic,
    YearFounded,
}

impl OrganizationSearchParam {
    /// Maps a filter property name (with or without the `ORGANIZATIONS_`
    /// prefix) to a search parameter.
    pub fn parse(property: &str) -> Option<Self> {
        use OrganizationSearchParam::*;
        match property.strip_prefix("ORGANIZATIONS_").unwrap_or(property) {
            "STAGE" => Some(Stage),
            "INDUSTRY" => Some(Industry),
            "EMPLOYEE_COUNT" => Some(EmployeeCount),
            "COUNTRY_A2" | "HEADQUARTERS" => Some(CountryA2),
            "TAGS" => Some(Tags),
            "LINKEDIN_FOLLOWER_COUNT" => Some(LinkedInFollowerCount),
            "IS_PUBLIC" => Some(IsPublic),
            "YEAR_FOUNDED" => Some(YearFounded),
            _ => None,
        }
    }
}

/// Properties accepted by the contact search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactSearchParam {
    Stage,
    City,
    CountryA2,
    Tags,
    LinkedInFollowerCount,
}

impl ContactSearchParam {
    pub fn parse(property: &str) -> Option<Self> {
        use ContactSearchParam::*;
        match property {
            "STAGE" => Some(Stage),
            "CITY" | "CONTACTS_CITY" => Some(City),
            "COUNTRY_A2" | "CONTACTS_COUNTRY" => Some(CountryA2),
            "TAGS" | "CONTACTS_TAGS" => Some(Tags),
            "LINKEDIN_FOLLOWER_COUNT" | "CONTACTS_LINKEDIN_FOLLOWER_COUNT" => Some(LinkedInFollowerCount),
            _ => None,
        }
    }
}

/// Predicates on one matched node.
struct FilterGroup {
    alias: &'static str,
    param_prefix: &'static str,
    /// Extra `MATCH` for the group's node; `None` for the root node.
    pattern: Option<&'static str>,
    filter: CypherFilter,
}

impl FilterGroup {
    fn new(alias: &'static str, param_prefix: &'static str, pattern: Option<&'static str>) -> Self {
        Self {
            alias,
            param_prefix,
            pattern,
            filter: CypherFilter::and(),
        }
    }
}

/// `property <op> value` for a numeric range filter: BETWEEN takes the two
/// bounds, the relational operators take the first value.
fn numeric_range(property: &str, item: &FilterItem) -> Result<CypherFilter, AppError> {
    let values = item.int_list()?;
    match item.operation {
        ComparisonOperator::Between => Ok(CypherFilter::compare(
            property,
            json!(values),
            ComparisonOperator::Between,
        )),
        op @ (ComparisonOperator::Eq
        | ComparisonOperator::Lt
        | ComparisonOperator::Lte
        | ComparisonOperator::Gt
        | ComparisonOperator::Gte) => Ok(CypherFilter::compare(property, values[0], op)),
        other => Err(AppError::Validation(format!(
            "operation {:?} is not supported on '{}'",
            other, item.property
        ))),
    }
}

/// LinkedIn follower count: a LinkedIn URL and a follower range, both on the
/// same social node.
fn linkedin_followers(group: &mut FilterGroup, item: &FilterItem) -> Result<(), AppError> {
    group.filter.push(CypherFilter::contains("url", "linkedin."));
    group.filter.push(numeric_range("followersCount", item)?);
    Ok(())
}

/// Renders `root` followed by the active groups' matches and a combined
/// `WHERE`, returning the distinct ids of `return_alias`.
fn assemble(root: &str, groups: &[FilterGroup], return_alias: &str) -> Result<(String, Params), AppError> {
    let mut cypher = format!("{} WITH *", root);
    let mut conditions = Vec::new();
    let mut params = Params::new();

    for group in groups {
        if group.filter.is_empty() {
            continue;
        }
        let (fragment, group_params) = group.filter.build_fragment(group.alias, group.param_prefix)?;
        if let Some(pattern) = group.pattern {
            cypher.push_str(&format!(" MATCH {} WITH *", pattern));
        }
        conditions.push(fragment);
        params.extend(group_params);
    }

    if !conditions.is_empty() {
        cypher.push_str(" WHERE ");
        cypher.push_str(&conditions.join(" AND "));
    }
    cypher.push_str(&format!(" RETURN DISTINCT {}.id AS id", return_alias));
    Ok((cypher, params))
}

/// Organization id search query and its parameters (without `$tenant`).
pub fn organization_filter_query(filter: Option<&SearchFilter>) -> Result<(String, Params), AppError> {
    let mut organization = FilterGroup::new("o", "o_param_", None);
    let mut tag = FilterGroup::new("t", "t_param_", Some("(o)-[:TAGGED]->(t:Tag)"));
    let mut location = FilterGroup::new("l", "l_param_", Some("(o)--(l:Location)"));
    let mut social = FilterGroup::new("s", "s_param_", Some("(o)-[:HAS]->(s:Social)"));

    for item in filter.map(|f| f.and.as_slice()).unwrap_or_default() {
        let Some(param) = OrganizationSearchParam::parse(&item.property) else {
            tracing::debug!(property = %item.property, "organization filter property ignored");
            continue;
        };
        match param {
            OrganizationSearchParam::Stage => organization.filter.push(CypherFilter::eq("stage", item.str_value()?)),
            OrganizationSearchParam::Industry => {
                organization.filter.push(CypherFilter::in_list("industry", item.str_list()?.to_vec()))
            }
            OrganizationSearchParam::EmployeeCount => organization.filter.push(numeric_range("employees", item)?),
            OrganizationSearchParam::YearFounded => organization.filter.push(numeric_range("yearFounded", item)?),
            OrganizationSearchParam::IsPublic => organization.filter.push(CypherFilter::eq("isPublic", item.bool_value()?)),
            OrganizationSearchParam::Tags => tag.filter.push(CypherFilter::in_list("id", item.str_list()?.to_vec())),
            OrganizationSearchParam::CountryA2 => {
                location.filter.push(CypherFilter::in_list("countryCodeA2", item.str_list()?.to_vec()))
            }
            OrganizationSearchParam::LinkedInFollowerCount => linkedin_followers(&mut social, item)?,
        }
    }

    assemble(
        "MATCH (o:Organization)-[:ORGANIZATION_BELONGS_TO_TENANT]->(:Tenant {name:$tenant}) WHERE o.hide = false",
        &[organization, tag, location, social],
        "o",
    )
}

/// Contact id search query and its parameters (without `$tenant`).
pub fn contact_filter_query(filter: Option<&SearchFilter>) -> Result<(String, Params), AppError> {
    let mut organization = FilterGroup::new("o", "o_param_", Some("(c)--(j:JobRole)--(o:Organization)"));
    let mut tag = FilterGroup::new("t", "t_param_", Some("(c)-[:TAGGED]->(t:Tag)"));
    let mut location = FilterGroup::new("l", "l_param_", Some("(c)--(l:Location)"));
    let mut social = FilterGroup::new("s", "s_param_", Some("(c)-[:HAS]->(s:Social)"));

    for item in filter.map(|f| f.and.as_slice()).unwrap_or_default() {
        let Some(param) = ContactSearchParam::parse(&item.property) else {
            tracing::debug!(property = %item.property, "contact filter property ignored");
            continue;
        };
        match param {
            ContactSearchParam::Stage => organization.filter.push(CypherFilter::eq("stage", item.str_value()?)),
            ContactSearchParam::Tags => tag.filter.push(CypherFilter::in_list("id", item.str_list()?.to_vec())),
            ContactSearchParam::CountryA2 => {
                location.filter.push(CypherFilter::in_list("countryCodeA2", item.str_list()?.to_vec()))
            }
            ContactSearchParam::City => location.filter.push(CypherFilter::in_list("locality", item.str_list()?.to_vec())),
            ContactSearchParam::LinkedInFollowerCount => linkedin_followers(&mut social, item)?,
        }
    }

    assemble(
        "MATCH (c:Contact)-[:CONTACT_BELONGS_TO_TENANT]->(:Tenant {name:$tenant})",
        &[organization, tag, location, social],
        "c",
    )
}

#[derive(FromContext, Clone)]
pub struct OrganizationWithFiltersReadRepository {
    graph: AppGraph,
}

impl OrganizationWithFiltersReadRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    /// Ids of the tenant's organizations matching every item of `filter`.
    pub async fn get_filtered_organization_ids(
        &self,
        tenant: &Tenant,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<String>, AppError> {
        tracing::debug!(tenant = %tenant, "OrganizationWithFiltersReadRepository::get_filtered_organization_ids");

        let (cypher, params) = organization_filter_query(filter)?;
        self.graph
            .query(cypher)
            .params(params)
            .param("tenant", tenant.as_str())
            .fetch_column("id")
            .await
    }
}

#[derive(FromContext, Clone)]
pub struct ContactWithFiltersReadRepository {
    graph: AppGraph,
}

impl ContactWithFiltersReadRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    /// Ids of the tenant's contacts matching every item of `filter`.
    pub async fn get_filtered_contact_ids(
        &self,
        tenant: &Tenant,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<String>, AppError> {
        tracing::debug!(tenant = %tenant, "ContactWithFiltersReadRepository::get_filtered_contact_ids");

        let (cypher, params) = contact_filter_query(filter)?;
        self.graph
            .query(cypher)
            .params(params)
            .param("tenant", tenant.as_str())
            .fetch_column("id")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::mock::MockExecutor;
    use crate::graph::Row;
    use crate::models::FilterValue;
    use std::sync::Arc;

    fn item(property: &str, operation: ComparisonOperator, value: FilterValue) -> FilterItem {
        FilterItem::new(property, operation, value)
    }

    #[test]
    fn test_no_filter_has_no_where() {
        let (cypher, params) = organization_filter_query(None).unwrap();
        assert_eq!(
            cypher,
            "MATCH (o:Organization)-[:ORGANIZATION_BELONGS_TO_TENANT]->(:Tenant {name:$tenant}) WHERE o.hide = false WITH * RETURN DISTINCT o.id AS id"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_hidden_organizations_excluded_with_filter_groups() {
        let filter = SearchFilter::new(vec![
            item("TAGS", ComparisonOperator::In, FilterValue::array_str(["t1"])),
            item("IS_PUBLIC", ComparisonOperator::Eq, FilterValue::bool(true)),
        ]);
        let (cypher, _) = organization_filter_query(Some(&filter)).unwrap();

        assert!(cypher.starts_with(
            "MATCH (o:Organization)-[:ORGANIZATION_BELONGS_TO_TENANT]->(:Tenant {name:$tenant}) WHERE o.hide = false WITH *"
        ));
        assert_eq!(cypher.matches("o.hide = false").count(), 1);
        assert!(cypher.contains("WHERE o.isPublic = $o_param_1 AND t.id IN $t_param_1"));
    }

    #[test]
    fn test_organization_only_filters_skip_group_matches() {
        let filter = SearchFilter::new(vec![
            item("STAGE", ComparisonOperator::Eq, FilterValue::str("LEAD")),
            item("ORGANIZATIONS_EMPLOYEE_COUNT", ComparisonOperator::Between, FilterValue::array_int([10, 50])),
        ]);
        let (cypher, params) = organization_filter_query(Some(&filter)).unwrap();

        assert!(!cypher.contains("MATCH (o)"));
        assert!(cypher.contains(
            "WHERE (o.stage = $o_param_1 AND (o.employees >= $o_param_2 AND o.employees <= $o_param_3)) RETURN DISTINCT o.id"
        ));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_groups_use_distinct_prefixes() {
        let filter = SearchFilter::new(vec![
            item("INDUSTRY", ComparisonOperator::In, FilterValue::array_str(["Software"])),
            item("TAGS", ComparisonOperator::In, FilterValue::array_str(["t1", "t2"])),
            item("COUNTRY_A2", ComparisonOperator::In, FilterValue::array_str(["US"])),
            item("IS_PUBLIC", ComparisonOperator::Eq, FilterValue::bool(true)),
        ]);
        let (cypher, params) = organization_filter_query(Some(&filter)).unwrap();

        assert!(cypher.contains("MATCH (o)-[:TAGGED]->(t:Tag) WITH *"));
        assert!(cypher.contains("MATCH (o)--(l:Location) WITH *"));
        assert!(!cypher.contains("Social"));
        assert!(cypher.contains("(o.industry IN $o_param_1 AND o.isPublic = $o_param_2) AND t.id IN $t_param_1 AND l.countryCodeA2 IN $l_param_1"));
        let mut keys: Vec<_> = params.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["l_param_1", "o_param_1", "o_param_2", "t_param_1"]);
    }

    #[test]
    fn test_linkedin_followers_on_same_social_node() {
        let filter = SearchFilter::new(vec![item(
            "LINKEDIN_FOLLOWER_COUNT",
            ComparisonOperator::Gte,
            FilterValue::array_int([1000]),
        )]);
        let (cypher, params) = organization_filter_query(Some(&filter)).unwrap();

        assert!(cypher.contains("MATCH (o)-[:HAS]->(s:Social) WITH *"));
        assert!(cypher.contains("WHERE (s.url CONTAINS $s_param_1 AND s.followersCount >= $s_param_2)"));
        assert_eq!(params["s_param_1"], json!("linkedin."));
        assert_eq!(params["s_param_2"], json!(1000));
    }

    #[test]
    fn test_string_predicates_compare_exactly() {
        let filter: SearchFilter = serde_json::from_value(json!({"and": [
            {"property": "STAGE", "value": {"str": "Lead"}, "caseSensitive": false},
            {"property": "INDUSTRY", "operation": "IN", "value": {"arrayStr": ["Software"]}}
        ]}))
        .unwrap();
        let (cypher, params) = organization_filter_query(Some(&filter)).unwrap();

        assert!(cypher.contains("WHERE (o.stage = $o_param_1 AND o.industry IN $o_param_2)"));
        assert!(!cypher.contains("toLower"));
        assert_eq!(params["o_param_1"], json!("Lead"));
    }

    #[test]
    fn test_unsupported_range_operation() {
        let filter = SearchFilter::new(vec![item(
            "YEAR_FOUNDED",
            ComparisonOperator::Contains,
            FilterValue::array_int([2000]),
        )]);
        assert!(matches!(organization_filter_query(Some(&filter)), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_contact_stage_joins_through_job_role() {
        let filter = SearchFilter::new(vec![
            item("STAGE", ComparisonOperator::Eq, FilterValue::str("CUSTOMER")),
            item("CONTACTS_CITY", ComparisonOperator::In, FilterValue::array_str(["Paris"])),
            item("UNKNOWN", ComparisonOperator::Eq, FilterValue::str("x")),
        ]);
        let (cypher, _) = contact_filter_query(Some(&filter)).unwrap();

        assert!(cypher.starts_with("MATCH (c:Contact)-[:CONTACT_BELONGS_TO_TENANT]->(:Tenant {name:$tenant}) WITH *"));
        assert!(cypher.contains("MATCH (c)--(j:JobRole)--(o:Organization) WITH *"));
        assert!(cypher.contains("WHERE o.stage = $o_param_1 AND l.locality IN $l_param_1"));
        assert!(cypher.ends_with("RETURN DISTINCT c.id AS id"));
    }

    #[tokio::test]
    async fn test_repository_binds_tenant() {
        let mock = Arc::new(MockExecutor::new().with_rows(vec![Row::from([("id", json!("c1"))])]));
        let repo = ContactWithFiltersReadRepository::new(mock.clone());

        let ids = repo
            .get_filtered_contact_ids(&Tenant::new("acme").unwrap(), None)
            .await
            .unwrap();
        assert_eq!(ids, vec!["c1"]);
        assert_eq!(mock.last_call().params["tenant"], json!("acme"));
    }
}
