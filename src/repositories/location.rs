//! Location writes.

use serde_json::Value as JsonValue;

use crate::context::{AppGraph, Context};
use crate::cypher;
use crate::di::FromContext;
use crate::error::AppError;
use crate::graph::{Params, QueryExt};
use crate::models::{is_overwrite_source, AddressDetails, Location, LocationCreate, LocationUpdate, NodeLabel};
use crate::tenant::Tenant;

const ADDRESS_TEXT_FIELDS: &[&str] = &[
    "country",
    "region",
    "district",
    "locality",
    "street",
    "address",
    "address2",
    "zip",
    "addressType",
    "houseNumber",
    "postalCode",
    "plusFour",
    "predirection",
    "timeZone",
];

const ADDRESS_VALUE_FIELDS: &[&str] = &["commercial", "latitude", "longitude", "utcOffset"];

/// Address details as camelCase parameters.
fn address_params(address: &AddressDetails) -> Result<Params, AppError> {
    match serde_json::to_value(address) {
        Ok(JsonValue::Object(map)) => Ok(map.into_iter().collect()),
        Ok(other) => Err(AppError::Internal(format!(
            "address serialized to a non-object value: {}",
            other
        ))),
        Err(e) => Err(AppError::Internal(format!("failed to serialize address: {}", e))),
    }
}

/// `l.f = $f` for every address field.
fn plain_address_assignments() -> String {
    ADDRESS_TEXT_FIELDS
        .iter()
        .chain(ADDRESS_VALUE_FIELDS)
        .map(|field| format!("l.{f} = ${f}", f = field))
        .collect::<Vec<_>>()
        .join(",\n                ")
}

#[derive(FromContext, Clone)]
pub struct LocationRepository {
    graph: AppGraph,
}

impl LocationRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    pub async fn get_location(&self, tenant: &Tenant, location_id: &str) -> Result<Option<Location>, AppError> {
        tracing::debug!(tenant = %tenant, location_id, "LocationRepository::get_location");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:LOCATION_BELONGS_TO_TENANT]-(l:Location {id:$id})
                 RETURN l {.*} AS l",
            )
            .param("tenant", tenant.as_str())
            .param("id", location_id)
            .fetch_value("l")
            .await
    }

    /// Merges the location under its tenant; an existing location is kept.
    pub async fn create_location(
        &self,
        tenant: &Tenant,
        location_id: &str,
        data: &LocationCreate,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, location_id, "LocationRepository::create_location");

        let cypher = format!(
            "MATCH (t:Tenant {{name:$tenant}})
             MERGE (t)<-[:LOCATION_BELONGS_TO_TENANT]-(l:Location:{label} {{id:$id}})
             ON CREATE SET l.rawAddress = $rawAddress,
                l.name = $name,
                {address},
                l.validated = null,
                l.source = $source,
                l.sourceOfTruth = $sourceOfTruth,
                l.appSource = $appSource,
                l.createdAt = $createdAt,
                l.updatedAt = $now",
            label = NodeLabel::Location.tenant_label(tenant),
            address = plain_address_assignments(),
        );
        let now = cypher::now();

        self.graph
            .query(cypher)
            .params(address_params(&data.address)?)
            .param("tenant", tenant.as_str())
            .param("id", location_id)
            .param("rawAddress", &data.raw_address)
            .param("name", &data.name)
            .param("source", &data.source.source)
            .param("sourceOfTruth", data.source.source_of_truth())
            .param("appSource", data.source.app_source())
            .param(
                "createdAt",
                cypher::timestamp(data.created_at).unwrap_or_else(|| now.clone()),
            )
            .param("now", &now)
            .run()
            .await
    }

    /// Replaces every address field.
    pub async fn update_location(
        &self,
        tenant: &Tenant,
        location_id: &str,
        data: &LocationUpdate,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, location_id, "LocationRepository::update_location");

        let cypher = format!(
            "MATCH (:Tenant {{name:$tenant}})<-[:LOCATION_BELONGS_TO_TENANT]-(l:Location {{id:$id}})
             WHERE l:{label}
             SET l.sourceOfTruth = CASE WHEN $overwrite=true THEN $sourceOfTruth ELSE l.sourceOfTruth END,
                l.updatedAt = $now,
                l.rawAddress = $rawAddress,
                l.name = $name,
                {address}",
            label = NodeLabel::Location.tenant_label(tenant),
            address = plain_address_assignments(),
        );

        self.graph
            .query(cypher)
            .params(address_params(&data.address)?)
            .param("tenant", tenant.as_str())
            .param("id", location_id)
            .param("rawAddress", &data.raw_address)
            .param("name", &data.name)
            .param("sourceOfTruth", &data.source)
            .param("overwrite", is_overwrite_source(&data.source))
            .param("now", cypher::now())
            .run()
            .await
    }

    pub async fn fail_location_validation(
        &self,
        tenant: &Tenant,
        location_id: &str,
        validation_error: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, location_id, validation_error, "LocationRepository::fail_location_validation");

        let cypher = format!(
            "MATCH (:Tenant {{name:$tenant}})<-[:LOCATION_BELONGS_TO_TENANT]-(l:Location:{label} {{id:$id}})
             SET l.validationError = $validationError,
                l.validated = false,
                l.updatedAt = $now",
            label = NodeLabel::Location.tenant_label(tenant),
        );
        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("id", location_id)
            .param("validationError", validation_error)
            .param("now", cypher::now())
            .run()
            .await
    }

    /// Marks the location validated. Non-empty validated values replace
    /// stored ones; empty values only fill blanks.
    pub async fn location_validated(
        &self,
        tenant: &Tenant,
        location_id: &str,
        address: &AddressDetails,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, location_id, "LocationRepository::location_validated");

        let mut assignments: Vec<String> = ADDRESS_TEXT_FIELDS
            .iter()
            .map(|field| {
                format!(
                    "l.{f} = CASE WHEN ${f} <> '' OR l.{f} IS NULL OR l.{f} = '' THEN ${f} ELSE l.{f} END",
                    f = field
                )
            })
            .collect();
        for field in ["latitude", "longitude"] {
            assignments.push(format!(
                "l.{f} = CASE WHEN ${f} IS NOT NULL OR l.{f} IS NULL THEN ${f} ELSE l.{f} END",
                f = field
            ));
        }
        assignments.push("l.commercial = $commercial".to_string());
        assignments.push("l.utcOffset = $utcOffset".to_string());

        let cypher = format!(
            "MATCH (:Tenant {{name:$tenant}})<-[:LOCATION_BELONGS_TO_TENANT]-(l:Location:{label} {{id:$id}})
             SET l.validationError = '',
                l.validated = true,
                l.updatedAt = $now,
                {assignments}",
            label = NodeLabel::Location.tenant_label(tenant),
            assignments = assignments.join(",\n                "),
        );

        self.graph
            .query(cypher)
            .params(address_params(address)?)
            .param("tenant", tenant.as_str())
            .param("id", location_id)
            .param("now", cypher::now())
            .run()
            .await
    }

    pub async fn link_with_organization(
        &self,
        tenant: &Tenant,
        organization_id: &str,
        location_id: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, organization_id, location_id, "LocationRepository::link_with_organization");

        self.graph
            .query(
                "MATCH (t:Tenant {name:$tenant})<-[:ORGANIZATION_BELONGS_TO_TENANT]-(org:Organization {id:$organizationId}),
                       (t)<-[:LOCATION_BELONGS_TO_TENANT]-(l:Location {id:$locationId})
                 MERGE (org)-[:ASSOCIATED_WITH]->(l)
                 SET org.updatedAt = $now",
            )
            .param("tenant", tenant.as_str())
            .param("organizationId", organization_id)
            .param("locationId", location_id)
            .param("now", cypher::now())
            .run()
            .await
    }

    pub async fn link_with_contact(&self, tenant: &Tenant, contact_id: &str, location_id: &str) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, contact_id, location_id, "LocationRepository::link_with_contact");

        self.graph
            .query(
                "MATCH (t:Tenant {name:$tenant})<-[:CONTACT_BELONGS_TO_TENANT]-(c:Contact {id:$contactId}),
                       (t)<-[:LOCATION_BELONGS_TO_TENANT]-(l:Location {id:$locationId})
                 MERGE (c)-[:ASSOCIATED_WITH]->(l)
                 SET c.updatedAt = $now",
            )
            .param("tenant", tenant.as_str())
            .param("contactId", contact_id)
            .param("locationId", location_id)
            .param("now", cypher::now())
            .run()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::mock::MockExecutor;
    use crate::models::SourceFields;
    use serde_json::json;
    use std::sync::Arc;

    fn tenant() -> Tenant {
        Tenant::new("acme").unwrap()
    }

    fn berlin() -> AddressDetails {
        AddressDetails {
            country: "Germany".into(),
            locality: "Berlin".into(),
            latitude: Some(52.52),
            utc_offset: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_address_params_are_camel_case() {
        let params = address_params(&berlin()).unwrap();
        assert_eq!(params["locality"], json!("Berlin"));
        assert_eq!(params["utcOffset"], json!(1));
        assert_eq!(params["longitude"], json!(null));
        assert!(params.contains_key("houseNumber"));
    }

    #[tokio::test]
    async fn test_create_location_binds_address() {
        let mock = Arc::new(MockExecutor::new());
        let repo = LocationRepository::new(mock.clone());
        let data = LocationCreate {
            name: "HQ".into(),
            raw_address: "Berlin, Germany".into(),
            address: berlin(),
            source: SourceFields::openline(),
            created_at: None,
        };

        repo.create_location(&tenant(), "l1", &data).await.unwrap();

        let call = mock.last_call();
        assert!(call
            .cypher
            .contains("MERGE (t)<-[:LOCATION_BELONGS_TO_TENANT]-(l:Location:Location_acme {id:$id})"));
        assert!(call.cypher.contains("l.locality = $locality"));
        assert_eq!(call.params["country"], json!("Germany"));
        assert_eq!(call.params["latitude"], json!(52.52));
    }

    #[tokio::test]
    async fn test_validated_fills_blanks_only_for_empty_values() {
        let mock = Arc::new(MockExecutor::new());
        let repo = LocationRepository::new(mock.clone());

        repo.location_validated(&tenant(), "l1", &berlin()).await.unwrap();

        let cypher = mock.last_call().cypher;
        assert!(cypher.contains(
            "l.country = CASE WHEN $country <> '' OR l.country IS NULL OR l.country = '' THEN $country ELSE l.country END"
        ));
        assert!(cypher.contains("l.latitude = CASE WHEN $latitude IS NOT NULL OR l.latitude IS NULL"));
        assert!(cypher.contains("l.validated = true"));
    }

    #[tokio::test]
    async fn test_fail_validation() {
        let mock = Arc::new(MockExecutor::new());
        let repo = LocationRepository::new(mock.clone());

        repo.fail_location_validation(&tenant(), "l1", "unknown address")
            .await
            .unwrap();

        let call = mock.last_call();
        assert!(call.cypher.contains("l.validated = false"));
        assert_eq!(call.params["validationError"], json!("unknown address"));
    }
}
