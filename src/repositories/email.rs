//! Email address writes.

use crate::context::{AppGraph, Context};
use crate::cypher;
use crate::di::FromContext;
use crate::error::AppError;
use crate::graph::QueryExt;
use crate::models::{is_overwrite_source, Email, EmailCreate, EmailValidation, NodeLabel, APP_SOURCE, SOURCE_OPENLINE};
use crate::tenant::Tenant;

/// Node kinds an email address can be attached to with `HAS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailOwner {
    Contact,
    Organization,
    User,
}

impl EmailOwner {
    fn label(&self) -> NodeLabel {
        match self {
            EmailOwner::Contact => NodeLabel::Contact,
            EmailOwner::Organization => NodeLabel::Organization,
            EmailOwner::User => NodeLabel::User,
        }
    }

    fn belongs_to_tenant(&self) -> &'static str {
        match self {
            EmailOwner::Contact => "CONTACT_BELONGS_TO_TENANT",
            EmailOwner::Organization => "ORGANIZATION_BELONGS_TO_TENANT",
            EmailOwner::User => "USER_BELONGS_TO_TENANT",
        }
    }
}

#[derive(FromContext, Clone)]
pub struct EmailRepository {
    graph: AppGraph,
}

impl EmailRepository {
    pub fn new(graph: AppGraph) -> Self {
        Self { graph }
    }

    pub async fn get_email(&self, tenant: &Tenant, email_id: &str) -> Result<Option<Email>, AppError> {
        tracing::debug!(tenant = %tenant, email_id, "EmailRepository::get_email");

        self.graph
            .query(
                "MATCH (:Tenant {name:$tenant})<-[:EMAIL_ADDRESS_BELONGS_TO_TENANT]-(e:Email {id:$id})
                 RETURN e {.*} AS e",
            )
            .param("tenant", tenant.as_str())
            .param("id", email_id)
            .fetch_value("e")
            .await
    }

    /// Merges the email node by id. Missing source fields default to `openline`.
    pub async fn create_email(&self, tenant: &Tenant, email_id: &str, data: &EmailCreate) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, email_id, "EmailRepository::create_email");

        let cypher = format!(
            "MATCH (t:Tenant {{name:$tenant}})
             MERGE (e:Email:{label} {{id:$id}})
             SET e.rawEmail = $rawEmail,
                e.source = $source,
                e.sourceOfTruth = $sourceOfTruth,
                e.appSource = $appSource,
                e.createdAt = $createdAt,
                e.updatedAt = $now
             MERGE (t)<-[:EMAIL_ADDRESS_BELONGS_TO_TENANT]-(e)",
            label = NodeLabel::Email.tenant_label(tenant),
        );
        let now = cypher::now();
        let source = if data.source.source.is_empty() {
            SOURCE_OPENLINE
        } else {
            data.source.source.as_str()
        };
        let source_of_truth = if data.source.source_of_truth.is_empty() {
            source
        } else {
            data.source.source_of_truth.as_str()
        };

        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("id", email_id)
            .param("rawEmail", &data.raw_email)
            .param("source", source)
            .param("sourceOfTruth", source_of_truth)
            .param("appSource", data.source.app_source())
            .param(
                "createdAt",
                cypher::timestamp(data.created_at).unwrap_or_else(|| now.clone()),
            )
            .param("now", &now)
            .run()
            .await
    }

    pub async fn update_raw_email(
        &self,
        tenant: &Tenant,
        email_id: &str,
        raw_email: &str,
        source: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, email_id, "EmailRepository::update_raw_email");

        let cypher = format!(
            "MATCH (:Tenant {{name:$tenant}})<-[:EMAIL_ADDRESS_BELONGS_TO_TENANT]-(e:Email:{label} {{id:$id}})
             SET e.sourceOfTruth = CASE WHEN $overwrite=true THEN $sourceOfTruth ELSE e.sourceOfTruth END,
                e.updatedAt = $now,
                e.rawEmail = $rawEmail",
            label = NodeLabel::Email.tenant_label(tenant),
        );
        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("id", email_id)
            .param("rawEmail", raw_email)
            .param("sourceOfTruth", source)
            .param("overwrite", is_overwrite_source(source))
            .param("now", cypher::now())
            .run()
            .await
    }

    /// Stores a verification result and links the email's domain when one
    /// was reported. `work` defaults to "not a free provider" once.
    pub async fn email_validated(
        &self,
        tenant: &Tenant,
        email_id: &str,
        data: &EmailValidation,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, email_id, domain = %data.domain, "EmailRepository::email_validated");

        let cypher = format!(
            "MATCH (:Tenant {{name:$tenant}})<-[:EMAIL_ADDRESS_BELONGS_TO_TENANT]-(e:Email:{label} {{id:$id}})
             SET e.email = $email,
                e.isCatchAll = $isCatchAll,
                e.deliverable = $deliverable,
                e.isValidSyntax = $isValidSyntax,
                e.username = $username,
                e.updatedAt = $now,
                e.isRoleAccount = $isRoleAccount,
                e.techValidatedAt = $validatedAt,
                e.isRisky = $isRisky,
                e.isFirewalled = $isFirewalled,
                e.provider = $provider,
                e.firewall = $firewall,
                e.isMailboxFull = $isMailboxFull,
                e.isFreeAccount = $isFreeAccount,
                e.smtpSuccess = $smtpSuccess,
                e.verifyResponseCode = $verifyResponseCode,
                e.verifyErrorCode = $verifyErrorCode,
                e.verifyDescription = $verifyDescription,
                e.isPrimaryDomain = $isPrimaryDomain,
                e.primaryDomain = $primaryDomain,
                e.alternateEmail = $alternateEmail,
                e.work = CASE WHEN e.work IS NULL THEN NOT $isFreeAccount ELSE e.work END
             WITH e
             WHERE $domain <> ''
             MERGE (d:Domain {{domain:$domain}})
             ON CREATE SET d.id=randomUUID(),
                d.createdAt=$now,
                d.updatedAt=$now,
                d.source=$source,
                d.appSource=$appSource
             WITH d, e
             MERGE (e)-[:HAS_DOMAIN]->(d)",
            label = NodeLabel::Email.tenant_label(tenant),
        );

        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("id", email_id)
            .param("email", &data.email_address)
            .param("domain", data.domain.to_lowercase())
            .param("isCatchAll", data.is_catch_all)
            .param("deliverable", &data.deliverable)
            .param("isValidSyntax", data.is_valid_syntax)
            .param("username", &data.username)
            .param("validatedAt", cypher::timestamp(data.validated_at))
            .param("isRoleAccount", data.is_role_account)
            .param("isRisky", data.is_risky)
            .param("isFirewalled", data.is_firewalled)
            .param("provider", &data.provider)
            .param("firewall", &data.firewall)
            .param("isMailboxFull", data.is_mailbox_full)
            .param("isFreeAccount", data.is_free_account)
            .param("smtpSuccess", data.smtp_success)
            .param("verifyResponseCode", &data.response_code)
            .param("verifyErrorCode", &data.error_code)
            .param("verifyDescription", &data.description)
            .param("isPrimaryDomain", data.is_primary_domain)
            .param("primaryDomain", &data.primary_domain)
            .param("alternateEmail", &data.alternate_email)
            .param("source", SOURCE_OPENLINE)
            .param("appSource", APP_SOURCE)
            .param("now", cypher::now())
            .run()
            .await
    }

    /// Resets every verification property.
    pub async fn clean_email_validation(&self, tenant: &Tenant, email_id: &str) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, email_id, "EmailRepository::clean_email_validation");

        let cypher = format!(
            "MATCH (:Tenant {{name:$tenant}})<-[:EMAIL_ADDRESS_BELONGS_TO_TENANT]-(e:Email {{id:$id}})
             WHERE e:{label}
             SET e.email = '',
                e.isCatchAll = null,
                e.deliverable = null,
                e.isValidSyntax = null,
                e.username = null,
                e.isRoleAccount = null,
                e.techValidatedAt = null,
                e.isRisky = null,
                e.isFirewalled = null,
                e.provider = null,
                e.firewall = null,
                e.isMailboxFull = null,
                e.isFreeAccount = null,
                e.smtpSuccess = null,
                e.verifyResponseCode = null,
                e.verifyErrorCode = null,
                e.verifyDescription = null,
                e.isPrimaryDomain = null,
                e.primaryDomain = null,
                e.alternateEmail = null,
                e.work = null,
                e.updatedAt = $now",
            label = NodeLabel::Email.tenant_label(tenant),
        );
        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("id", email_id)
            .param("now", cypher::now())
            .run()
            .await
    }

    /// Links the email to its owner. A primary link demotes the owner's
    /// other email links.
    pub async fn link_with(
        &self,
        tenant: &Tenant,
        owner: EmailOwner,
        owner_id: &str,
        email_id: &str,
        primary: bool,
    ) -> Result<(), AppError> {
        tracing::debug!(
            tenant = %tenant,
            owner = ?owner,
            owner_id,
            email_id,
            primary,
            "EmailRepository::link_with"
        );

        let cypher = format!(
            "MATCH (t:Tenant {{name:$tenant}})<-[:{belongs}]-(owner:{label} {{id:$ownerId}}),
                   (t)<-[:EMAIL_ADDRESS_BELONGS_TO_TENANT]-(e:Email {{id:$emailId}})
             MERGE (owner)-[rel:HAS]->(e)
             SET rel.primary = $primary, owner.updatedAt = $now
             WITH owner, e
             OPTIONAL MATCH (owner)-[other:HAS]->(o:Email)
             WHERE $primary = true AND o.id <> e.id
             SET other.primary = false",
            belongs = owner.belongs_to_tenant(),
            label = owner.label(),
        );
        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("ownerId", owner_id)
            .param("emailId", email_id)
            .param("primary", primary)
            .param("now", cypher::now())
            .run()
            .await
    }

    /// Removes the owner's link to `email`, matched as normalized or raw address.
    pub async fn unlink_from(
        &self,
        tenant: &Tenant,
        owner: EmailOwner,
        owner_id: &str,
        email: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(tenant = %tenant, owner = ?owner, owner_id, email, "EmailRepository::unlink_from");

        let cypher = format!(
            "MATCH (:Tenant {{name:$tenant}})<-[:{belongs}]-(owner:{label} {{id:$ownerId}})-[rel:HAS]->(e:Email)
             WHERE e.email = $email OR e.rawEmail = $email
             DELETE rel",
            belongs = owner.belongs_to_tenant(),
            label = owner.label(),
        );
        self.graph
            .query(cypher)
            .param("tenant", tenant.as_str())
            .param("ownerId", owner_id)
            .param("email", email)
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

    #[tokio::test]
    async fn test_create_defaults_source_to_openline() {
        let mock = Arc::new(MockExecutor::new());
        let repo = EmailRepository::new(mock.clone());
        let data = EmailCreate {
            raw_email: "Ann@Acme.com".into(),
            source: SourceFields::default(),
            created_at: None,
        };

        repo.create_email(&tenant(), "e1", &data).await.unwrap();

        let call = mock.last_call();
        assert!(call.cypher.contains("MERGE (e:Email:Email_acme {id:$id})"));
        assert_eq!(call.params["source"], json!("openline"));
        assert_eq!(call.params["sourceOfTruth"], json!("openline"));
        assert_eq!(call.params["rawEmail"], json!("Ann@Acme.com"));
    }

    #[tokio::test]
    async fn test_validated_merges_lowercased_domain() {
        let mock = Arc::new(MockExecutor::new());
        let repo = EmailRepository::new(mock.clone());
        let data = EmailValidation {
            email_address: "ann@acme.com".into(),
            domain: "ACME.com".into(),
            is_free_account: false,
            ..Default::default()
        };

        repo.email_validated(&tenant(), "e1", &data).await.unwrap();

        let call = mock.last_call();
        assert!(call.cypher.contains("WHERE $domain <> ''"));
        assert!(call.cypher.contains("MERGE (e)-[:HAS_DOMAIN]->(d)"));
        assert_eq!(call.params["domain"], json!("acme.com"));
    }

    #[tokio::test]
    async fn test_primary_link_demotes_others() {
        let mock = Arc::new(MockExecutor::new());
        let repo = EmailRepository::new(mock.clone());

        repo.link_with(&tenant(), EmailOwner::User, "u1", "e1", true)
            .await
            .unwrap();

        let call = mock.last_call();
        assert!(call
            .cypher
            .contains("<-[:USER_BELONGS_TO_TENANT]-(owner:User {id:$ownerId})"));
        assert!(call.cypher.contains("SET other.primary = false"));
        assert_eq!(call.params["primary"], json!(true));
    }

    #[tokio::test]
    async fn test_unlink_matches_raw_or_normalized() {
        let mock = Arc::new(MockExecutor::new());
        let repo = EmailRepository::new(mock.clone());

        repo.unlink_from(&tenant(), EmailOwner::Organization, "o1", "ann@acme.com")
            .await
            .unwrap();

        let cypher = mock.last_call().cypher;
        assert!(cypher.contains("(owner:Organization {id:$ownerId})-[rel:HAS]->(e:Email)"));
        assert!(cypher.contains("WHERE e.email = $email OR e.rawEmail = $email"));
    }
}
