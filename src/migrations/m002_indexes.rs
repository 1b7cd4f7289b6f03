//! Lookup indexes for the properties repositories match on besides `id`.

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::AppError;
use crate::graph::CypherExecutor;
use crate::migrations::traits::{apply_ddl, Ddl, Migration};

const INDEXES: &[Ddl] = &[
    Ddl {
        name: "domain_domain",
        cypher: "CREATE INDEX domain_domain IF NOT EXISTS FOR (n:Domain) ON (n.domain)",
        required: true,
    },
    Ddl {
        name: "email_raw_email",
        cypher: "CREATE INDEX email_raw_email IF NOT EXISTS FOR (n:Email) ON (n.rawEmail)",
        required: true,
    },
    Ddl {
        name: "email_email",
        cypher: "CREATE INDEX email_email IF NOT EXISTS FOR (n:Email) ON (n.email)",
        required: true,
    },
    Ddl {
        name: "organization_customer_os_id",
        cypher: "CREATE INDEX organization_customer_os_id IF NOT EXISTS FOR (n:Organization) ON (n.customerOsId)",
        required: true,
    },
    Ddl {
        name: "organization_reference_id",
        cypher: "CREATE INDEX organization_reference_id IF NOT EXISTS FOR (n:Organization) ON (n.referenceId)",
        required: true,
    },
    Ddl {
        name: "invoice_number",
        cypher: "CREATE INDEX invoice_number IF NOT EXISTS FOR (n:Invoice) ON (n.number)",
        required: true,
    },
    Ddl {
        name: "social_url",
        cypher: "CREATE INDEX social_url IF NOT EXISTS FOR (n:Social) ON (n.url)",
        required: true,
    },
];

/// Index on `Tenant.name`. Created only when the uniqueness constraint from
/// the first migration is missing, since the constraint already backs one.
const TENANT_NAME_INDEX: Ddl = Ddl {
    name: "tenant_name",
    cypher: "CREATE INDEX tenant_name IF NOT EXISTS FOR (n:Tenant) ON (n.name)",
    required: true,
};

pub struct M002Indexes;

impl M002Indexes {
    async fn tenant_name_backed(graph: &dyn CypherExecutor) -> Result<bool, AppError> {
        use crate::graph::QueryExt;

        let count: Option<i64> = graph
            .query(
                "SHOW INDEXES YIELD labelsOrTypes, properties
                 WHERE labelsOrTypes = ['Tenant'] AND properties = ['name']
                 RETURN count(*) AS count",
            )
            .fetch_value("count")
            .await?;
        Ok(count.unwrap_or(0) > 0)
    }
}

impl Migration for M002Indexes {
    fn id(&self) -> &'static str {
        "m002_indexes"
    }

    fn version(&self) -> u32 {
        2
    }

    fn description(&self) -> &'static str {
        "Lookup indexes (tenant name, domain, email, customerOsId, invoice number)"
    }

    fn up<'a>(&'a self, graph: &'a dyn CypherExecutor) -> BoxFuture<'a, Result<(), AppError>> {
        async move {
            if !Self::tenant_name_backed(graph).await? {
                apply_ddl(graph, &[TENANT_NAME_INDEX]).await?;
            }
            apply_ddl(graph, INDEXES).await
        }
        .boxed()
    }
}
