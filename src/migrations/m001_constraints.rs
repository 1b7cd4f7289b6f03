//! Uniqueness of `id` on the core labels.

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::AppError;
use crate::graph::CypherExecutor;
use crate::migrations::traits::{apply_ddl, Ddl, Migration};

const CONSTRAINTS: &[Ddl] = &[
    Ddl {
        name: "tenant_name_unique",
        cypher: "CREATE CONSTRAINT tenant_name_unique IF NOT EXISTS FOR (n:Tenant) REQUIRE n.name IS UNIQUE",
        required: false,
    },
    Ddl {
        name: "contact_id_unique",
        cypher: "CREATE CONSTRAINT contact_id_unique IF NOT EXISTS FOR (n:Contact) REQUIRE n.id IS UNIQUE",
        required: false,
    },
    Ddl {
        name: "organization_id_unique",
        cypher: "CREATE CONSTRAINT organization_id_unique IF NOT EXISTS FOR (n:Organization) REQUIRE n.id IS UNIQUE",
        required: false,
    },
    Ddl {
        name: "contract_id_unique",
        cypher: "CREATE CONSTRAINT contract_id_unique IF NOT EXISTS FOR (n:Contract) REQUIRE n.id IS UNIQUE",
        required: false,
    },
    Ddl {
        name: "opportunity_id_unique",
        cypher: "CREATE CONSTRAINT opportunity_id_unique IF NOT EXISTS FOR (n:Opportunity) REQUIRE n.id IS UNIQUE",
        required: false,
    },
    Ddl {
        name: "invoice_id_unique",
        cypher: "CREATE CONSTRAINT invoice_id_unique IF NOT EXISTS FOR (n:Invoice) REQUIRE n.id IS UNIQUE",
        required: false,
    },
    Ddl {
        name: "user_id_unique",
        cypher: "CREATE CONSTRAINT user_id_unique IF NOT EXISTS FOR (n:User) REQUIRE n.id IS UNIQUE",
        required: false,
    },
    Ddl {
        name: "email_id_unique",
        cypher: "CREATE CONSTRAINT email_id_unique IF NOT EXISTS FOR (n:Email) REQUIRE n.id IS UNIQUE",
        required: false,
    },
    Ddl {
        name: "location_id_unique",
        cypher: "CREATE CONSTRAINT location_id_unique IF NOT EXISTS FOR (n:Location) REQUIRE n.id IS UNIQUE",
        required: false,
    },
    Ddl {
        name: "job_role_id_unique",
        cypher: "CREATE CONSTRAINT job_role_id_unique IF NOT EXISTS FOR (n:JobRole) REQUIRE n.id IS UNIQUE",
        required: false,
    },
    Ddl {
        name: "issue_id_unique",
        cypher: "CREATE CONSTRAINT issue_id_unique IF NOT EXISTS FOR (n:Issue) REQUIRE n.id IS UNIQUE",
        required: false,
    },
    Ddl {
        name: "flow_id_unique",
        cypher: "CREATE CONSTRAINT flow_id_unique IF NOT EXISTS FOR (n:Flow) REQUIRE n.id IS UNIQUE",
        required: false,
    },
];

pub struct M001Constraints;

impl Migration for M001Constraints {
    fn id(&self) -> &'static str {
        "m001_constraints"
    }

    fn version(&self) -> u32 {
        1
    }

    fn description(&self) -> &'static str {
        "Uniqueness constraints on core entity ids"
    }

    fn up<'a>(&'a self, graph: &'a dyn CypherExecutor) -> BoxFuture<'a, Result<(), AppError>> {
        async move { apply_ddl(graph, CONSTRAINTS).await }.boxed()
    }
}
