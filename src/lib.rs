//! crm-graph - multi-tenant CRM data access over Neo4j.
//!
//! Repositories build parameterized Cypher per entity, scope every node to a
//! tenant through `<Label>_<tenant>` labels, and gate field writes on the
//! node's source of truth.

pub mod cli;
pub mod config;
pub mod consistency;
pub mod context;
pub mod cypher;
pub mod di;
pub mod error;
pub mod graph;
pub mod migrations;
pub mod models;
pub mod repositories;
pub mod tenant;

// Re-export FromRef at crate root for crm-graph-macros generated code
pub use di::FromRef;
