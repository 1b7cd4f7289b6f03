//! Backend implementations.
//!
//! A backend provides a client implementing [`GraphClient`](crate::graph::GraphClient)
//! and a transaction implementing [`Transaction`](crate::graph::Transaction),
//! both implementing [`CypherExecutor`](crate::graph::CypherExecutor).

pub mod neo4j;
