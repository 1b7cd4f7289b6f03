//! Cypher building blocks shared by the repositories.

mod filter;
mod patch;

pub use filter::{CypherFilter, FilterDetails, LogicalOperator};
pub use patch::{gated_assignment, Blank, SetClause};

use chrono::{DateTime, Utc};

use crate::graph::Timestamp;

/// Current time, bound as a native `DATETIME`.
pub fn now() -> Timestamp {
    Timestamp::now()
}

/// Optional instant, bound as a native `DATETIME` when present.
pub fn timestamp(value: Option<DateTime<Utc>>) -> Option<Timestamp> {
    value.map(Timestamp::from)
}
