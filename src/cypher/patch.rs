//! Sparse `SET` clause builder.
//!
//! Patch structs hold one `Option<T>` per field; only `Some` fields become
//! assignments. Gated assignments respect source-of-truth ownership:
//!
//! ```text
//! n.name = CASE WHEN n.sourceOfTruth=$sourceOfTruth OR $overwrite=true
//!               OR n.name IS NULL OR n.name = '' THEN $name ELSE n.name END
//! ```

use serde_json::Value as JsonValue;

use crate::graph::{Params, Timestamp};

/// How a gated assignment decides that the stored value is empty and may
/// be replaced by any source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blank {
    /// `IS NULL OR = ''` (strings).
    NullOrEmpty,
    /// `IS NULL` only (booleans, counts).
    Null,
    /// `IS NULL OR = 0` (numbers where zero means unset).
    NullOrZero,
}

impl Blank {
    fn condition(&self, property: &str) -> String {
        match self {
            Blank::NullOrEmpty => format!("{p} IS NULL OR {p} = ''", p = property),
            Blank::Null => format!("{} IS NULL", property),
            Blank::NullOrZero => format!("{p} IS NULL OR {p} = 0", p = property),
        }
    }
}

/// Renders one source-of-truth gated assignment.
///
/// `source_param` names the parameter holding the writing source
/// (`sourceOfTruth` for most entities, `source` for organization updates).
pub fn gated_assignment(alias: &str, field: &str, source_param: &str, blank: Blank) -> String {
    let property = format!("{}.{}", alias, field);
    format!(
        "{p} = CASE WHEN {a}.sourceOfTruth=${s} OR $overwrite=true OR {blank} THEN ${f} ELSE {p} END",
        p = property,
        a = alias,
        s = source_param,
        blank = blank.condition(&property),
        f = field,
    )
}

/// Accumulates `SET` assignments and their parameters.
#[derive(Debug, Clone)]
pub struct SetClause {
    alias: String,
    source_param: String,
    assignments: Vec<String>,
    params: Params,
}

impl SetClause {
    pub fn new(alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
            source_param: "sourceOfTruth".to_string(),
            assignments: Vec::new(),
            params: Params::new(),
        }
    }

    /// Parameter gated assignments compare `sourceOfTruth` against.
    pub fn with_source_param(mut self, name: &str) -> Self {
        self.source_param = name.to_string();
        self
    }

    /// `n.field = $field`, when `value` is present.
    pub fn set<T: Into<JsonValue>>(&mut self, field: &str, value: Option<T>) -> &mut Self {
        if let Some(value) = value {
            self.assignments
                .push(format!("{}.{} = ${}", self.alias, field, field));
            self.params.insert(field.to_string(), value.into());
        }
        self
    }

    /// Gated string assignment, when `value` is present.
    pub fn set_gated<T: Into<JsonValue>>(&mut self, field: &str, value: Option<T>) -> &mut Self {
        self.set_gated_blank(field, value, Blank::NullOrEmpty)
    }

    /// Gated assignment with an explicit blank check, when `value` is present.
    pub fn set_gated_blank<T: Into<JsonValue>>(
        &mut self,
        field: &str,
        value: Option<T>,
        blank: Blank,
    ) -> &mut Self {
        if let Some(value) = value {
            self.assignments.push(gated_assignment(
                &self.alias,
                field,
                &self.source_param,
                blank,
            ));
            self.params.insert(field.to_string(), value.into());
        }
        self
    }

    /// Assignment gated on ownership only; a blank stored value does not
    /// open it to other sources.
    pub fn set_owned<T: Into<JsonValue>>(&mut self, field: &str, value: Option<T>) -> &mut Self {
        if let Some(value) = value {
            self.assignments.push(format!(
                "{a}.{f} = CASE WHEN {a}.sourceOfTruth=${s} OR $overwrite=true THEN ${f} ELSE {a}.{f} END",
                a = self.alias,
                f = field,
                s = self.source_param,
            ));
            self.params.insert(field.to_string(), value.into());
        }
        self
    }

    /// Adds a hand-written assignment.
    pub fn raw(&mut self, assignment: impl Into<String>) -> &mut Self {
        self.assignments.push(assignment.into());
        self
    }

    /// Binds a parameter referenced by a [`raw`](Self::raw) assignment.
    pub fn param(&mut self, name: &str, value: impl Into<JsonValue>) -> &mut Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// `n.sourceOfTruth` changes only when `$overwrite` is true.
    pub fn source_of_truth(&mut self) -> &mut Self {
        let assignment = format!(
            "{a}.sourceOfTruth = CASE WHEN $overwrite=true THEN ${s} ELSE {a}.sourceOfTruth END",
            a = self.alias,
            s = self.source_param,
        );
        self.assignments.push(assignment);
        self
    }

    /// `n.updatedAt = $updatedAt`.
    pub fn updated_at(&mut self, now: &Timestamp) -> &mut Self {
        self.assignments
            .push(format!("{}.updatedAt = $updatedAt", self.alias));
        self.params
            .insert("updatedAt".to_string(), JsonValue::from(now.clone()));
        self
    }

    /// True when no field assignment has been added.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Comma-separated assignments (without the `SET` keyword) and params.
    pub fn build(self) -> (String, Params) {
        (self.assignments.join(", "), self.params)
    }
}
