//! Document records and query options.

use cap_core::{CapabilityError, CapabilityResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored document. Never visible outside its `(tenant, applet)` scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocRecord {
    pub id: String,
    pub table: String,
    pub value: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result ordering, always over `updatedAt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    Asc,
    #[default]
    Desc,
}

/// A single equality constraint over a dot-path field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConstraint {
    pub field: String,
    pub op: String,
    pub value: Value,
}

impl QueryConstraint {
    /// Only `eq` is supported by design; anything else is rejected here,
    /// before any I/O happens.
    fn validate(&self) -> CapabilityResult<()> {
        if self.op != "eq" {
            return Err(CapabilityError::invalid(format!(
                "unsupported query operator {:?} (only \"eq\" is supported)",
                self.op
            )));
        }
        if self.field.trim().is_empty() {
            return Err(CapabilityError::invalid("query field must not be empty"));
        }
        // Backends compare the text rendering of a JSONB leaf, which
        // only agrees across backends for scalars. Composite equality
        // is not part of the query surface.
        if self.value.is_object() || self.value.is_array() {
            return Err(CapabilityError::invalid(format!(
                "constraint value for {:?} must be a scalar",
                self.field
            )));
        }
        Ok(())
    }
}

/// Parsed and validated query options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<QueryConstraint>,
    #[serde(default)]
    pub filters: Vec<QueryConstraint>,
    #[serde(default)]
    pub order: Order,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl QueryOptions {
    /// Parse untyped RPC params into validated options.
    ///
    /// A missing/null options object means "everything in the table".
    pub fn from_value(raw: Option<&Value>) -> CapabilityResult<Self> {
        let options: QueryOptions = match raw {
            None | Some(Value::Null) => QueryOptions::default(),
            Some(v) => serde_json::from_value(v.clone())
                .map_err(|e| CapabilityError::invalid(format!("invalid query options: {e}")))?,
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> CapabilityResult<()> {
        if let Some(index) = &self.index {
            index.validate()?;
        }
        for filter in &self.filters {
            filter.validate()?;
        }
        Ok(())
    }

    /// All constraints in evaluation order: index first, then filters.
    pub fn constraints(&self) -> impl Iterator<Item = &QueryConstraint> {
        self.index.iter().chain(self.filters.iter())
    }
}
