//! JSON shapes for attribute filters and their validation.
//!
//! ```json
//! {
//!   "logicalOperator": "And",
//!   "filters": [
//!     { "fieldPath": "petTypes", "operator": "Contains", "value": "Dog" },
//!     { "fieldPath": "riskTolerance", "operator": "InRange", "value": [5, 10] }
//!   ]
//! }
//! ```
//!
//! An element of `filters` may itself be a group, so trees nest to any
//! depth. Compiling a wire filter into a [`FilterExpression`] checks every
//! leaf up front; nothing malformed reaches evaluation.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Condition, FilterExpression, FilterOperator, LogicalOperator, Predicate};
use crate::attributes::AttributeValue;
use crate::error::{Error, Result};

/// A group of filters joined by one logical operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeFilters {
    /// `And` or `Or`, case-insensitive. Missing means `And`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_operator: Option<String>,
    #[serde(default)]
    pub filters: Vec<FilterNode>,
}

/// A single predicate as sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeFilter {
    pub field_path: String,
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Either a leaf or a nested group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterNode {
    Filter(AttributeFilter),
    Group(AttributeFilters),
}

// Objects carrying `filters` or `logicalOperator` are groups, everything else
// is a leaf. Dispatching on the keys keeps serde's field-level error messages
// instead of the opaque untagged-enum failure.
impl<'de> Deserialize<'de> for FilterNode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let is_group = value
            .as_object()
            .is_some_and(|o| o.contains_key("filters") || o.contains_key("logicalOperator"));

        if is_group {
            serde_json::from_value(value)
                .map(FilterNode::Group)
                .map_err(de::Error::custom)
        } else {
            serde_json::from_value(value)
                .map(FilterNode::Filter)
                .map_err(de::Error::custom)
        }
    }
}

impl AttributeFilters {
    /// Validates and compiles the group.
    pub fn compile(&self) -> Result<FilterExpression> {
        let operator = match self.logical_operator.as_deref() {
            None => LogicalOperator::And,
            Some(token) => token.trim().parse()?,
        };
        let children = self
            .filters
            .iter()
            .map(FilterNode::compile)
            .collect::<Result<Vec<_>>>()?;

        Ok(FilterExpression::Group { operator, children })
    }
}

impl FilterNode {
    pub fn compile(&self) -> Result<FilterExpression> {
        match self {
            FilterNode::Filter(filter) => filter.compile(),
            FilterNode::Group(group) => group.compile(),
        }
    }
}

impl AttributeFilter {
    /// Validates and compiles the predicate.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidFilter`] for an empty path, an unknown operator, a
    /// missing value, or an `InRange` value that is not `[min, max]`.
    pub fn compile(&self) -> Result<FilterExpression> {
        let path = self.field_path.trim();
        if path.is_empty() {
            return Err(Error::InvalidFilter("filter field path must not be empty".into()));
        }

        let operator: FilterOperator = self.operator.trim().parse().map_err(|e| match e {
            Error::InvalidFilter(msg) => Error::InvalidFilter(format!("field '{}': {}", path, msg)),
            other => other,
        })?;

        let value = match (&self.value, operator.requires_value()) {
            (Some(v), true) => Some(v),
            (None, true) => {
                return Err(Error::InvalidFilter(format!(
                    "operator '{}' on field '{}' requires a value",
                    operator, path
                )))
            }
            (_, false) => None,
        };

        let condition = match (operator, value) {
            (FilterOperator::InRange, Some(v)) => range_bounds(path, v)?,
            (FilterOperator::Equals, Some(v)) => Condition::Equals(v.clone().into()),
            (FilterOperator::NotEquals, Some(v)) => Condition::NotEquals(v.clone().into()),
            (FilterOperator::Contains, Some(v)) => Condition::Contains(v.clone().into()),
            (FilterOperator::NotContains, Some(v)) => Condition::NotContains(v.clone().into()),
            (FilterOperator::GreaterThan, Some(v)) => Condition::GreaterThan(v.clone().into()),
            (FilterOperator::LessThan, Some(v)) => Condition::LessThan(v.clone().into()),
            (FilterOperator::IsTrue, _) => Condition::IsTrue,
            (FilterOperator::IsFalse, _) => Condition::IsFalse,
            (FilterOperator::Exists, _) => Condition::Exists,
            (FilterOperator::NotExists, _) => Condition::NotExists,
            (op, None) => {
                return Err(Error::InvalidFilter(format!(
                    "operator '{}' on field '{}' requires a value",
                    op, path
                )))
            }
        };

        Ok(FilterExpression::Predicate(Predicate::new(path, condition)))
    }
}

fn range_bounds(path: &str, value: &Value) -> Result<Condition> {
    let invalid = || {
        Error::InvalidFilter(format!(
            "operator 'InRange' on field '{}' requires a [min, max] pair of numbers",
            path
        ))
    };

    let bounds = value.as_array().ok_or_else(invalid)?;
    let [min, max] = bounds.as_slice() else {
        return Err(invalid());
    };
    let (min, max) = match (min.as_f64(), max.as_f64()) {
        (Some(min), Some(max)) => (min, max),
        _ => return Err(invalid()),
    };
    if min > max {
        return Err(Error::InvalidFilter(format!(
            "operator 'InRange' on field '{}' has min {} greater than max {}",
            path, min, max
        )));
    }

    Ok(Condition::InRange { min, max })
}

impl TryFrom<&AttributeFilters> for FilterExpression {
    type Error = Error;

    fn try_from(filters: &AttributeFilters) -> Result<Self> {
        filters.compile()
    }
}

impl From<&FilterExpression> for FilterNode {
    fn from(expression: &FilterExpression) -> Self {
        match expression {
            FilterExpression::Predicate(p) => {
                let value = match p.condition() {
                    Condition::Equals(v)
                    | Condition::NotEquals(v)
                    | Condition::Contains(v)
                    | Condition::NotContains(v)
                    | Condition::GreaterThan(v)
                    | Condition::LessThan(v) => Some(Value::from(v.clone())),
                    Condition::InRange { min, max } => Some(Value::from(AttributeValue::List(vec![
                        AttributeValue::Number(*min),
                        AttributeValue::Number(*max),
                    ]))),
                    _ => None,
                };
                FilterNode::Filter(AttributeFilter {
                    field_path: p.field_path().to_string(),
                    operator: p.condition().operator().to_string(),
                    value,
                })
            }
            FilterExpression::Group { operator, children } => FilterNode::Group(AttributeFilters {
                logical_operator: Some(
                    match operator {
                        LogicalOperator::And => "And",
                        LogicalOperator::Or => "Or",
                    }
                    .to_string(),
                ),
                filters: children.iter().map(FilterNode::from).collect(),
            }),
        }
    }
}
