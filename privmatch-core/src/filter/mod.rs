//! Attribute filter expressions.
//!
//! Filters combine semantic search with structured constraints, enabling
//! queries like "similar profiles where petTypes contains 'Dog' AND
//! riskTolerance > 6".
//!
//! Evaluation never fails. A missing attribute or a type mismatch simply does
//! not match, so one odd record cannot abort a search. Malformed filters are
//! rejected earlier, when the wire form in [`wire`] is compiled.

pub mod wire;

pub use wire::{AttributeFilter, AttributeFilters, FilterNode};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::attributes::{AttributeValue, Attributes};
use crate::error::{Error, Result};
use crate::visibility::ATTRIBUTES_PREFIX;

/// Leaf operators, named by their wire tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
    InRange,
    IsTrue,
    IsFalse,
    Exists,
    NotExists,
}

impl FilterOperator {
    /// Every operator, in wire order.
    pub const ALL: [FilterOperator; 11] = [
        FilterOperator::Equals,
        FilterOperator::NotEquals,
        FilterOperator::Contains,
        FilterOperator::NotContains,
        FilterOperator::GreaterThan,
        FilterOperator::LessThan,
        FilterOperator::InRange,
        FilterOperator::IsTrue,
        FilterOperator::IsFalse,
        FilterOperator::Exists,
        FilterOperator::NotExists,
    ];

    /// The exact wire token.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "Equals",
            FilterOperator::NotEquals => "NotEquals",
            FilterOperator::Contains => "Contains",
            FilterOperator::NotContains => "NotContains",
            FilterOperator::GreaterThan => "GreaterThan",
            FilterOperator::LessThan => "LessThan",
            FilterOperator::InRange => "InRange",
            FilterOperator::IsTrue => "IsTrue",
            FilterOperator::IsFalse => "IsFalse",
            FilterOperator::Exists => "Exists",
            FilterOperator::NotExists => "NotExists",
        }
    }

    /// Returns true if the operator compares against a value.
    pub fn requires_value(&self) -> bool {
        !matches!(
            self,
            FilterOperator::IsTrue
                | FilterOperator::IsFalse
                | FilterOperator::Exists
                | FilterOperator::NotExists
        )
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FilterOperator::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| {
                let expected: Vec<&str> = FilterOperator::ALL.iter().map(|op| op.as_str()).collect();
                Error::InvalidFilter(format!(
                    "unknown operator '{}'; expected one of {}",
                    s,
                    expected.join(", ")
                ))
            })
    }
}

/// How a group combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LogicalOperator {
    /// All children must match. An empty group matches.
    #[default]
    And,
    /// At least one child must match. An empty group does not match.
    Or,
}

impl FromStr for LogicalOperator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("and") {
            Ok(LogicalOperator::And)
        } else if s.eq_ignore_ascii_case("or") {
            Ok(LogicalOperator::Or)
        } else {
            Err(Error::InvalidFilter(format!(
                "unknown logical operator '{}'; expected And or Or",
                s
            )))
        }
    }
}

/// The condition a predicate applies to a resolved attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals(AttributeValue),
    NotEquals(AttributeValue),
    /// List membership or substring.
    Contains(AttributeValue),
    NotContains(AttributeValue),
    GreaterThan(AttributeValue),
    LessThan(AttributeValue),
    /// Closed interval.
    InRange { min: f64, max: f64 },
    IsTrue,
    IsFalse,
    Exists,
    NotExists,
}

impl Condition {
    /// The operator this condition was built from.
    pub fn operator(&self) -> FilterOperator {
        match self {
            Condition::Equals(_) => FilterOperator::Equals,
            Condition::NotEquals(_) => FilterOperator::NotEquals,
            Condition::Contains(_) => FilterOperator::Contains,
            Condition::NotContains(_) => FilterOperator::NotContains,
            Condition::GreaterThan(_) => FilterOperator::GreaterThan,
            Condition::LessThan(_) => FilterOperator::LessThan,
            Condition::InRange { .. } => FilterOperator::InRange,
            Condition::IsTrue => FilterOperator::IsTrue,
            Condition::IsFalse => FilterOperator::IsFalse,
            Condition::Exists => FilterOperator::Exists,
            Condition::NotExists => FilterOperator::NotExists,
        }
    }

    /// Applies the condition to an attribute that is present.
    fn test(&self, actual: &AttributeValue) -> bool {
        match self {
            Condition::Equals(expected) => actual == expected,
            Condition::NotEquals(expected) => actual != expected,
            Condition::Contains(needle) => contains(actual, needle).unwrap_or(false),
            Condition::NotContains(needle) => contains(actual, needle).is_some_and(|found| !found),
            Condition::GreaterThan(bound) => compare_numbers(actual, bound, |a, b| a > b),
            Condition::LessThan(bound) => compare_numbers(actual, bound, |a, b| a < b),
            Condition::InRange { min, max } => actual
                .as_f64()
                .is_some_and(|n| n >= *min && n <= *max),
            Condition::IsTrue => actual.as_bool() == Some(true),
            Condition::IsFalse => actual.as_bool() == Some(false),
            Condition::Exists => true,
            Condition::NotExists => false,
        }
    }
}

/// A leaf: one condition on one field path.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    field_path: String,
    condition: Condition,
}

impl Predicate {
    /// Creates a predicate.
    pub fn new(field_path: impl Into<String>, condition: Condition) -> Self {
        Self {
            field_path: field_path.into(),
            condition,
        }
    }

    #[inline]
    pub fn field_path(&self) -> &str {
        &self.field_path
    }

    #[inline]
    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Evaluates the predicate. An absent field only satisfies `NotExists`.
    pub fn matches(&self, attributes: &Attributes) -> bool {
        match resolve(attributes, &self.field_path) {
            Some(actual) => self.condition.test(actual),
            None => matches!(self.condition, Condition::NotExists),
        }
    }
}

/// A boolean tree of predicates.
///
/// # Example
///
/// ```
/// use privmatch_core::{Attributes, FilterExpression};
///
/// let attrs = Attributes::new()
///     .with_field("petTypes", vec!["Dog", "Cat"])
///     .with_field("riskTolerance", 8);
///
/// let filter = FilterExpression::field("petTypes")
///     .contains("Dog")
///     .and(FilterExpression::field("riskTolerance").greater_than(6));
///
/// assert!(filter.matches(&attrs));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpression {
    Predicate(Predicate),
    Group {
        operator: LogicalOperator,
        children: Vec<FilterExpression>,
    },
}

impl FilterExpression {
    /// Starts a predicate on a field path.
    pub fn field(path: &str) -> FieldFilter {
        FieldFilter {
            field_path: path.to_string(),
        }
    }

    /// A group where every child must match.
    pub fn all(children: Vec<FilterExpression>) -> Self {
        FilterExpression::Group {
            operator: LogicalOperator::And,
            children,
        }
    }

    /// A group where at least one child must match.
    pub fn any(children: Vec<FilterExpression>) -> Self {
        FilterExpression::Group {
            operator: LogicalOperator::Or,
            children,
        }
    }

    /// Combines with another expression using AND, flattening AND chains.
    pub fn and(self, other: FilterExpression) -> Self {
        self.combine(LogicalOperator::And, other)
    }

    /// Combines with another expression using OR, flattening OR chains.
    pub fn or(self, other: FilterExpression) -> Self {
        self.combine(LogicalOperator::Or, other)
    }

    fn combine(self, op: LogicalOperator, other: FilterExpression) -> Self {
        match self {
            FilterExpression::Group {
                operator,
                mut children,
            } if operator == op => {
                children.push(other);
                FilterExpression::Group {
                    operator,
                    children,
                }
            }
            this => FilterExpression::Group {
                operator: op,
                children: vec![this, other],
            },
        }
    }

    /// Evaluates the expression. Groups short-circuit.
    pub fn matches(&self, attributes: &Attributes) -> bool {
        match self {
            FilterExpression::Predicate(p) => p.matches(attributes),
            FilterExpression::Group {
                operator: LogicalOperator::And,
                children,
            } => children.iter().all(|c| c.matches(attributes)),
            FilterExpression::Group {
                operator: LogicalOperator::Or,
                children,
            } => children.iter().any(|c| c.matches(attributes)),
        }
    }

    /// Every field path referenced by the expression, in order.
    pub fn field_paths(&self) -> Vec<&str> {
        let mut paths = Vec::new();
        self.collect_paths(&mut paths);
        paths
    }

    fn collect_paths<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            FilterExpression::Predicate(p) => out.push(p.field_path()),
            FilterExpression::Group { children, .. } => {
                for child in children {
                    child.collect_paths(out);
                }
            }
        }
    }
}

impl From<Predicate> for FilterExpression {
    fn from(predicate: Predicate) -> Self {
        FilterExpression::Predicate(predicate)
    }
}

/// Evaluates `expression` against an attribute bag.
#[inline]
pub fn evaluate(expression: &FilterExpression, attributes: &Attributes) -> bool {
    expression.matches(attributes)
}

/// Builder for predicates on one field.
#[derive(Debug)]
pub struct FieldFilter {
    field_path: String,
}

impl FieldFilter {
    fn build(self, condition: Condition) -> FilterExpression {
        FilterExpression::Predicate(Predicate::new(self.field_path, condition))
    }

    pub fn equals<V: Into<AttributeValue>>(self, value: V) -> FilterExpression {
        self.build(Condition::Equals(value.into()))
    }

    pub fn not_equals<V: Into<AttributeValue>>(self, value: V) -> FilterExpression {
        self.build(Condition::NotEquals(value.into()))
    }

    /// List contains the value, or string contains the substring.
    pub fn contains<V: Into<AttributeValue>>(self, value: V) -> FilterExpression {
        self.build(Condition::Contains(value.into()))
    }

    pub fn not_contains<V: Into<AttributeValue>>(self, value: V) -> FilterExpression {
        self.build(Condition::NotContains(value.into()))
    }

    pub fn greater_than<V: Into<AttributeValue>>(self, value: V) -> FilterExpression {
        self.build(Condition::GreaterThan(value.into()))
    }

    pub fn less_than<V: Into<AttributeValue>>(self, value: V) -> FilterExpression {
        self.build(Condition::LessThan(value.into()))
    }

    /// Field is a number within `[min, max]`, bounds included.
    pub fn in_range(self, min: f64, max: f64) -> FilterExpression {
        self.build(Condition::InRange { min, max })
    }

    pub fn is_true(self) -> FilterExpression {
        self.build(Condition::IsTrue)
    }

    pub fn is_false(self) -> FilterExpression {
        self.build(Condition::IsFalse)
    }

    /// Field is present. An explicit null counts as present.
    pub fn exists(self) -> FilterExpression {
        self.build(Condition::Exists)
    }

    pub fn not_exists(self) -> FilterExpression {
        self.build(Condition::NotExists)
    }
}

// Paths may be written relative to the bag ("skills") or the way privacy
// settings spell them ("attributes.skills").
fn resolve<'a>(attributes: &'a Attributes, path: &str) -> Option<&'a AttributeValue> {
    attributes.resolve(path).or_else(|| {
        path.strip_prefix(ATTRIBUTES_PREFIX)
            .and_then(|rest| attributes.resolve(rest))
    })
}

// None when the attribute is neither a list nor a string.
fn contains(haystack: &AttributeValue, needle: &AttributeValue) -> Option<bool> {
    match haystack {
        AttributeValue::List(items) => Some(items.contains(needle)),
        AttributeValue::String(s) => needle.as_str().map(|n| s.contains(n)),
        _ => None,
    }
}

fn compare_numbers<F>(actual: &AttributeValue, bound: &AttributeValue, cmp: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    match (actual.as_f64(), bound.as_f64()) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}
