//! Attribute storage for entity records.
//!
//! Attributes are an open bag of typed values attached to an entity. Values
//! form a tagged union so filters can pattern-match without inspecting
//! untyped JSON at evaluation time.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// A single attribute value.
///
/// Converts to and from [`serde_json::Value`]; all JSON numbers become `f64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum AttributeValue {
    /// Explicit null.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value. Integers and floats share one representation.
    Number(f64),
    /// UTF-8 string.
    String(String),
    /// Ordered sequence of values.
    List(Vec<AttributeValue>),
    /// Nested map of values.
    Map(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Returns the string slice if this is a string.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number if this is numeric.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean if this is a bool.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the elements if this is a list.
    #[inline]
    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the entries if this is a map.
    #[inline]
    pub fn as_map(&self) -> Option<&BTreeMap<String, AttributeValue>> {
        match self {
            AttributeValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns true for an explicit null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Short name of the value's type, used in validation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::Null => "null",
            AttributeValue::Bool(_) => "bool",
            AttributeValue::Number(_) => "number",
            AttributeValue::String(_) => "string",
            AttributeValue::List(_) => "list",
            AttributeValue::Map(_) => "map",
        }
    }
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => AttributeValue::Null,
            Value::Bool(b) => AttributeValue::Bool(b),
            Value::Number(n) => n
                .as_f64()
                .map_or(AttributeValue::Null, AttributeValue::Number),
            Value::String(s) => AttributeValue::String(s),
            Value::Array(items) => {
                AttributeValue::List(items.into_iter().map(AttributeValue::from).collect())
            }
            Value::Object(map) => AttributeValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, AttributeValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<AttributeValue> for Value {
    fn from(value: AttributeValue) -> Self {
        match value {
            AttributeValue::Null => Value::Null,
            AttributeValue::Bool(b) => Value::Bool(b),
            AttributeValue::Number(n) => number_to_json(n),
            AttributeValue::String(s) => Value::String(s),
            AttributeValue::List(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            AttributeValue::Map(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

// Whole numbers go back out as JSON integers so `8` doesn't come back as `8.0`.
fn number_to_json(n: f64) -> Value {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

impl From<f64> for AttributeValue {
    fn from(n: f64) -> Self {
        AttributeValue::Number(n)
    }
}

impl From<f32> for AttributeValue {
    fn from(n: f32) -> Self {
        AttributeValue::Number(f64::from(n))
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        AttributeValue::Number(n as f64)
    }
}

impl From<i32> for AttributeValue {
    fn from(n: i32) -> Self {
        AttributeValue::Number(f64::from(n))
    }
}

impl From<u32> for AttributeValue {
    fn from(n: u32) -> Self {
        AttributeValue::Number(f64::from(n))
    }
}

impl<T: Into<AttributeValue>> From<Vec<T>> for AttributeValue {
    fn from(items: Vec<T>) -> Self {
        AttributeValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// Open attribute bag attached to an entity.
///
/// # Example
///
/// ```
/// use privmatch_core::Attributes;
///
/// let attrs = Attributes::new()
///     .with_field("occupation", "nurse")
///     .with_field("riskTolerance", 8)
///     .with_field("petTypes", vec!["Dog", "Cat"]);
///
/// assert_eq!(attrs.get_str("occupation"), Some("nurse"));
/// assert_eq!(attrs.get_f64("riskTolerance"), Some(8.0));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes {
    data: HashMap<String, AttributeValue>,
}

impl Attributes {
    /// Creates a new empty attribute bag.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    /// Creates an attribute bag from a HashMap.
    #[inline]
    pub fn from_map(data: HashMap<String, AttributeValue>) -> Self {
        Self { data }
    }

    /// Adds a field to the bag. Chainable.
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Sets a field value, returning the previous value if any.
    pub fn set<K, V>(&mut self, key: K, value: V) -> Option<AttributeValue>
    where
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        self.data.insert(key.into(), value.into())
    }

    /// Gets a top-level field by key.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.data.get(key)
    }

    /// Gets a field as a string.
    #[inline]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// Gets a field as an f64.
    #[inline]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(|v| v.as_f64())
    }

    /// Gets a field as a bool.
    #[inline]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(|v| v.as_bool())
    }

    /// Gets a field as a list.
    #[inline]
    pub fn get_list(&self, key: &str) -> Option<&[AttributeValue]> {
        self.data.get(key).and_then(|v| v.as_list())
    }

    /// Resolves a dot-delimited path.
    ///
    /// An exact top-level key wins; otherwise the path is walked segment by
    /// segment through nested maps.
    ///
    /// ```
    /// use privmatch_core::{AttributeValue, Attributes};
    ///
    /// let attrs: Attributes = serde_json::from_str(
    ///     r#"{"address": {"city": "Lyon"}, "a.b": 1}"#,
    /// ).unwrap();
    ///
    /// assert_eq!(attrs.resolve("address.city"), Some(&AttributeValue::from("Lyon")));
    /// assert_eq!(attrs.resolve("a.b"), Some(&AttributeValue::Number(1.0)));
    /// assert!(attrs.resolve("address.zip").is_none());
    /// ```
    pub fn resolve(&self, path: &str) -> Option<&AttributeValue> {
        if let Some(value) = self.data.get(path) {
            return Some(value);
        }

        let mut segments = path.split('.');
        let mut current = self.data.get(segments.next()?)?;
        for segment in segments {
            current = current.as_map()?.get(segment)?;
        }
        Some(current)
    }

    /// Removes a field and returns its value if present.
    #[inline]
    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        self.data.remove(key)
    }

    /// Returns true if the bag contains the given top-level key.
    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Returns the number of top-level fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the bag has no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns an iterator over the fields.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.data.iter()
    }

    /// Returns a copy holding only the fields whose key passes `keep`.
    pub fn filtered<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&str) -> bool,
    {
        Self {
            data: self
                .data
                .iter()
                .filter(|(k, _)| keep(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Returns the underlying data map.
    #[inline]
    pub fn into_inner(self) -> HashMap<String, AttributeValue> {
        self.data
    }
}

impl TryFrom<Value> for Attributes {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self {
                data: map
                    .into_iter()
                    .map(|(k, v)| (k, AttributeValue::from(v)))
                    .collect(),
            }),
            Value::Null => Ok(Self::new()),
            other => Err(Error::InvalidRequest(format!(
                "attributes must be a JSON object, got {}",
                AttributeValue::from(other).type_name()
            ))),
        }
    }
}

impl FromIterator<(String, AttributeValue)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (String, AttributeValue)>>(iter: T) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}
