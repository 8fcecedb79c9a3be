//! Dynamically typed field values and ordered field bags.
//!
//! Shares hold no schema: each field maps to one of a closed set of value
//! shapes. Field order is preserved so that anything derived from a bag
//! (log column layouts in particular) is deterministic.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered mapping of field name to value.
pub type FieldBag = IndexMap<String, Value>;

/// A single stored value.
///
/// `Display` renders the raw-text form used by streak and deck logs:
/// text appears bare, floats always carry a decimal point (`5.0`, not
/// `5`), and compound values fall back to their JSON rendering.
///
/// # Example
///
/// ```rust
/// use reflex::store::Value;
///
/// assert_eq!(Value::from(5.0).to_string(), "5.0");
/// assert_eq!(Value::from(7).to_string(), "7");
/// assert_eq!(Value::from("hello").to_string(), "hello");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Bag(FieldBag),
}

impl Value {
    /// Truthiness in the dynamic-value sense: false, zero, and empty
    /// containers are falsy, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Bag(bag) => !bag.is_empty(),
        }
    }

    /// Numeric view of the value. Only integers and floats are numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Text view of the value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// List view of the value.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Bag view of the value.
    pub fn as_bag(&self) -> Option<&FieldBag> {
        match self {
            Value::Bag(bag) => Some(bag),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(n) if n.is_finite() && n.fract() == 0.0 => write!(f, "{n:.1}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
            compound => write!(
                f,
                "{}",
                serde_json::to_string(compound).unwrap_or_default()
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<FieldBag> for Value {
    fn from(value: FieldBag) -> Self {
        Value::Bag(value)
    }
}

/// Build a [`FieldBag`] from literal field/value pairs.
///
/// # Example
///
/// ```rust
/// use reflex::fields;
///
/// let bag = fields! { "north" => 10.0, "east" => 5.0 };
/// assert_eq!(bag.len(), 2);
/// ```
#[macro_export]
macro_rules! fields {
    () => { $crate::store::FieldBag::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut bag = $crate::store::FieldBag::new();
        $(bag.insert($name.to_string(), $crate::store::Value::from($value));)+
        bag
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_follows_dynamic_rules() {
        assert!(Value::from(true).is_truthy());
        assert!(!Value::from(false).is_truthy());
        assert!(Value::from(1).is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(Value::from(0.5).is_truthy());
        assert!(!Value::from(0.0).is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(Value::List(vec![Value::from(1)]).is_truthy());
    }

    #[test]
    fn numeric_view_covers_ints_and_floats() {
        assert_eq!(Value::from(7).as_f64(), Some(7.0));
        assert_eq!(Value::from(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::from("7").as_f64(), None);
        assert_eq!(Value::Bool(true).as_f64(), None);
    }

    #[test]
    fn raw_text_keeps_float_point() {
        assert_eq!(Value::from(0.0).to_string(), "0.0");
        assert_eq!(Value::from(5.0).to_string(), "5.0");
        assert_eq!(Value::from(2.5).to_string(), "2.5");
        assert_eq!(Value::from(6).to_string(), "6");
        assert_eq!(Value::from("hello").to_string(), "hello");
    }

    #[test]
    fn fields_macro_preserves_order() {
        let bag = fields! { "b" => 1.0, "a" => 2.0, "c" => 3.0 };
        let names: Vec<&str> = bag.keys().map(String::as_str).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn value_roundtrips_through_json() {
        let bag = fields! { "name" => "alpha", "count" => 3, "ratio" => 0.5 };
        let value = Value::Bag(bag);
        let json = serde_json::to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, back);
    }

    #[test]
    fn bag_deserializes_from_json_object() {
        let bag: FieldBag = serde_json::from_str(r#"{"north": 10.0, "label": "ned"}"#).unwrap();
        assert_eq!(bag.get("north"), Some(&Value::Float(10.0)));
        assert_eq!(bag.get("label"), Some(&Value::Text("ned".to_string())));
    }
}
