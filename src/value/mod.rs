//! Value model shared between the evaluator and the bounded containers
//!
//! Container variants are reference-counted handles, so cloning a `Value`
//! aliases the same underlying container and cyclic graphs are
//! constructible, matching the reference semantics scripts observe.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::bounded::{BoundedList, BoundedMap, BoundedSet, BoundedText};

/// A datum flowing through the sandbox.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(Rc<BoundedText>),
    List(BoundedList),
    Map(BoundedMap),
    Set(BoundedSet),
}

impl Value {
    /// Variant name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
        }
    }

    /// Element count for container-like values, character count for text.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Text(text) => Some(text.char_len()),
            Value::List(list) => Some(list.len()),
            Value::Map(map) => Some(map.len()),
            Value::Set(set) => Some(set.len()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> Option<bool> {
        self.len().map(|len| len == 0)
    }

    /// Pointer identity of the shared record backing this value, if any.
    ///
    /// Scalars have no identity; two equal ints are indistinguishable.
    pub(crate) fn identity(&self) -> Option<usize> {
        match self {
            Value::Text(text) => Some(Rc::as_ptr(text) as usize),
            Value::List(list) => Some(list.identity()),
            Value::Map(map) => Some(map.identity()),
            Value::Set(set) => Some(set.identity()),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            _ => false,
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

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

/// Scalar values usable as map keys and set members.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Key {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Key {
    /// Key form of a value, or `None` for kinds that cannot be a key.
    ///
    /// Rejecting container-kinded keys is the evaluator's type error, not a
    /// limit condition.
    pub fn from_value(value: &Value) -> Option<Key> {
        match value {
            Value::Null => Some(Key::Null),
            Value::Bool(inner) => Some(Key::Bool(*inner)),
            Value::Int(inner) => Some(Key::Int(*inner)),
            Value::Text(inner) => Some(Key::Text(inner.as_str().to_string())),
            _ => None,
        }
    }

    /// Approximate size contribution of this key.
    pub fn approx_size(&self) -> usize {
        match self {
            Key::Text(text) => text.chars().count(),
            _ => 0,
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Null => write!(f, "null"),
            Key::Bool(inner) => write!(f, "{}", inner),
            Key::Int(inner) => write!(f, "{}", inner),
            Key::Text(inner) => write!(f, "\"{}\"", inner),
        }
    }
}

impl From<bool> for Key {
    fn from(value: bool) -> Self {
        Key::Bool(value)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::LimitPolicy;

    fn policy() -> Rc<LimitPolicy> {
        Rc::new(LimitPolicy::default())
    }

    #[test]
    fn test_value_kind() {
        assert_eq!(Value::Null.kind(), "null");
        assert_eq!(Value::Int(3).kind(), "int");
        assert_eq!(Value::List(BoundedList::new(policy())).kind(), "list");
    }

    #[test]
    fn test_value_len() {
        assert_eq!(Value::Int(3).len(), None);
        let text = Rc::new(BoundedText::new(policy(), "héllo"));
        assert_eq!(Value::Text(text).len(), Some(5));
        let list = BoundedList::from_values(policy(), vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(Value::List(list).len(), Some(2));
    }

    #[test]
    fn test_aliased_values_share_identity() {
        let list = BoundedList::new(policy());
        let a = Value::List(list.clone());
        let b = Value::List(list);
        assert_eq!(a.identity(), b.identity());
        let other = Value::List(BoundedList::new(policy()));
        assert_ne!(a.identity(), other.identity());
    }

    #[test]
    fn test_self_referential_equality_terminates() {
        let list = BoundedList::new(policy());
        list.append(Value::List(list.clone())).unwrap();
        let a = Value::List(list.clone());
        let b = Value::List(list);
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_from_value() {
        assert_eq!(Key::from_value(&Value::Int(7)), Some(Key::Int(7)));
        assert_eq!(Key::from_value(&Value::Null), Some(Key::Null));
        let text = Rc::new(BoundedText::new(policy(), "k"));
        assert_eq!(
            Key::from_value(&Value::Text(text)),
            Some(Key::Text("k".to_string()))
        );
        assert_eq!(Key::from_value(&Value::List(BoundedList::new(policy()))), None);
    }

    #[test]
    fn test_key_approx_size() {
        assert_eq!(Key::Int(9).approx_size(), 0);
        assert_eq!(Key::from("héllo").approx_size(), 5);
    }

    #[test]
    fn test_key_serializes() {
        let json = serde_json::to_string(&Key::Int(3)).unwrap();
        let back: Key = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Key::Int(3));
    }
}
