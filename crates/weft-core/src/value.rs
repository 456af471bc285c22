//! The value tree walked by every compiler pass.
//!
//! [`Value`] is the recursion unit of the definition forest: plain scalars,
//! arrays and string-keyed maps, service [`Reference`]s, nested inline
//! [`Definition`]s, and the [`Argument`] wrapper that marks a payload for
//! special handling (lazy collections, closure-valued arguments).

use indexmap::IndexMap;

use crate::definition::Definition;
use crate::reference::Reference;

/// A configuration or argument value.
///
/// Maps use [`IndexMap`] so iteration order is the declaration order; the
/// dependency analysis pass relies on this for deterministic edge sets.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The absence of a value.
    Null,
    /// A boolean scalar.
    Bool(bool),
    /// An integer scalar.
    Int(i64),
    /// A floating-point scalar.
    Float(f64),
    /// A string scalar, possibly containing `{key}` placeholders.
    Str(String),
    /// A positional list of values.
    Array(Vec<Value>),
    /// A string-keyed map of values.
    Map(IndexMap<String, Value>),
    /// A reference to another service.
    Reference(Reference),
    /// An inline (anonymous) definition.
    Definition(Box<Definition>),
    /// A wrapped value with special argument semantics.
    Argument(Box<Argument>),
}

impl Value {
    /// Create a string value.
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Check if this value is a scalar (null, bool, int, float or string).
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_)
        )
    }

    /// Get the string slice if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the reference if this value is one.
    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Value::Reference(r) => Some(r),
            _ => None,
        }
    }

    /// Render a scalar as the text it substitutes into a placeholder string.
    ///
    /// Returns `None` for non-scalar values; embedding those in mixed text is
    /// an error the placeholder resolver reports.
    pub fn to_embedded_string(&self) -> Option<String> {
        match self {
            Value::Null => Some(String::new()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Reference> for Value {
    fn from(r: Reference) -> Self {
        Value::Reference(r)
    }
}

impl From<Definition> for Value {
    fn from(d: Definition) -> Self {
        Value::Definition(Box::new(d))
    }
}

/// What an [`Argument`] wrapper means to the passes that see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    /// The payload is evaluated lazily; references inside it are soft.
    Lazy,
    /// The payload is handed over as a closure, not evaluated eagerly.
    Closure,
}

/// A value wrapped with special argument semantics.
///
/// The tree walker recurses into the payload; the dependency analysis pass
/// marks every reference found under a [`ArgumentKind::Lazy`] wrapper as a
/// lazy edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    /// How the payload is to be treated.
    pub kind: ArgumentKind,
    /// The wrapped value.
    pub value: Value,
}

impl Argument {
    /// Wrap a value as a lazily-evaluated argument.
    pub fn lazy(value: impl Into<Value>) -> Self {
        Argument {
            kind: ArgumentKind::Lazy,
            value: value.into(),
        }
    }

    /// Wrap a value as a closure-valued argument.
    pub fn closure(value: impl Into<Value>) -> Self {
        Argument {
            kind: ArgumentKind::Closure,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_classification() {
        assert!(Value::Null.is_scalar());
        assert!(Value::Int(3).is_scalar());
        assert!(Value::string("x").is_scalar());
        assert!(!Value::Array(vec![]).is_scalar());
        assert!(!Value::Map(IndexMap::new()).is_scalar());
    }

    #[test]
    fn embedded_string_rendering() {
        assert_eq!(Value::Int(42).to_embedded_string().as_deref(), Some("42"));
        assert_eq!(Value::Bool(true).to_embedded_string().as_deref(), Some("true"));
        assert_eq!(Value::Null.to_embedded_string().as_deref(), Some(""));
        assert_eq!(Value::Array(vec![]).to_embedded_string(), None);
    }

    #[test]
    fn argument_wrappers() {
        let arg = Argument::lazy(Value::Array(vec![Value::Int(1)]));
        assert_eq!(arg.kind, ArgumentKind::Lazy);

        let arg = Argument::closure(Value::string("callable"));
        assert_eq!(arg.kind, ArgumentKind::Closure);
    }
}
