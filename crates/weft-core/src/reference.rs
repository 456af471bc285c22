//! Service references and their on-invalid policies.

use crate::definition::MethodCall;

/// What happens when a reference points at a service that does not exist.
///
/// The policy travels with the reference through every pass unchanged; only
/// the invalid-reference resolver acts on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidBehavior {
    /// Compilation fails with a missing-service error.
    #[default]
    Exception,
    /// The reference is replaced by null.
    Null,
    /// The reference (or its enclosing collection entry) is dropped.
    Ignore,
    /// The reference is kept; the runtime skips it while the target is
    /// uninitialized. Edges built from such references are *weak*.
    IgnoreOnUninitialized,
}

/// "Use the value produced by service `id`."
///
/// The declared type is decoupled from the id so autowired lookups can match
/// on type while the id stays a plain service name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reference {
    /// The target service id.
    pub id: String,
    /// Policy when the target does not exist.
    pub behavior: InvalidBehavior,
    /// Declared type of the target, for autowired lookups.
    pub ty: Option<String>,
    /// Variable-name hint used for named autowiring bindings.
    pub name: Option<String>,
    /// Method calls applied to the referenced value after retrieval.
    pub calls: Vec<MethodCall>,
}

impl Reference {
    /// Create a reference with the default (exception) behavior.
    pub fn new(id: impl Into<String>) -> Self {
        Reference {
            id: id.into(),
            ..Reference::default()
        }
    }

    /// Create a reference with an explicit on-invalid behavior.
    pub fn with_behavior(id: impl Into<String>, behavior: InvalidBehavior) -> Self {
        Reference {
            id: id.into(),
            behavior,
            ..Reference::default()
        }
    }

    /// Create a typed reference, as produced by the autowiring pass.
    pub fn typed(id: impl Into<String>, ty: impl Into<String>) -> Self {
        Reference {
            id: id.into(),
            ty: Some(ty.into()),
            ..Reference::default()
        }
    }

    /// Whether edges built from this reference are weak.
    pub fn is_weak(&self) -> bool {
        self.behavior == InvalidBehavior::IgnoreOnUninitialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_behavior_is_exception() {
        let r = Reference::new("db");
        assert_eq!(r.behavior, InvalidBehavior::Exception);
        assert!(!r.is_weak());
    }

    #[test]
    fn uninitialized_references_are_weak() {
        let r = Reference::with_behavior("db", InvalidBehavior::IgnoreOnUninitialized);
        assert!(r.is_weak());
    }

    #[test]
    fn typed_reference_keeps_id_and_type_apart() {
        let r = Reference::typed("app.logger", "FileLogger");
        assert_eq!(r.id, "app.logger");
        assert_eq!(r.ty.as_deref(), Some("FileLogger"));
    }
}
