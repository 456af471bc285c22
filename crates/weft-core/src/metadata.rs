//! Precomputed class metadata used by autowiring and validity checks.
//!
//! There is no late-bound reflection here: class shapes (constructor
//! signatures, method parameter lists, supertype sets) are registered once
//! into a [`MetadataRegistry`] when the definition model is loaded, and every
//! pass performs nullable lookups against it.
//!
//! The registry is **not thread-safe** by design: it is populated
//! single-threaded before compilation starts and is effectively read-only
//! while the passes run.

use rustc_hash::FxHashMap;

use crate::value::Value;

/// Canonical name of the constructor in metadata and error messages.
pub const CONSTRUCTOR: &str = "constructor";

/// A declared parameter type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// A class or interface name.
    Class(String),
    /// An array whose elements are instances of the named type.
    ListOf(String),
}

impl TypeRef {
    /// The element type name for lists, the class name otherwise.
    pub fn name(&self) -> &str {
        match self {
            TypeRef::Class(name) | TypeRef::ListOf(name) => name,
        }
    }
}

/// Metadata for one positional parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamMeta {
    /// The parameter name.
    pub name: String,
    /// The declared type; `None` for untyped parameters.
    pub ty: Option<TypeRef>,
    /// Whether null is an acceptable value.
    pub nullable: bool,
    /// The declared default value, when one exists.
    pub default: Option<Value>,
}

impl ParamMeta {
    /// An untyped parameter with no default.
    pub fn untyped(name: impl Into<String>) -> Self {
        ParamMeta {
            name: name.into(),
            ty: None,
            nullable: false,
            default: None,
        }
    }

    /// A parameter typed with a class or interface name.
    pub fn of_class(name: impl Into<String>, class: impl Into<String>) -> Self {
        ParamMeta {
            name: name.into(),
            ty: Some(TypeRef::Class(class.into())),
            nullable: false,
            default: None,
        }
    }

    /// A parameter typed as a list of the given class.
    pub fn list_of(name: impl Into<String>, class: impl Into<String>) -> Self {
        ParamMeta {
            name: name.into(),
            ty: Some(TypeRef::ListOf(class.into())),
            nullable: false,
            default: None,
        }
    }

    /// Attach a default value.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Mark the parameter nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Whether autowiring may leave this parameter unfilled.
    pub fn is_optional(&self) -> bool {
        self.nullable || self.default.is_some()
    }
}

/// Metadata for one method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodMeta {
    /// The method name.
    pub name: String,
    /// Whether the method is publicly callable.
    pub public: bool,
    /// Positional parameters.
    pub params: Vec<ParamMeta>,
}

impl MethodMeta {
    /// Create a public method.
    pub fn new(name: impl Into<String>, params: Vec<ParamMeta>) -> Self {
        MethodMeta {
            name: name.into(),
            public: true,
            params,
        }
    }

    /// Create a non-public method.
    pub fn private(name: impl Into<String>, params: Vec<ParamMeta>) -> Self {
        MethodMeta {
            name: name.into(),
            public: false,
            params,
        }
    }
}

/// Metadata for one class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMeta {
    /// The class name.
    pub name: String,
    /// Whether the class can be instantiated (not abstract, not an interface).
    pub instantiable: bool,
    /// Every supertype: parent classes and implemented interfaces,
    /// transitively flattened at registration time.
    pub supertypes: Vec<String>,
    /// The constructor, when the class declares one.
    pub constructor: Option<MethodMeta>,
    /// Non-constructor methods.
    pub methods: Vec<MethodMeta>,
}

impl ClassMeta {
    /// Create an instantiable class with no supertypes and no constructor.
    pub fn new(name: impl Into<String>) -> Self {
        ClassMeta {
            name: name.into(),
            instantiable: true,
            supertypes: Vec::new(),
            constructor: None,
            methods: Vec::new(),
        }
    }

    /// Create an interface (never instantiable).
    pub fn interface(name: impl Into<String>) -> Self {
        ClassMeta {
            instantiable: false,
            ..ClassMeta::new(name)
        }
    }

    /// Set the constructor signature.
    pub fn with_constructor(mut self, params: Vec<ParamMeta>) -> Self {
        self.constructor = Some(MethodMeta::new(CONSTRUCTOR, params));
        self
    }

    /// Set a non-public constructor.
    pub fn with_private_constructor(mut self, params: Vec<ParamMeta>) -> Self {
        self.constructor = Some(MethodMeta::private(CONSTRUCTOR, params));
        self
    }

    /// Add a supertype (parent class or interface).
    pub fn implementing(mut self, ty: impl Into<String>) -> Self {
        self.supertypes.push(ty.into());
        self
    }

    /// Add a method.
    pub fn with_method(mut self, method: MethodMeta) -> Self {
        self.methods.push(method);
        self
    }

    /// Look up a method by name.
    pub fn method(&self, name: &str) -> Option<&MethodMeta> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Whether instances of this class satisfy the given type name.
    pub fn is_a(&self, ty: &str) -> bool {
        self.name == ty || self.supertypes.iter().any(|s| s == ty)
    }
}

/// Central store for class metadata; lookups are nullable.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    classes: FxHashMap<String, ClassMeta>,
}

impl MetadataRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class, replacing any previous entry with the same name.
    ///
    /// Declared supertypes are flattened with the supertypes of every
    /// already-registered ancestor, so parents must be registered before
    /// their subtypes for the chain to be complete.
    pub fn register(&mut self, mut meta: ClassMeta) -> &mut Self {
        let mut flat: Vec<String> = Vec::new();
        let mut pending = std::mem::take(&mut meta.supertypes);
        pending.reverse();
        while let Some(ty) = pending.pop() {
            if ty == meta.name || flat.contains(&ty) {
                continue;
            }
            if let Some(ancestor) = self.classes.get(&ty) {
                pending.extend(ancestor.supertypes.iter().rev().cloned());
            }
            flat.push(ty);
        }
        meta.supertypes = flat;
        self.classes.insert(meta.name.clone(), meta);
        self
    }

    /// Look up a class by name.
    pub fn get(&self, name: &str) -> Option<&ClassMeta> {
        self.classes.get(name)
    }

    /// Check if a class is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Whether `class` satisfies `ty` (identity or registered supertype).
    pub fn accepts(&self, class: &str, ty: &str) -> bool {
        if class == ty {
            return true;
        }
        self.get(class).is_some_and(|meta| meta.is_a(ty))
    }

    /// Look up a method on a class.
    pub fn method(&self, class: &str, method: &str) -> Option<&MethodMeta> {
        let meta = self.get(class)?;
        if method == CONSTRUCTOR {
            meta.constructor.as_ref()
        } else {
            meta.method(method)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> MetadataRegistry {
        let mut registry = MetadataRegistry::new();
        registry.register(ClassMeta::interface("LoggerInterface"));
        registry.register(
            ClassMeta::new("FileLogger")
                .implementing("LoggerInterface")
                .with_constructor(vec![ParamMeta::untyped("path")]),
        );
        registry
    }

    #[test]
    fn accepts_walks_supertypes() {
        let registry = registry();
        assert!(registry.accepts("FileLogger", "FileLogger"));
        assert!(registry.accepts("FileLogger", "LoggerInterface"));
        assert!(!registry.accepts("LoggerInterface", "FileLogger"));
    }

    #[test]
    fn registration_flattens_ancestor_supertypes() {
        let mut registry = MetadataRegistry::new();
        registry.register(ClassMeta::interface("LoggerInterface"));
        registry.register(
            ClassMeta::new("AbstractLogger").implementing("LoggerInterface"),
        );
        registry.register(ClassMeta::new("FileLogger").implementing("AbstractLogger"));

        assert!(registry.accepts("FileLogger", "AbstractLogger"));
        assert!(registry.accepts("FileLogger", "LoggerInterface"));
        let meta = registry.get("FileLogger").unwrap();
        assert_eq!(meta.supertypes, vec!["AbstractLogger", "LoggerInterface"]);
    }

    #[test]
    fn unknown_classes_resolve_to_none() {
        let registry = registry();
        assert!(registry.get("Missing").is_none());
        assert!(!registry.accepts("Missing", "LoggerInterface"));
    }

    #[test]
    fn constructor_lookup_uses_canonical_name() {
        let registry = registry();
        let ctor = registry.method("FileLogger", CONSTRUCTOR).unwrap();
        assert_eq!(ctor.params.len(), 1);
        assert_eq!(ctor.params[0].name, "path");
    }

    #[test]
    fn optional_parameters() {
        assert!(ParamMeta::untyped("x").with_default(Value::Null).is_optional());
        assert!(ParamMeta::untyped("x").nullable().is_optional());
        assert!(!ParamMeta::untyped("x").is_optional());
    }
}
