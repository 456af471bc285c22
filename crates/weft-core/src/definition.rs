//! Service definitions: the declarative "how to build this value" model.
//!
//! A [`Definition`] is mutated destructively by the compiler passes until it
//! is consumed into its final form after the last pass. The [`Changes`]
//! bitset records which fields were explicitly set by the user, so a pass may
//! re-derive a field only when doing so cannot clobber explicit intent.

use bitflags::bitflags;
use indexmap::IndexMap;

use crate::reference::{InvalidBehavior, Reference};
use crate::value::Value;

bitflags! {
    /// Which definition fields were explicitly set by the user.
    ///
    /// The tree walker recurses into a field's values only when its bit is
    /// set, and a pass only overwrites a guarded field when the bit is set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Changes: u16 {
        /// The target class was set.
        const CLASS = 1 << 0;
        /// Constructor arguments were set.
        const ARGUMENTS = 1 << 1;
        /// Method calls were configured.
        const METHOD_CALLS = 1 << 2;
        /// Properties were configured.
        const PROPERTIES = 1 << 3;
        /// A factory callable was set.
        const FACTORY = 1 << 4;
        /// Factory class arguments were set.
        const CLASS_ARGUMENTS = 1 << 5;
        /// Laziness was set.
        const LAZY = 1 << 6;
        /// Visibility was set.
        const PUBLIC = 1 << 7;
        /// Sharing was set.
        const SHARED = 1 << 8;
        /// Autowiring was toggled.
        const AUTOWIRED = 1 << 9;
        /// A decoration target was set.
        const DECORATES = 1 << 10;
    }
}

/// A configured method call: `(method, args, returns_clone)`.
///
/// A call with `returns_clone` set is a *wither*: it returns a rebuilt copy
/// of the object, so everything before the last wither in a call chain is
/// constructor-equivalent for dependency purposes.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// The method name.
    pub method: String,
    /// Positional arguments for the call.
    pub arguments: Vec<Value>,
    /// Whether the call returns a clone (wither style).
    pub returns_clone: bool,
}

impl MethodCall {
    /// Create an ordinary (mutating) method call.
    pub fn new(method: impl Into<String>, arguments: Vec<Value>) -> Self {
        MethodCall {
            method: method.into(),
            arguments,
            returns_clone: false,
        }
    }

    /// Create a wither call, one that returns a rebuilt copy.
    pub fn wither(method: impl Into<String>, arguments: Vec<Value>) -> Self {
        MethodCall {
            method: method.into(),
            arguments,
            returns_clone: true,
        }
    }
}

/// A configured property assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// The assigned value.
    pub value: Value,
    /// Whether the property is assigned on the class rather than the instance.
    pub is_static: bool,
}

/// A decoration declaration: this definition wraps another service.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoration {
    /// The decorated service id.
    pub id: String,
    /// The id the decorated definition is renamed to; defaults to
    /// `<decorator>.inner` when absent.
    pub inner_id: Option<String>,
    /// Decoration priority; higher priorities wrap closer to the original.
    pub priority: i32,
    /// Policy when the decorated service does not exist.
    pub on_invalid: InvalidBehavior,
}

/// The callable side of a factory definition.
#[derive(Debug, Clone, PartialEq)]
pub enum FactoryTarget {
    /// A static class whose method is called.
    Class(String),
    /// Another service whose method is called.
    Service(Reference),
}

/// How the definition produces its value.
#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionKind {
    /// Construct an instance of `class` with positional `arguments`.
    Object {
        /// The target class name.
        class: String,
        /// Positional constructor arguments.
        arguments: Vec<Value>,
    },
    /// Call `method` on `target` to produce the value.
    Factory {
        /// The class or service the factory method lives on.
        target: FactoryTarget,
        /// The factory method name.
        method: String,
        /// Constructor arguments for the factory itself.
        class_arguments: Vec<Value>,
        /// Arguments for the factory method invocation.
        arguments: Vec<Value>,
    },
    /// Wrap a callable value as a closure with its own arguments.
    Closure {
        /// The wrapped callable (usually a reference or inline definition).
        callable: Box<Value>,
        /// Arguments bound into the closure.
        arguments: Vec<Value>,
    },
    /// A provisional definition awaiting materialization.
    Undefined {
        /// Class hint, when one was declared.
        class: Option<String>,
    },
}

/// A buildable service described declaratively.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    /// How the value is produced.
    pub kind: DefinitionKind,
    /// Whether the service is part of the public surface.
    pub public: bool,
    /// Whether the service is a shared singleton.
    pub shared: bool,
    /// Whether instantiation is deferred behind a proxy.
    pub lazy: bool,
    /// Whether the instance is injected at runtime rather than built.
    pub synthetic: bool,
    /// Whether unresolved arguments are filled from type metadata.
    pub autowired: bool,
    /// Deprecation notice; informational, never aborts compilation.
    pub deprecation: Option<String>,
    /// Tags: name → multi-valued attribute maps.
    pub tags: IndexMap<String, Vec<IndexMap<String, Value>>>,
    /// Decoration target, when this definition wraps another service.
    pub decorates: Option<Decoration>,
    /// Method calls applied after construction, in order.
    pub calls: Vec<MethodCall>,
    /// Property assignments applied after construction.
    pub properties: IndexMap<String, Property>,
    /// Which fields were explicitly set.
    pub changes: Changes,
}

impl Definition {
    fn with_kind(kind: DefinitionKind, changes: Changes) -> Self {
        Definition {
            kind,
            public: false,
            shared: true,
            lazy: false,
            synthetic: false,
            autowired: false,
            deprecation: None,
            tags: IndexMap::new(),
            decorates: None,
            calls: Vec::new(),
            properties: IndexMap::new(),
            changes,
        }
    }

    /// Create an object definition for `class` with no arguments.
    pub fn object(class: impl Into<String>) -> Self {
        Definition::with_kind(
            DefinitionKind::Object {
                class: class.into(),
                arguments: Vec::new(),
            },
            Changes::CLASS,
        )
    }

    /// Create a factory definition.
    pub fn factory(target: FactoryTarget, method: impl Into<String>) -> Self {
        Definition::with_kind(
            DefinitionKind::Factory {
                target,
                method: method.into(),
                class_arguments: Vec::new(),
                arguments: Vec::new(),
            },
            Changes::FACTORY,
        )
    }

    /// Create a closure definition wrapping `callable`.
    pub fn closure(callable: impl Into<Value>) -> Self {
        Definition::with_kind(
            DefinitionKind::Closure {
                callable: Box::new(callable.into()),
                arguments: Vec::new(),
            },
            Changes::FACTORY,
        )
    }

    /// Create an undefined definition, optionally with a class hint.
    pub fn undefined(class: Option<String>) -> Self {
        Definition::with_kind(DefinitionKind::Undefined { class }, Changes::empty())
    }

    // ==========================================================================
    // Change-tracked setters
    // ==========================================================================

    /// Set the positional arguments, recording the change bit.
    pub fn set_arguments(&mut self, args: Vec<Value>) -> &mut Self {
        match &mut self.kind {
            DefinitionKind::Object { arguments, .. }
            | DefinitionKind::Factory { arguments, .. }
            | DefinitionKind::Closure { arguments, .. } => *arguments = args,
            DefinitionKind::Undefined { .. } => {}
        }
        self.changes |= Changes::ARGUMENTS;
        self
    }

    /// Append a positional argument, recording the change bit.
    pub fn add_argument(&mut self, value: impl Into<Value>) -> &mut Self {
        match &mut self.kind {
            DefinitionKind::Object { arguments, .. }
            | DefinitionKind::Factory { arguments, .. }
            | DefinitionKind::Closure { arguments, .. } => arguments.push(value.into()),
            DefinitionKind::Undefined { .. } => {}
        }
        self.changes |= Changes::ARGUMENTS;
        self
    }

    /// Set the factory class arguments, recording the change bit.
    pub fn set_class_arguments(&mut self, args: Vec<Value>) -> &mut Self {
        if let DefinitionKind::Factory {
            class_arguments, ..
        } = &mut self.kind
        {
            *class_arguments = args;
        }
        self.changes |= Changes::CLASS_ARGUMENTS;
        self
    }

    /// Append a method call, recording the change bit.
    pub fn add_call(&mut self, call: MethodCall) -> &mut Self {
        self.calls.push(call);
        self.changes |= Changes::METHOD_CALLS;
        self
    }

    /// Set a property, recording the change bit.
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.properties.insert(
            name.into(),
            Property {
                value: value.into(),
                is_static: false,
            },
        );
        self.changes |= Changes::PROPERTIES;
        self
    }

    /// Set visibility, recording the change bit.
    pub fn set_public(&mut self, public: bool) -> &mut Self {
        self.public = public;
        self.changes |= Changes::PUBLIC;
        self
    }

    /// Set sharing, recording the change bit.
    pub fn set_shared(&mut self, shared: bool) -> &mut Self {
        self.shared = shared;
        self.changes |= Changes::SHARED;
        self
    }

    /// Set laziness, recording the change bit.
    pub fn set_lazy(&mut self, lazy: bool) -> &mut Self {
        self.lazy = lazy;
        self.changes |= Changes::LAZY;
        self
    }

    /// Toggle autowiring, recording the change bit.
    pub fn set_autowired(&mut self, autowired: bool) -> &mut Self {
        self.autowired = autowired;
        self.changes |= Changes::AUTOWIRED;
        self
    }

    /// Declare this definition as decorating another service.
    pub fn set_decorates(&mut self, decoration: Decoration) -> &mut Self {
        self.decorates = Some(decoration);
        self.changes |= Changes::DECORATES;
        self
    }

    /// Mark as synthetic (instance injected at runtime).
    pub fn set_synthetic(&mut self, synthetic: bool) -> &mut Self {
        self.synthetic = synthetic;
        self
    }

    /// Attach a deprecation message.
    pub fn set_deprecated(&mut self, message: impl Into<String>) -> &mut Self {
        self.deprecation = Some(message.into());
        self
    }

    /// Add a tag with the given attributes.
    pub fn add_tag(&mut self, name: impl Into<String>, attributes: IndexMap<String, Value>) -> &mut Self {
        self.tags.entry(name.into()).or_default().push(attributes);
        self
    }

    // ==========================================================================
    // Accessors
    // ==========================================================================

    /// The target class name, if this definition declares one.
    pub fn class(&self) -> Option<&str> {
        match &self.kind {
            DefinitionKind::Object { class, .. } => Some(class),
            DefinitionKind::Undefined { class } => class.as_deref(),
            _ => None,
        }
    }

    /// The positional (invocation) arguments, if the kind carries any.
    pub fn arguments(&self) -> &[Value] {
        match &self.kind {
            DefinitionKind::Object { arguments, .. }
            | DefinitionKind::Factory { arguments, .. }
            | DefinitionKind::Closure { arguments, .. } => arguments,
            DefinitionKind::Undefined { .. } => &[],
        }
    }

    /// Mutable access to the positional arguments.
    pub fn arguments_mut(&mut self) -> Option<&mut Vec<Value>> {
        match &mut self.kind {
            DefinitionKind::Object { arguments, .. }
            | DefinitionKind::Factory { arguments, .. }
            | DefinitionKind::Closure { arguments, .. } => Some(arguments),
            DefinitionKind::Undefined { .. } => None,
        }
    }

    /// Whether the definition has the given tag.
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }
}

/// A named redirect from one service id to another.
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    /// The id this alias redirects to.
    pub target: String,
    /// Whether the alias is part of the public surface.
    pub public: bool,
    /// Deprecation notice; informational only.
    pub deprecation: Option<String>,
}

impl Alias {
    /// Create a private alias.
    pub fn new(target: impl Into<String>) -> Self {
        Alias {
            target: target.into(),
            public: false,
            deprecation: None,
        }
    }

    /// Create a public alias.
    pub fn public(target: impl Into<String>) -> Self {
        Alias {
            target: target.into(),
            public: true,
            deprecation: None,
        }
    }
}
