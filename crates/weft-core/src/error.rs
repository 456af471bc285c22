//! Unified error types for container compilation.
//!
//! Every compiler pass reports failures through [`CompileError`]. Propagation
//! is fail-fast: a pass either completes leaving the builder consistent, or
//! returns an error that aborts the whole compilation.
//!
//! ## Error Taxonomy
//!
//! ```text
//! CompileError
//! ├── CircularDependency      - service reference cycle, with the full path
//! ├── CircularParameter       - placeholder resolution cycle, with the chain
//! ├── ServiceNotFound         - missing service id, with the referencing source
//! ├── ParameterNotFound       - missing parameter key
//! ├── UnresolvableDependency  - autowiring cannot determine an argument
//! ├── BindingResolution       - non-instantiable class / non-public constructor
//! └── Runtime                 - malformed arguments, invalid metadata, ...
//! ```

use thiserror::Error;

/// Convenience alias used by every pass and builder operation.
pub type CompileResult<T> = Result<T, CompileError>;

/// Errors raised while compiling a container.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// A cycle of eager service references was detected.
    #[error("circular reference detected for service '{}', path: {}", path.first().map_or("?", |s| s.as_str()), path.join(" -> "))]
    CircularDependency {
        /// The ids along the cycle, first id repeated at the end.
        path: Vec<String>,
    },

    /// A parameter placeholder resolved through itself.
    #[error("circular reference detected for parameter '{}', chain: {}", chain.first().map_or("?", |s| s.as_str()), chain.join(" -> "))]
    CircularParameter {
        /// The parameter keys along the cycle, first key repeated at the end.
        chain: Vec<String>,
    },

    /// A referenced service id does not exist.
    #[error("service '{id}' not found{}", source_id.as_deref().map(|s| format!(", referenced by '{s}'")).unwrap_or_default())]
    ServiceNotFound {
        /// The missing service id.
        id: String,
        /// The service that referenced it, when known.
        source_id: Option<String>,
    },

    /// A referenced parameter key does not exist.
    ///
    /// Distinguished from [`CompileError::ServiceNotFound`] so callers can
    /// tell a parameter-caused failure from a service-caused one.
    #[error("parameter '{name}' not found{}", source_id.as_deref().map(|s| format!(", used by '{s}'")).unwrap_or_default())]
    ParameterNotFound {
        /// The missing parameter key.
        name: String,
        /// The service whose resolution required it, when known.
        source_id: Option<String>,
    },

    /// Autowiring could not determine a value for an argument.
    #[error("cannot autowire service '{id}': argument '{parameter}' of method '{method}' {reason}")]
    UnresolvableDependency {
        /// The service being autowired.
        id: String,
        /// The owning method (`constructor` for constructors).
        method: String,
        /// The parameter name.
        parameter: String,
        /// Why no value could be determined.
        reason: String,
    },

    /// A class cannot be bound: not instantiable, or constructor not public.
    #[error("cannot bind class '{class}': {reason}")]
    BindingResolution {
        /// The offending class name.
        class: String,
        /// Why binding failed.
        reason: String,
    },

    /// Malformed definitions, invalid metadata, failed speculative
    /// registration and other internal consistency failures.
    #[error("{message}")]
    Runtime {
        /// Description of the failure.
        message: String,
    },
}

impl CompileError {
    /// Create a [`CompileError::Runtime`] from anything printable.
    pub fn runtime(message: impl Into<String>) -> Self {
        CompileError::Runtime {
            message: message.into(),
        }
    }

    /// Create a [`CompileError::ServiceNotFound`] without a source id.
    pub fn service_not_found(id: impl Into<String>) -> Self {
        CompileError::ServiceNotFound {
            id: id.into(),
            source_id: None,
        }
    }

    /// Check if this is a missing-service error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CompileError::ServiceNotFound { .. })
    }

    /// Check if this is a circularity error (service or parameter).
    pub fn is_circular(&self) -> bool {
        matches!(
            self,
            CompileError::CircularDependency { .. } | CompileError::CircularParameter { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_dependency_display() {
        let err = CompileError::CircularDependency {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(
            format!("{err}"),
            "circular reference detected for service 'a', path: a -> b -> a"
        );
    }

    #[test]
    fn service_not_found_display() {
        let err = CompileError::ServiceNotFound {
            id: "logger".into(),
            source_id: Some("app".into()),
        };
        assert_eq!(
            format!("{err}"),
            "service 'logger' not found, referenced by 'app'"
        );

        let bare = CompileError::service_not_found("logger");
        assert_eq!(format!("{bare}"), "service 'logger' not found");
        assert!(bare.is_not_found());
    }

    #[test]
    fn unresolvable_dependency_display() {
        let err = CompileError::UnresolvableDependency {
            id: "mailer".into(),
            method: "constructor".into(),
            parameter: "transport".into(),
            reason: "has no type and no default value".into(),
        };
        assert_eq!(
            format!("{err}"),
            "cannot autowire service 'mailer': argument 'transport' of method \
             'constructor' has no type and no default value"
        );
    }

    #[test]
    fn circular_classification() {
        assert!(
            CompileError::CircularParameter {
                chain: vec!["a".into(), "a".into()]
            }
            .is_circular()
        );
        assert!(!CompileError::runtime("boom").is_circular());
    }
}
