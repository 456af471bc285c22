//! Structural validity checks over the finished definition map.

use weft_core::builder::ContainerBuilder;
use weft_core::definition::{Definition, DefinitionKind};
use weft_core::error::{CompileError, CompileResult};
use weft_core::metadata::CONSTRUCTOR;
use weft_core::value::Value;

use crate::Pass;

// =============================================================================
// Definition validity
// =============================================================================

/// Rejects definitions the runtime could never honor.
///
/// Synthetic services must be public, since a private synthetic instance
/// could never be injected. Object definitions must carry a class name,
/// and no provisional definition may survive to this point. Tag attribute
/// values must be scalars.
#[derive(Default)]
pub struct CheckDefinitionValidityPass;

impl CheckDefinitionValidityPass {
    /// Create the pass.
    pub fn new() -> Self {
        Self
    }
}

impl Pass for CheckDefinitionValidityPass {
    fn name(&self) -> &'static str {
        "CheckDefinitionValidityPass"
    }

    fn process(&mut self, builder: &mut ContainerBuilder) -> CompileResult<()> {
        for (id, def) in builder.definitions() {
            if def.synthetic && !def.public {
                return Err(CompileError::runtime(format!(
                    "synthetic service '{id}' must be public"
                )));
            }
            match &def.kind {
                DefinitionKind::Object { class, .. } if class.is_empty() => {
                    return Err(CompileError::runtime(format!(
                        "service '{id}' has no class"
                    )));
                }
                DefinitionKind::Undefined { .. } if !def.synthetic => {
                    return Err(CompileError::runtime(format!(
                        "service '{id}' was never materialized"
                    )));
                }
                _ => {}
            }
            for (tag, entries) in &def.tags {
                for attributes in entries {
                    for (name, value) in attributes {
                        if !value.is_scalar() {
                            return Err(CompileError::runtime(format!(
                                "tag '{tag}' on service '{id}': attribute '{name}' must be a scalar"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Argument validity
// =============================================================================

/// Checks constructor argument counts against the metadata registry.
///
/// Only object definitions whose class has a registered constructor are
/// checked. Too many arguments, or a gap where a required parameter has
/// no value, fails the build. Definitions nested inside argument values,
/// inlined ones included, are checked under their owning service id.
#[derive(Default)]
pub struct CheckArgumentsValidityPass;

impl CheckArgumentsValidityPass {
    /// Create the pass.
    pub fn new() -> Self {
        Self
    }

    fn check_definition(
        &self,
        builder: &ContainerBuilder,
        id: &str,
        def: &Definition,
    ) -> CompileResult<()> {
        if def.synthetic {
            return Ok(());
        }
        if let DefinitionKind::Object { class, arguments } = &def.kind
            && let Some(ctor) = builder.method_meta(class, CONSTRUCTOR)
        {
            if arguments.len() > ctor.params.len() {
                return Err(CompileError::runtime(format!(
                    "service '{id}': constructor of '{class}' takes {} arguments, {} given",
                    ctor.params.len(),
                    arguments.len()
                )));
            }
            for param in &ctor.params[arguments.len()..] {
                if !param.is_optional() {
                    return Err(CompileError::runtime(format!(
                        "service '{id}': missing required constructor argument '{}' of '{class}'",
                        param.name
                    )));
                }
            }
        }

        for value in def.arguments() {
            self.check_value(builder, id, value)?;
        }
        match &def.kind {
            DefinitionKind::Factory {
                class_arguments, ..
            } => {
                for value in class_arguments {
                    self.check_value(builder, id, value)?;
                }
            }
            DefinitionKind::Closure { callable, .. } => {
                self.check_value(builder, id, callable)?;
            }
            _ => {}
        }
        for call in &def.calls {
            for value in &call.arguments {
                self.check_value(builder, id, value)?;
            }
        }
        for property in def.properties.values() {
            self.check_value(builder, id, &property.value)?;
        }
        Ok(())
    }

    fn check_value(
        &self,
        builder: &ContainerBuilder,
        id: &str,
        value: &Value,
    ) -> CompileResult<()> {
        match value {
            Value::Definition(def) => self.check_definition(builder, id, def),
            Value::Array(items) => items
                .iter()
                .try_for_each(|item| self.check_value(builder, id, item)),
            Value::Map(entries) => entries
                .values()
                .try_for_each(|entry| self.check_value(builder, id, entry)),
            Value::Argument(argument) => self.check_value(builder, id, &argument.value),
            _ => Ok(()),
        }
    }
}

impl Pass for CheckArgumentsValidityPass {
    fn name(&self) -> &'static str {
        "CheckArgumentsValidityPass"
    }

    fn process(&mut self, builder: &mut ContainerBuilder) -> CompileResult<()> {
        for (id, def) in builder.definitions() {
            self.check_definition(builder, id, def)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use weft_core::metadata::{ClassMeta, ParamMeta};
    use weft_core::value::Value;

    #[test]
    fn private_synthetic_service_is_rejected() {
        let mut builder = ContainerBuilder::new();
        builder.register("injected", "Kernel").set_synthetic(true);

        let err = CheckDefinitionValidityPass::new().process(&mut builder).unwrap_err();
        assert!(matches!(err, CompileError::Runtime { .. }));

        builder.definition_mut("injected").unwrap().set_public(true);
        CheckDefinitionValidityPass::new().process(&mut builder).unwrap();
    }

    #[test]
    fn surviving_undefined_definition_is_rejected() {
        let mut builder = ContainerBuilder::new();
        builder.set_definition(
            "ghost",
            weft_core::definition::Definition::undefined(None),
        );
        let err = CheckDefinitionValidityPass::new().process(&mut builder).unwrap_err();
        assert!(matches!(err, CompileError::Runtime { .. }));
    }

    #[test]
    fn non_scalar_tag_attribute_is_rejected() {
        let mut builder = ContainerBuilder::new();
        let mut attributes = IndexMap::new();
        attributes.insert("priority".to_string(), Value::Int(5));
        builder
            .register("listener", "Listener")
            .add_tag("event.listener", attributes);
        CheckDefinitionValidityPass::new().process(&mut builder).unwrap();

        let mut nested = IndexMap::new();
        nested.insert("extras".to_string(), Value::Array(vec![Value::Int(1)]));
        builder
            .definition_mut("listener")
            .unwrap()
            .add_tag("event.listener", nested);
        let err = CheckDefinitionValidityPass::new().process(&mut builder).unwrap_err();
        assert!(matches!(err, CompileError::Runtime { .. }));
    }

    fn register_app_meta(builder: &mut ContainerBuilder) {
        builder.metadata_mut().register(ClassMeta::new("App").with_constructor(vec![
            ParamMeta::of_class("logger", "Logger"),
            ParamMeta::untyped("name").with_default(Value::Str("app".into())),
        ]));
    }

    #[test]
    fn missing_required_argument_is_rejected() {
        let mut builder = ContainerBuilder::new();
        register_app_meta(&mut builder);
        builder.register("app", "App");

        let err = CheckArgumentsValidityPass::new().process(&mut builder).unwrap_err();
        assert!(matches!(err, CompileError::Runtime { .. }));
    }

    #[test]
    fn optional_tail_may_stay_unfilled() {
        let mut builder = ContainerBuilder::new();
        register_app_meta(&mut builder);
        builder
            .register("app", "App")
            .add_argument(Value::Str("stub".into()));

        CheckArgumentsValidityPass::new().process(&mut builder).unwrap();
    }

    #[test]
    fn excess_arguments_are_rejected() {
        let mut builder = ContainerBuilder::new();
        register_app_meta(&mut builder);
        builder
            .register("app", "App")
            .set_arguments(vec![Value::Null, Value::Null, Value::Null]);

        let err = CheckArgumentsValidityPass::new().process(&mut builder).unwrap_err();
        assert!(matches!(err, CompileError::Runtime { .. }));
    }

    #[test]
    fn nested_inlined_definitions_are_checked() {
        let mut builder = ContainerBuilder::new();
        register_app_meta(&mut builder);
        let inner = weft_core::definition::Definition::object("App");
        builder
            .register("outer", "Outer")
            .add_argument(Value::Definition(Box::new(inner)));

        let err = CheckArgumentsValidityPass::new().process(&mut builder).unwrap_err();
        let CompileError::Runtime { message } = err else {
            panic!("expected a runtime error");
        };
        assert!(message.contains("outer"));
        assert!(message.contains("logger"));
    }

    #[test]
    fn classes_without_metadata_are_skipped() {
        let mut builder = ContainerBuilder::new();
        builder.register("opaque", "Opaque");
        CheckArgumentsValidityPass::new().process(&mut builder).unwrap();
    }
}
