//! Downgrading of references whose target no longer exists.

use weft_core::builder::ContainerBuilder;
use weft_core::definition::{Definition, DefinitionKind, FactoryTarget};
use weft_core::error::{CompileError, CompileResult};
use weft_core::reference::InvalidBehavior;
use weft_core::value::Value;

use crate::Pass;

/// The recovery point for dangling references.
///
/// A reference to a service that does not exist is downgraded per its
/// on-invalid behavior. `Ignore` removes the entry when the reference sits
/// inside an array or map and substitutes null anywhere else. `Null` always
/// substitutes null. `Exception` fails the build. `IgnoreOnUninitialized`
/// references are left for the runtime to handle.
#[derive(Default)]
pub struct ResolveInvalidReferencesPass {
    current_id: Option<String>,
    messages: Vec<String>,
}

/// Outcome of resolving one value. `Drop` is only honored inside a
/// collection; a positional slot converts it to null.
enum Resolved {
    Keep(Value),
    Drop,
}

impl ResolveInvalidReferencesPass {
    /// Create the pass.
    pub fn new() -> Self {
        Self::default()
    }

    fn resolve_definition(
        &mut self,
        builder: &ContainerBuilder,
        def: &mut Definition,
    ) -> CompileResult<()> {
        match &mut def.kind {
            DefinitionKind::Object { arguments, .. }
            | DefinitionKind::Closure { arguments, .. } => {
                self.resolve_slots(builder, arguments)?;
            }
            DefinitionKind::Factory {
                target,
                class_arguments,
                arguments,
                ..
            } => {
                if let FactoryTarget::Service(reference) = target
                    && !builder.has(builder.resolve_alias(&reference.id))
                    && matches!(reference.behavior, InvalidBehavior::Exception)
                {
                    return Err(CompileError::ServiceNotFound {
                        id: reference.id.clone(),
                        source_id: self.current_id.clone(),
                    });
                }
                self.resolve_slots(builder, class_arguments)?;
                self.resolve_slots(builder, arguments)?;
            }
            DefinitionKind::Undefined { .. } => {}
        }
        if let DefinitionKind::Closure { callable, .. } = &mut def.kind {
            let taken = std::mem::replace(callable.as_mut(), Value::Null);
            **callable = match self.resolve_value(builder, taken, false)? {
                Resolved::Keep(value) => value,
                Resolved::Drop => Value::Null,
            };
        }
        for call in &mut def.calls {
            self.resolve_slots(builder, &mut call.arguments)?;
        }
        for property in def.properties.values_mut() {
            let taken = std::mem::replace(&mut property.value, Value::Null);
            property.value = match self.resolve_value(builder, taken, false)? {
                Resolved::Keep(value) => value,
                Resolved::Drop => Value::Null,
            };
        }
        Ok(())
    }

    // Positional slots keep their arity: a dropped reference becomes null.
    fn resolve_slots(
        &mut self,
        builder: &ContainerBuilder,
        slots: &mut Vec<Value>,
    ) -> CompileResult<()> {
        for slot in slots.iter_mut() {
            let taken = std::mem::replace(slot, Value::Null);
            *slot = match self.resolve_value(builder, taken, false)? {
                Resolved::Keep(value) => value,
                Resolved::Drop => Value::Null,
            };
        }
        Ok(())
    }

    fn resolve_value(
        &mut self,
        builder: &ContainerBuilder,
        value: Value,
        in_collection: bool,
    ) -> CompileResult<Resolved> {
        match value {
            Value::Reference(mut reference) => {
                if builder.has(builder.resolve_alias(&reference.id)) {
                    for call in &mut reference.calls {
                        self.resolve_slots(builder, &mut call.arguments)?;
                    }
                    return Ok(Resolved::Keep(Value::Reference(reference)));
                }
                match reference.behavior {
                    InvalidBehavior::Exception => Err(CompileError::ServiceNotFound {
                        id: reference.id,
                        source_id: self.current_id.clone(),
                    }),
                    InvalidBehavior::Null => Ok(Resolved::Keep(Value::Null)),
                    InvalidBehavior::Ignore => {
                        if in_collection {
                            self.messages.push(format!(
                                "removed reference to missing service '{}' from '{}'",
                                reference.id,
                                self.current_id.as_deref().unwrap_or("?"),
                            ));
                            Ok(Resolved::Drop)
                        } else {
                            Ok(Resolved::Keep(Value::Null))
                        }
                    }
                    InvalidBehavior::IgnoreOnUninitialized => {
                        Ok(Resolved::Keep(Value::Reference(reference)))
                    }
                }
            }
            Value::Array(items) => {
                let mut kept = Vec::with_capacity(items.len());
                for item in items {
                    if let Resolved::Keep(value) = self.resolve_value(builder, item, true)? {
                        kept.push(value);
                    }
                }
                Ok(Resolved::Keep(Value::Array(kept)))
            }
            Value::Map(entries) => {
                let mut kept = indexmap::IndexMap::new();
                for (key, entry) in entries {
                    if let Resolved::Keep(value) = self.resolve_value(builder, entry, true)? {
                        kept.insert(key, value);
                    }
                }
                Ok(Resolved::Keep(Value::Map(kept)))
            }
            Value::Argument(mut argument) => {
                let taken = std::mem::replace(&mut argument.value, Value::Null);
                argument.value = match self.resolve_value(builder, taken, false)? {
                    Resolved::Keep(value) => value,
                    Resolved::Drop => Value::Null,
                };
                Ok(Resolved::Keep(Value::Argument(argument)))
            }
            Value::Definition(mut inline) => {
                self.resolve_definition(builder, &mut inline)?;
                Ok(Resolved::Keep(Value::Definition(inline)))
            }
            other => Ok(Resolved::Keep(other)),
        }
    }
}

impl Pass for ResolveInvalidReferencesPass {
    fn name(&self) -> &'static str {
        "ResolveInvalidReferencesPass"
    }

    fn process(&mut self, builder: &mut ContainerBuilder) -> CompileResult<()> {
        let ids: Vec<String> = builder.definitions().keys().cloned().collect();
        for id in ids {
            let Some(mut def) = builder.definition(&id).cloned() else {
                continue;
            };
            self.current_id = Some(id.clone());
            self.resolve_definition(builder, &mut def)?;
            if builder.has_definition(&id) {
                builder.set_definition(id, def);
            }
        }
        self.current_id = None;
        for message in std::mem::take(&mut self.messages) {
            builder.log("ResolveInvalidReferencesPass", message);
        }
        Ok(())
    }
}
