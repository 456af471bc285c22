//! The recursive tree walker shared by every pass.
//!
//! A pass implements [`ValueTransformer`] and overrides [`transform`]
//! (`ValueTransformer::transform`) for the node kinds it cares about,
//! delegating back to [`walk_value`] for everything else. The builder is
//! threaded through a [`WalkContext`] parameter on every call; no pass holds
//! a builder reference across calls.
//!
//! Recursion rules:
//! - arrays and maps recurse into their elements
//! - argument wrappers recurse into their payload
//! - references recurse into each nested method call's argument list
//! - definitions recurse into a field only when its change bit is set
//!
//! The reserved container-self id is never walked.

use indexmap::IndexMap;
use weft_core::builder::{CONTAINER_ID, ContainerBuilder};
use weft_core::definition::{Changes, Definition, DefinitionKind};
use weft_core::error::{CompileError, CompileResult};
use weft_core::value::Value;

/// Per-walk state handed to every [`ValueTransformer::transform`] call.
pub struct WalkContext<'a> {
    /// The builder being compiled.
    pub builder: &'a mut ContainerBuilder,
    /// Id of the root-level definition currently being walked, when the walk
    /// started from the definition map.
    pub current_id: Option<String>,
}

/// A compiler pass's view of the value tree.
///
/// The default [`transform`](Self::transform) recurses without changing
/// anything; concrete passes override it and call [`walk_value`] to continue
/// below the nodes they handled.
pub trait ValueTransformer {
    /// Transform one value, returning its replacement.
    ///
    /// `is_root` is true only for the synthetic `Definition` value wrapping a
    /// root map entry.
    fn transform(
        &mut self,
        ctx: &mut WalkContext<'_>,
        value: Value,
        is_root: bool,
    ) -> CompileResult<Value>
    where
        Self: Sized,
    {
        walk_value(self, ctx, value, is_root)
    }
}

/// Default recursion over one value. Passes call this from their `transform`
/// override to descend past a node they did not consume.
pub fn walk_value<T: ValueTransformer>(
    transformer: &mut T,
    ctx: &mut WalkContext<'_>,
    value: Value,
    is_root: bool,
) -> CompileResult<Value> {
    match value {
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(transformer.transform(ctx, item, false)?);
            }
            Ok(Value::Array(out))
        }
        Value::Map(entries) => {
            let mut out = IndexMap::with_capacity(entries.len());
            for (key, item) in entries {
                out.insert(key, transformer.transform(ctx, item, false)?);
            }
            Ok(Value::Map(out))
        }
        Value::Argument(mut arg) => {
            arg.value = transformer.transform(ctx, arg.value, false)?;
            Ok(Value::Argument(arg))
        }
        Value::Reference(mut reference) => {
            for call in &mut reference.calls {
                let args = std::mem::take(&mut call.arguments);
                call.arguments = walk_arguments(transformer, ctx, args)?;
            }
            Ok(Value::Reference(reference))
        }
        Value::Definition(def) => {
            let def = walk_definition(transformer, ctx, *def, is_root)?;
            Ok(Value::Definition(Box::new(def)))
        }
        leaf => Ok(leaf),
    }
}

/// Recurse into a definition's changed fields.
pub fn walk_definition<T: ValueTransformer>(
    transformer: &mut T,
    ctx: &mut WalkContext<'_>,
    mut def: Definition,
    _is_root: bool,
) -> CompileResult<Definition> {
    let changes = def.changes;

    if changes.contains(Changes::ARGUMENTS) || changes.contains(Changes::FACTORY) {
        match &mut def.kind {
            DefinitionKind::Object { arguments, .. } => {
                if changes.contains(Changes::ARGUMENTS) {
                    let args = std::mem::take(arguments);
                    *arguments = walk_arguments(transformer, ctx, args)?;
                }
            }
            DefinitionKind::Factory {
                target,
                class_arguments,
                arguments,
                ..
            } => {
                if changes.contains(Changes::FACTORY) {
                    if let weft_core::definition::FactoryTarget::Service(reference) = target {
                        let value =
                            transformer.transform(ctx, Value::Reference(reference.clone()), false)?;
                        if let Value::Reference(replacement) = value {
                            *reference = replacement;
                        }
                    }
                }
                if changes.contains(Changes::CLASS_ARGUMENTS) {
                    let args = std::mem::take(class_arguments);
                    *class_arguments = walk_arguments(transformer, ctx, args)?;
                }
                if changes.contains(Changes::ARGUMENTS) {
                    let args = std::mem::take(arguments);
                    *arguments = walk_arguments(transformer, ctx, args)?;
                }
            }
            DefinitionKind::Closure {
                callable,
                arguments,
            } => {
                if changes.contains(Changes::FACTORY) {
                    let inner = std::mem::replace(callable.as_mut(), Value::Null);
                    **callable = transformer.transform(ctx, inner, false)?;
                }
                if changes.contains(Changes::ARGUMENTS) {
                    let args = std::mem::take(arguments);
                    *arguments = walk_arguments(transformer, ctx, args)?;
                }
            }
            DefinitionKind::Undefined { .. } => {}
        }
    } else if changes.contains(Changes::CLASS_ARGUMENTS) {
        if let DefinitionKind::Factory {
            class_arguments, ..
        } = &mut def.kind
        {
            let args = std::mem::take(class_arguments);
            *class_arguments = walk_arguments(transformer, ctx, args)?;
        }
    }

    if changes.contains(Changes::METHOD_CALLS) {
        for call in &mut def.calls {
            let args = std::mem::take(&mut call.arguments);
            call.arguments = walk_arguments(transformer, ctx, args)?;
        }
    }

    if changes.contains(Changes::PROPERTIES) {
        for (_, property) in def.properties.iter_mut() {
            let value = std::mem::replace(&mut property.value, Value::Null);
            property.value = transformer.transform(ctx, value, false)?;
        }
    }

    Ok(def)
}

fn walk_arguments<T: ValueTransformer>(
    transformer: &mut T,
    ctx: &mut WalkContext<'_>,
    args: Vec<Value>,
) -> CompileResult<Vec<Value>> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        out.push(transformer.transform(ctx, arg, false)?);
    }
    Ok(out)
}

/// Walk every root definition in the builder with `transformer`.
///
/// Each root entry is walked on a clone and written back on success, so the
/// transformer keeps full access to the builder (other definitions included)
/// while one definition is being rebuilt. On error the builder is left with
/// every earlier definition transformed and the rest untouched.
pub fn process_definitions<T: ValueTransformer>(
    transformer: &mut T,
    builder: &mut ContainerBuilder,
) -> CompileResult<()> {
    let ids: Vec<String> = builder.definitions().keys().cloned().collect();

    for id in ids {
        if id == CONTAINER_ID {
            continue;
        }
        // Definitions added or removed by earlier iterations are respected.
        let Some(def) = builder.definition(&id).cloned() else {
            continue;
        };
        let mut ctx = WalkContext {
            builder,
            current_id: Some(id.clone()),
        };
        match transformer.transform(&mut ctx, Value::Definition(Box::new(def)), true)? {
            Value::Definition(def) => {
                if builder.has_definition(&id) {
                    builder.definitions_mut().insert(id, *def);
                }
            }
            _ => {
                return Err(CompileError::runtime(format!(
                    "walking definition '{id}' produced a non-definition value"
                )));
            }
        }
    }

    Ok(())
}
