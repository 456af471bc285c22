//! Metadata-driven autowiring of constructor and method-call arguments.

use rustc_hash::{FxHashMap, FxHashSet};
use weft_core::builder::ContainerBuilder;
use weft_core::definition::Definition;
use weft_core::error::{CompileError, CompileResult};
use weft_core::metadata::{MethodMeta, ParamMeta, TypeRef};
use weft_core::reference::Reference;
use weft_core::value::Value;

use crate::Pass;

const NAME: &str = "AutowirePass";

/// Outcome of a candidate lookup for one declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Exactly one registered service implements the type.
    Found(String),
    /// Two or more services implement the type.
    Ambiguous,
    /// No registered service implements the type.
    NotFound,
}

#[derive(Debug, Clone)]
enum Candidate {
    Unique(String),
    Ambiguous,
}

/// Fills unresolved constructor and method-call arguments from class
/// metadata.
///
/// A definition is considered when it is autowired, not synthetic, not of an
/// excluded class, and its class has a public constructor with parameters.
/// A non-public constructor on an autowired class is a hard error.
///
/// Typed parameters resolve against a per-run index mapping each type to its
/// sole implementing service; ambiguity is always a failure. A type with no
/// implementation that names a concrete instantiable class is registered
/// speculatively as a private autowired definition and autowired in turn,
/// rolled back when that fails and the parameter permits a default.
#[derive(Default)]
pub struct AutowirePass {
    excluded: FxHashSet<String>,
    types: FxHashMap<String, Candidate>,
}

impl AutowirePass {
    /// Create the pass with no excluded classes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the pass with a set of classes autowiring must not touch.
    pub fn excluding(classes: impl IntoIterator<Item = String>) -> Self {
        AutowirePass {
            excluded: classes.into_iter().collect(),
            types: FxHashMap::default(),
        }
    }

    fn rebuild_type_index(&mut self, builder: &ContainerBuilder) {
        self.types.clear();
        let entries: Vec<(String, String)> = builder
            .definitions()
            .iter()
            .filter_map(|(id, def)| def.class().map(|c| (id.clone(), c.to_string())))
            .collect();
        for (id, class) in entries {
            self.index_service(builder, &id, &class);
        }
    }

    fn index_service(&mut self, builder: &ContainerBuilder, id: &str, class: &str) {
        let mut names = vec![class.to_string()];
        if let Some(meta) = builder.class_meta(class) {
            names.extend(meta.supertypes.iter().cloned());
        }
        for name in names {
            self.types
                .entry(name)
                .and_modify(|candidate| {
                    if !matches!(candidate, Candidate::Unique(existing) if existing == id) {
                        *candidate = Candidate::Ambiguous;
                    }
                })
                .or_insert_with(|| Candidate::Unique(id.to_string()));
        }
    }

    /// Look up the service implementing `ty`.
    pub fn resolve_type(&self, ty: &str) -> Resolution {
        match self.types.get(ty) {
            Some(Candidate::Unique(id)) => Resolution::Found(id.clone()),
            Some(Candidate::Ambiguous) => Resolution::Ambiguous,
            None => Resolution::NotFound,
        }
    }

    fn autowire_definition(&mut self, builder: &mut ContainerBuilder, id: &str) -> CompileResult<()> {
        let Some(def) = builder.definition(id).cloned() else {
            return Ok(());
        };
        if !def.autowired || def.synthetic {
            return Ok(());
        }
        let Some(class) = def.class().map(str::to_string) else {
            return Ok(());
        };
        if self.excluded.contains(&class) {
            return Ok(());
        }
        let Some(class_meta) = builder.class_meta(&class).cloned() else {
            builder.log(
                NAME,
                format!("skipping service '{id}': class '{class}' has no metadata"),
            );
            return Ok(());
        };

        let inner = self.decorator_target(builder, id, &def, &class, &class_meta);
        let mut def = def;

        if let Some(ctor) = &class_meta.constructor {
            if !ctor.public {
                return Err(CompileError::BindingResolution {
                    class: class.clone(),
                    reason: "constructor is not public".into(),
                });
            }
            if !ctor.params.is_empty() {
                let current = def.arguments().to_vec();
                let filled = self.autowire_method(builder, id, ctor, current, inner.as_ref())?;
                def.set_arguments(filled);
            }
        }

        for index in 0..def.calls.len() {
            let call = &def.calls[index];
            let Some(method_meta) = builder.method_meta(&class, &call.method).cloned() else {
                continue;
            };
            if method_meta.params.is_empty() {
                continue;
            }
            let current = call.arguments.clone();
            let filled = self.autowire_method(builder, id, &method_meta, current, inner.as_ref())?;
            def.calls[index].arguments = filled;
        }

        builder.definitions_mut().insert(id.to_string(), def);
        Ok(())
    }

    /// Pre-scan for the decorator tie-break: exactly one unresolved parameter
    /// typed as the decorated class rewires to the inner instance id; a
    /// second such parameter cancels the special case for both.
    fn decorator_target(
        &self,
        builder: &ContainerBuilder,
        id: &str,
        def: &Definition,
        class: &str,
        class_meta: &weft_core::metadata::ClassMeta,
    ) -> Option<(String, String)> {
        let decoration = def.decorates.as_ref()?;
        let decorated_class = builder
            .definition(&decoration.id)
            .and_then(|d| d.class())
            .map(str::to_string)?;

        let mut matches = 0usize;
        let mut count = |params: &[ParamMeta], filled: usize| {
            for param in params.iter().skip(filled) {
                if let Some(TypeRef::Class(t)) = &param.ty
                    && builder.metadata().accepts(&decorated_class, t)
                {
                    matches += 1;
                }
            }
        };

        if let Some(ctor) = &class_meta.constructor {
            count(&ctor.params, def.arguments().len());
        }
        for call in &def.calls {
            if let Some(method_meta) = builder.method_meta(class, &call.method) {
                count(&method_meta.params, call.arguments.len());
            }
        }

        if matches == 1 {
            let inner_id = decoration
                .inner_id
                .clone()
                .unwrap_or_else(|| format!("{id}.inner"));
            Some((inner_id, decorated_class))
        } else {
            None
        }
    }

    fn autowire_method(
        &mut self,
        builder: &mut ContainerBuilder,
        id: &str,
        method: &MethodMeta,
        mut args: Vec<Value>,
        inner: Option<&(String, String)>,
    ) -> CompileResult<Vec<Value>> {
        for index in args.len()..method.params.len() {
            let param = method.params[index].clone();
            let value = self.autowire_param(builder, id, &method.name, &param, inner)?;
            args.push(value);
        }

        // Trailing arguments equal to their parameter's default are dropped.
        while let Some(last) = args.last() {
            let Some(param) = method.params.get(args.len() - 1) else {
                break;
            };
            if param.default.as_ref() == Some(last) {
                args.pop();
            } else {
                break;
            }
        }
        Ok(args)
    }

    fn autowire_param(
        &mut self,
        builder: &mut ContainerBuilder,
        id: &str,
        method: &str,
        param: &ParamMeta,
        inner: Option<&(String, String)>,
    ) -> CompileResult<Value> {
        if let Some(TypeRef::ListOf(element)) = &param.ty {
            let candidates = crate::passes::autowire_arrays::list_candidates(builder, id, element);
            return Ok(if candidates.is_empty() {
                param.default.clone().unwrap_or(Value::Array(Vec::new()))
            } else {
                Value::Array(candidates)
            });
        }

        let Some(TypeRef::Class(ty)) = &param.ty else {
            // Untyped parameters fall back to their declared default.
            return self.fallback(param).ok_or_else(|| {
                CompileError::UnresolvableDependency {
                    id: id.to_string(),
                    method: method.to_string(),
                    parameter: param.name.clone(),
                    reason: "has no type and no default value".into(),
                }
            });
        };

        if let Some((inner_id, decorated_class)) = inner
            && builder.metadata().accepts(decorated_class, ty)
        {
            return Ok(Reference::typed(inner_id.clone(), ty.clone()).into());
        }

        match self.resolve_type(ty) {
            Resolution::Found(service) => Ok(Reference::typed(service, ty.clone()).into()),
            Resolution::Ambiguous => self.fallback(param).ok_or_else(|| {
                CompileError::UnresolvableDependency {
                    id: id.to_string(),
                    method: method.to_string(),
                    parameter: param.name.clone(),
                    reason: format!("type '{ty}' is implemented by multiple services"),
                }
            }),
            Resolution::NotFound => {
                let instantiable = builder
                    .class_meta(ty)
                    .is_some_and(|meta| meta.instantiable);
                if instantiable && !builder.has(ty) {
                    let ty = ty.clone();
                    match self.register_speculatively(builder, &ty) {
                        Ok(()) => Ok(Reference::typed(ty.clone(), ty).into()),
                        Err(err) => self.fallback(param).ok_or(err),
                    }
                } else {
                    self.fallback(param)
                        .ok_or_else(|| CompileError::UnresolvableDependency {
                            id: id.to_string(),
                            method: method.to_string(),
                            parameter: param.name.clone(),
                            reason: format!("no service implements type '{ty}'"),
                        })
                }
            }
        }
    }

    fn fallback(&self, param: &ParamMeta) -> Option<Value> {
        if let Some(default) = &param.default {
            Some(default.clone())
        } else if param.nullable {
            Some(Value::Null)
        } else {
            None
        }
    }

    fn register_speculatively(
        &mut self,
        builder: &mut ContainerBuilder,
        class: &str,
    ) -> CompileResult<()> {
        let mut def = Definition::object(class);
        def.set_autowired(true);
        builder.set_definition(class, def);
        self.index_service(builder, class, class);

        match self.autowire_definition(builder, class) {
            Ok(()) => {
                builder.log(NAME, format!("registered service '{class}' for autowiring"));
                Ok(())
            }
            Err(err) => {
                builder.remove_definition(class);
                self.rebuild_type_index(builder);
                Err(err)
            }
        }
    }
}

impl Pass for AutowirePass {
    fn name(&self) -> &'static str {
        NAME
    }

    fn process(&mut self, builder: &mut ContainerBuilder) -> CompileResult<()> {
        self.rebuild_type_index(builder);
        let ids: Vec<String> = builder.definitions().keys().cloned().collect();
        for id in ids {
            self.autowire_definition(builder, &id)?;
        }
        Ok(())
    }
}
