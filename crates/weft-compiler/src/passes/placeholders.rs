//! Resolution of `{key}` parameter placeholders in strings.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use weft_core::builder::ContainerBuilder;
use weft_core::definition::{DefinitionKind, FactoryTarget};
use weft_core::error::{CompileError, CompileResult};
use weft_core::value::Value;

use crate::Pass;
use crate::walker::{WalkContext, ValueTransformer, process_definitions, walk_value};

/// A named value transformation applied behind a `{key|name}` placeholder.
pub trait PlaceholderProcessor {
    /// Whether this processor answers to `name`.
    fn supports(&self, name: &str) -> bool;

    /// Transform the resolved value.
    fn process(&self, value: Value) -> CompileResult<Value>;
}

/// Substitutes `{key}` placeholders from the parameter map.
///
/// A string that is exactly one placeholder resolves to the typed parameter
/// value, non-scalars included. Placeholders embedded in longer text are
/// coerced to strings; a non-scalar embedded that way is a hard error.
/// `{key|processor}` pipes the resolved value left to right through the
/// registered processors. Resolution memoizes per exact expression and
/// tracks an in-progress key chain per top-level string; a repeated key is a
/// circular-parameter error.
///
/// The parameter map itself is resolved first, then every definition via the
/// walker and every alias target.
#[derive(Default)]
pub struct ResolvePlaceholdersPass {
    processors: Vec<Box<dyn PlaceholderProcessor>>,
    params: IndexMap<String, Value>,
    memo: FxHashMap<String, Value>,
    resolving: Vec<String>,
    current_source: Option<String>,
}

impl ResolvePlaceholdersPass {
    /// Create the pass with no processors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a processor for `{key|name}` placeholders.
    pub fn add_processor(&mut self, processor: Box<dyn PlaceholderProcessor>) -> &mut Self {
        self.processors.push(processor);
        self
    }

    /// The whole string is a single `{...}` placeholder.
    fn exact_token(expr: &str) -> Option<&str> {
        let inner = expr.strip_prefix('{')?.strip_suffix('}')?;
        if inner.is_empty() || inner.contains(['{', '}']) {
            None
        } else {
            Some(inner)
        }
    }

    fn resolve_token(&mut self, token: &str) -> CompileResult<Value> {
        let mut parts = token.split('|');
        let key = parts.next().unwrap_or_default();
        let mut value = self.resolve_key(key)?;
        for name in parts {
            let Some(processor) = self.processors.iter().find(|p| p.supports(name)) else {
                return Err(CompileError::runtime(format!(
                    "no placeholder processor supports '{name}'"
                )));
            };
            value = processor.process(value)?;
        }
        Ok(value)
    }

    fn resolve_key(&mut self, key: &str) -> CompileResult<Value> {
        if self.resolving.iter().any(|k| k == key) {
            let mut chain = self.resolving.clone();
            chain.push(key.to_string());
            return Err(CompileError::CircularParameter { chain });
        }
        let Some(value) = self.params.get(key).cloned() else {
            return Err(CompileError::ParameterNotFound {
                name: key.to_string(),
                source_id: self.current_source.clone(),
            });
        };
        self.resolving.push(key.to_string());
        let resolved = self.resolve_value(value);
        self.resolving.pop();
        resolved
    }

    fn resolve_value(&mut self, value: Value) -> CompileResult<Value> {
        match value {
            Value::Str(s) => self.resolve_expr(&s),
            Value::Array(items) => Ok(Value::Array(
                items
                    .into_iter()
                    .map(|v| self.resolve_value(v))
                    .collect::<CompileResult<_>>()?,
            )),
            Value::Map(entries) => {
                let mut out = IndexMap::with_capacity(entries.len());
                for (k, v) in entries {
                    out.insert(k, self.resolve_value(v)?);
                }
                Ok(Value::Map(out))
            }
            other => Ok(other),
        }
    }

    fn resolve_expr(&mut self, expr: &str) -> CompileResult<Value> {
        if !expr.contains('{') {
            return Ok(Value::string(expr));
        }
        if let Some(memoized) = self.memo.get(expr) {
            return Ok(memoized.clone());
        }

        let value = if let Some(token) = Self::exact_token(expr) {
            self.resolve_token(token)?
        } else {
            self.resolve_mixed(expr)?
        };

        self.memo.insert(expr.to_string(), value.clone());
        Ok(value)
    }

    /// Hand-rolled scan for placeholders embedded in longer text. Braces
    /// with no counterpart, and empty `{}` pairs, stay literal.
    fn resolve_mixed(&mut self, expr: &str) -> CompileResult<Value> {
        let mut out = String::with_capacity(expr.len());
        let mut rest = expr;
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                rest = "";
                break;
            };
            let token = &after[..end];
            if token.is_empty() || token.contains('{') {
                out.push('{');
                rest = after;
                continue;
            }
            let value = self.resolve_token(token)?;
            let Some(text) = value.to_embedded_string() else {
                return Err(CompileError::runtime(format!(
                    "cannot embed non-scalar parameter '{token}' into string '{expr}'"
                )));
            };
            out.push_str(&text);
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(Value::Str(out))
    }

    fn resolve_top_level(&mut self, expr: &str) -> CompileResult<Value> {
        self.resolving.clear();
        self.resolve_expr(expr)
    }

    // Class and method name fields stay strings; a placeholder resolving to
    // anything else is left alone.
    fn resolve_name_field(&mut self, field: &mut String) -> CompileResult<()> {
        if let Value::Str(resolved) = self.resolve_top_level(&field.clone())? {
            *field = resolved;
        }
        Ok(())
    }
}

impl ValueTransformer for ResolvePlaceholdersPass {
    fn transform(
        &mut self,
        ctx: &mut WalkContext<'_>,
        value: Value,
        is_root: bool,
    ) -> CompileResult<Value> {
        self.current_source = ctx.current_id.clone();
        match value {
            Value::Str(s) => self.resolve_top_level(&s),
            Value::Definition(mut def) => {
                match &mut def.kind {
                    DefinitionKind::Object { class, .. } => {
                        self.resolve_name_field(class)?;
                    }
                    DefinitionKind::Factory { target, method, .. } => {
                        if let FactoryTarget::Class(class) = target {
                            self.resolve_name_field(class)?;
                        }
                        self.resolve_name_field(method)?;
                    }
                    DefinitionKind::Undefined { class: Some(class) } => {
                        self.resolve_name_field(class)?;
                    }
                    _ => {}
                }
                walk_value(self, ctx, Value::Definition(def), is_root)
            }
            other => walk_value(self, ctx, other, is_root),
        }
    }
}

impl Pass for ResolvePlaceholdersPass {
    fn name(&self) -> &'static str {
        "ResolvePlaceholdersPass"
    }

    fn process(&mut self, builder: &mut ContainerBuilder) -> CompileResult<()> {
        self.memo.clear();
        self.resolving.clear();
        self.current_source = None;
        self.params = builder.parameters().clone();

        let keys: Vec<String> = self.params.keys().cloned().collect();
        for key in keys {
            self.resolving.clear();
            let resolved = self.resolve_key(&key)?;
            self.params.insert(key, resolved);
        }
        *builder.parameters_mut() = self.params.clone();

        process_definitions(self, builder)?;
        self.current_source = None;

        let targets: Vec<(String, String)> = builder
            .aliases()
            .iter()
            .map(|(id, alias)| (id.clone(), alias.target.clone()))
            .collect();
        for (id, target) in targets {
            if let Value::Str(resolved) = self.resolve_top_level(&target)?
                && let Some(alias) = builder.aliases_mut().get_mut(&id)
            {
                alias.target = resolved;
            }
        }
        Ok(())
    }
}
