//! Autowiring of list-typed constructor parameters.

use weft_core::builder::ContainerBuilder;
use weft_core::error::CompileResult;
use weft_core::metadata::TypeRef;
use weft_core::reference::Reference;
use weft_core::value::Value;

use crate::Pass;

/// Every registered service whose class satisfies `ty`, as typed references
/// in definition order, excluding the service being filled.
pub(crate) fn list_candidates(
    builder: &ContainerBuilder,
    exclude_id: &str,
    ty: &str,
) -> Vec<Value> {
    builder
        .definitions()
        .iter()
        .filter(|(id, _)| id.as_str() != exclude_id)
        .filter(|(_, def)| def.class().is_some_and(|c| builder.metadata().accepts(c, ty)))
        .map(|(id, _)| Value::Reference(Reference::typed(id.clone(), ty.to_string())))
        .collect()
}

/// Fills unset constructor parameters typed `ListOf(T)` on autowired
/// definitions with an array referencing every implementation of `T`.
///
/// Parameters are filled left to right from the first unset position for as
/// long as they are list-typed. When no implementation exists the declared
/// default is used, or an empty array when there is none.
#[derive(Default)]
pub struct AutowireArrayParametersPass;

impl AutowireArrayParametersPass {
    /// Create the pass.
    pub fn new() -> Self {
        Self
    }
}

impl Pass for AutowireArrayParametersPass {
    fn name(&self) -> &'static str {
        "AutowireArrayParametersPass"
    }

    fn process(&mut self, builder: &mut ContainerBuilder) -> CompileResult<()> {
        let ids: Vec<String> = builder.definitions().keys().cloned().collect();
        for id in ids {
            let Some(def) = builder.definition(&id) else {
                continue;
            };
            if !def.autowired || def.synthetic {
                continue;
            }
            let Some(class) = def.class().map(str::to_string) else {
                continue;
            };
            let Some(ctor) = builder
                .class_meta(&class)
                .and_then(|meta| meta.constructor.clone())
            else {
                continue;
            };

            let mut args = def.arguments().to_vec();
            let mut filled = false;
            while args.len() < ctor.params.len() {
                let param = &ctor.params[args.len()];
                let Some(TypeRef::ListOf(element)) = &param.ty else {
                    break;
                };
                let candidates = list_candidates(builder, &id, element);
                let value = if candidates.is_empty() {
                    param.default.clone().unwrap_or(Value::Array(Vec::new()))
                } else {
                    Value::Array(candidates)
                };
                args.push(value);
                filled = true;
            }

            if filled {
                builder.log(
                    "AutowireArrayParametersPass",
                    format!("filled list parameters of service '{id}'"),
                );
                if let Some(def) = builder.definition_mut(&id) {
                    def.set_arguments(args);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::metadata::{ClassMeta, ParamMeta};

    fn handler_metadata(builder: &mut ContainerBuilder) {
        builder
            .metadata_mut()
            .register(ClassMeta::interface("Handler"))
            .register(ClassMeta::new("MailHandler").implementing("Handler"))
            .register(ClassMeta::new("SmsHandler").implementing("Handler"))
            .register(
                ClassMeta::new("Dispatcher")
                    .with_constructor(vec![ParamMeta::list_of("handlers", "Handler")]),
            );
    }

    #[test]
    fn list_parameter_collects_every_implementation_in_order() {
        let mut builder = ContainerBuilder::new();
        handler_metadata(&mut builder);
        builder.register("mail", "MailHandler");
        builder.register("sms", "SmsHandler");
        builder.register("dispatcher", "Dispatcher").set_autowired(true);

        AutowireArrayParametersPass::new().process(&mut builder).unwrap();

        assert_eq!(
            builder.definition("dispatcher").unwrap().arguments(),
            &[Value::Array(vec![
                Value::Reference(Reference::typed("mail", "Handler")),
                Value::Reference(Reference::typed("sms", "Handler")),
            ])]
        );
    }

    #[test]
    fn the_service_itself_is_excluded() {
        let mut builder = ContainerBuilder::new();
        builder
            .metadata_mut()
            .register(ClassMeta::interface("Handler"))
            .register(
                ClassMeta::new("CompositeHandler")
                    .implementing("Handler")
                    .with_constructor(vec![ParamMeta::list_of("inner", "Handler")]),
            )
            .register(ClassMeta::new("MailHandler").implementing("Handler"));
        builder.register("mail", "MailHandler");
        builder.register("composite", "CompositeHandler").set_autowired(true);

        AutowireArrayParametersPass::new().process(&mut builder).unwrap();

        assert_eq!(
            builder.definition("composite").unwrap().arguments(),
            &[Value::Array(vec![Value::Reference(Reference::typed(
                "mail", "Handler"
            ))])]
        );
    }

    #[test]
    fn no_candidates_uses_the_default_or_an_empty_array() {
        let mut builder = ContainerBuilder::new();
        builder
            .metadata_mut()
            .register(ClassMeta::interface("Handler"))
            .register(ClassMeta::new("Dispatcher").with_constructor(vec![
                ParamMeta::list_of("handlers", "Handler")
                    .with_default(Value::Array(vec![Value::Null])),
            ]))
            .register(
                ClassMeta::new("Sink")
                    .with_constructor(vec![ParamMeta::list_of("handlers", "Handler")]),
            );
        builder.register("dispatcher", "Dispatcher").set_autowired(true);
        builder.register("sink", "Sink").set_autowired(true);

        AutowireArrayParametersPass::new().process(&mut builder).unwrap();

        assert_eq!(
            builder.definition("dispatcher").unwrap().arguments(),
            &[Value::Array(vec![Value::Null])]
        );
        assert_eq!(
            builder.definition("sink").unwrap().arguments(),
            &[Value::Array(Vec::new())]
        );
    }

    #[test]
    fn explicit_arguments_are_left_alone() {
        let mut builder = ContainerBuilder::new();
        handler_metadata(&mut builder);
        builder.register("mail", "MailHandler");
        builder
            .register("dispatcher", "Dispatcher")
            .set_autowired(true)
            .add_argument(Value::Array(vec![Value::Reference(Reference::new("mail"))]));

        AutowireArrayParametersPass::new().process(&mut builder).unwrap();

        assert_eq!(
            builder.definition("dispatcher").unwrap().arguments(),
            &[Value::Array(vec![Value::Reference(Reference::new("mail"))])]
        );
        assert!(builder.log_entries().is_empty());
    }
}
