//! End-to-end pipeline tests against the public facade.

use weft::prelude::*;

fn analyzed(builder: &mut ContainerBuilder) {
    AnalyzeReferencesPass::new()
        .process(builder)
        .unwrap_or_else(|e| panic!("analysis failed: {e}"));
}

// =============================================================================
// The logger/app scenario
// =============================================================================

#[test]
fn placeholder_analysis_cycle_check_and_inlining_end_to_end() {
    let mut builder = ContainerBuilder::new();
    builder.set_parameter("log.path", Value::Str("/var/log/app.log".into()));
    builder
        .register("logger", "FileLogger")
        .add_argument(Value::Str("{log.path}".into()));
    builder
        .register("app", "App")
        .set_public(true)
        .add_argument(Value::Reference(Reference::new("logger")));

    let mut compiler = Compiler::with_passes(vec![
        Box::new(ResolvePlaceholdersPass::new()),
        Box::new(AnalyzeReferencesPass::new()),
        Box::new(CheckCircularReferencesPass::new()),
        Box::new(InlineDefinitionsPass::new()),
    ]);
    compiler.compile(&mut builder).unwrap();

    // The private logger was inlined into app and removed from the map.
    assert_eq!(builder.definitions().len(), 1);
    let app = builder.definition("app").unwrap();
    assert!(app.public);
    let Value::Definition(inlined) = &app.arguments()[0] else {
        panic!("expected the logger definition inlined into app");
    };
    assert_eq!(inlined.class(), Some("FileLogger"));
    assert_eq!(
        inlined.arguments(),
        &[Value::Str("/var/log/app.log".into())]
    );
    assert!(builder.log_entries().iter().any(|entry| {
        entry.pass == "InlineDefinitionsPass"
            && entry.message.contains("inlined service 'logger' into 'app'")
    }));
}

// =============================================================================
// Cycle detection
// =============================================================================

fn two_service_loop(builder: &mut ContainerBuilder) {
    builder
        .register("a", "A")
        .set_public(true)
        .add_argument(Value::Reference(Reference::new("b")));
    builder
        .register("b", "B")
        .add_argument(Value::Reference(Reference::new("a")));
}

#[test]
fn eager_two_service_loop_is_rejected() {
    let mut builder = ContainerBuilder::new();
    two_service_loop(&mut builder);
    analyzed(&mut builder);

    let err = CheckCircularReferencesPass::new()
        .process(&mut builder)
        .unwrap_err();
    assert!(matches!(err, CompileError::CircularDependency { .. }));
}

#[test]
fn a_lazy_edge_breaks_the_loop() {
    let mut builder = ContainerBuilder::new();
    two_service_loop(&mut builder);
    builder.definition_mut("b").unwrap().set_lazy(true);
    analyzed(&mut builder);

    CheckCircularReferencesPass::new()
        .process(&mut builder)
        .unwrap();
}

#[test]
fn a_weak_edge_breaks_the_loop() {
    let mut builder = ContainerBuilder::new();
    two_service_loop(&mut builder);
    builder.definition_mut("b").unwrap().set_arguments(vec![Value::Reference(
        Reference::with_behavior("a", InvalidBehavior::IgnoreOnUninitialized),
    )]);
    analyzed(&mut builder);

    CheckCircularReferencesPass::new()
        .process(&mut builder)
        .unwrap();
}

// =============================================================================
// Autowiring
// =============================================================================

fn logger_metadata(builder: &mut ContainerBuilder) {
    builder.metadata_mut().register(ClassMeta::interface("Logger"));
    builder
        .metadata_mut()
        .register(ClassMeta::new("FileLogger").implementing("Logger"));
    builder.metadata_mut().register(
        ClassMeta::new("App").with_constructor(vec![ParamMeta::of_class("logger", "Logger")]),
    );
}

#[test]
fn autowiring_fills_a_typed_constructor_parameter() {
    let mut builder = ContainerBuilder::new();
    logger_metadata(&mut builder);
    builder.register("file_logger", "FileLogger");
    builder
        .register("app", "App")
        .set_public(true)
        .set_autowired(true);

    AutowirePass::new().process(&mut builder).unwrap();

    assert!(matches!(
        &builder.definition("app").unwrap().arguments()[0],
        Value::Reference(r) if r.id == "file_logger" && r.ty.as_deref() == Some("Logger")
    ));
}

#[test]
fn two_implementations_of_a_type_are_ambiguous() {
    let mut builder = ContainerBuilder::new();
    logger_metadata(&mut builder);
    builder
        .metadata_mut()
        .register(ClassMeta::new("NullLogger").implementing("Logger"));
    builder.register("file_logger", "FileLogger");
    builder.register("null_logger", "NullLogger");
    builder
        .register("app", "App")
        .set_public(true)
        .set_autowired(true);

    let err = AutowirePass::new().process(&mut builder).unwrap_err();
    assert!(matches!(err, CompileError::UnresolvableDependency { .. }));
}

// =============================================================================
// Structural passes
// =============================================================================

#[test]
fn alias_chain_rewrites_references_to_the_terminal_id() {
    let mut builder = ContainerBuilder::new();
    builder.register("c", "Target");
    builder.set_alias("b", Alias::new("c"));
    builder.set_alias("a", Alias::new("b"));
    builder
        .register("app", "App")
        .set_public(true)
        .add_argument(Value::Reference(Reference::new("a")));

    ResolveAliasesPass::new().process(&mut builder).unwrap();

    assert!(matches!(
        &builder.definition("app").unwrap().arguments()[0],
        Value::Reference(r) if r.id == "c"
    ));
}

#[test]
fn decoration_moves_the_public_id_to_the_decorator() {
    let mut builder = ContainerBuilder::new();
    builder.register("logger", "FileLogger").set_public(true);
    builder
        .register("buffered", "BufferedLogger")
        .set_decorates(Decoration {
            id: "logger".into(),
            inner_id: None,
            priority: 0,
            on_invalid: InvalidBehavior::Exception,
        })
        .add_argument(Value::Reference(Reference::new("buffered.inner")));

    let mut compiler = Compiler::with_passes(vec![
        Box::new(DecoratorPass::new()),
        Box::new(ResolveAliasesPass::new()),
    ]);
    compiler.compile(&mut builder).unwrap();

    // "logger" now reaches the decorator; the decorator wraps the original.
    assert!(matches!(
        &builder.definition("buffered").unwrap().arguments()[0],
        Value::Reference(r) if r.id == "buffered.inner"
    ));
    assert_eq!(
        builder.definition("buffered.inner").unwrap().class(),
        Some("FileLogger")
    );
}

#[test]
fn unused_private_definitions_are_pruned() {
    let mut builder = ContainerBuilder::new();
    builder.register("used", "Used");
    builder.register("orphan", "Orphan");
    builder
        .register("app", "App")
        .set_public(true)
        .add_argument(Value::Reference(Reference::new("used")));

    let mut compiler = Compiler::with_passes(vec![
        Box::new(AnalyzeReferencesPass::new()),
        Box::new(RemoveUnusedDefinitionsPass::new()),
    ]);
    compiler.compile(&mut builder).unwrap();

    assert!(builder.has_definition("used"));
    assert!(!builder.has_definition("orphan"));
    assert!(builder.has_definition("app"));
}

#[test]
fn analysis_is_idempotent() {
    let mut builder = ContainerBuilder::new();
    builder.register("store", "Store");
    builder
        .register("app", "App")
        .set_public(true)
        .add_argument(Value::Reference(Reference::new("store")));

    analyzed(&mut builder);
    let first = builder.graph().edge_list();
    analyzed(&mut builder);
    assert_eq!(first, builder.graph().edge_list());
}

// =============================================================================
// Placeholders
// =============================================================================

#[test]
fn exact_placeholder_preserves_the_parameter_type() {
    let mut builder = ContainerBuilder::new();
    builder.set_parameter("workers", Value::Int(8));
    builder
        .register("pool", "WorkerPool")
        .set_public(true)
        .add_argument(Value::Str("{workers}".into()));

    ResolvePlaceholdersPass::new().process(&mut builder).unwrap();
    assert_eq!(builder.definition("pool").unwrap().arguments(), &[Value::Int(8)]);
}

#[test]
fn mixed_text_interpolates_scalars() {
    let mut builder = ContainerBuilder::new();
    builder.set_parameter("host", Value::Str("db.internal".into()));
    builder.set_parameter("port", Value::Int(5432));
    builder
        .register("db", "Connection")
        .set_public(true)
        .add_argument(Value::Str("postgres://{host}:{port}".into()));

    ResolvePlaceholdersPass::new().process(&mut builder).unwrap();
    assert_eq!(
        builder.definition("db").unwrap().arguments(),
        &[Value::Str("postgres://db.internal:5432".into())]
    );
}

// =============================================================================
// The standard pipeline
// =============================================================================

#[test]
fn the_standard_pipeline_compiles_a_small_container() {
    let mut builder = ContainerBuilder::new();
    builder.set_parameter("log.path", Value::Str("/var/log/app.log".into()));
    builder
        .register("logger", "FileLogger")
        .add_argument(Value::Str("{log.path}".into()));
    builder.register("orphan", "Orphan");
    builder
        .register("app", "App")
        .set_public(true)
        .add_argument(Value::Reference(Reference::new("logger")));

    Compiler::standard().compile(&mut builder).unwrap();

    // The orphan is gone, the logger was folded into app.
    assert!(!builder.has_definition("orphan"));
    let app = builder.definition("app").unwrap();
    let Value::Definition(inlined) = &app.arguments()[0] else {
        panic!("expected the logger inlined into app");
    };
    assert_eq!(
        inlined.arguments(),
        &[Value::Str("/var/log/app.log".into())]
    );
}

#[test]
fn the_standard_pipeline_rejects_an_eager_cycle() {
    let mut builder = ContainerBuilder::new();
    two_service_loop(&mut builder);

    let err = Compiler::standard().compile(&mut builder).unwrap_err();
    assert!(matches!(err, CompileError::CircularDependency { .. }));
}
