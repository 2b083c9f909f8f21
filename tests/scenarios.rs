//! The six end-to-end scenarios (spec.md §8), driven directly through the
//! public `AroStatement`/`FeatureSetExecutor` API since no parser ships in
//! this crate (spec.md §1).

use std::sync::{Arc, Mutex};

use aro_runtime::prelude::*;
use aro_runtime::repository::map_entry;
use aro_runtime::services::logging::{LogTarget, LoggingService};
use aro_runtime::services::test_context::InMemoryTestExecutionContext;

fn feature_set(name: &str, business_activity: &str, body: Vec<Statement>) -> FeatureSet {
    FeatureSet {
        name: name.to_string(),
        business_activity: business_activity.to_string(),
        body,
    }
}

fn aro(
    verb: &str,
    role: ActionRole,
    result: ResultDescriptor,
    object: ObjectDescriptor,
    value_source: ValueSource,
) -> AroStatement {
    AroStatement {
        action: Action { verb: verb.to_string(), role, span: Span::default() },
        result,
        object,
        value_source,
        to_source: None,
        from_source: None,
        by_source: None,
        query_modifiers: QueryModifiers::default(),
        span: Span::default(),
    }
}

fn registry_with_all_actions() -> Arc<ActionRegistry> {
    let registry = Arc::new(ActionRegistry::new());
    register_all(&registry);
    registry
}

/// Scenario 1: arithmetic test via `When`/`Then`.
#[tokio::test]
async fn arithmetic_test_via_when_then() {
    let registry = registry_with_all_actions();
    let executor = Arc::new(FeatureSetExecutor::new(registry.clone()));

    let add_numbers = feature_set(
        "Add-Numbers",
        "Orders",
        vec![
            Statement::Aro(aro(
                "compute",
                ActionRole::Own,
                ResultDescriptor::new("sum"),
                ObjectDescriptor::new("a", Preposition::From),
                ValueSource::Expression(Expression::Binary(
                    Box::new(Expression::VarRef("a".to_string())),
                    "+".to_string(),
                    Box::new(Expression::VarRef("b".to_string())),
                )),
            )),
            Statement::Aro(aro(
                "return",
                ActionRole::Response,
                ResultDescriptor::new("OK"),
                ObjectDescriptor::new("sum", Preposition::With),
                ValueSource::None,
            )),
        ],
    );

    let test_context = Arc::new(InMemoryTestExecutionContext::new(executor.clone()));
    test_context.register_feature_set(add_numbers);

    let mut ctx = ExecutionContext::new("Orders", "caller");
    ctx.register::<Arc<dyn aro_runtime::services::test_context::TestExecutionContext>>(test_context.clone());
    ctx.bind("a", TypedValue::Integer(3), false).unwrap();
    ctx.bind("b", TypedValue::Integer(5), false).unwrap();

    let caller = feature_set(
        "caller",
        "Orders",
        vec![
            Statement::Aro(aro(
                "when",
                ActionRole::Own,
                ResultDescriptor::new("sum"),
                ObjectDescriptor::new("Add-Numbers", Preposition::From),
                ValueSource::None,
            )),
            Statement::Aro(aro(
                "then",
                ActionRole::Own,
                ResultDescriptor::new("sum"),
                ObjectDescriptor::new("8", Preposition::With),
                ValueSource::Literal(TypedValue::Integer(8)),
            )),
        ],
    );

    executor.run(&caller, &mut ctx).await.unwrap();

    assert_eq!(ctx.resolve("sum"), Some(&TypedValue::Float(8.0)));
    let assertions = test_context.assertions();
    assert_eq!(assertions.len(), 1);
    assert_eq!(assertions[0].variable, "sum");
    assert!(assertions[0].passed);
}

/// Scenario 2: state-machine transition via `Given`/`Accept`, idempotency
/// failure on a repeated transition.
#[tokio::test]
async fn state_machine_transition_then_rejects_repeat() {
    let registry = registry_with_all_actions();
    let executor = FeatureSetExecutor::new(registry);

    struct Collector(Mutex<Vec<aro_runtime::Event>>);
    #[async_trait::async_trait]
    impl aro_runtime::events::EventHandler for Collector {
        async fn handle(&self, event: &aro_runtime::Event) {
            self.0.lock().unwrap().push(event.clone());
        }
    }
    let collector = Arc::new(Collector(Mutex::new(Vec::new())));
    let bus = Arc::new(EventBus::new());
    bus.subscribe("StateTransitionEvent", collector.clone());

    let mut ctx = ExecutionContext::new("Orders", "fs").with_event_bus(bus);

    let given = feature_set(
        "fs",
        "Orders",
        vec![Statement::Aro(aro(
            "given",
            ActionRole::Own,
            ResultDescriptor::new("order"),
            ObjectDescriptor::new("order", Preposition::With),
            ValueSource::Literal(map_entry(vec![
                ("id", TypedValue::String("o1".to_string())),
                ("status", TypedValue::String("draft".to_string())),
            ])),
        ))],
    );
    executor.run(&given, &mut ctx).await.unwrap();

    let accept = feature_set(
        "fs",
        "Orders",
        vec![Statement::Aro(aro(
            "accept",
            ActionRole::Own,
            ResultDescriptor::new("draft_placed_order"),
            ObjectDescriptor::new("order", Preposition::From).with_specifiers(vec!["status".to_string()]),
            ValueSource::None,
        ))],
    );
    executor.run(&accept, &mut ctx).await.unwrap();

    match ctx.resolve("order") {
        Some(TypedValue::Map(m)) => assert_eq!(m.get("status"), Some(&TypedValue::String("placed".to_string()))),
        other => panic!("expected updated map, got {other:?}"),
    }

    let events = collector.0.lock().unwrap().clone();
    assert_eq!(events.len(), 1);
    if let aro_runtime::Event::StateTransition(e) = &events[0] {
        assert_eq!(e.from_state, "draft");
        assert_eq!(e.to_state, "placed");
        assert_eq!(e.entity_id.as_deref(), Some("o1"));
    } else {
        panic!("expected a StateTransitionEvent");
    }

    let err = executor.run(&accept, &mut ctx).await.unwrap_err();
    assert!(matches!(err, ActionError::AcceptStateError { .. }));
}

/// Scenario 3: `Store` into a repository emits a change event; `Retrieve`
/// returns the full list, then a scalar under a `where` match.
#[tokio::test]
async fn store_then_retrieve_all_and_scalar() {
    let registry = registry_with_all_actions();
    let executor = FeatureSetExecutor::new(registry);

    let mut ctx = ExecutionContext::new("Orders", "fs").with_repository(Arc::new(RepositoryStore::new()));
    ctx.bind(
        "msg",
        map_entry(vec![
            ("id", TypedValue::String("m1".to_string())),
            ("text", TypedValue::String("hi".to_string())),
        ]),
        false,
    )
    .unwrap();

    let store_stmt = aro(
        "store",
        ActionRole::Response,
        ResultDescriptor::new("msg"),
        ObjectDescriptor::new("message-repository", Preposition::Into),
        ValueSource::None,
    );

    let retrieve_all = aro(
        "retrieve",
        ActionRole::Request,
        ResultDescriptor::new("all"),
        ObjectDescriptor::new("message-repository", Preposition::From),
        ValueSource::None,
    );

    let mut retrieve_one = aro(
        "retrieve",
        ActionRole::Request,
        ResultDescriptor::new("one"),
        ObjectDescriptor::new("message-repository", Preposition::From),
        ValueSource::None,
    );
    retrieve_one.query_modifiers = QueryModifiers {
        where_clause: Some(WhereClause {
            field: "id".to_string(),
            op: "is".to_string(),
            value: TypedValue::String("m1".to_string()),
            span: Span::default(),
        }),
    };

    let body = feature_set(
        "fs",
        "Orders",
        vec![
            Statement::Aro(store_stmt),
            Statement::Aro(retrieve_all),
            Statement::Aro(retrieve_one),
        ],
    );
    executor.run(&body, &mut ctx).await.unwrap();

    let expected = map_entry(vec![
        ("id", TypedValue::String("m1".to_string())),
        ("text", TypedValue::String("hi".to_string())),
    ]);
    assert_eq!(ctx.resolve("all"), Some(&TypedValue::List(vec![expected.clone()])));
    assert_eq!(ctx.resolve("one"), Some(&expected));
}

/// Scenario 4: `Compute` intersect/union obey multiset laws end to end.
#[tokio::test]
async fn compute_set_ops_obey_multiset_laws() {
    let registry = registry_with_all_actions();
    let executor = FeatureSetExecutor::new(registry);
    let mut ctx = ExecutionContext::new("Orders", "fs");

    // `ValueSource::Literal` (not `Expression`) for the secondary list: it
    // populates `_with_`/`_literal_` without touching `_expression_`, which
    // `primary_operand` would otherwise prefer over `_from_`.
    let mut intersect_stmt = aro(
        "compute",
        ActionRole::Own,
        ResultDescriptor::new("i").with_specifiers(vec!["intersect".to_string()]),
        ObjectDescriptor::new("xs", Preposition::From),
        ValueSource::Literal(TypedValue::List(vec![
            TypedValue::Integer(2),
            TypedValue::Integer(2),
            TypedValue::Integer(4),
        ])),
    );
    intersect_stmt.from_source = Some(Expression::List(vec![
        TypedValue::Integer(1),
        TypedValue::Integer(2),
        TypedValue::Integer(2),
        TypedValue::Integer(3),
    ]));

    let mut union_stmt = aro(
        "compute",
        ActionRole::Own,
        ResultDescriptor::new("u").with_specifiers(vec!["union".to_string()]),
        ObjectDescriptor::new("xs", Preposition::From),
        ValueSource::Literal(TypedValue::List(vec![TypedValue::Integer(2), TypedValue::Integer(3)])),
    );
    union_stmt.from_source = Some(Expression::List(vec![TypedValue::Integer(1), TypedValue::Integer(2)]));

    let body = feature_set("fs", "Orders", vec![Statement::Aro(intersect_stmt), Statement::Aro(union_stmt)]);
    executor.run(&body, &mut ctx).await.unwrap();

    assert_eq!(
        ctx.resolve("i"),
        Some(&TypedValue::List(vec![TypedValue::Integer(2), TypedValue::Integer(2)]))
    );
    assert_eq!(
        ctx.resolve("u"),
        Some(&TypedValue::List(vec![TypedValue::Integer(1), TypedValue::Integer(2), TypedValue::Integer(3)]))
    );
}

/// Scenario 5: `Filter` then `Reduce` pipeline.
#[tokio::test]
async fn filter_then_reduce_pipeline() {
    let registry = registry_with_all_actions();
    let executor = FeatureSetExecutor::new(registry);
    let mut ctx = ExecutionContext::new("Orders", "fs");
    ctx.bind(
        "orders",
        TypedValue::List(vec![
            map_entry(vec![("amt", TypedValue::Integer(10))]),
            map_entry(vec![("amt", TypedValue::Integer(50))]),
            map_entry(vec![("amt", TypedValue::Integer(200))]),
        ]),
        false,
    )
    .unwrap();

    let mut filter_stmt = aro(
        "filter",
        ActionRole::Own,
        ResultDescriptor::new("big"),
        ObjectDescriptor::new("orders", Preposition::Where),
        ValueSource::None,
    );
    filter_stmt.query_modifiers = QueryModifiers {
        where_clause: Some(WhereClause {
            field: "amt".to_string(),
            op: ">".to_string(),
            value: TypedValue::Integer(20),
            span: Span::default(),
        }),
    };

    let mut reduce_stmt = aro(
        "reduce",
        ActionRole::Own,
        ResultDescriptor::new("total"),
        ObjectDescriptor::new("big", Preposition::From),
        ValueSource::None,
    );
    reduce_stmt.by_source = Some(Expression::Aggregate("amt".to_string(), "sum".to_string()));

    let body = feature_set("fs", "Orders", vec![Statement::Aro(filter_stmt), Statement::Aro(reduce_stmt)]);
    executor.run(&body, &mut ctx).await.unwrap();

    assert_eq!(
        ctx.resolve("big"),
        Some(&TypedValue::List(vec![
            map_entry(vec![("amt", TypedValue::Integer(50))]),
            map_entry(vec![("amt", TypedValue::Integer(200))]),
        ]))
    );
    assert_eq!(ctx.resolve("total"), Some(&TypedValue::Float(250.0)));
}

/// Scenario 6: `Log` routes output/error lines by specifier, formatted per
/// `outputContext`.
#[tokio::test]
async fn log_routes_output_and_error_under_machine_context() {
    struct RecordingLog(Mutex<Vec<(String, String)>>);
    impl LoggingService for RecordingLog {
        fn write(&self, target: LogTarget, line: &str) {
            let name = match target {
                LogTarget::Output => "output",
                LogTarget::Error => "error",
            };
            self.0.lock().unwrap().push((name.to_string(), line.to_string()));
        }
    }

    let registry = registry_with_all_actions();
    let executor = FeatureSetExecutor::new(registry);
    let recorder = Arc::new(RecordingLog(Mutex::new(Vec::new())));

    let mut ctx = ExecutionContext::new("Orders", "fs");
    ctx.register::<Arc<dyn LoggingService>>(recorder.clone());

    let output_stmt = aro(
        "log",
        ActionRole::Response,
        ResultDescriptor::new("hello"),
        ObjectDescriptor::new("console", Preposition::To),
        ValueSource::Literal(TypedValue::String("hello".to_string())),
    );
    let error_stmt = aro(
        "log",
        ActionRole::Response,
        ResultDescriptor::new("hello"),
        ObjectDescriptor::new("console", Preposition::To).with_specifiers(vec!["error".to_string()]),
        ValueSource::Literal(TypedValue::String("hello".to_string())),
    );

    let body = feature_set("fs", "Orders", vec![Statement::Aro(output_stmt), Statement::Aro(error_stmt)]);
    executor.run(&body, &mut ctx).await.unwrap();

    let lines = recorder.0.lock().unwrap().clone();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].0, "output");
    assert_eq!(lines[0].1, "{\"level\":\"info\",\"source\":\"fs\",\"message\":\"hello\"}");
    assert_eq!(lines[1].0, "error");
    assert_eq!(lines[1].1, "{\"level\":\"info\",\"source\":\"fs\",\"message\":\"hello\"}");
}
