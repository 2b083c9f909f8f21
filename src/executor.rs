//! `FeatureSetExecutor`: runs a `FeatureSet`'s statement body through the
//! per-statement loop (spec.md §4.E): clear auxiliaries, populate clause
//! bindings, look up and validate the action, bind its result, check for a
//! captured response, propagate errors. Also expands `Match`/`ForEach`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::descriptors::{AroStatement, Expression, FeatureSet, ForEachLoop, MatchStatement, Statement, ValueSource};
use crate::error::Result;
use crate::expr;
use crate::registry::ActionRegistry;
use crate::value::TypedValue;

/// Verbs the executor must not auto-bind `result.base` for (spec.md §4.E
/// step 4): `Update`/`Merge` rebind `result.base` internally with
/// `allowRebind=true`, `Accept`/`Publish` rebind `object.base`/`result.base`
/// themselves, the Response/Export family (`Return`, `Throw`, `Log`, `Send`,
/// `Store`, `Write`, `Publish`, `Emit`, `Notify`) read `result.base` as a
/// reference to a value a prior statement already bound rather than naming
/// a fresh variable, and `Then`/`Assert` likewise only read the variable
/// under test — in every case a generic `allowRebind=false` bind would
/// collide with that earlier binding.
const SELF_BINDING_VERBS: &[&str] = &[
    "update", "modify", "change", "set", "configure", "merge", "combine", "join", "concat", "accept",
    "return", "throw", "raise", "fail", "log", "print", "output", "debug", "send", "store", "save",
    "persist", "write", "publish", "emit", "notify", "then", "assert",
];

pub struct FeatureSetExecutor {
    registry: Arc<ActionRegistry>,
}

impl FeatureSetExecutor {
    pub fn new(registry: Arc<ActionRegistry>) -> Self {
        Self { registry }
    }

    /// Runs every statement in order, stopping early once a response is
    /// captured (spec.md §4.B `set_response`: "first call wins").
    pub async fn run(&self, feature_set: &FeatureSet, ctx: &mut ExecutionContext) -> Result<()> {
        self.run_statements(&feature_set.body, ctx).await
    }

    /// Boxed because `Match`/`ForEach` bodies recurse back into this method —
    /// an unboxed `async fn` can't express a self-referential future.
    fn run_statements<'a>(
        &'a self,
        statements: &'a [Statement],
        ctx: &'a mut ExecutionContext,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            for statement in statements {
                if ctx.response_captured() {
                    break;
                }
                self.run_statement(statement, ctx).await?;
            }
            Ok(())
        })
    }

    async fn run_statement(&self, statement: &Statement, ctx: &mut ExecutionContext) -> Result<()> {
        match statement {
            Statement::Aro(aro) => self.run_aro(aro, ctx).await,
            Statement::Publish(publish) => {
                let value = ctx
                    .resolve(&publish.object.base)
                    .cloned()
                    .ok_or_else(|| crate::error::ActionError::UndefinedVariable(publish.object.base.clone()))?;
                ctx.bind(&publish.result.base, value, true)?;
                Ok(())
            }
            Statement::Match(m) => self.run_match(m, ctx).await,
            Statement::ForEach(f) => self.run_foreach(f, ctx).await,
        }
    }

    async fn run_aro(&self, aro: &AroStatement, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.clear_auxiliaries();
        bind_clauses(aro, ctx)?;

        let verb = aro.action.verb.to_ascii_lowercase();
        self.registry.validate_preposition(&verb, aro.object.preposition)?;
        let implementation = self.registry.lookup(&verb).ok_or_else(|| {
            crate::error::ActionError::runtime(format!("no action registered for verb `{verb}`"))
        })?;

        let value = implementation.execute(&aro.result, &aro.object, ctx).await?;

        if !SELF_BINDING_VERBS.contains(&verb.as_str()) {
            ctx.bind(&aro.result.base, value, false)?;
        }
        Ok(())
    }

    async fn run_match(&self, statement: &MatchStatement, ctx: &mut ExecutionContext) -> Result<()> {
        let subject = expr::evaluate(&statement.subject, ctx)?;
        for branch in &statement.branches {
            let predicate_value = expr::evaluate(&branch.predicate, ctx)?;
            if predicate_value == subject || truthy(&predicate_value) {
                return self.run_statements(&branch.body, ctx).await;
            }
        }
        Ok(())
    }

    async fn run_foreach(&self, loop_: &ForEachLoop, ctx: &mut ExecutionContext) -> Result<()> {
        let source = expr::evaluate(&loop_.source, ctx)?;
        let TypedValue::List(items) = source else {
            return Err(crate::error::ActionError::TypeMismatch {
                expected: "List".to_string(),
                actual: source.type_name().to_string(),
                variable: None,
            });
        };
        for item in items {
            ctx.bind(&loop_.item_variable, item, true)?;
            self.run_statements(&loop_.body, ctx).await?;
            if ctx.response_captured() {
                break;
            }
        }
        Ok(())
    }
}

fn truthy(value: &TypedValue) -> bool {
    matches!(value, TypedValue::Boolean(true))
}

/// Step 2: populate `_literal_`/`_expression_`/`_to_`/`_from_`/
/// `_by_pattern_`/`_by_flags_`/`_aggregation_type_`/`_aggregation_field_`/
/// `_where_field_`/`_where_op_`/`_where_value_` from the statement's clauses
/// (spec.md §4.E step 2).
fn bind_clauses(aro: &AroStatement, ctx: &mut ExecutionContext) -> Result<()> {
    match &aro.value_source {
        ValueSource::None => {}
        ValueSource::Literal(lit) => {
            ctx.bind("_literal_", lit.clone(), true)?;
            ctx.bind("_with_", lit.clone(), true)?;
        }
        ValueSource::Expression(expr) => {
            if let Expression::VarRef(name) = expr {
                ctx.bind("_expression_name_", TypedValue::String(name.clone()), true)?;
            }
            let value = expr::evaluate(expr, ctx)?;
            ctx.bind("_expression_", value.clone(), true)?;
            ctx.bind("_with_", value, true)?;
        }
    }

    if let Some(expr) = &aro.to_source {
        let value = expr::evaluate(expr, ctx)?;
        ctx.bind("_to_", value, true)?;
    }
    if let Some(expr) = &aro.from_source {
        let value = expr::evaluate(expr, ctx)?;
        ctx.bind("_from_", value, true)?;
    }
    if let Some(expr) = &aro.by_source {
        bind_by_clause(expr, ctx)?;
    }

    if let Some(where_clause) = &aro.query_modifiers.where_clause {
        ctx.bind("_where_field_", TypedValue::String(where_clause.field.clone()), true)?;
        ctx.bind("_where_op_", TypedValue::String(where_clause.op.clone()), true)?;
        ctx.bind("_where_value_", where_clause.value.clone(), true)?;
    }
    Ok(())
}

fn bind_by_clause(expr: &Expression, ctx: &mut ExecutionContext) -> Result<()> {
    match expr {
        Expression::Aggregate(field, op) => {
            ctx.bind("_aggregation_field_", TypedValue::String(field.clone()), true)?;
            ctx.bind("_aggregation_type_", TypedValue::String(op.clone()), true)?;
        }
        Expression::Regex(pattern, flags) => {
            ctx.bind("_by_pattern_", TypedValue::String(pattern.clone()), true)?;
            ctx.bind("_by_flags_", TypedValue::String(flags.clone()), true)?;
        }
        other => {
            let value = expr::evaluate(other, ctx)?;
            if let Some(pattern) = value.to_plain_string() {
                ctx.bind("_by_pattern_", TypedValue::String(pattern), true)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::compute::Compute;
    use crate::descriptors::{Action, ActionRole, ObjectDescriptor, Preposition, ResultDescriptor, Span};

    fn aro(verb: &str, result: ResultDescriptor, object: ObjectDescriptor, value_source: ValueSource) -> AroStatement {
        AroStatement {
            action: Action { verb: verb.to_string(), role: ActionRole::Own, span: Span::default() },
            result,
            object,
            value_source,
            to_source: None,
            from_source: None,
            by_source: None,
            query_modifiers: Default::default(),
            span: Span::default(),
        }
    }

    #[tokio::test]
    async fn running_a_compute_statement_binds_its_result() {
        let registry = Arc::new(ActionRegistry::new());
        registry.register(Arc::new(Compute));
        let executor = FeatureSetExecutor::new(registry);

        let mut ctx = ExecutionContext::new("Orders", "fs");
        ctx.bind("input", TypedValue::String("hello".to_string()), false).unwrap();
        let mut object = ObjectDescriptor::new("input", Preposition::From);
        object.specifiers = vec![];
        let result = ResultDescriptor::new("output").with_specifiers(vec!["uppercase"]);
        let statement = Statement::Aro(aro("compute", result, object, ValueSource::None));

        executor.run_statements(std::slice::from_ref(&statement), &mut ctx).await.unwrap();
        assert_eq!(ctx.resolve("output"), Some(&TypedValue::String("HELLO".to_string())));
    }
}
