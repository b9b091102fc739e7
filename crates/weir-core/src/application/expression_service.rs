//! Expression dispatch
//!
//! The [`ExpressionService`] routes expressions to the strategy registered
//! for their kind. Dependencies are resolved first and handed to the
//! strategy keyed by dependency name. Values of strategies that ask for it
//! are memoised in the context under the expression content, so a second
//! evaluation in the same context is served without touching a store.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use super::strategies::{ExpressionStrategy, ResolvedDependencies};
use crate::domain::context::ExpressionContext;
use crate::domain::expression::{Expression, ExpressionKind};
use crate::types::RuntimeValue;
use crate::{EngineError, EvaluationError, Result};

/// Registry of expression strategies, by kind
#[derive(Default)]
pub struct ExpressionService {
    strategies: HashMap<ExpressionKind, Arc<dyn ExpressionStrategy>>,
}

impl ExpressionService {
    /// Create a service without strategies
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy for the kind it handles, replacing any previous one
    pub fn register(&mut self, strategy: Arc<dyn ExpressionStrategy>) -> Option<Arc<dyn ExpressionStrategy>> {
        let kind = strategy.kind();
        debug!("Registering expression strategy for {}", kind);
        self.strategies.insert(kind, strategy)
    }

    /// Builder form of [`Self::register`]
    pub fn with_strategy(mut self, strategy: Arc<dyn ExpressionStrategy>) -> Self {
        self.register(strategy);
        self
    }

    /// Kinds with a registered strategy
    pub fn kinds(&self) -> Vec<ExpressionKind> {
        self.strategies.keys().cloned().collect()
    }

    fn strategy(&self, expression: &Expression) -> Result<&Arc<dyn ExpressionStrategy>> {
        self.strategies.get(&expression.kind).ok_or_else(|| {
            EngineError::Evaluation(
                EvaluationError::new(format!(
                    "No strategy is registered for expressions of kind {}",
                    expression.kind
                ))
                .with_expression(&expression.name),
            )
        })
    }

    /// Evaluate one expression
    pub fn evaluate(&self, expression: &Expression, context: &mut ExpressionContext) -> Result<RuntimeValue> {
        let mut values = self.evaluate_all(std::slice::from_ref(expression), context)?;
        values.pop().ok_or_else(|| {
            EngineError::Evaluation(
                EvaluationError::new("Evaluation produced no value").with_expression(&expression.name),
            )
        })
    }

    /// Evaluate a batch, returning values in input order
    ///
    /// Expressions of the same kind are handed to their strategy as one
    /// batch. Dependencies of the whole batch are resolved together, so two
    /// dependencies with the same name must resolve to the same value.
    pub fn evaluate_all(
        &self,
        expressions: &[Expression],
        context: &mut ExpressionContext,
    ) -> Result<Vec<RuntimeValue>> {
        if expressions.is_empty() {
            return Ok(Vec::new());
        }

        let resolved = self.resolve_dependencies(expressions, context)?;

        // kinds in first-seen order
        let mut groups: Vec<(&ExpressionKind, Vec<usize>)> = Vec::new();
        for (index, expression) in expressions.iter().enumerate() {
            match groups.iter_mut().find(|(kind, _)| **kind == expression.kind) {
                Some((_, indexes)) => indexes.push(index),
                None => groups.push((&expression.kind, vec![index])),
            }
        }

        let mut results: Vec<Option<RuntimeValue>> = vec![None; expressions.len()];
        for (kind, indexes) in groups {
            let strategy = self.strategy(&expressions[indexes[0]])?;
            let caching = strategy.must_cache_in_context();

            let mut pending = Vec::with_capacity(indexes.len());
            for index in indexes {
                let memoised = if caching {
                    context.get(&expressions[index].content)
                } else {
                    None
                };
                match memoised {
                    Some(value) => results[index] = Some(value.clone()),
                    None => pending.push(index),
                }
            }
            if pending.is_empty() {
                trace!("All {} expressions served from context", kind);
                continue;
            }

            let batch: Vec<&Expression> = pending.iter().map(|index| &expressions[*index]).collect();
            let values = strategy.evaluate_all(&batch, context, &resolved)?;
            if values.len() != batch.len() {
                return Err(EngineError::evaluation(format!(
                    "Strategy for {} returned {} values for {} expressions",
                    kind,
                    values.len(),
                    batch.len()
                )));
            }

            for (index, value) in pending.into_iter().zip(values) {
                if caching {
                    context.insert(expressions[index].content.clone(), value.clone());
                }
                results[index] = Some(value);
            }
        }

        results
            .into_iter()
            .zip(expressions)
            .map(|(value, expression)| {
                value.ok_or_else(|| {
                    EngineError::Evaluation(
                        EvaluationError::new("Evaluation produced no value").with_expression(&expression.name),
                    )
                })
            })
            .collect()
    }

    fn resolve_dependencies(
        &self,
        expressions: &[Expression],
        context: &mut ExpressionContext,
    ) -> Result<ResolvedDependencies> {
        let dependencies: Vec<Expression> = expressions
            .iter()
            .flat_map(|expression| expression.dependencies.iter().cloned())
            .collect();

        let mut resolved = ResolvedDependencies::new();
        if dependencies.is_empty() {
            return Ok(resolved);
        }

        let values = self.evaluate_all(&dependencies, context)?;
        for (dependency, value) in dependencies.into_iter().zip(values) {
            resolved.insert(dependency.name, value);
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::strategies::{ConstantExpressionStrategy, InputExpressionStrategy};
    use crate::domain::expression::ReturnType;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Caching strategy answering `value of <content>` and counting batches
    struct CountingStrategy {
        batches: Arc<AtomicUsize>,
    }

    impl ExpressionStrategy for CountingStrategy {
        fn kind(&self) -> ExpressionKind {
            ExpressionKind::Variable
        }

        fn evaluate(
            &self,
            expression: &Expression,
            _context: &ExpressionContext,
            _resolved: &ResolvedDependencies,
        ) -> Result<RuntimeValue> {
            Ok(RuntimeValue::from(format!("value of {}", expression.content)))
        }

        fn evaluate_all(
            &self,
            expressions: &[&Expression],
            context: &ExpressionContext,
            resolved: &ResolvedDependencies,
        ) -> Result<Vec<RuntimeValue>> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            expressions
                .iter()
                .map(|expression| self.evaluate(expression, context, resolved))
                .collect()
        }

        fn must_cache_in_context(&self) -> bool {
            true
        }
    }

    /// Returns the resolved dependency named `limit`
    struct LimitStrategy;

    impl ExpressionStrategy for LimitStrategy {
        fn kind(&self) -> ExpressionKind {
            ExpressionKind::Parameter
        }

        fn evaluate(
            &self,
            _expression: &Expression,
            _context: &ExpressionContext,
            resolved: &ResolvedDependencies,
        ) -> Result<RuntimeValue> {
            resolved
                .get("limit")
                .cloned()
                .ok_or_else(|| EngineError::DependencyMissing("limit".to_string()))
        }

        fn must_cache_in_context(&self) -> bool {
            false
        }
    }

    fn counting_strategy() -> (Arc<CountingStrategy>, Arc<AtomicUsize>) {
        let batches = Arc::new(AtomicUsize::new(0));
        let strategy = Arc::new(CountingStrategy {
            batches: batches.clone(),
        });
        (strategy, batches)
    }

    #[test]
    fn test_unknown_kind() {
        let service = ExpressionService::new();
        let expression = Expression::new("x", "x", ReturnType::String, ExpressionKind::Custom("groovy".to_string()));

        let err = service.evaluate(&expression, &mut ExpressionContext::new()).unwrap_err();
        assert_matches!(err, EngineError::Evaluation(inner) => {
            assert!(inner.message.contains("groovy"));
            assert_eq!(inner.expression_name.as_deref(), Some("x"));
        });
    }

    #[test]
    fn test_memoised_values_are_reused() {
        let (strategy, batches) = counting_strategy();
        let service = ExpressionService::new().with_strategy(strategy);
        let batch = vec![
            Expression::variable("a", ReturnType::String),
            Expression::variable("b", ReturnType::String),
        ];
        let mut context = ExpressionContext::new();

        let first = service.evaluate_all(&batch, &mut context).unwrap();
        let second = service.evaluate_all(&batch, &mut context).unwrap();

        assert_eq!(first, second);
        assert_eq!(batches.load(Ordering::SeqCst), 1);
        assert_eq!(context.get("a"), Some(&RuntimeValue::from("value of a")));
    }

    #[test]
    fn test_results_follow_input_order_across_kinds() {
        let (strategy, batches) = counting_strategy();
        let service = ExpressionService::new()
            .with_strategy(strategy)
            .with_strategy(Arc::new(ConstantExpressionStrategy::new()));
        let batch = vec![
            Expression::variable("a", ReturnType::String),
            Expression::constant("7", ReturnType::Long),
            Expression::variable("b", ReturnType::String),
        ];

        let values = service.evaluate_all(&batch, &mut ExpressionContext::new()).unwrap();
        assert_eq!(
            values,
            vec![
                RuntimeValue::from("value of a"),
                RuntimeValue::from(7_i64),
                RuntimeValue::from("value of b"),
            ]
        );
        assert_eq!(batches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dependencies_are_resolved_first() {
        let service = ExpressionService::new()
            .with_strategy(Arc::new(LimitStrategy))
            .with_strategy(Arc::new(InputExpressionStrategy::new()));

        let expression = Expression::parameter("threshold", ReturnType::Long)
            .with_dependency(Expression::input("limit", ReturnType::Long));
        let mut context = ExpressionContext::new().with_value("limit", 5_i64);

        assert_eq!(service.evaluate(&expression, &mut context).unwrap(), RuntimeValue::from(5_i64));
    }

    #[test]
    fn test_dependency_failure_propagates() {
        let service = ExpressionService::new()
            .with_strategy(Arc::new(LimitStrategy))
            .with_strategy(Arc::new(InputExpressionStrategy::new()));

        let expression = Expression::parameter("threshold", ReturnType::Long)
            .with_dependency(Expression::input("limit", ReturnType::Long));

        assert_eq!(
            service.evaluate(&expression, &mut ExpressionContext::new()),
            Err(EngineError::DependencyMissing("limit".to_string()))
        );
    }

    #[test]
    fn test_non_caching_strategy_leaves_context_untouched() {
        let service = ExpressionService::new().with_strategy(Arc::new(ConstantExpressionStrategy::new()));
        let mut context = ExpressionContext::new();

        service
            .evaluate(&Expression::constant("true", ReturnType::Boolean), &mut context)
            .unwrap();
        assert!(context.values().is_empty());
    }

    #[test]
    fn test_register_replaces() {
        let mut service = ExpressionService::new();
        assert!(service.register(Arc::new(ConstantExpressionStrategy::new())).is_none());
        assert!(service.register(Arc::new(ConstantExpressionStrategy::new())).is_some());
        assert_eq!(service.kinds(), vec![ExpressionKind::Constant]);
    }
}
