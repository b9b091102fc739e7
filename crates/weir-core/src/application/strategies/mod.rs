//! Expression strategies
//!
//! Each strategy resolves one [`ExpressionKind`]. The dispatcher hands a
//! strategy the expressions of its kind together with the values of their
//! already-resolved dependencies, keyed by dependency name.

use std::collections::HashMap;
use std::hash::Hash;

use crate::domain::context::ExpressionContext;
use crate::domain::expression::{Expression, ExpressionKind};
use crate::types::RuntimeValue;
use crate::Result;

/// Business data bound to the evaluation container
pub mod business_data_reference;

/// Named queries against the business data store
pub mod business_data_query;

/// Business object accessors
pub mod business_object_dao;

/// Literal values
pub mod constant;

/// Engine-provided constants
pub mod engine_constant;

/// Values supplied by the caller
pub mod input;

/// Process parameters
pub mod parameter;

/// Process data
pub mod variable;

pub use business_data_reference::BusinessDataReferenceExpressionStrategy;
pub use business_data_query::BusinessDataQueryExpressionStrategy;
pub use business_object_dao::{BusinessObjectDaoExpressionStrategy, DaoRegistry, RepositoryDao};
pub use constant::ConstantExpressionStrategy;
pub use engine_constant::{EngineConstant, EngineConstantExpressionStrategy};
pub use input::InputExpressionStrategy;
pub use parameter::ParameterExpressionStrategy;
pub use variable::VariableExpressionStrategy;

/// Values of resolved dependencies, keyed by dependency name
pub type ResolvedDependencies = HashMap<String, RuntimeValue>;

/// Resolves the expressions of one kind
pub trait ExpressionStrategy: Send + Sync {
    /// Kind handled by this strategy
    fn kind(&self) -> ExpressionKind;

    /// Evaluate a single expression
    fn evaluate(
        &self,
        expression: &Expression,
        context: &ExpressionContext,
        resolved: &ResolvedDependencies,
    ) -> Result<RuntimeValue>;

    /// Evaluate a batch, returning values in input order
    ///
    /// Expressions sharing the same content are evaluated once.
    fn evaluate_all(
        &self,
        expressions: &[&Expression],
        context: &ExpressionContext,
        resolved: &ResolvedDependencies,
    ) -> Result<Vec<RuntimeValue>> {
        evaluate_distinct(
            expressions,
            |expression| expression.content.as_str(),
            |expression| self.evaluate(expression, context, resolved),
        )
    }

    /// Whether values must be memoised in the context under their content
    fn must_cache_in_context(&self) -> bool;
}

/// Evaluate each distinct key of a batch once, keeping input order
pub fn evaluate_distinct<'a, K, KeyFn, EvalFn>(
    expressions: &[&'a Expression],
    key: KeyFn,
    mut eval: EvalFn,
) -> Result<Vec<RuntimeValue>>
where
    K: Eq + Hash,
    KeyFn: Fn(&'a Expression) -> K,
    EvalFn: FnMut(&'a Expression) -> Result<RuntimeValue>,
{
    let mut known: HashMap<K, RuntimeValue> = HashMap::new();
    let mut values = Vec::with_capacity(expressions.len());

    for expression in expressions.iter().copied() {
        let key = key(expression);
        if let Some(value) = known.get(&key) {
            values.push(value.clone());
            continue;
        }
        let value = eval(expression)?;
        known.insert(key, value.clone());
        values.push(value);
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::expression::ReturnType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_evaluate_distinct_evaluates_each_key_once() {
        let a = Expression::variable("a", ReturnType::Long);
        let b = Expression::variable("b", ReturnType::Long);
        let batch = vec![&a, &b, &a];

        let mut calls = Vec::new();
        let values = evaluate_distinct(
            &batch,
            |expression| expression.content.as_str(),
            |expression| {
                calls.push(expression.content.clone());
                Ok(RuntimeValue::from(expression.content.len() as i64))
            },
        )
        .unwrap();

        assert_eq!(values.len(), 3);
        assert_eq!(values[0], values[2]);
        assert_eq!(calls, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_evaluate_distinct_stops_on_first_error() {
        let a = Expression::variable("a", ReturnType::Long);
        let result = evaluate_distinct(
            &[&a],
            |expression| expression.content.clone(),
            |_| Err(crate::EngineError::evaluation("boom")),
        );
        assert_eq!(result, Err(crate::EngineError::evaluation("boom")));
    }
}
