use std::sync::Arc;

use tracing::trace;

use super::expression_service::ExpressionService;
use crate::domain::context::ExpressionContext;
use crate::domain::process_definition::TransitionDefinition;
use crate::types::RuntimeValue;
use crate::{EngineError, EvaluationError, Result};

/// Evaluates transition guards
pub trait ConditionEvaluator: Send + Sync {
    /// Evaluate the guard of `transition`
    ///
    /// Returns `None` when the transition has no guard or the guard
    /// evaluated to null.
    fn evaluate(&self, transition: &TransitionDefinition, context: &mut ExpressionContext) -> Result<Option<bool>>;
}

/// Guard evaluation through the expression service
pub struct ExpressionConditionEvaluator {
    expressions: Arc<ExpressionService>,
}

impl ExpressionConditionEvaluator {
    /// Create an evaluator
    pub fn new(expressions: Arc<ExpressionService>) -> Self {
        Self { expressions }
    }
}

impl ConditionEvaluator for ExpressionConditionEvaluator {
    fn evaluate(&self, transition: &TransitionDefinition, context: &mut ExpressionContext) -> Result<Option<bool>> {
        let Some(condition) = &transition.condition else {
            return Ok(None);
        };

        if !condition.return_type.is_boolean() {
            return Err(EngineError::Evaluation(
                EvaluationError::new(format!(
                    "Condition of transition {} must return a Boolean but is declared as {}",
                    transition.name, condition.return_type
                ))
                .with_expression(&condition.name),
            ));
        }

        let value = self.expressions.evaluate(condition, context)?;
        trace!("Condition of transition {} evaluated to {:?}", transition.name, value);

        match value {
            RuntimeValue::Data(serde_json::Value::Bool(fired)) => Ok(Some(fired)),
            RuntimeValue::Data(serde_json::Value::Null) => Ok(None),
            other => Err(EngineError::Evaluation(
                EvaluationError::new(format!(
                    "Condition of transition {} evaluated to a {} instead of a Boolean",
                    transition.name,
                    other.type_name()
                ))
                .with_expression(&condition.name),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::strategies::{ConstantExpressionStrategy, InputExpressionStrategy};
    use crate::domain::expression::{Expression, ReturnType};
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    fn evaluator() -> ExpressionConditionEvaluator {
        let expressions = ExpressionService::new()
            .with_strategy(Arc::new(ConstantExpressionStrategy::new()))
            .with_strategy(Arc::new(InputExpressionStrategy::new()));
        ExpressionConditionEvaluator::new(Arc::new(expressions))
    }

    fn guarded(condition: Expression) -> TransitionDefinition {
        TransitionDefinition::new("t1", "gateway", "task")
            .with_name("to task")
            .with_condition(condition)
    }

    #[test]
    fn test_unguarded_transition() {
        let transition = TransitionDefinition::new("t1", "gateway", "task");
        assert_eq!(evaluator().evaluate(&transition, &mut ExpressionContext::new()), Ok(None));
    }

    #[test]
    fn test_boolean_guard() {
        let transition = guarded(Expression::constant("true", ReturnType::Boolean));
        assert_eq!(evaluator().evaluate(&transition, &mut ExpressionContext::new()), Ok(Some(true)));
    }

    #[test]
    fn test_non_boolean_declared_type() {
        let transition = guarded(Expression::constant("1", ReturnType::Integer));

        let err = evaluator()
            .evaluate(&transition, &mut ExpressionContext::new())
            .unwrap_err();
        assert_matches!(err, EngineError::Evaluation(inner) => {
            assert!(inner.message.contains("to task"));
            assert!(inner.message.contains("Integer"));
        });
    }

    #[test]
    fn test_null_guard_value() {
        let transition = guarded(Expression::input("approved", ReturnType::Boolean));
        let mut context = ExpressionContext::new().with_value("approved", serde_json::Value::Null);

        assert_eq!(evaluator().evaluate(&transition, &mut context), Ok(None));
    }

    #[test]
    fn test_non_boolean_value() {
        let transition = guarded(Expression::input("approved", ReturnType::Boolean));
        let mut context = ExpressionContext::new().with_value("approved", "yes");

        assert_matches!(
            evaluator().evaluate(&transition, &mut context),
            Err(EngineError::Evaluation(inner)) if inner.message.contains("string")
        );
    }
}
