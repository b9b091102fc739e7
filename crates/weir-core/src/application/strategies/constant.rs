use super::{evaluate_distinct, ExpressionStrategy, ResolvedDependencies};
use crate::application::conversion::convert_text;
use crate::domain::context::ExpressionContext;
use crate::domain::expression::{Expression, ExpressionKind};
use crate::types::RuntimeValue;
use crate::Result;

/// Resolves literal expressions by converting their content
#[derive(Debug, Default)]
pub struct ConstantExpressionStrategy;

impl ConstantExpressionStrategy {
    /// Create the strategy
    pub fn new() -> Self {
        Self
    }
}

impl ExpressionStrategy for ConstantExpressionStrategy {
    fn kind(&self) -> ExpressionKind {
        ExpressionKind::Constant
    }

    fn evaluate(
        &self,
        expression: &Expression,
        _context: &ExpressionContext,
        _resolved: &ResolvedDependencies,
    ) -> Result<RuntimeValue> {
        convert_text(&expression.content, &expression.return_type)
            .map_err(|err| err.with_expression(&expression.name))
    }

    // "1" as Integer and "1" as String are different constants
    fn evaluate_all(
        &self,
        expressions: &[&Expression],
        context: &ExpressionContext,
        resolved: &ResolvedDependencies,
    ) -> Result<Vec<RuntimeValue>> {
        evaluate_distinct(
            expressions,
            |expression| (expression.content.as_str(), &expression.return_type),
            |expression| self.evaluate(expression, context, resolved),
        )
    }

    fn must_cache_in_context(&self) -> bool {
        false
    }
}
