use super::{ExpressionStrategy, ResolvedDependencies};
use crate::domain::context::ExpressionContext;
use crate::domain::expression::{Expression, ExpressionKind};
use crate::types::RuntimeValue;
use crate::{EngineError, Result};

/// Reads values the caller placed in the context
#[derive(Debug, Default)]
pub struct InputExpressionStrategy;

impl InputExpressionStrategy {
    /// Create the strategy
    pub fn new() -> Self {
        Self
    }
}

impl ExpressionStrategy for InputExpressionStrategy {
    fn kind(&self) -> ExpressionKind {
        ExpressionKind::Input
    }

    fn evaluate(
        &self,
        expression: &Expression,
        context: &ExpressionContext,
        _resolved: &ResolvedDependencies,
    ) -> Result<RuntimeValue> {
        context
            .get(&expression.content)
            .cloned()
            .ok_or_else(|| EngineError::DependencyMissing(expression.content.clone()))
    }

    fn must_cache_in_context(&self) -> bool {
        false
    }
}
