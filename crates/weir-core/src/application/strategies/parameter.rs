use std::sync::Arc;

use super::{ExpressionStrategy, ResolvedDependencies};
use crate::application::conversion::convert_text;
use crate::domain::context::ExpressionContext;
use crate::domain::expression::{Expression, ExpressionKind};
use crate::domain::repository::ParameterService;
use crate::types::RuntimeValue;
use crate::{EngineError, EvaluationError, Result};

/// Reads process parameters of the evaluated process definition
pub struct ParameterExpressionStrategy {
    parameters: Arc<dyn ParameterService>,
}

impl ParameterExpressionStrategy {
    /// Create the strategy
    pub fn new(parameters: Arc<dyn ParameterService>) -> Self {
        Self { parameters }
    }
}

impl ExpressionStrategy for ParameterExpressionStrategy {
    fn kind(&self) -> ExpressionKind {
        ExpressionKind::Parameter
    }

    fn evaluate(
        &self,
        expression: &Expression,
        context: &ExpressionContext,
        _resolved: &ResolvedDependencies,
    ) -> Result<RuntimeValue> {
        let process_definition_id = context
            .process_definition_id
            .ok_or_else(|| EngineError::DependencyMissing("processDefinitionId".to_string()))?;

        let parameter = self
            .parameters
            .get(process_definition_id, &expression.content)?
            .ok_or_else(|| {
                EngineError::Evaluation(
                    EvaluationError::new(format!(
                        "Parameter {} is not defined on process definition {}",
                        expression.content, process_definition_id
                    ))
                    .with_expression(&expression.name),
                )
            })?;

        match parameter.value {
            Some(text) => convert_text(&text, &expression.return_type)
                .map_err(|err| err.with_expression(&expression.name)),
            None => Ok(RuntimeValue::null()),
        }
    }

    fn must_cache_in_context(&self) -> bool {
        true
    }
}
