use std::str::FromStr;

use super::{ExpressionStrategy, ResolvedDependencies};
use crate::domain::context::{ContainerType, ExpressionContext};
use crate::domain::expression::{Expression, ExpressionKind};
use crate::types::{EngineExecutionContext, EngineHandle, RuntimeValue};
use crate::{EngineError, EvaluationError, Result};

/// Constants the engine provides to expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineConstant {
    /// Public API accessor
    ApiAccessor,
    /// API accessor for connectors
    ConnectorApiAccessor,
    /// Where the evaluation takes place
    EngineExecutionContext,
    /// Id of the evaluated process definition
    ProcessDefinitionId,
    /// Id of the process instance being evaluated
    ProcessInstanceId,
    /// Id of the flow node instance being evaluated
    ActivityInstanceId,
}

impl EngineConstant {
    /// Name used as expression content
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineConstant::ApiAccessor => "apiAccessor",
            EngineConstant::ConnectorApiAccessor => "connectorApiAccessor",
            EngineConstant::EngineExecutionContext => "engineExecutionContext",
            EngineConstant::ProcessDefinitionId => "processDefinitionId",
            EngineConstant::ProcessInstanceId => "processInstanceId",
            EngineConstant::ActivityInstanceId => "activityInstanceId",
        }
    }
}

impl FromStr for EngineConstant {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "apiAccessor" => Ok(EngineConstant::ApiAccessor),
            "connectorApiAccessor" => Ok(EngineConstant::ConnectorApiAccessor),
            "engineExecutionContext" => Ok(EngineConstant::EngineExecutionContext),
            "processDefinitionId" => Ok(EngineConstant::ProcessDefinitionId),
            "processInstanceId" => Ok(EngineConstant::ProcessInstanceId),
            "activityInstanceId" => Ok(EngineConstant::ActivityInstanceId),
            other => Err(EngineError::evaluation(format!("Unknown engine constant {}", other))),
        }
    }
}

/// Resolves engine constants from the evaluation context
#[derive(Debug, Default)]
pub struct EngineConstantExpressionStrategy;

impl EngineConstantExpressionStrategy {
    /// Create the strategy
    pub fn new() -> Self {
        Self
    }
}

fn container_id(context: &ExpressionContext, container_type: ContainerType) -> Option<i64> {
    context
        .container()
        .filter(|container| container.container_type == container_type)
        .map(|container| container.id)
}

fn process_instance_id(context: &ExpressionContext) -> Option<i64> {
    container_id(context, ContainerType::ProcessInstance).or_else(|| {
        context
            .get(EngineConstant::ProcessInstanceId.as_str())
            .and_then(RuntimeValue::as_i64)
    })
}

impl ExpressionStrategy for EngineConstantExpressionStrategy {
    fn kind(&self) -> ExpressionKind {
        ExpressionKind::EngineConstant
    }

    fn evaluate(
        &self,
        expression: &Expression,
        context: &ExpressionContext,
        _resolved: &ResolvedDependencies,
    ) -> Result<RuntimeValue> {
        let constant = expression.content.parse::<EngineConstant>().map_err(|_| {
            EngineError::Evaluation(
                EvaluationError::new(format!("Unknown engine constant {}", expression.content))
                    .with_expression(&expression.name),
            )
        })?;
        let missing = || EngineError::DependencyMissing(constant.as_str().to_string());

        match constant {
            EngineConstant::ApiAccessor => Ok(RuntimeValue::Handle(EngineHandle::ApiAccessor)),
            EngineConstant::ConnectorApiAccessor => {
                Ok(RuntimeValue::Handle(EngineHandle::ConnectorApiAccessor))
            }
            EngineConstant::EngineExecutionContext => Ok(RuntimeValue::Handle(
                EngineHandle::ExecutionContext(EngineExecutionContext {
                    process_definition_id: context.process_definition_id,
                    process_instance_id: process_instance_id(context),
                    activity_instance_id: container_id(context, ContainerType::FlowNode),
                }),
            )),
            EngineConstant::ProcessDefinitionId => context
                .process_definition_id
                .map(RuntimeValue::from)
                .ok_or_else(missing),
            EngineConstant::ProcessInstanceId => process_instance_id(context)
                .map(RuntimeValue::from)
                .ok_or_else(missing),
            EngineConstant::ActivityInstanceId => container_id(context, ContainerType::FlowNode)
                .map(RuntimeValue::from)
                .ok_or_else(missing),
        }
    }

    fn must_cache_in_context(&self) -> bool {
        false
    }
}
