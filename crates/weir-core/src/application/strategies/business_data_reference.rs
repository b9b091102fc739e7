use std::sync::Arc;

use tracing::trace;

use super::{ExpressionStrategy, ResolvedDependencies};
use crate::domain::business_data::{BusinessDataRepository, RefBusinessDataInstance, RefBusinessDataService};
use crate::domain::context::{ContainerType, DataContainer, ExpressionContext};
use crate::domain::expression::{Expression, ExpressionKind};
use crate::domain::flow_node_instance::FlowNodeInstance;
use crate::domain::repository::ReadPersistenceService;
use crate::error::BusinessDataError;
use crate::types::RuntimeValue;
use crate::{EngineError, EvaluationError, Result};

/// Loads the business data bound to the evaluation container
///
/// A flow node sees its own bindings first, then those of its process
/// instance.
pub struct BusinessDataReferenceExpressionStrategy {
    references: Arc<dyn RefBusinessDataService>,
    repository: Arc<dyn BusinessDataRepository>,
    flow_nodes: Arc<dyn ReadPersistenceService<FlowNodeInstance>>,
}

impl BusinessDataReferenceExpressionStrategy {
    /// Create the strategy
    pub fn new(
        references: Arc<dyn RefBusinessDataService>,
        repository: Arc<dyn BusinessDataRepository>,
        flow_nodes: Arc<dyn ReadPersistenceService<FlowNodeInstance>>,
    ) -> Self {
        Self {
            references,
            repository,
            flow_nodes,
        }
    }

    /// Binding named `name` visible from `container`, with the owning
    /// process instance when it could be determined
    fn find_reference(
        &self,
        name: &str,
        container: DataContainer,
    ) -> Result<(Option<RefBusinessDataInstance>, Option<i64>)> {
        match container.container_type {
            ContainerType::ProcessInstance => {
                let reference = self
                    .references
                    .get_ref_business_data_instance(name, container.id)
                    .map_err(|err| read_failure(err, Some(container.id)))?;
                Ok((reference, Some(container.id)))
            }
            ContainerType::FlowNode => {
                let process_instance_id = self
                    .owning_process_instance(container.id)
                    .map_err(|err| read_failure(err, None))?;
                let local = self
                    .references
                    .get_flow_node_ref_business_data_instance(name, container.id)
                    .map_err(|err| read_failure(err, process_instance_id))?;
                if local.is_some() {
                    return Ok((local, process_instance_id));
                }
                let Some(process_instance_id) = process_instance_id else {
                    return Ok((None, None));
                };
                trace!(
                    "No local binding {} on flow node {}, falling back to process instance {}",
                    name,
                    container.id,
                    process_instance_id
                );
                let reference = self
                    .references
                    .get_ref_business_data_instance(name, process_instance_id)
                    .map_err(|err| read_failure(err, Some(process_instance_id)))?;
                Ok((reference, Some(process_instance_id)))
            }
        }
    }

    /// Process instance owning a flow node, `None` when the flow node record is gone
    fn owning_process_instance(&self, flow_node_instance_id: i64) -> Result<Option<i64>> {
        let flow_node = self.flow_nodes.select_by_id(flow_node_instance_id)?;
        Ok(flow_node.and_then(|flow_node| flow_node.parent_process_instance_id()))
    }

    fn load(&self, reference: &RefBusinessDataInstance) -> std::result::Result<RuntimeValue, BusinessDataError> {
        match reference {
            RefBusinessDataInstance::Simple { data_id: None, .. } => Ok(RuntimeValue::null()),
            RefBusinessDataInstance::Simple {
                data_class_name,
                data_id: Some(id),
                ..
            } => match self.repository.find_by_id(data_class_name, *id)? {
                Some(entity) => Ok(RuntimeValue::Entity(entity)),
                None => Err(BusinessDataError::Store(format!(
                    "{} with persistence id {} does not exist",
                    data_class_name, id
                ))),
            },
            RefBusinessDataInstance::Multiple {
                data_class_name,
                data_ids,
                ..
            } => Ok(RuntimeValue::Entities(
                self.repository.find_by_ids(data_class_name, data_ids)?,
            )),
        }
    }
}

fn read_failure(err: EngineError, process_instance_id: Option<i64>) -> EngineError {
    match err {
        EngineError::Persistence(message) => {
            let mut wrapped = EvaluationError::new(format!("Unable to read business data bindings: {}", message));
            if let Some(id) = process_instance_id {
                wrapped = wrapped.with_process_instance(id);
            }
            EngineError::Evaluation(wrapped)
        }
        other => other.with_process_instance(process_instance_id),
    }
}

impl ExpressionStrategy for BusinessDataReferenceExpressionStrategy {
    fn kind(&self) -> ExpressionKind {
        ExpressionKind::BusinessDataReference
    }

    fn evaluate(
        &self,
        expression: &Expression,
        context: &ExpressionContext,
        _resolved: &ResolvedDependencies,
    ) -> Result<RuntimeValue> {
        let container = context
            .container()
            .ok_or_else(|| EngineError::DependencyMissing("containerId".to_string()))?;
        let name = expression.content.as_str();

        let (reference, process_instance_id) = self
            .find_reference(name, container)
            .map_err(|err| err.with_expression(&expression.name))?;

        let Some(reference) = reference else {
            let mut err = EvaluationError::new(format!(
                "No business data named {} is bound to {}",
                name, container
            ))
            .with_expression(&expression.name);
            if let Some(id) = process_instance_id {
                err = err.with_process_instance(id);
            }
            return Err(EngineError::Evaluation(err));
        };

        self.load(&reference).map_err(|err| {
            let mut wrapped = EvaluationError::new(format!("Unable to load business data {}: {}", name, err))
                .with_expression(&expression.name);
            if let Some(id) = process_instance_id {
                wrapped = wrapped.with_process_instance(id);
            }
            EngineError::Evaluation(wrapped)
        })
    }

    fn must_cache_in_context(&self) -> bool {
        true
    }
}
