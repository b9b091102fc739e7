use std::collections::HashMap;
use std::sync::Arc;

use super::{ExpressionStrategy, ResolvedDependencies};
use crate::application::data_instance_service::DataInstanceService;
use crate::domain::context::{ContainerType, DataContainer, ExpressionContext};
use crate::domain::expression::{Expression, ExpressionKind};
use crate::domain::repository::{ParentContainerResolver, QueryOptions};
use crate::types::RuntimeValue;
use crate::{EngineError, EvaluationError, Result};

/// Resolves process data visible from the evaluation container
///
/// When the context carries a `time`, data is read from the archive as it
/// was at that instant.
pub struct VariableExpressionStrategy {
    data_instances: Arc<DataInstanceService>,
    live_resolver: Arc<dyn ParentContainerResolver>,
    archived_resolver: Arc<dyn ParentContainerResolver>,
}

impl VariableExpressionStrategy {
    /// Create the strategy
    pub fn new(
        data_instances: Arc<DataInstanceService>,
        live_resolver: Arc<dyn ParentContainerResolver>,
        archived_resolver: Arc<dyn ParentContainerResolver>,
    ) -> Self {
        Self {
            data_instances,
            live_resolver,
            archived_resolver,
        }
    }

    fn values_by_name(
        &self,
        names: &[String],
        container: DataContainer,
        context: &ExpressionContext,
    ) -> Result<HashMap<String, serde_json::Value>> {
        // the requested names already bound the result
        let options = QueryOptions::all_results();
        let values = match context.time {
            Some(time) => self
                .data_instances
                .get_archived_data_instances(Some(names), container, self.archived_resolver.as_ref(), time, options)?
                .into_iter()
                .map(|archived| (archived.record.name, archived.record.value))
                .collect(),
            None => self
                .data_instances
                .get_data_instances(Some(names), container, self.live_resolver.as_ref(), options)?
                .into_iter()
                .map(|data| (data.name, data.value))
                .collect(),
        };
        Ok(values)
    }

    fn read_failure(err: EngineError, expression: &Expression, container: DataContainer) -> EngineError {
        match err {
            EngineError::Persistence(message) => {
                let mut wrapped = EvaluationError::new(format!(
                    "Unable to read data visible from {}: {}",
                    container, message
                ))
                .with_expression(&expression.name);
                if container.container_type == ContainerType::ProcessInstance {
                    wrapped = wrapped.with_process_instance(container.id);
                }
                EngineError::Evaluation(wrapped)
            }
            other => other.with_expression(&expression.name),
        }
    }
}

impl ExpressionStrategy for VariableExpressionStrategy {
    fn kind(&self) -> ExpressionKind {
        ExpressionKind::Variable
    }

    fn evaluate(
        &self,
        expression: &Expression,
        context: &ExpressionContext,
        resolved: &ResolvedDependencies,
    ) -> Result<RuntimeValue> {
        let mut values = self.evaluate_all(&[expression], context, resolved)?;
        values
            .pop()
            .ok_or_else(|| EngineError::evaluation("No value produced").with_expression(&expression.name))
    }

    // One hierarchy lookup for the whole batch
    fn evaluate_all(
        &self,
        expressions: &[&Expression],
        context: &ExpressionContext,
        _resolved: &ResolvedDependencies,
    ) -> Result<Vec<RuntimeValue>> {
        if expressions.is_empty() {
            return Ok(Vec::new());
        }
        let container = context
            .container()
            .ok_or_else(|| EngineError::DependencyMissing("containerId".to_string()))?;

        let mut names: Vec<String> = Vec::new();
        for expression in expressions {
            if !names.contains(&expression.content) {
                names.push(expression.content.clone());
            }
        }

        let values = self
            .values_by_name(&names, container, context)
            .map_err(|err| Self::read_failure(err, expressions[0], container))?;

        expressions
            .iter()
            .map(|expression| {
                values
                    .get(&expression.content)
                    .cloned()
                    .map(RuntimeValue::Data)
                    .ok_or_else(|| {
                        EngineError::Evaluation(
                            EvaluationError::new(format!(
                                "Data {} is not visible from {}",
                                expression.content, container
                            ))
                            .with_expression(&expression.name),
                        )
                    })
            })
            .collect()
    }

    fn must_cache_in_context(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::archive::Archived;
    use crate::domain::data_instance::DataInstance;
    use crate::domain::expression::ReturnType;
    use crate::domain::repository::{
        ReadArchiveService, ReadPersistenceService, SelectListDescriptor, SelectOneDescriptor,
    };
    use assert_matches::assert_matches;
    use chrono::Utc;
    use mockall::mock;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    mock! {
        Data {}
        impl ReadPersistenceService<DataInstance> for Data {
            fn select_list(&self, descriptor: &SelectListDescriptor) -> Result<Vec<DataInstance>>;
            fn select_one(&self, descriptor: &SelectOneDescriptor) -> Result<Option<DataInstance>>;
            fn select_by_id(&self, id: i64) -> Result<Option<DataInstance>>;
        }
    }

    mock! {
        ArchivedData {}
        impl ReadArchiveService<DataInstance> for ArchivedData {
            fn select_list(&self, descriptor: &SelectListDescriptor) -> Result<Vec<Archived<DataInstance>>>;
            fn select_one(&self, descriptor: &SelectOneDescriptor) -> Result<Option<Archived<DataInstance>>>;
            fn select_by_id(&self, id: i64) -> Result<Option<Archived<DataInstance>>>;
        }
    }

    mock! {
        Resolver {}
        impl ParentContainerResolver for Resolver {
            fn container_hierarchy(&self, container: DataContainer) -> Result<Vec<DataContainer>>;
        }
    }

    fn resolver() -> Arc<MockResolver> {
        let mut resolver = MockResolver::new();
        resolver
            .expect_container_hierarchy()
            .returning(|container| Ok(vec![container, DataContainer::process_instance(1)]));
        Arc::new(resolver)
    }

    fn strategy(data: MockData, archived: MockArchivedData) -> VariableExpressionStrategy {
        let service = DataInstanceService::new(Arc::new(data), Arc::new(archived));
        VariableExpressionStrategy::new(Arc::new(service), resolver(), resolver())
    }

    #[test]
    fn test_batch_uses_one_lookup() {
        let mut data = MockData::new();
        data.expect_select_list()
            .withf(|descriptor| descriptor.query_name == "getDataInstancesWithNamesOfContainers2")
            .times(1)
            .returning(|_| {
                Ok(vec![
                    DataInstance::new(1, "a", "java.lang.Long", json!(1), DataContainer::process_instance(1)),
                    DataInstance::new(2, "b", "java.lang.Long", json!(2), DataContainer::flow_node(4)),
                ])
            });

        let strategy = strategy(data, MockArchivedData::new());
        let a = Expression::variable("a", ReturnType::Long);
        let b = Expression::variable("b", ReturnType::Long);
        let context = ExpressionContext::for_container(DataContainer::flow_node(4));

        let values = strategy
            .evaluate_all(&[&a, &b, &a], &context, &ResolvedDependencies::new())
            .unwrap();

        assert_eq!(
            values,
            vec![RuntimeValue::from(1_i64), RuntimeValue::from(2_i64), RuntimeValue::from(1_i64)]
        );
    }

    #[test]
    fn test_time_reads_archive() {
        let mut archived = MockArchivedData::new();
        archived
            .expect_select_list()
            .withf(|descriptor| descriptor.query_name == "getSADataInstancesWithNamesOfContainers2")
            .times(1)
            .returning(|_| {
                Ok(vec![Archived::new(
                    9,
                    1,
                    Utc::now(),
                    DataInstance::new(1, "a", "java.lang.String", json!("then"), DataContainer::process_instance(1)),
                )])
            });

        let strategy = strategy(MockData::new(), archived);
        let context = ExpressionContext::for_container(DataContainer::flow_node(4)).at_time(Utc::now());

        let value = strategy
            .evaluate(&Expression::variable("a", ReturnType::String), &context, &ResolvedDependencies::new())
            .unwrap();
        assert_eq!(value, RuntimeValue::from("then"));
    }

    #[test]
    fn test_missing_data() {
        let mut data = MockData::new();
        data.expect_select_list().returning(|_| Ok(Vec::new()));

        let strategy = strategy(data, MockArchivedData::new());
        let context = ExpressionContext::for_container(DataContainer::flow_node(4));

        let err = strategy
            .evaluate(&Expression::variable("ghost", ReturnType::String), &context, &ResolvedDependencies::new())
            .unwrap_err();
        assert_matches!(err, EngineError::Evaluation(inner) if inner.expression_name.as_deref() == Some("ghost"));
    }

    #[test]
    fn test_name_lookup_ignores_result_cap() {
        let mut data = MockData::new();
        data.expect_select_list().returning(|_| {
            Ok(vec![
                DataInstance::new(1, "amount", "java.lang.Long", json!(50), DataContainer::process_instance(1)),
                DataInstance::new(2, "approved", "java.lang.Boolean", json!(true), DataContainer::process_instance(1)),
            ])
        });
        let service = DataInstanceService::new(Arc::new(data), Arc::new(MockArchivedData::new()))
            .with_max_results(Some(1));
        let strategy = VariableExpressionStrategy::new(Arc::new(service), resolver(), resolver());

        let amount = Expression::variable("amount", ReturnType::Long);
        let approved = Expression::variable("approved", ReturnType::Boolean);
        let context = ExpressionContext::for_container(DataContainer::flow_node(4));

        let values = strategy
            .evaluate_all(&[&amount, &approved], &context, &ResolvedDependencies::new())
            .unwrap();
        assert_eq!(values, vec![RuntimeValue::from(50_i64), RuntimeValue::from(true)]);
    }

    #[test]
    fn test_read_failure_is_wrapped() {
        let mut data = MockData::new();
        data.expect_select_list()
            .returning(|_| Err(EngineError::Persistence("db down".to_string())));

        let strategy = strategy(data, MockArchivedData::new());
        let context = ExpressionContext::for_container(DataContainer::process_instance(1));

        let err = strategy
            .evaluate(&Expression::variable("amount", ReturnType::Long), &context, &ResolvedDependencies::new())
            .unwrap_err();
        assert_matches!(err, EngineError::Evaluation(inner) => {
            assert_eq!(inner.expression_name.as_deref(), Some("amount"));
            assert_eq!(inner.process_instance_id, Some(1));
            assert!(inner.message.contains("db down"));
        });
    }

    #[test]
    fn test_requires_container() {
        let strategy = strategy(MockData::new(), MockArchivedData::new());
        let result = strategy.evaluate(
            &Expression::variable("a", ReturnType::String),
            &ExpressionContext::new(),
            &ResolvedDependencies::new(),
        );
        assert_matches!(result, Err(EngineError::DependencyMissing(_)));
    }
}
