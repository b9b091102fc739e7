use std::sync::Arc;

use tracing::debug;

use super::{evaluate_distinct, ExpressionStrategy, ResolvedDependencies};
use crate::domain::business_data::{
    BusinessDataRepository, BusinessQueryParameters, QueryResult, QueryResultType,
};
use crate::domain::context::ExpressionContext;
use crate::domain::expression::{Expression, ExpressionKind, ReturnType};
use crate::error::BusinessDataError;
use crate::types::RuntimeValue;
use crate::{EngineError, EvaluationError, Result};

/// Dependency holding the first row of a list query
pub const START_INDEX_PARAMETER: &str = "startIndex";

/// Dependency holding the page size of a list query
pub const MAX_RESULTS_PARAMETER: &str = "maxResults";

/// Runs named business data queries
///
/// The content is the query name, conventionally `Entity.query`. The
/// declared return type selects the shape: `Long` or `Integer` for a
/// scalar, an entity class for a single entity and `List` for a page of
/// entities of the class named by the query prefix.
pub struct BusinessDataQueryExpressionStrategy {
    repository: Arc<dyn BusinessDataRepository>,
    default_max_results: usize,
}

impl BusinessDataQueryExpressionStrategy {
    /// Create the strategy; list queries without `maxResults` return at most
    /// `default_max_results` rows
    pub fn new(repository: Arc<dyn BusinessDataRepository>, default_max_results: usize) -> Self {
        Self {
            repository,
            default_max_results,
        }
    }

    fn parameters(&self, expression: &Expression, resolved: &ResolvedDependencies) -> Result<BusinessQueryParameters> {
        let mut parameters = BusinessQueryParameters::new();
        for dependency in &expression.dependencies {
            let value = resolved
                .get(&dependency.name)
                .ok_or_else(|| EngineError::DependencyMissing(dependency.name.clone()))?;
            parameters.insert(dependency.name.clone(), value.clone());
        }
        Ok(parameters)
    }

    fn page(&self, expression: &Expression, parameters: &mut BusinessQueryParameters) -> Result<(usize, usize)> {
        let start_index = match parameters.remove(START_INDEX_PARAMETER).filter(|v| !v.is_null()) {
            Some(value) => index_value(&value, START_INDEX_PARAMETER, expression)?,
            None => 0,
        };
        let max_results = match parameters.remove(MAX_RESULTS_PARAMETER).filter(|v| !v.is_null()) {
            Some(value) => index_value(&value, MAX_RESULTS_PARAMETER, expression)?,
            None => self.default_max_results,
        };
        Ok((start_index, max_results))
    }

    fn run(&self, expression: &Expression, resolved: &ResolvedDependencies) -> Result<RuntimeValue> {
        let query_name = expression.content.as_str();
        let mut parameters = self.parameters(expression, resolved)?;

        match &expression.return_type {
            ReturnType::List => {
                let (start_index, max_results) = self.page(expression, &mut parameters)?;
                let result_class = query_entity(query_name).ok_or_else(|| {
                    query_error(
                        expression,
                        format!("Query {} does not name the entity it returns", query_name),
                    )
                })?;
                debug!(
                    "Running list query {} from {} (max {})",
                    query_name, start_index, max_results
                );
                let entities = self
                    .repository
                    .find_list_by_named_query(query_name, result_class, &parameters, start_index, max_results)
                    .map_err(|err| store_error(expression, err))?;
                Ok(RuntimeValue::Entities(entities))
            }
            ReturnType::Long | ReturnType::Integer => {
                match self
                    .repository
                    .find_by_named_query(query_name, &QueryResultType::Scalar, &parameters)
                    .map_err(|err| store_error(expression, err))?
                {
                    Some(QueryResult::Scalar(value)) => Ok(RuntimeValue::from(value)),
                    None => Ok(RuntimeValue::null()),
                    Some(QueryResult::Entity(_)) => Err(query_error(
                        expression,
                        format!("Query {} returned an entity instead of a number", query_name),
                    )),
                }
            }
            ReturnType::Entity(class_name) => {
                let result_type = QueryResultType::Entity(class_name.clone());
                match self
                    .repository
                    .find_by_named_query(query_name, &result_type, &parameters)
                    .map_err(|err| store_error(expression, err))?
                {
                    Some(QueryResult::Entity(entity)) => Ok(RuntimeValue::Entity(entity)),
                    None => Ok(RuntimeValue::null()),
                    Some(QueryResult::Scalar(_)) => Err(query_error(
                        expression,
                        format!("Query {} returned a number instead of {}", query_name, class_name),
                    )),
                }
            }
            other => Err(query_error(
                expression,
                format!("Query {} cannot produce a value of type {}", query_name, other),
            )),
        }
    }
}

impl ExpressionStrategy for BusinessDataQueryExpressionStrategy {
    fn kind(&self) -> ExpressionKind {
        ExpressionKind::BusinessDataQuery
    }

    fn evaluate(
        &self,
        expression: &Expression,
        _context: &ExpressionContext,
        resolved: &ResolvedDependencies,
    ) -> Result<RuntimeValue> {
        self.run(expression, resolved)
    }

    // Same query with other arguments is another query
    fn evaluate_all(
        &self,
        expressions: &[&Expression],
        _context: &ExpressionContext,
        resolved: &ResolvedDependencies,
    ) -> Result<Vec<RuntimeValue>> {
        evaluate_distinct(
            expressions,
            |expression| {
                (
                    expression.content.as_str(),
                    &expression.return_type,
                    &expression.dependencies,
                )
            },
            |expression| self.run(expression, resolved),
        )
    }

    fn must_cache_in_context(&self) -> bool {
        false
    }
}

/// Entity prefix of a query name, `Invoice` for `Invoice.findByNumber`
fn query_entity(query_name: &str) -> Option<&str> {
    query_name
        .split_once('.')
        .map(|(entity, _)| entity)
        .filter(|entity| !entity.is_empty())
}

fn index_value(value: &RuntimeValue, name: &str, expression: &Expression) -> Result<usize> {
    value
        .as_i64()
        .and_then(|index| usize::try_from(index).ok())
        .ok_or_else(|| {
            query_error(
                expression,
                format!("{} must be a non-negative integer, got {}", name, value.type_name()),
            )
        })
}

fn query_error(expression: &Expression, message: String) -> EngineError {
    EngineError::Evaluation(EvaluationError::new(message).with_expression(&expression.name))
}

fn store_error(expression: &Expression, err: BusinessDataError) -> EngineError {
    match err {
        BusinessDataError::NonUniqueResult(_) | BusinessDataError::UnknownQuery(_) => {
            query_error(expression, err.to_string())
        }
        BusinessDataError::Store(_) => query_error(
            expression,
            format!("Unable to run query {}: {}", expression.content, err),
        ),
    }
}
