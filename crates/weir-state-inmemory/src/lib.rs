//! In-memory collaborator services for the Weir engine
//!
//! This crate provides in-memory implementations of the read services
//! defined in the weir-core crate. It is primarily useful for development,
//! testing, and embedding the engine where no database is involved.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use tracing::debug;

pub mod business_data;
pub use business_data::{EntityPredicate, InMemoryBusinessDataRepository, InMemoryRefBusinessDataService};

pub mod parameters;
pub use parameters::InMemoryParameterService;

pub mod queries;

pub mod store;
pub use store::{InMemoryArchiveStore, InMemoryRecordStore, QueryFilter, Record};

use weir_core::application::strategies::{
    BusinessDataQueryExpressionStrategy, BusinessDataReferenceExpressionStrategy,
    BusinessObjectDaoExpressionStrategy, ConstantExpressionStrategy, DaoRegistry,
    EngineConstantExpressionStrategy, InputExpressionStrategy, ParameterExpressionStrategy,
    VariableExpressionStrategy,
};
use weir_core::domain::data_instance::DataInstance;
use weir_core::domain::flow_node_instance::{FlowNodeInstance, ProcessInstance};
use weir_core::domain::repository::ParentContainerResolver;
use weir_core::{
    DataInstanceService, EngineConfig, ExpressionConditionEvaluator, ExpressionService,
    ParentContainerResolverImpl, TransitionService,
};

/// Provider for in-memory stores and the services built on them
pub struct InMemoryStateStoreProvider {
    data_instances: Arc<InMemoryRecordStore<DataInstance>>,
    archived_data_instances: Arc<InMemoryArchiveStore<DataInstance>>,
    flow_nodes: Arc<InMemoryRecordStore<FlowNodeInstance>>,
    archived_flow_nodes: Arc<InMemoryArchiveStore<FlowNodeInstance>>,
    process_instances: Arc<InMemoryRecordStore<ProcessInstance>>,
    archived_process_instances: Arc<InMemoryArchiveStore<ProcessInstance>>,
    business_data: Arc<InMemoryBusinessDataRepository>,
    references: Arc<InMemoryRefBusinessDataService>,
    parameters: Arc<InMemoryParameterService>,
}

impl InMemoryStateStoreProvider {
    /// Create empty stores with the engine's named queries registered
    pub fn new() -> Self {
        let data_instances = Arc::new(InMemoryRecordStore::new());
        queries::register_data_instance_queries(&data_instances);

        let archived_data_instances = Arc::new(InMemoryArchiveStore::new());
        queries::register_archived_data_instance_queries(&archived_data_instances);

        let archived_flow_nodes = Arc::new(InMemoryArchiveStore::new());
        queries::register_archived_flow_node_queries(&archived_flow_nodes);

        let archived_process_instances = Arc::new(InMemoryArchiveStore::new());
        queries::register_archived_process_instance_queries(&archived_process_instances);

        Self {
            data_instances,
            archived_data_instances,
            flow_nodes: Arc::new(InMemoryRecordStore::new()),
            archived_flow_nodes,
            process_instances: Arc::new(InMemoryRecordStore::new()),
            archived_process_instances,
            business_data: Arc::new(InMemoryBusinessDataRepository::new()),
            references: Arc::new(InMemoryRefBusinessDataService::new()),
            parameters: Arc::new(InMemoryParameterService::new()),
        }
    }

    /// Live data instances
    pub fn data_instances(&self) -> &Arc<InMemoryRecordStore<DataInstance>> {
        &self.data_instances
    }

    /// Archived data instances
    pub fn archived_data_instances(&self) -> &Arc<InMemoryArchiveStore<DataInstance>> {
        &self.archived_data_instances
    }

    /// Live flow node instances
    pub fn flow_nodes(&self) -> &Arc<InMemoryRecordStore<FlowNodeInstance>> {
        &self.flow_nodes
    }

    /// Archived flow node instances
    pub fn archived_flow_nodes(&self) -> &Arc<InMemoryArchiveStore<FlowNodeInstance>> {
        &self.archived_flow_nodes
    }

    /// Live process instances
    pub fn process_instances(&self) -> &Arc<InMemoryRecordStore<ProcessInstance>> {
        &self.process_instances
    }

    /// Archived process instances
    pub fn archived_process_instances(&self) -> &Arc<InMemoryArchiveStore<ProcessInstance>> {
        &self.archived_process_instances
    }

    /// Business data entities
    pub fn business_data(&self) -> &Arc<InMemoryBusinessDataRepository> {
        &self.business_data
    }

    /// Business data bindings
    pub fn references(&self) -> &Arc<InMemoryRefBusinessDataService> {
        &self.references
    }

    /// Process parameters
    pub fn parameters(&self) -> &Arc<InMemoryParameterService> {
        &self.parameters
    }

    /// Hierarchy resolver over live records only
    pub fn live_resolver(&self) -> Arc<dyn ParentContainerResolver> {
        Arc::new(ParentContainerResolverImpl::live(
            self.flow_nodes.clone(),
            self.process_instances.clone(),
        ))
    }

    /// Hierarchy resolver falling back to archived records
    pub fn archived_resolver(&self) -> Arc<dyn ParentContainerResolver> {
        Arc::new(ParentContainerResolverImpl::archived(
            self.flow_nodes.clone(),
            self.process_instances.clone(),
            self.archived_flow_nodes.clone(),
            self.archived_process_instances.clone(),
        ))
    }

    /// Data lookups over the live and archived data stores
    pub fn data_instance_service(&self, config: &EngineConfig) -> DataInstanceService {
        DataInstanceService::new(self.data_instances.clone(), self.archived_data_instances.clone())
            .with_max_results(config.max_data_results)
    }

    /// Expression service with every standard strategy registered
    pub fn create_expression_service(&self, config: &EngineConfig, daos: DaoRegistry) -> ExpressionService {
        debug!("Creating expression service over in-memory stores");
        let data_instances = Arc::new(self.data_instance_service(config));

        ExpressionService::new()
            .with_strategy(Arc::new(ConstantExpressionStrategy::new()))
            .with_strategy(Arc::new(InputExpressionStrategy::new()))
            .with_strategy(Arc::new(EngineConstantExpressionStrategy::new()))
            .with_strategy(Arc::new(VariableExpressionStrategy::new(
                data_instances,
                self.live_resolver(),
                self.archived_resolver(),
            )))
            .with_strategy(Arc::new(ParameterExpressionStrategy::new(self.parameters.clone())))
            .with_strategy(Arc::new(BusinessDataReferenceExpressionStrategy::new(
                self.references.clone(),
                self.business_data.clone(),
                self.flow_nodes.clone(),
            )))
            .with_strategy(Arc::new(BusinessDataQueryExpressionStrategy::new(
                self.business_data.clone(),
                config.business_data_max_results,
            )))
            .with_strategy(Arc::new(BusinessObjectDaoExpressionStrategy::new(
                Arc::new(daos),
                self.business_data.clone(),
            )))
    }

    /// Transition service whose guards run on `expressions`
    pub fn create_transition_service(&self, expressions: Arc<ExpressionService>) -> TransitionService {
        TransitionService::new(Arc::new(ExpressionConditionEvaluator::new(expressions)))
    }
}

impl Default for InMemoryStateStoreProvider {
    fn default() -> Self {
        Self::new()
    }
}
