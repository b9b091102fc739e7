//!
//! Weir Core - transition decisions and expression resolution
//!
//! This crate decides which outgoing transitions fire when a flow node of a
//! business process completes, and resolves the expressions those decisions
//! (and the rest of an engine) depend on: process data scoped by container
//! hierarchy, business data, parameters and engine constants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - process model, runtime records and collaborator interfaces
pub mod domain;

/// Application services - evaluation and decision logic
pub mod application;

/// Runtime values
pub mod types;

/// Error types
pub mod error;

/// Engine configuration
pub mod config;

pub use config::EngineConfig;
pub use error::{BusinessDataError, EngineError, EvaluationError, ExecutionError, Result};
pub use types::{DaoHandle, EngineExecutionContext, EngineHandle, RuntimeValue};

pub use application::condition::{ConditionEvaluator, ExpressionConditionEvaluator};
pub use application::container_resolver::ParentContainerResolverImpl;
pub use application::data_instance_service::DataInstanceService;
pub use application::default_transition::DefaultTransitionResolver;
pub use application::expression_service::ExpressionService;
pub use application::gateway::{
    ExclusiveTransitionEvaluator, ImplicitTransitionEvaluator, InclusiveTransitionEvaluator,
    ParallelTransitionEvaluator, TransitionEvaluator, TransitionService,
};
pub use application::strategies::ExpressionStrategy;

pub use domain::context::{ContainerType, DataContainer, ExpressionContext};
pub use domain::expression::{Expression, ExpressionKind, ReturnType};
pub use domain::process_definition::{
    FlowNodeDefinition, FlowNodeTransitions, FlowNodeType, GatewayType, ProcessDefinition,
    TransitionDefinition,
};
