/// Transition guard evaluation
pub mod condition;

/// Standard container hierarchy resolution
pub mod container_resolver;

/// Text to typed value conversion shared by strategies
pub mod conversion;

/// Process data lookup through container hierarchies
pub mod data_instance_service;

/// Default transition fallback
pub mod default_transition;

/// Expression dispatch
pub mod expression_service;

/// Gateway transition evaluation
pub mod gateway;

/// Expression strategies
pub mod strategies;
