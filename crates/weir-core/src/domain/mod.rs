/// Archived snapshots of live records
pub mod archive;

/// Business data entities, bindings and store access
pub mod business_data;

/// Evaluation context and data containers
pub mod context;

/// Process data instances
pub mod data_instance;

/// Expression value objects
pub mod expression;

/// Flow node and process instance runtime records
pub mod flow_node_instance;

/// Process definition graph
pub mod process_definition;

/// Collaborator interfaces
pub mod repository;
