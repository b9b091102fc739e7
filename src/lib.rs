//! # Weir
//!
//! Transition decisions and expression resolution for business processes.
//!
//! Weir decides which outgoing transitions of a completed flow node fire
//! (parallel, inclusive, exclusive and implicit routing, with default
//! transition fallback) and resolves the expressions guarding them: process
//! data looked up through the container hierarchy, business data, process
//! parameters and engine constants.
//!
//! This crate re-exports [`weir_core`], which holds the engine and the
//! collaborator traits, and [`weir_state_inmemory`], which provides in-memory
//! collaborators and wires complete services on top of them.
//!
//! ```no_run
//! use std::sync::Arc;
//! use weir::inmemory::InMemoryStateStoreProvider;
//! use weir::strategies::DaoRegistry;
//! use weir::{DataContainer, EngineConfig, Expression, ExpressionContext, ReturnType};
//!
//! let config = EngineConfig::from_env();
//! let provider = InMemoryStateStoreProvider::new();
//! let expressions = provider.create_expression_service(&config, DaoRegistry::new(&config));
//!
//! let mut context = ExpressionContext::for_container(DataContainer::flow_node(10));
//! let approved = expressions.evaluate(&Expression::variable("approved", ReturnType::Boolean), &mut context);
//!
//! let transitions = provider.create_transition_service(Arc::new(expressions));
//! # let _ = (approved, transitions);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub use weir_core::*;

/// Expression strategies shipped with the engine
pub use weir_core::application::strategies;

/// In-memory collaborators
pub use weir_state_inmemory as inmemory;
