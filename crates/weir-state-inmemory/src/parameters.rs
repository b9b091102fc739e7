//! Process parameters

use std::collections::HashMap;

use parking_lot::RwLock;

use weir_core::domain::repository::{Parameter, ParameterService};
use weir_core::{EngineError, Result};

/// Process parameters keyed by process definition
#[derive(Debug, Default)]
pub struct InMemoryParameterService {
    parameters: RwLock<HashMap<i64, HashMap<String, Parameter>>>,
}

impl InMemoryParameterService {
    /// Create a service without process definitions
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a process definition known, even without parameters
    pub fn deploy(&self, process_definition_id: i64) {
        self.parameters
            .write()
            .entry(process_definition_id)
            .or_default();
    }

    /// Put or replace a parameter of a process definition
    pub fn set(&self, process_definition_id: i64, parameter: Parameter) {
        self.parameters
            .write()
            .entry(process_definition_id)
            .or_default()
            .insert(parameter.name.clone(), parameter);
    }
}

impl ParameterService for InMemoryParameterService {
    fn get(&self, process_definition_id: i64, name: &str) -> Result<Option<Parameter>> {
        let parameters = self.parameters.read();
        let definition = parameters.get(&process_definition_id).ok_or_else(|| {
            EngineError::NotFound(format!("Process definition {}", process_definition_id))
        })?;
        Ok(definition.get(name).cloned())
    }
}
