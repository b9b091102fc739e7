use std::fmt;
use thiserror::Error;

/// Diagnostic context of a failed expression evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationError {
    /// What went wrong
    pub message: String,

    /// Name of the expression being evaluated, when known
    pub expression_name: Option<String>,

    /// Owning process instance, when known
    pub process_instance_id: Option<i64>,
}

impl EvaluationError {
    /// Create an evaluation error with only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            expression_name: None,
            process_instance_id: None,
        }
    }

    /// Attach the name of the expression that failed
    pub fn with_expression(mut self, name: impl Into<String>) -> Self {
        self.expression_name = Some(name.into());
        self
    }

    /// Attach the owning process instance
    pub fn with_process_instance(mut self, process_instance_id: i64) -> Self {
        self.process_instance_id = Some(process_instance_id);
        self
    }
}

impl fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(name) = &self.expression_name {
            write!(f, " [expression: {}]", name)?;
        }
        if let Some(id) = self.process_instance_id {
            write!(f, " [process instance: {}]", id)?;
        }
        Ok(())
    }
}

/// Diagnostic context of a structural defect found while executing a process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionError {
    /// What went wrong
    pub message: String,

    /// Name of the process definition
    pub process_name: Option<String>,

    /// Version of the process definition
    pub process_version: Option<String>,

    /// Process instance being executed
    pub process_instance_id: Option<i64>,

    /// Flow node the defect was found on
    pub flow_node_name: Option<String>,
}

impl ExecutionError {
    /// Create an execution error with only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            process_name: None,
            process_version: None,
            process_instance_id: None,
            flow_node_name: None,
        }
    }

    /// Attach process definition name and version
    pub fn with_process(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.process_name = Some(name.into());
        self.process_version = Some(version.into());
        self
    }

    /// Attach the process instance id
    pub fn with_process_instance(mut self, process_instance_id: i64) -> Self {
        self.process_instance_id = Some(process_instance_id);
        self
    }

    /// Attach the flow node name
    pub fn with_flow_node(mut self, name: impl Into<String>) -> Self {
        self.flow_node_name = Some(name.into());
        self
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(node) = &self.flow_node_name {
            write!(f, " [flow node: {}]", node)?;
        }
        if let (Some(name), Some(version)) = (&self.process_name, &self.process_version) {
            write!(f, " [process: {} {}]", name, version)?;
        }
        if let Some(id) = self.process_instance_id {
            write!(f, " [process instance: {}]", id)?;
        }
        Ok(())
    }
}

/// Core error type for the Weir engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A value the evaluation depends on is missing from the context
    #[error("Missing dependency: {0}")]
    DependencyMissing(String),

    /// Expression could not be evaluated
    #[error("Expression evaluation error: {0}")]
    Evaluation(EvaluationError),

    /// Process definition is structurally unable to proceed
    #[error("Execution error: {0}")]
    Execution(ExecutionError),

    /// Business object, process definition, parameter or record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Read failure of an external store
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl EngineError {
    /// Shorthand for an evaluation error carrying only a message
    pub fn evaluation(message: impl Into<String>) -> Self {
        EngineError::Evaluation(EvaluationError::new(message))
    }

    /// Shorthand for an execution error carrying only a message
    pub fn execution(message: impl Into<String>) -> Self {
        EngineError::Execution(ExecutionError::new(message))
    }

    /// Attach the owning process instance to evaluation and execution errors
    /// that do not carry one yet. Other kinds are returned unchanged.
    pub fn with_process_instance(self, process_instance_id: Option<i64>) -> Self {
        let Some(id) = process_instance_id else {
            return self;
        };
        match self {
            EngineError::Evaluation(err) if err.process_instance_id.is_none() => {
                EngineError::Evaluation(err.with_process_instance(id))
            }
            EngineError::Execution(err) if err.process_instance_id.is_none() => {
                EngineError::Execution(err.with_process_instance(id))
            }
            other => other,
        }
    }

    /// Attach the expression name to evaluation errors that do not carry one yet
    pub fn with_expression(self, name: &str) -> Self {
        match self {
            EngineError::Evaluation(err) if err.expression_name.is_none() => {
                EngineError::Evaluation(err.with_expression(name))
            }
            other => other,
        }
    }
}

/// Result alias used throughout the engine
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by a business data repository
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusinessDataError {
    /// A single-result query matched several rows
    #[error("Query {0} returned more than one result")]
    NonUniqueResult(String),

    /// The named query is not declared
    #[error("Unknown business data query: {0}")]
    UnknownQuery(String),

    /// The store itself failed
    #[error("Business data store failure: {0}")]
    Store(String),
}

impl From<BusinessDataError> for EngineError {
    fn from(err: BusinessDataError) -> Self {
        match err {
            BusinessDataError::Store(message) => EngineError::Persistence(message),
            other => EngineError::evaluation(other.to_string()),
        }
    }
}
