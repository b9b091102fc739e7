use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of the value an expression produces
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnType {
    /// `true` / `false`
    Boolean,
    /// Text
    String,
    /// 32-bit integer
    Integer,
    /// 64-bit integer, also the shape of scalar query results
    Long,
    /// Floating point number
    Double,
    /// List of values or entities
    List,
    /// A business data entity of the given class
    Entity(String),
}

impl ReturnType {
    /// Check if this is the boolean type
    #[inline]
    pub fn is_boolean(&self) -> bool {
        matches!(self, ReturnType::Boolean)
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnType::Boolean => write!(f, "Boolean"),
            ReturnType::String => write!(f, "String"),
            ReturnType::Integer => write!(f, "Integer"),
            ReturnType::Long => write!(f, "Long"),
            ReturnType::Double => write!(f, "Double"),
            ReturnType::List => write!(f, "List"),
            ReturnType::Entity(class) => write!(f, "{}", class),
        }
    }
}

/// Discriminator selecting the strategy that resolves an expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpressionKind {
    /// Literal value held in the content
    Constant,
    /// Value already supplied in the evaluation context
    Input,
    /// Process data resolved through the container hierarchy
    Variable,
    /// Business data bound to the current container
    BusinessDataReference,
    /// Named query against the business data store
    BusinessDataQuery,
    /// Business object accessor
    BusinessObjectDao,
    /// Process parameter
    Parameter,
    /// Engine-provided constant
    EngineConstant,
    /// Kind contributed by an extension strategy
    Custom(String),
}

impl fmt::Display for ExpressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionKind::Custom(name) => write!(f, "{}", name),
            other => write!(f, "{:?}", other),
        }
    }
}

/// An immutable expression reference embedded in a process definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Expression {
    /// Name used in diagnostics and as key of resolved dependencies
    pub name: String,

    /// Opaque reference resolved by the strategy (data name, query name, ...)
    pub content: String,

    /// Declared type of the produced value
    pub return_type: ReturnType,

    /// Strategy discriminator
    pub kind: ExpressionKind,

    /// Expressions that must be resolved before this one
    #[serde(default)]
    pub dependencies: Vec<Expression>,
}

impl Expression {
    /// Create an expression without dependencies
    pub fn new(
        name: impl Into<String>,
        content: impl Into<String>,
        return_type: ReturnType,
        kind: ExpressionKind,
    ) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            return_type,
            kind,
            dependencies: Vec::new(),
        }
    }

    /// Literal expression; the content doubles as its name
    pub fn constant(content: impl Into<String>, return_type: ReturnType) -> Self {
        let content = content.into();
        Self::new(content.clone(), content, return_type, ExpressionKind::Constant)
    }

    /// Expression reading the process data named `name`
    pub fn variable(name: impl Into<String>, return_type: ReturnType) -> Self {
        let name = name.into();
        Self::new(name.clone(), name, return_type, ExpressionKind::Variable)
    }

    /// Expression reading a value supplied in the context
    pub fn input(name: impl Into<String>, return_type: ReturnType) -> Self {
        let name = name.into();
        Self::new(name.clone(), name, return_type, ExpressionKind::Input)
    }

    /// Expression reading the process parameter named `name`
    pub fn parameter(name: impl Into<String>, return_type: ReturnType) -> Self {
        let name = name.into();
        Self::new(name.clone(), name, return_type, ExpressionKind::Parameter)
    }

    /// Rename; dependencies are looked up by name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a dependency
    pub fn with_dependency(mut self, dependency: Expression) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Replace the dependencies
    pub fn with_dependencies(mut self, dependencies: Vec<Expression>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Check if this expression has dependencies
    #[inline]
    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }
}
