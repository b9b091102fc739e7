use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{ExpressionStrategy, ResolvedDependencies};
use crate::config::EngineConfig;
use crate::domain::business_data::{BusinessDataRepository, BusinessObjectDao, Entity};
use crate::domain::context::ExpressionContext;
use crate::domain::expression::{Expression, ExpressionKind};
use crate::error::BusinessDataError;
use crate::types::{DaoHandle, RuntimeValue};
use crate::{EngineError, Result};

/// Builds a business object implementation bound to a repository
pub type DaoFactory = Arc<dyn Fn(Arc<dyn BusinessDataRepository>) -> Arc<dyn BusinessObjectDao> + Send + Sync>;

/// Business object implementations known to the engine, by implementation name
pub struct DaoRegistry {
    server_package: String,
    implementation_suffix: String,
    factories: HashMap<String, DaoFactory>,
}

impl DaoRegistry {
    /// Create an empty registry using the naming convention of `config`
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            server_package: config.dao_server_package.clone(),
            implementation_suffix: config.dao_implementation_suffix.clone(),
            factories: HashMap::new(),
        }
    }

    /// Implementation name of a business object interface
    ///
    /// `com.acme.model.InvoiceDAO` is implemented by
    /// `com.acme.model.server.InvoiceDAOImpl`.
    pub fn implementation_name(&self, interface_name: &str) -> String {
        match interface_name.rsplit_once('.') {
            Some((package, simple_name)) => format!(
                "{}.{}.{}{}",
                package, self.server_package, simple_name, self.implementation_suffix
            ),
            None => format!(
                "{}.{}{}",
                self.server_package, interface_name, self.implementation_suffix
            ),
        }
    }

    /// Register an implementation under its implementation name
    pub fn register(&mut self, implementation_name: impl Into<String>, factory: DaoFactory) {
        let implementation_name = implementation_name.into();
        debug!("Registering business object implementation {}", implementation_name);
        self.factories.insert(implementation_name, factory);
    }

    /// Register a [`RepositoryDao`] implementing `interface_name` for `entity_class`
    pub fn register_entity(&mut self, interface_name: &str, entity_class: impl Into<String>) {
        let implementation_name = self.implementation_name(interface_name);
        let entity_class = entity_class.into();
        let name = implementation_name.clone();
        self.register(
            implementation_name,
            Arc::new(move |repository: Arc<dyn BusinessDataRepository>| {
                Arc::new(RepositoryDao::new(name.clone(), entity_class.clone(), repository))
                    as Arc<dyn BusinessObjectDao>
            }),
        );
    }

    /// Build the implementation registered under `implementation_name`
    pub fn create(
        &self,
        implementation_name: &str,
        repository: Arc<dyn BusinessDataRepository>,
    ) -> Option<Arc<dyn BusinessObjectDao>> {
        self.factories
            .get(implementation_name)
            .map(|factory| factory(repository))
    }
}

/// Business object implementation reading one entity class from a repository
pub struct RepositoryDao {
    implementation_name: String,
    entity_class: String,
    repository: Arc<dyn BusinessDataRepository>,
}

impl RepositoryDao {
    /// Create an implementation
    pub fn new(
        implementation_name: impl Into<String>,
        entity_class: impl Into<String>,
        repository: Arc<dyn BusinessDataRepository>,
    ) -> Self {
        Self {
            implementation_name: implementation_name.into(),
            entity_class: entity_class.into(),
            repository,
        }
    }

    /// Class of the entities handled
    pub fn entity_class(&self) -> &str {
        &self.entity_class
    }
}

impl fmt::Debug for RepositoryDao {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryDao")
            .field("implementation_name", &self.implementation_name)
            .field("entity_class", &self.entity_class)
            .finish()
    }
}

impl BusinessObjectDao for RepositoryDao {
    fn implementation_name(&self) -> &str {
        &self.implementation_name
    }

    fn find_by_persistence_id(
        &self,
        persistence_id: i64,
    ) -> std::result::Result<Option<Entity>, BusinessDataError> {
        self.repository.find_by_id(&self.entity_class, persistence_id)
    }
}

/// Hands out business object accessors bound to the business data store
pub struct BusinessObjectDaoExpressionStrategy {
    registry: Arc<DaoRegistry>,
    repository: Arc<dyn BusinessDataRepository>,
}

impl BusinessObjectDaoExpressionStrategy {
    /// Create the strategy
    pub fn new(registry: Arc<DaoRegistry>, repository: Arc<dyn BusinessDataRepository>) -> Self {
        Self {
            registry,
            repository,
        }
    }
}

impl ExpressionStrategy for BusinessObjectDaoExpressionStrategy {
    fn kind(&self) -> ExpressionKind {
        ExpressionKind::BusinessObjectDao
    }

    fn evaluate(
        &self,
        expression: &Expression,
        _context: &ExpressionContext,
        _resolved: &ResolvedDependencies,
    ) -> Result<RuntimeValue> {
        let implementation_name = self.registry.implementation_name(&expression.content);
        let dao = self
            .registry
            .create(&implementation_name, self.repository.clone())
            .ok_or_else(|| {
                EngineError::NotFound(format!(
                    "Business object implementation {} of {}",
                    implementation_name, expression.content
                ))
            })?;
        Ok(RuntimeValue::Dao(DaoHandle(dao)))
    }

    fn must_cache_in_context(&self) -> bool {
        false
    }
}
