use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::Model;
use crate::config::OdmConfig;
use crate::driver::Driver;
use crate::errors::OdmError;
use crate::lifecycle::Lifecycle;
use crate::schema::naming::collection_name_of;
use crate::schema::{Record, RecordTypeMetadata, Registry};

/// A record type registered on a connection
#[derive(Debug, Clone)]
pub struct RegisteredModel {
    pub name: String,
    pub collection: String,
    pub metadata: Arc<RecordTypeMetadata>,
}

/// Entry point: a driver, the metadata registry and the ODM settings.
///
/// Record types are registered once at startup so that metadata errors
/// surface there instead of on the first request.
pub struct Connection {
    driver: Arc<dyn Driver>,
    registry: Arc<Registry>,
    config: OdmConfig,
    lifecycle: Lifecycle,
    models: RwLock<HashMap<TypeId, RegisteredModel>>,
}

impl Connection {
    pub fn new(driver: Arc<dyn Driver>, config: OdmConfig) -> Self {
        Self::with_registry(driver, config, Arc::new(Registry::new()))
    }

    /// Share one registry between several connections
    pub fn with_registry(driver: Arc<dyn Driver>, config: OdmConfig, registry: Arc<Registry>) -> Self {
        Connection {
            driver,
            registry,
            config,
            lifecycle: Lifecycle::default(),
            models: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &OdmConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Describe `R` and make it available through [`Connection::model`]
    pub fn register<R: Record>(&self) -> Result<Model<R>, OdmError> {
        let metadata = self.registry.describe_record::<R>()?;
        let registered = RegisteredModel {
            name: metadata.type_name().to_string(),
            collection: collection_name_of::<R>(),
            metadata,
        };

        log::info!(
            "Connection: registered {} -> collection '{}'",
            registered.name,
            registered.collection
        );
        self.models
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<R>(), registered.clone());

        Ok(Model::new(self, registered))
    }

    pub fn model<R: Record>(&self) -> Result<Model<R>, OdmError> {
        let registered = self
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<R>())
            .cloned();

        match registered {
            Some(registered) => Ok(Model::new(self, registered)),
            None => Err(OdmError::InvalidParams(format!(
                "record type `{}` is not registered",
                std::any::type_name::<R>()
            ))),
        }
    }

    /// Registered model by type name, ignoring case
    pub fn model_by_name(&self, name: &str) -> Result<RegisteredModel, OdmError> {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|registered| registered.name.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| OdmError::InvalidParams(format!("model '{}' is not registered", name)))
    }

    pub fn registered_models(&self) -> Vec<RegisteredModel> {
        let mut models: Vec<_> = self
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        models.sort_by(|a, b| a.name.cmp(&b.name));
        models
    }
}
