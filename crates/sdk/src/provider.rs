use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    bag::InputBag,
    binder::Binder,
    bus::OperationBus,
    converter::ConverterRegistry,
    error::{ProvideError, SerializationError},
    operation::Operation,
};

/// Binds request values to an operation, dispatches it and shapes the result.
///
/// The domain result is normalized to JSON by the bus and denormalized here
/// into the resource type exposed by the API.
#[derive(Clone, Debug)]
pub struct OperationProvider {
    converters: Arc<ConverterRegistry>,
    bus: Arc<OperationBus>,
}

impl OperationProvider {
    pub fn new(converters: Arc<ConverterRegistry>, bus: Arc<OperationBus>) -> Self {
        OperationProvider { converters, bus }
    }

    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    pub fn bus(&self) -> &OperationBus {
        &self.bus
    }

    /// Builds `O` from path variables merged with filters, without dispatching it.
    pub fn bind<O, P, F, K, V>(&self, path_vars: P, filters: F) -> Result<O, ProvideError>
    where
        O: Operation,
        P: IntoIterator<Item = (K, V)>,
        F: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let bag = InputBag::merge(path_vars, filters);
        let operation = Binder::new(&self.converters).bind::<O>(bag)?;
        Ok(operation)
    }

    /// Binds `O`, dispatches it and denormalizes the result into `R`.
    pub async fn provide<O, R, P, F, K, V>(&self, path_vars: P, filters: F) -> Result<R, ProvideError>
    where
        O: Operation,
        R: DeserializeOwned,
        P: IntoIterator<Item = (K, V)>,
        F: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let operation = self.bind::<O, _, _, _, _>(path_vars, filters)?;
        let normalized = self.bus.handle(operation).await?;
        let resource = serde_json::from_value(normalized).map_err(SerializationError::from)?;
        Ok(resource)
    }
}
